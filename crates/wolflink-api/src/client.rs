// Portal HTTP client
//
// Wraps `reqwest::Client` with bearer injection, session keepalive and a
// single re-authenticating retry. Endpoint methods live in `portal.rs` as
// inherent methods to keep this module focused on request mechanics.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{Authenticator, PasswordAuthenticator};
use crate::config::{ClientConfig, with_trailing_slash};
use crate::error::Error;
use crate::session::{PortalSessionOpener, SessionManager, SessionOpener, SessionSnapshot};

type SessionBody = Box<dyn Fn(&SessionSnapshot) -> serde_json::Value + Send + Sync>;

enum Body {
    Json(serde_json::Value),
    /// Rebuilt from the live session for every attempt.
    Session(SessionBody),
}

/// Per-call request options for [`PortalClient::execute`].
#[derive(Default)]
pub struct RequestOptions {
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Body>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Extra header. Overrides the injected `Authorization` on collision.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(Body::Json(body));
        self
    }

    /// JSON body that embeds session state such as `sessionId`.
    pub fn json_with_session(
        mut self,
        build: impl Fn(&SessionSnapshot) -> serde_json::Value + Send + Sync + 'static,
    ) -> Self {
        self.body = Some(Body::Session(Box::new(build)));
        self
    }

    fn body_for(&self, session: &SessionSnapshot) -> Option<serde_json::Value> {
        match self.body.as_ref()? {
            Body::Json(value) => Some(value.clone()),
            Body::Session(build) => Some(build(session)),
        }
    }
}

/// 401 and 500 mean the token or the portal session went stale.
fn is_stale_session(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::INTERNAL_SERVER_ERROR
}

/// Bearer header merged with caller headers; caller values win.
fn build_headers(session: &SessionSnapshot, extra: &HeaderMap) -> Result<HeaderMap, Error> {
    let bearer = HeaderValue::from_str(&session.bearer()).map_err(|_| Error::Authentication {
        message: "access token is not a valid header value".into(),
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, bearer);
    for name in extra.keys() {
        headers.remove(name);
    }
    for (name, value) in extra {
        headers.append(name.clone(), value.clone());
    }
    Ok(headers)
}

/// Stateful client for the Smartset portal API.
///
/// Owns the session state for its lifetime. Safe to share between tasks;
/// session refreshes are serialized internally.
pub struct PortalClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Option<Duration>,
    session: SessionManager,
    last_request_failed: AtomicBool,
}

impl PortalClient {
    /// Create a client with the production authenticator and session opener.
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let http = config.transport.build_client()?;
        let base_url = with_trailing_slash(config.portal_url.clone());

        let authenticator = Arc::new(PasswordAuthenticator::new(
            config.token_url.clone(),
            config.credentials.username.clone(),
            config.credentials.password.clone(),
        ));
        let opener = Arc::new(PortalSessionOpener::new(base_url.clone()));

        let mut client = Self::with_collaborators(
            http,
            base_url,
            authenticator,
            opener,
            config.session_refresh_interval,
        );
        client.timeout = Some(config.transport.timeout);
        Ok(client)
    }

    /// Create a client with caller-supplied collaborators.
    ///
    /// Use this with a pre-built `reqwest::Client` or to substitute the
    /// token and session flows.
    pub fn with_collaborators(
        http: reqwest::Client,
        base_url: Url,
        authenticator: Arc<dyn Authenticator>,
        opener: Arc<dyn SessionOpener>,
        session_refresh_interval: Duration,
    ) -> Self {
        let session = SessionManager::new(
            http.clone(),
            authenticator,
            opener,
            session_refresh_interval,
        );
        Self {
            http,
            base_url: with_trailing_slash(base_url),
            timeout: None,
            session,
            last_request_failed: AtomicBool::new(false),
        }
    }

    /// The portal base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Whether the most recent call through [`execute`](Self::execute) failed.
    pub fn last_request_failed(&self) -> bool {
        self.last_request_failed.load(Ordering::Relaxed)
    }

    // ── Pipeline ─────────────────────────────────────────────────────

    /// Run one API call and return its parsed JSON body.
    ///
    /// Authenticates and extends the session as needed. A 401 or 500
    /// response forces re-authentication and exactly one retry; if the retry
    /// fails as well the call ends in [`Error::FetchFailed`]. Any other
    /// status is parsed and handed back to the caller.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<serde_json::Value, Error> {
        self.execute_with_session(&method, path, &options)
            .await
            .map(|(body, _)| body)
    }

    /// Like [`execute`](Self::execute), also returning the session the
    /// response belongs to.
    pub(crate) async fn execute_with_session(
        &self,
        method: &Method,
        path: &str,
        options: &RequestOptions,
    ) -> Result<(serde_json::Value, SessionSnapshot), Error> {
        let result = self.run(method, path, options).await;
        self.last_request_failed
            .store(result.is_err(), Ordering::Relaxed);
        result
    }

    async fn run(
        &self,
        method: &Method,
        path: &str,
        options: &RequestOptions,
    ) -> Result<(serde_json::Value, SessionSnapshot), Error> {
        let url = self.base_url.join(path)?;

        let mut session = self.session.ensure_authenticated().await?;
        if let Err(e) = self.session.maybe_refresh_session().await {
            if !e.is_stale_session() {
                return Err(e);
            }
            info!(error = %e, "keepalive rejected, re-authenticating");
            session = self.session.reauthenticate(session.generation).await?;
        }
        let headers = build_headers(&session, &options.headers)?;

        let resp = self
            .send(method, url.clone(), headers, options, &session)
            .await?;
        let status = resp.status();
        if !is_stale_session(status) {
            return Ok((self.parse_body(resp).await?, session));
        }

        info!(%status, path, "retrying request after re-authentication");
        let session = self.session.reauthenticate(session.generation).await?;
        let headers = build_headers(&session, &options.headers)?;

        let resp = match self.send(method, url, headers, options, &session).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(path, error = %e, "retry failed");
                return Err(Error::FetchFailed {
                    message: format!("{method} {path} failed on retry: {e}"),
                    status: None,
                    payload: None,
                });
            }
        };

        let status = resp.status();
        if is_stale_session(status) {
            warn!(%status, path, "retry rejected");
            return Err(Error::FetchFailed {
                message: format!("{method} {path} failed after re-authentication (HTTP {status})"),
                status: Some(status.as_u16()),
                payload: None,
            });
        }

        Ok((self.parse_body(resp).await?, session))
    }

    async fn send(
        &self,
        method: &Method,
        url: Url,
        headers: HeaderMap,
        options: &RequestOptions,
        session: &SessionSnapshot,
    ) -> Result<reqwest::Response, Error> {
        debug!("{} {}", method, url);

        let mut builder = self.http.request(method.clone(), url).headers(headers);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(body) = options.body_for(session) {
            builder = builder.json(&body);
        }

        builder.send().await.map_err(|e| self.transport_error(e))
    }

    /// Parse a response body as JSON. An empty body is `null`.
    async fn parse_body(&self, resp: reqwest::Response) -> Result<serde_json::Value, Error> {
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| Error::deserialization(&e, &body))
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        match self.timeout {
            Some(timeout) if err.is_timeout() => Error::Timeout {
                timeout_secs: timeout.as_secs(),
            },
            _ => Error::Transport(err),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::header::CONTENT_TYPE;
    use secrecy::SecretString;

    use super::*;
    use crate::session::SessionId;

    fn snapshot(token: &str) -> SessionSnapshot {
        SessionSnapshot {
            access_token: SecretString::from(token.to_string()),
            session_id: SessionId(42),
            last_access: None,
            generation: 1,
        }
    }

    #[test]
    fn bearer_is_injected() {
        let headers = build_headers(&snapshot("abc"), &HeaderMap::new()).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer abc");
    }

    #[test]
    fn caller_headers_win_on_collision() {
        let mut extra = HeaderMap::new();
        extra.insert(AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        extra.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let headers = build_headers(&snapshot("abc"), &extra).unwrap();

        assert_eq!(headers[AUTHORIZATION], "Basic xyz");
        assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn session_body_is_rebuilt_per_snapshot() {
        let options = RequestOptions::new()
            .json_with_session(|s| serde_json::json!({ "sessionId": s.session_id }));

        let mut session = snapshot("abc");
        assert_eq!(options.body_for(&session).unwrap()["sessionId"], 42);
        session.session_id = SessionId(43);
        assert_eq!(options.body_for(&session).unwrap()["sessionId"], 43);
    }

    #[test]
    fn only_401_and_500_are_stale() {
        assert!(is_stale_session(StatusCode::UNAUTHORIZED));
        assert!(is_stale_session(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_stale_session(StatusCode::FORBIDDEN));
        assert!(!is_stale_session(StatusCode::BAD_GATEWAY));
        assert!(!is_stale_session(StatusCode::OK));
    }
}
