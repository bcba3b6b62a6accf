// Portal session lifecycle
//
// The portal ties every request to a server-side session opened with a
// valid access token. `SessionManager` owns the token, the session id and
// the keepalive throttle. Each check-then-refresh sequence runs under one
// async mutex so concurrent callers never open redundant sessions.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};
use url::Url;

use crate::auth::{Authenticator, Tokens};
use crate::error::Error;

/// Keepalive calls are throttled to one per interval.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Server-issued browser session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// ── Session opener ───────────────────────────────────────────────────

/// Opens and extends portal sessions for a given access token.
#[async_trait]
pub trait SessionOpener: Send + Sync {
    async fn create_session(
        &self,
        http: &reqwest::Client,
        access_token: &SecretString,
    ) -> Result<SessionId, Error>;

    /// Keepalive. The portal returns no payload of interest.
    async fn update_session(
        &self,
        http: &reqwest::Client,
        access_token: &SecretString,
        session_id: SessionId,
    ) -> Result<(), Error>;
}

#[derive(Deserialize)]
struct CreateSessionResponse {
    #[serde(rename = "browserSessionId", alias = "BrowserSessionId")]
    browser_session_id: SessionId,
}

/// `CreateSession2` / `UpdateSession` on the portal.
pub struct PortalSessionOpener {
    base_url: Url,
}

impl PortalSessionOpener {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    async fn post(
        &self,
        http: &reqwest::Client,
        access_token: &SecretString,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<String, Error> {
        let url = self.base_url.join(path)?;
        debug!("POST {}", url);

        let resp = http
            .post(url)
            .bearer_auth(access_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Session {
                message: format!("{path} failed (HTTP {status}): {body}"),
                status: Some(status.as_u16()),
            });
        }

        resp.text().await.map_err(Error::Transport)
    }
}

#[async_trait]
impl SessionOpener for PortalSessionOpener {
    async fn create_session(
        &self,
        http: &reqwest::Client,
        access_token: &SecretString,
    ) -> Result<SessionId, Error> {
        let timestamp = chrono::Local::now()
            .format("%Y-%m-%d %H:%M:%S%.3f")
            .to_string();
        let body = self
            .post(
                http,
                access_token,
                "api/portal/CreateSession2",
                &json!({ "timestamp": timestamp }),
            )
            .await?;

        let created: CreateSessionResponse =
            serde_json::from_str(&body).map_err(|e| Error::deserialization(&e, &body))?;
        Ok(created.browser_session_id)
    }

    async fn update_session(
        &self,
        http: &reqwest::Client,
        access_token: &SecretString,
        session_id: SessionId,
    ) -> Result<(), Error> {
        self.post(
            http,
            access_token,
            "api/portal/UpdateSession",
            &json!({ "sessionId": session_id }),
        )
        .await?;
        Ok(())
    }
}

// ── Session manager ──────────────────────────────────────────────────

/// Credentials and session id as of one point in time.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub access_token: SecretString,
    pub session_id: SessionId,
    pub last_access: Option<String>,
    /// Incremented every time a new session is opened.
    pub generation: u64,
}

impl SessionSnapshot {
    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }
}

#[derive(Debug, Default)]
struct SessionState {
    tokens: Option<Tokens>,
    session_id: Option<SessionId>,
    last_access: Option<String>,
    next_session_refresh: Option<Instant>,
    generation: u64,
}

impl SessionState {
    /// Snapshot of the current session, unless the token is missing or expired.
    fn valid_snapshot(&self) -> Option<SessionSnapshot> {
        let tokens = self.tokens.as_ref().filter(|t| !t.is_expired())?;
        Some(SessionSnapshot {
            access_token: tokens.access_token.clone(),
            session_id: self.session_id?,
            last_access: self.last_access.clone(),
            generation: self.generation,
        })
    }

    fn clear(&mut self) {
        *self = Self {
            generation: self.generation,
            ..Self::default()
        };
    }
}

/// Owns token and session state for one portal client.
pub struct SessionManager {
    http: reqwest::Client,
    authenticator: Arc<dyn Authenticator>,
    opener: Arc<dyn SessionOpener>,
    refresh_interval: Duration,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(
        http: reqwest::Client,
        authenticator: Arc<dyn Authenticator>,
        opener: Arc<dyn SessionOpener>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            http,
            authenticator,
            opener,
            refresh_interval,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Return the current session, authenticating and opening a new session
    /// first when there is no token or it has expired.
    pub async fn ensure_authenticated(&self) -> Result<SessionSnapshot, Error> {
        let mut state = self.state.lock().await;
        if let Some(snapshot) = state.valid_snapshot() {
            return Ok(snapshot);
        }
        debug!("no valid access token, authenticating");
        self.open(&mut state).await
    }

    /// Replace the session observed at `stale_generation`, regardless of
    /// token expiry.
    ///
    /// If another caller already replaced it, the newer session is returned
    /// instead of opening yet another one.
    pub async fn reauthenticate(&self, stale_generation: u64) -> Result<SessionSnapshot, Error> {
        let mut state = self.state.lock().await;
        if let Some(snapshot) = state
            .valid_snapshot()
            .filter(|s| s.generation != stale_generation)
        {
            debug!(generation = snapshot.generation, "session already replaced");
            return Ok(snapshot);
        }
        info!("re-authenticating with the portal");
        self.open(&mut state).await
    }

    /// Signal portal activity, at most once per refresh interval.
    pub async fn maybe_refresh_session(&self) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if state
            .next_session_refresh
            .is_some_and(|next| Instant::now() < next)
        {
            return Ok(());
        }

        let (Some(tokens), Some(session_id)) = (state.tokens.as_ref(), state.session_id) else {
            return Err(Error::SessionExpired);
        };
        self.opener
            .update_session(&self.http, &tokens.access_token, session_id)
            .await?;

        state.next_session_refresh = Some(Instant::now() + self.refresh_interval);
        debug!(%session_id, "session extended");
        Ok(())
    }

    /// Remember the server's `lastAccess` marker for the next values poll.
    ///
    /// Ignored if the session was replaced since the request started.
    pub async fn record_last_access(&self, generation: u64, last_access: Option<String>) {
        let mut state = self.state.lock().await;
        if state.generation == generation {
            state.last_access = last_access;
        }
    }

    /// Drop token and session so the next request starts from scratch.
    pub async fn invalidate(&self) {
        self.state.lock().await.clear();
    }

    pub async fn session_id(&self) -> Option<SessionId> {
        self.state.lock().await.session_id
    }

    pub async fn last_access(&self) -> Option<String> {
        self.state.lock().await.last_access.clone()
    }

    /// Authenticate and open a session. Both must succeed; on failure the
    /// state is left empty so the next call starts over.
    async fn open(&self, state: &mut SessionState) -> Result<SessionSnapshot, Error> {
        state.clear();

        let tokens = self.authenticator.token(&self.http).await?;
        let session_id = self
            .opener
            .create_session(&self.http, &tokens.access_token)
            .await?;

        state.tokens = Some(tokens);
        state.session_id = Some(session_id);
        state.generation += 1;
        info!(%session_id, generation = state.generation, "portal session opened");

        state.valid_snapshot().ok_or(Error::SessionExpired)
    }
}
