use thiserror::Error;

/// Top-level error type for the `wolflink-api` crate.
///
/// Keeps transport and status-code failures apart from domain error
/// payloads the portal embeds in otherwise successful responses.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The token endpoint rejected the credentials.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The portal refused to open or extend a session.
    #[error("Session error: {message}")]
    Session {
        message: String,
        status: Option<u16>,
    },

    /// An operation needed an open session but none exists.
    #[error("No active portal session -- authenticate first")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request exceeded the configured deadline.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Portal ──────────────────────────────────────────────────────
    /// The request failed after the single re-authentication retry, or the
    /// portal answered with an unrecognized error payload.
    #[error("Fetch failed: {message}")]
    FetchFailed {
        message: String,
        status: Option<u16>,
        payload: Option<serde_json::Value>,
    },

    /// The device did not report a parameter value. Transient; re-poll.
    #[error("Device failed to read parameter values")]
    ParameterRead { payload: serde_json::Value },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the credentials or the session were rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::Session { .. } | Self::SessionExpired
        )
    }

    /// Returns `true` if polling again may succeed without intervention.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::ParameterRead { .. } => true,
            _ => false,
        }
    }

    /// HTTP status attached to the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::FetchFailed { status, .. } | Self::Session { status, .. } => *status,
            _ => None,
        }
    }

    /// Returns `true` if the portal rejected a session call with 401 or 500,
    /// meaning the server-side session is gone and a new one is needed.
    pub fn is_stale_session(&self) -> bool {
        matches!(self, Self::Session { status: Some(401 | 500), .. })
    }

    pub(crate) fn deserialization(err: &serde_json::Error, body: &str) -> Self {
        let preview: String = body.chars().take(200).collect();
        Self::Deserialization {
            message: format!("{err} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parameter_read_is_transient_but_fetch_failure_is_not() {
        let read = Error::ParameterRead {
            payload: json!({ "errorCode": 1 }),
        };
        let fetch = Error::FetchFailed {
            message: "HTTP 401".into(),
            status: Some(401),
            payload: None,
        };

        assert!(read.is_transient());
        assert!(!fetch.is_transient());
        assert_eq!(fetch.status(), Some(401));
        assert!(!fetch.is_auth_failure());
    }

    #[test]
    fn only_401_and_500_session_rejections_are_stale() {
        let rejected = |status| Error::Session {
            message: "UpdateSession".into(),
            status,
        };

        assert!(rejected(Some(401)).is_stale_session());
        assert!(rejected(Some(500)).is_stale_session());
        assert!(!rejected(Some(403)).is_stale_session());
        assert!(!rejected(None).is_stale_session());
        assert!(!Error::SessionExpired.is_stale_session());
    }

    #[test]
    fn deserialization_preview_is_bounded() {
        let body = "x".repeat(500);
        let err = serde_json::from_str::<serde_json::Value>(&body).unwrap_err();

        match Error::deserialization(&err, &body) {
            Error::Deserialization { message, body: raw } => {
                assert!(message.len() < 300);
                assert_eq!(raw.len(), 500);
            }
            other => panic!("expected Deserialization, got {other:?}"),
        }
    }
}
