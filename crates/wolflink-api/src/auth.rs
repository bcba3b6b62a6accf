// Token acquisition
//
// The portal accepts bearer tokens issued by the Smartset identity server.
// `Authenticator` is the seam the session manager depends on;
// `PasswordAuthenticator` is the production implementation.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::Error;

pub const DEFAULT_TOKEN_URL: &str = "https://www.wolf-smartset.com/idsrv/connect/token";
const CLIENT_ID: &str = "ro.client";
const SCOPE: &str = "offline_access openid api";

/// An access token and the instant it stops being valid.
///
/// Replaced wholesale on refresh, never mutated.
#[derive(Debug, Clone)]
pub struct Tokens {
    pub access_token: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Exchanges credentials for a fresh access token.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn token(&self, http: &reqwest::Client) -> Result<Tokens, Error>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// OAuth2 resource-owner password grant against the identity server.
pub struct PasswordAuthenticator {
    token_url: Url,
    username: String,
    password: SecretString,
}

impl PasswordAuthenticator {
    pub fn new(token_url: Url, username: String, password: SecretString) -> Self {
        Self {
            token_url,
            username,
            password,
        }
    }
}

#[async_trait]
impl Authenticator for PasswordAuthenticator {
    async fn token(&self, http: &reqwest::Client) -> Result<Tokens, Error> {
        debug!(url = %self.token_url, username = %self.username, "requesting access token");

        let form = [
            ("grant_type", "password"),
            ("username", self.username.as_str()),
            ("password", self.password.expose_secret()),
            ("client_id", CLIENT_ID),
            ("scope", SCOPE),
        ];

        let resp = http
            .post(self.token_url.clone())
            .form(&form[..])
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("token request failed (HTTP {status}): {body}"),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::deserialization(&e, &body))?;

        debug!(expires_in = token.expires_in, "access token issued");
        Ok(Tokens::new(
            token.access_token,
            Utc::now() + TimeDelta::seconds(token.expires_in),
        ))
    }
}
