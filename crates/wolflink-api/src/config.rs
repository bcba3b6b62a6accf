// Client configuration
//
// Everything `PortalClient::new` needs to wire the production
// authenticator, session opener and transport.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::auth::DEFAULT_TOKEN_URL;
use crate::error::Error;
use crate::session::DEFAULT_REFRESH_INTERVAL;
use crate::transport::TransportConfig;

pub const DEFAULT_PORTAL_URL: &str = "https://www.wolf-smartset.com/portal/";

/// Smartset account credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Portal root; API paths are joined onto it.
    pub portal_url: Url,
    pub token_url: Url,
    pub credentials: Credentials,
    pub transport: TransportConfig,
    /// Minimum spacing between session keepalive calls.
    pub session_refresh_interval: Duration,
}

impl ClientConfig {
    /// Config for the public Smartset portal.
    pub fn new(credentials: Credentials) -> Result<Self, Error> {
        Ok(Self {
            portal_url: Url::parse(DEFAULT_PORTAL_URL)?,
            token_url: Url::parse(DEFAULT_TOKEN_URL)?,
            credentials,
            transport: TransportConfig::default(),
            session_refresh_interval: DEFAULT_REFRESH_INTERVAL,
        })
    }
}

/// `Url::join` drops the last path segment unless the base ends with `/`.
pub(crate) fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
