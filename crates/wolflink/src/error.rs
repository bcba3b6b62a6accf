//! CLI error types with miette diagnostics.
//!
//! Maps portal and config errors into user-facing errors with help text.

use miette::Diagnostic;
use thiserror::Error;

use wolflink_config::ConfigError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const DEVICE_READ: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(dead_code)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the Smartset portal at {url}")]
    #[diagnostic(
        code(wolflink::connection_failed),
        help("Check your network connection or the portal_url of your profile.")
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS setup failed: {message}")]
    #[diagnostic(
        code(wolflink::tls_error),
        help("Check ca_cert in your profile, or use --insecure (-k) against a test portal.")
    )]
    TlsError { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(wolflink::auth_failed),
        help(
            "Verify your Smartset username and password.\n\
             Run: wolflink config set-password"
        )
    )]
    AuthFailed { message: String },

    #[error("The portal refused the session: {message}")]
    #[diagnostic(
        code(wolflink::session_failed),
        help("The account may be locked or the portal may be under maintenance.")
    )]
    SessionFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(wolflink::no_credentials),
        help(
            "Configure credentials with: wolflink config init\n\
             Or set WOLFLINK_USERNAME and WOLFLINK_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(wolflink::not_found),
        help("Run: wolflink {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Portal ───────────────────────────────────────────────────────
    #[error("Portal request failed: {message}")]
    #[diagnostic(code(wolflink::api_error))]
    ApiError {
        message: String,
        status: Option<u16>,
    },

    #[error("The heating device did not answer the value request")]
    #[diagnostic(
        code(wolflink::device_read),
        help("The gateway is online but the boiler did not respond. Try again shortly.")
    )]
    DeviceRead,

    #[error("Unexpected portal response: {message}")]
    #[diagnostic(code(wolflink::invalid_response), help("Run with -vv to see the request log."))]
    InvalidResponse { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(wolflink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(wolflink::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: wolflink config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(wolflink::config))]
    Config(Box<figment::Error>),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(wolflink::timeout),
        help("Increase the timeout with --timeout or try again later.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Rendering ───────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {message}")]
    #[diagnostic(code(wolflink::render))]
    Render { message: String },
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::SessionFailed { .. } | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::DeviceRead => exit_code::DEVICE_READ,
            Self::Validation { .. } | Self::ProfileNotFound { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Error mapping ────────────────────────────────────────────────────

impl From<wolflink_api::Error> for CliError {
    fn from(err: wolflink_api::Error) -> Self {
        use wolflink_api::Error;

        match err {
            Error::Authentication { message } => CliError::AuthFailed { message },

            Error::Session { message, .. } => CliError::SessionFailed { message },

            Error::SessionExpired => CliError::SessionFailed {
                message: "session expired".into(),
            },

            Error::Transport(e) => CliError::ConnectionFailed {
                url: e
                    .url()
                    .map_or_else(|| "(unknown)".into(), ToString::to_string),
                source: Box::new(e),
            },

            Error::InvalidUrl(e) => CliError::Validation {
                field: "url".into(),
                reason: e.to_string(),
            },

            Error::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            Error::Tls(message) => CliError::TlsError { message },

            Error::FetchFailed {
                message, status, ..
            } => CliError::ApiError { message, status },

            Error::ParameterRead { .. } => CliError::DeviceRead,

            Error::Deserialization { message, .. } => CliError::InvalidResponse { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Serialization(e) => CliError::Render {
                message: e.to_string(),
            },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
