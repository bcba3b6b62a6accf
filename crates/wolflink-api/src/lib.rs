// wolflink-api: Async Rust client for the Wolf Smartset heating portal

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod flatten;
pub mod mapper;
pub mod models;
pub mod portal;
pub mod session;
pub mod transport;

pub use auth::{Authenticator, PasswordAuthenticator, Tokens};
pub use client::{PortalClient, RequestOptions};
pub use config::{ClientConfig, Credentials};
pub use error::Error;
pub use models::{Device, ListItem, Parameter, ParameterInfo, ParameterKind, Value};
pub use session::{PortalSessionOpener, SessionId, SessionManager, SessionOpener, SessionSnapshot};
pub use transport::{TlsMode, TransportConfig};
