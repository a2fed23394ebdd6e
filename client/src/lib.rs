pub mod api;
pub mod backoff;
pub mod board;
pub mod config;
pub mod driver;
pub mod events;
pub mod identity;
pub mod scheduler;
pub mod screen;
pub mod session;
pub mod sync;

pub use api::HttpApi;
pub use config::{AnimationConfig, ClientConfig};
pub use driver::{Command, Driver};
pub use events::Stream;
pub use identity::{Identity, IdentityStore};
pub use screen::{Screen, Surface};
pub use sync::{BetRejected, Effect, RoundPhase, RoundSyncClient};
use thiserror::Error;

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed: {status}: {body}")]
    FailedWithBody {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("connection closed")]
    ConnectionClosed,
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("dial timeout")]
    DialTimeout,
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
