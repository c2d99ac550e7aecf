use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Rejected by `CoreConfig::validate` or an unparsable log filter.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The global tracing subscriber could not be installed.
    #[error("Logging setup failed: {0}")]
    Logging(String),

    /// The default HTTP transport could not be constructed.
    #[error("HTTP transport unavailable: {0}")]
    Transport(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, Error>;
