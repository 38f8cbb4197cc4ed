//! Unified error type.

/// The error type returned by the server's fallible startup operations.
///
/// Application-level failures (404, 503, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: reading configuration, parsing the listen
/// address, binding to a port.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(#[from] envconfig::Error),

    #[error("invalid listen address `{0}`")]
    InvalidAddress(String),
}
