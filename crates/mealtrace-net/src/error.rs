use thiserror::Error;

/// Errors produced by the network layer.
#[derive(Error, Debug)]
pub enum NetError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Server returned status {0}")]
    Status(u16),

    /// Neither a bearer token nor a device id is available for the call.
    #[error("No credentials available for remote call")]
    NoAuth,

    /// The response body did not match the expected shape.
    #[error("Invalid response body: {0}")]
    InvalidBody(String),
}
