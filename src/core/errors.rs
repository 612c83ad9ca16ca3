use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl ClientError {
    /// Whether the error invalidates the transport.
    ///
    /// Deserialization failures are local to a single frame: the connection
    /// stays open and keeps reading. Everything else means the socket is gone
    /// and the caller enters its recovery path.
    pub fn is_transport_fatal(&self) -> bool {
        !matches!(self, Self::DeserializationError(_))
    }
}
