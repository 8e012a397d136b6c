use thiserror::Error;

/// Errors raised at the bit store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error on the connection
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The server rejected the command
    #[error("server error: {0}")]
    Server(String),

    /// The reply stream could not be parsed
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("unexpected reply to {command}: {reply}")]
    UnexpectedReply { command: &'static str, reply: String },

    #[error("invalid field type `{0}`, expected u1..=u63")]
    InvalidFieldType(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = core::result::Result<T, StoreError>;
