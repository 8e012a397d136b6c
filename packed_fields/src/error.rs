use bit_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("a layout needs at least one field")]
    EmptyLayout,

    #[error("Bit width must be in the range 1..=32, got {0}")]
    InvalidWidth(u8),

    #[error("expected {expected} values, one per field, got {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("Index {index} is out of bounds for {len} fields")]
    FieldIndexOutOfBounds { index: usize, len: usize },

    #[error("store replied with {found} values for {expected} fields")]
    ResponseLength { expected: usize, found: usize },

    #[error("reply {0:?} is not an unsigned 32-bit field value")]
    UnexpectedReply(Option<i64>),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl FieldError {
    /// Whether the error comes from misuse of the API rather than from the
    /// store or the network.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FieldError::EmptyLayout
                | FieldError::InvalidWidth(_)
                | FieldError::ArityMismatch { .. }
                | FieldError::FieldIndexOutOfBounds { .. }
        )
    }
}

pub type Result<T> = core::result::Result<T, FieldError>;
