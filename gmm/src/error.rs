use thiserror::Error;

/// Errors returned by gmm operations.
#[derive(Debug, Error)]
pub enum GmmError {
    #[error("gmm: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("gmm: {0} covariance is not implemented")]
    Unimplemented(String),

    #[error("gmm: number of components must be a power of two, got {0}")]
    NotPowerOfTwo(usize),

    #[error("gmm: statistics order must be 1 or 2, got {0}")]
    InvalidOrder(u8),

    #[error("gmm: statistics order mismatch")]
    OrderMismatch,

    #[error("gmm: empty data")]
    EmptyData,

    #[error("gmm: invalid model: {0}")]
    InvalidModel(String),

    #[error("gmm: unknown covariance kind: {0}")]
    UnknownKind(String),

    #[error("gmm: unknown persisted type: {0}")]
    UnknownType(String),

    #[error("gmm: {0}")]
    Io(String),

    #[error("gmm: invalid format: {0}")]
    InvalidFormat(String),
}
