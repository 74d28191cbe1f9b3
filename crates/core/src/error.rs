use thiserror::Error;

/// A field-level validation failure, reported before any storage I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("invalid {field}: {reason}")]
    Malformed { field: &'static str, reason: String },
    #[error("{field} out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },
    #[error("unsupported {field}: {value}")]
    Unsupported { field: &'static str, value: String },
}

impl ValidationError {
    pub fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            field,
            reason: reason.into(),
        }
    }

    pub fn out_of_range(field: &'static str, reason: impl Into<String>) -> Self {
        Self::OutOfRange {
            field,
            reason: reason.into(),
        }
    }

    pub fn unsupported(field: &'static str, value: impl Into<String>) -> Self {
        Self::Unsupported {
            field,
            value: value.into(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Empty { field }
            | Self::TooLong { field, .. }
            | Self::Malformed { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::Unsupported { field, .. } => field,
        }
    }
}

/// Uniform error returned by every repository implementation.
///
/// Backends translate their driver-specific "no rows" and "duplicate key"
/// conditions into [`StoreError::NotFound`] and [`StoreError::Conflict`];
/// everything else the driver reports ends up in [`StoreError::Backend`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("storage error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Build a closure that wraps a driver error with some context.
    pub fn backend<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> Self + '_ {
        move |e| Self::Backend(format!("{context}: {e}"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
