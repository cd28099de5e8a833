use crate::SvgParserError;

/// Errors produced outside of the geometry core
///
/// Geometric degeneracy is never an error, effects report it through
/// [`Outcome::Unchanged`](crate::Outcome) instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse path: {reason} at offset {offset}")]
    Parse { reason: String, offset: usize },
    #[error("invalid value for parameter `{key}`: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("unknown or unsupported effect: {0}")]
    UnknownEffect(String),
    #[error("conversion error: {reason}")]
    Conversion { reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "serde")]
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<SvgParserError> for Error {
    fn from(error: SvgParserError) -> Self {
        match error {
            SvgParserError::IoError(error) => Error::Io(error),
            error => Error::Parse {
                reason: error.to_string(),
                offset: error.offset(),
            },
        }
    }
}
