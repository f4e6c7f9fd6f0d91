//thiserror-based error taxonomy for command handlers
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("room {0} not found")]
    NotFound(u32),
    #[error("precondition violated: {0}")]
    Precondition(String),
    #[error("{0}")]
    AlreadyInState(String),
    #[error("billing conflict: {0}")]
    Conflict(String),
    #[error("internal invariant violation: {0}")]
    Internal(String),
}

impl From<hotel_protocol::ParseEnumError> for CoreError {
    fn from(e: hotel_protocol::ParseEnumError) -> Self {
        CoreError::Precondition(e.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
