use thiserror::Error;

use super::{LuaType, ThreadStatus};

/// Host-side view of a failed interpreter operation.
///
/// The interpreter itself reports failures as a [`ThreadStatus`] with the
/// error object left on the stack; this type only exists for callers that
/// opt into `?` through [`LuaState::check_status`](super::LuaState::check_status).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LuaError {
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("not enough memory")]
    Memory,
    #[error("error in error handling: {0}")]
    ErrorHandler(String),
    #[error("cannot open file: {0}")]
    File(String),
    #[error("{expected} expected, got {found}")]
    TypeMismatch { expected: LuaType, found: LuaType },
}

pub type LuaResult<T> = Result<T, LuaError>;

impl LuaError {
    /// Error for a failing status, or `None` for `Ok`/`Yield`.
    pub fn from_status(status: ThreadStatus, message: String) -> Option<Self> {
        Some(match status {
            ThreadStatus::Ok | ThreadStatus::Yield => return None,
            ThreadStatus::ErrRun => LuaError::Runtime(message),
            ThreadStatus::ErrSyntax => LuaError::Syntax(message),
            ThreadStatus::ErrMem => LuaError::Memory,
            ThreadStatus::ErrErr => LuaError::ErrorHandler(message),
            ThreadStatus::ErrFile => LuaError::File(message),
        })
    }
}
