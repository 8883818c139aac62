//! The single error type surfaced to callers, carrying the `(line, column)`
//! of the offending byte (spec §7 "Error reporting").

use crate::stack::StackError;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("{message} at {line}:{column}")]
pub struct ParseError {
    pub message: String,
    pub line: i64,
    pub column: i64,
}

impl ParseError {
    #[must_use]
    pub fn new(message: impl Into<String>, line: i64, column: i64) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }

    pub(crate) fn from_stack(err: StackError, line: i64, column: i64) -> Self {
        let message = match err {
            StackError::TooManyCloses => "too many closes",
            StackError::UnexpectedArrayClose => "unexpected array close",
            StackError::UnexpectedObjectClose => "unexpected object close",
        };
        Self::new(message, line, column)
    }
}
