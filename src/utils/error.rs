//! Error handling for Xi Script
//!
//! All three phases (lexing, parsing, execution) report failures as a
//! `(message, line)` pair. `Display` renders the pair as `"<message> at line <n>"`.

use crate::utils::Span;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Script error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ==================== Lexer Errors ====================
    #[error("{message} at line {}", span.line)]
    Lex { message: String, span: Span },

    // ==================== Parser Errors ====================
    #[error("{message} at line {}", span.line)]
    Parse { message: String, span: Span },

    // ==================== Runtime Errors ====================
    #[error("{message} at line {line}")]
    Runtime { message: String, line: usize },
}

/// Which phase produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lex,
    Parse,
    Runtime,
}

impl Error {
    pub fn lex(message: impl Into<String>, span: Span) -> Self {
        Self::Lex { message: message.into(), span }
    }

    pub fn parse(message: impl Into<String>, span: Span) -> Self {
        Self::Parse { message: message.into(), span }
    }

    pub fn runtime(message: impl Into<String>, line: usize) -> Self {
        Self::Runtime { message: message.into(), line }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Lex { .. } => ErrorKind::Lex,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Runtime { .. } => ErrorKind::Runtime,
        }
    }

    /// The bare message, without the line suffix
    pub fn message(&self) -> &str {
        match self {
            Self::Lex { message, .. } | Self::Parse { message, .. } | Self::Runtime { message, .. } => message,
        }
    }

    /// Source line the error was reported on (0 when raised outside any statement)
    pub fn line(&self) -> usize {
        match self {
            Self::Lex { span, .. } | Self::Parse { span, .. } => span.line,
            Self::Runtime { line, .. } => *line,
        }
    }

    /// Get the span associated with this error
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lex { span, .. } | Self::Parse { span, .. } => Some(*span),
            Self::Runtime { .. } => None,
        }
    }
}
