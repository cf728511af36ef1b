//! Utility module

mod error;
mod span;
mod stack;

pub use error::{Error, ErrorKind, Result};
pub use span::Span;
pub use stack::ensure_sufficient_stack;
