//! Xi Script
//!
//! An embeddable Lua-like scripting language: lexer, parser, arena AST and
//! a tree-walking interpreter with a small standard library.

pub mod feedback;
pub mod frontend;
pub mod runtime;
pub mod script;
pub mod stdlib;
pub mod utils;

pub use frontend::ast::Program;
pub use runtime::{Interpreter, Limits, ScriptTable, ScriptValue};
pub use script::{ScriptEngine, ScriptInstance};
pub use utils::{Error, ErrorKind, Result, Span};
