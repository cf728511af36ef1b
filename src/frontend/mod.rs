//! Frontend module - Lexer, Parser, AST

pub mod token;
pub mod lexer;
pub mod ast;
pub mod parser;

pub use lexer::tokenize;
pub use parser::{parse_source as parse, Parser};
