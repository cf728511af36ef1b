//! Runtime module - values, scopes and the interpreter

pub mod environment;
pub mod interpreter;
pub mod operators;
pub mod value;

pub use interpreter::{Flow, Interpreter, Limits};
pub use value::{FunctionRef, NativeFunction, ScriptTable, ScriptValue};
