//! Script Engine
//!
//! Compiles source text into shareable programs and builds interpreters
//! seeded with the standard library and engine API.

use crate::frontend::ast::Program;
use crate::frontend::parser;
use crate::runtime::{Interpreter, Limits};
use crate::stdlib;
use crate::utils::{Error, Result};
use log::debug;
use std::rc::Rc;

/// Compile/validate facade and interpreter factory
#[derive(Debug, Default)]
pub struct ScriptEngine {
    limits: Limits,
    /// Error from the last compile
    error: Option<Error>,
}

impl ScriptEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpreters created by this engine use `limits`
    pub fn with_limits(limits: Limits) -> Self {
        Self { limits, error: None }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Lex and parse `source`. The result can be executed by any number of
    /// interpreters.
    pub fn compile(&mut self, source: &str) -> Result<Rc<Program>> {
        self.error = None;

        let result = parser::parse_source(source).map(Rc::new);
        match &result {
            Ok(program) => debug!(
                "Compiled script: {} top-level statements, {} functions",
                program.body.len(),
                program.function_count()
            ),
            Err(err) => {
                debug!("Compilation failed: {}", err);
                self.error = Some(err.clone());
            }
        }
        result
    }

    /// True when `source` compiles to a non-empty program
    pub fn validate(&mut self, source: &str) -> bool {
        self.compile(source).is_ok_and(|program| !program.is_empty())
    }

    /// A fresh interpreter with this engine's limits and no globals
    pub fn create_interpreter(&self) -> Interpreter {
        Interpreter::with_limits(self.limits)
    }

    pub fn register_standard_library(&self, interp: &mut Interpreter) {
        stdlib::register_standard_library(interp);
    }

    pub fn register_engine_api(&self, interp: &mut Interpreter) {
        stdlib::register_engine_api(interp);
    }

    // ==================== Diagnostics ====================

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Message of the last compile error, empty when it succeeded
    pub fn error(&self) -> &str {
        self.error.as_ref().map_or("", |e| e.message())
    }

    /// Line of the last compile error, or -1
    pub fn error_line(&self) -> i64 {
        self.error.as_ref().map_or(-1, |e| e.line() as i64)
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}
