//! Per-entity script state and lifecycle hooks.
//!
//! A script may define `OnStart()`, `OnUpdate(dt)` and `OnDestroy()`. Each
//! is optional. After a runtime error the instance stops updating until it
//! is reloaded.

use crate::frontend::ast::Program;
use crate::runtime::{Interpreter, ScriptValue};
use crate::script::engine::ScriptEngine;
use crate::utils::{Error, Result};
use log::{debug, warn};
use std::rc::Rc;

pub const ON_START: &str = "OnStart";
pub const ON_UPDATE: &str = "OnUpdate";
pub const ON_DESTROY: &str = "OnDestroy";

pub struct ScriptInstance {
    source: String,
    program: Option<Rc<Program>>,
    interpreter: Option<Interpreter>,
    initialized: bool,
    error: Option<Error>,
}

impl ScriptInstance {
    pub fn new(source: impl Into<String>) -> Self {
        ScriptInstance {
            source: source.into(),
            program: None,
            interpreter: None,
            initialized: false,
            error: None,
        }
    }

    /// Reuse an already compiled program
    pub fn from_program(source: impl Into<String>, program: Rc<Program>) -> Self {
        ScriptInstance { program: Some(program), ..Self::new(source) }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn interpreter(&self) -> Option<&Interpreter> {
        self.interpreter.as_ref()
    }

    pub fn interpreter_mut(&mut self) -> Option<&mut Interpreter> {
        self.interpreter.as_mut()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Line of the last error, or -1
    pub fn error_line(&self) -> i64 {
        self.error.as_ref().map_or(-1, |e| e.line() as i64)
    }

    fn fail(&mut self, err: Error) -> Error {
        warn!("Script error: {}", err);
        self.error = Some(err.clone());
        err
    }

    /// Compile (unless cached), build an interpreter with the libraries and
    /// whatever `setup` registers, then run the top-level statements
    pub fn initialize<F>(&mut self, engine: &mut ScriptEngine, setup: F) -> Result<()>
    where
        F: FnOnce(&mut Interpreter),
    {
        let program = match self.program.clone() {
            Some(program) => program,
            None => {
                let compiled = engine.compile(&self.source);
                let program = compiled.map_err(|e| self.fail(e))?;
                self.program = Some(Rc::clone(&program));
                program
            }
        };

        let mut interp = engine.create_interpreter();
        engine.register_standard_library(&mut interp);
        engine.register_engine_api(&mut interp);
        setup(&mut interp);

        let result = interp.execute(&program);
        self.interpreter = Some(interp);
        result.map_err(|e| self.fail(e))?;

        debug!("Script initialized ({} functions)", program.function_count());
        self.initialized = true;
        Ok(())
    }

    fn call_hook(&mut self, name: &str, args: &[ScriptValue]) -> Result<()> {
        if !self.initialized {
            return Ok(());
        }
        let Some(interp) = self.interpreter.as_mut() else {
            return Ok(());
        };
        if !interp.has_function(name) {
            return Ok(());
        }

        let result = interp.call_function(name, args);
        result.map(|_| ()).map_err(|e| self.fail(e))
    }

    pub fn start(&mut self) -> Result<()> {
        self.call_hook(ON_START, &[])
    }

    /// Call `OnUpdate(dt)`; does nothing once an error has occurred
    pub fn update(&mut self, dt: f64) -> Result<()> {
        if self.error.is_some() {
            return Ok(());
        }
        self.call_hook(ON_UPDATE, &[ScriptValue::Number(dt)])
    }

    /// Call `OnDestroy()`. Errors are logged and otherwise ignored. After an
    /// earlier error the hook is skipped.
    pub fn destroy(&mut self) {
        if self.error.is_none() {
            let _ = self.call_hook(ON_DESTROY, &[]);
        }
        self.initialized = false;
    }

    /// Swap in new source: tear down the running script, then initialize
    /// and start the replacement
    pub fn reload<F>(&mut self, engine: &mut ScriptEngine, source: impl Into<String>, setup: F) -> Result<()>
    where
        F: FnOnce(&mut Interpreter),
    {
        if self.initialized {
            self.destroy();
        }

        self.source = source.into();
        self.program = None;
        self.interpreter = None;
        self.error = None;

        self.initialize(engine, setup)?;
        self.start()
    }
}
