//! Tree-walking interpreter for Xi Script.
//!
//! Statements complete with a [`Flow`]; errors short-circuit through
//! `Result`. The first runtime error is latched: until [`Interpreter::clear_error`]
//! is called, `execute` and `call_function` return it without running
//! anything.

use crate::frontend::ast::*;
use crate::runtime::environment::Environment;
use crate::runtime::operators;
use crate::runtime::value::{number_key, FunctionRef, ScriptTable, ScriptValue};
use crate::utils::{ensure_sufficient_stack, Error, Result};
use log::{debug, error};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Resource caps for a single interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum body executions of any single loop
    pub max_iterations: u64,
    /// Maximum nesting of script function calls
    pub max_call_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits { max_iterations: 1_000_000, max_call_depth: 200 }
    }
}

/// How a statement completed
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Break,
    Return(ScriptValue),
}

/// A function body together with the program that owns it
struct StoredFunction {
    program: Rc<Program>,
    func: FuncId,
}

/// One step of an assignment path such as `a.b[k]`
enum PathKey {
    Member(String),
    Index(String),
    /// Index value that cannot address a table slot; the write is dropped
    Unusable,
}

pub struct Interpreter {
    env: Environment,
    functions: Vec<StoredFunction>,
    /// Slot of each (program, function) pair already in `functions`
    function_slots: FxHashMap<(*const Program, FuncId), usize>,
    limits: Limits,
    error: Option<Error>,
    call_depth: usize,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Self {
        Interpreter {
            env: Environment::new(),
            functions: Vec::new(),
            function_slots: FxHashMap::default(),
            limits,
            error: None,
            call_depth: 0,
        }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    // ==================== Host API ====================

    /// Run a program's top-level statements in the global scope.
    /// Returns the value of a top-level `return`, or nil.
    pub fn execute(&mut self, program: &Rc<Program>) -> Result<ScriptValue> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        debug!("Executing program ({} top-level statements)", program.body.len());
        let result = self.exec_block(program, &program.body).map(|flow| match flow {
            Flow::Return(value) => value,
            Flow::Normal | Flow::Break => ScriptValue::Nil,
        });
        self.latch(result)
    }

    /// Call a global function by name
    pub fn call_function(&mut self, name: &str, args: &[ScriptValue]) -> Result<ScriptValue> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        let callee = self.get_global(name);
        let result = match callee {
            ScriptValue::NativeFunction(native) => {
                native.call(args).map_err(|e| Error::runtime(format!("{:#}", e), 0))
            }
            ScriptValue::Function(func) => self.call_script(func, args.to_vec(), 0),
            _ => Err(Error::runtime(format!("Attempt to call non-function value '{}'", name), 0)),
        };
        self.latch(result)
    }

    /// True when `name` is a global script or native function
    pub fn has_function(&self, name: &str) -> bool {
        self.env.get_global(name).is_some_and(ScriptValue::is_callable)
    }

    pub fn set_global(&mut self, name: impl Into<String>, value: ScriptValue) {
        self.env.define_global(name, value);
    }

    /// The global's value, or nil when unset
    pub fn get_global(&self, name: &str) -> ScriptValue {
        self.env.get_global(name).cloned().unwrap_or_default()
    }

    pub fn has_global(&self, name: &str) -> bool {
        self.env.get_global(name).is_some()
    }

    /// Bind a host function as a global. Re-registering a name replaces it.
    pub fn register_native<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[ScriptValue]) -> anyhow::Result<ScriptValue> + 'static,
    {
        self.env.define_global(name, ScriptValue::native(f));
    }

    // ==================== Diagnostics ====================

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// The pending error's message, empty when there is none
    pub fn error_message(&self) -> &str {
        self.error.as_ref().map_or("", |e| e.message())
    }

    /// Line of the pending error, or -1 when there is none
    pub fn error_line(&self) -> i64 {
        self.error.as_ref().map_or(-1, |e| e.line() as i64)
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Drop all globals, functions and errors
    pub fn reset(&mut self) {
        self.env.clear();
        self.functions.clear();
        self.function_slots.clear();
        self.error = None;
        self.call_depth = 0;
    }

    fn latch(&mut self, result: Result<ScriptValue>) -> Result<ScriptValue> {
        if let Err(err) = &result {
            debug!("Runtime error: {}", err);
            self.error = Some(err.clone());
            self.env.truncate(1);
            self.call_depth = 0;
        }
        result
    }

    /// Run `f` inside a fresh scope, popping it even when `f` fails
    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.env.push_scope();
        let result = f(self);
        self.env.pop_scope();
        result
    }

    /// Function values carry no identity, so every evaluation of the same
    /// definition shares one slot. The stored `Rc` keeps the key's address live.
    fn define_function(&mut self, program: &Rc<Program>, func: FuncId) -> ScriptValue {
        let functions = &mut self.functions;
        let index = *self.function_slots.entry((Rc::as_ptr(program), func)).or_insert_with(|| {
            functions.push(StoredFunction { program: Rc::clone(program), func });
            functions.len() - 1
        });
        ScriptValue::Function(FunctionRef(index))
    }

    // ==================== Statements ====================

    fn exec_block(&mut self, program: &Rc<Program>, block: &[StmtId]) -> Result<Flow> {
        for &stmt in block {
            match self.exec_stmt(program, stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_scoped_block(&mut self, program: &Rc<Program>, block: &[StmtId]) -> Result<Flow> {
        self.scoped(|this| this.exec_block(program, block))
    }

    fn exec_stmt(&mut self, program: &Rc<Program>, id: StmtId) -> Result<Flow> {
        ensure_sufficient_stack(|| self.exec_stmt_inner(program, id))
    }

    fn exec_stmt_inner(&mut self, program: &Rc<Program>, id: StmtId) -> Result<Flow> {
        let stmt = program.stmt(id);
        let line = stmt.line;

        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(program, *expr)?;
            }
            StmtKind::Local { name, init } => {
                let value = match init {
                    Some(expr) => self.eval(program, *expr)?,
                    None => ScriptValue::Nil,
                };
                self.env.define_local(name.as_str(), value);
            }
            StmtKind::Assign { target, value } => {
                let value = self.eval(program, *value)?;
                self.assign(program, *target, value)?;
            }
            StmtKind::If { cond, then_body, elseifs, else_body } => {
                if self.eval(program, *cond)?.is_truthy() {
                    return self.exec_scoped_block(program, then_body);
                }
                for (branch_cond, body) in elseifs {
                    if self.eval(program, *branch_cond)?.is_truthy() {
                        return self.exec_scoped_block(program, body);
                    }
                }
                if let Some(body) = else_body {
                    return self.exec_scoped_block(program, body);
                }
            }
            StmtKind::While { cond, body } => {
                let mut iterations = 0;
                while self.eval(program, *cond)?.is_truthy() {
                    self.count_iteration(&mut iterations, "while", line)?;
                    match self.exec_scoped_block(program, body)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
            }
            StmtKind::Repeat { body, cond } => {
                let mut iterations = 0;
                loop {
                    self.count_iteration(&mut iterations, "repeat", line)?;
                    // The condition can see locals declared in the body
                    let exit = self.scoped(|this| match this.exec_block(program, body)? {
                        Flow::Normal => Ok(this.eval(program, *cond)?.is_truthy().then_some(Flow::Normal)),
                        Flow::Break => Ok(Some(Flow::Normal)),
                        ret @ Flow::Return(_) => Ok(Some(ret)),
                    })?;
                    match exit {
                        None => {}
                        Some(Flow::Return(value)) => return Ok(Flow::Return(value)),
                        Some(_) => break,
                    }
                }
            }
            StmtKind::NumericFor { var, start, end, step, body } => {
                return self.exec_numeric_for(program, var, *start, *end, *step, body, line);
            }
            StmtKind::GenericFor { vars, iterator, body } => {
                return self.exec_generic_for(program, vars, *iterator, body, line);
            }
            StmtKind::FunctionDecl { name, func, is_local } => {
                let value = self.define_function(program, *func);
                if *is_local {
                    self.env.define_local(name.as_str(), value);
                } else {
                    self.env.define_global(name.as_str(), value);
                }
            }
            StmtKind::Return(values) => {
                // Every expression runs; only the first value is kept
                let mut first = None;
                for &expr in values {
                    let value = self.eval(program, expr)?;
                    first.get_or_insert(value);
                }
                return Ok(Flow::Return(first.unwrap_or_default()));
            }
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Block(body) => return self.exec_scoped_block(program, body),
        }

        Ok(Flow::Normal)
    }

    fn count_iteration(&self, iterations: &mut u64, kind: &str, line: usize) -> Result<()> {
        *iterations += 1;
        if *iterations > self.limits.max_iterations {
            return Err(Error::runtime(format!("Maximum iterations exceeded in {} loop", kind), line));
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn exec_numeric_for(
        &mut self,
        program: &Rc<Program>,
        var: &str,
        start: ExprId,
        end: ExprId,
        step: Option<ExprId>,
        body: &[StmtId],
        line: usize,
    ) -> Result<Flow> {
        let start = self.eval(program, start)?;
        let end = self.eval(program, end)?;
        let step = match step {
            Some(expr) => self.eval(program, expr)?,
            None => ScriptValue::Number(1.0),
        };

        let (Some(mut current), Some(end), Some(step)) = (start.as_number(), end.as_number(), step.as_number())
        else {
            return Err(Error::runtime("For loop bounds must be numbers", line));
        };
        if step == 0.0 {
            return Err(Error::runtime("For loop step cannot be zero", line));
        }

        let mut iterations = 0;
        while (step > 0.0 && current <= end) || (step < 0.0 && current >= end) {
            self.count_iteration(&mut iterations, "for", line)?;

            let flow = self.scoped(|this| {
                this.env.define_local(var, ScriptValue::Number(current));
                this.exec_block(program, body)
            })?;
            match flow {
                Flow::Normal => {}
                Flow::Break => break,
                ret @ Flow::Return(_) => return Ok(ret),
            }

            current += step;
        }

        Ok(Flow::Normal)
    }

    fn exec_generic_for(
        &mut self,
        program: &Rc<Program>,
        vars: &[String],
        iterator: ExprId,
        body: &[StmtId],
        line: usize,
    ) -> Result<Flow> {
        let ScriptValue::Table(table) = self.eval(program, iterator)? else {
            return Ok(Flow::Normal);
        };

        let mut iterations = 0;
        for (key, value) in table.iter() {
            self.count_iteration(&mut iterations, "for", line)?;

            let flow = self.scoped(|this| {
                for (i, var) in vars.iter().enumerate() {
                    let bound = match i {
                        0 => ScriptValue::String(key.to_string()),
                        1 => value.clone(),
                        _ => ScriptValue::Nil,
                    };
                    this.env.define_local(var.as_str(), bound);
                }
                this.exec_block(program, body)
            })?;
            match flow {
                Flow::Normal => {}
                Flow::Break => break,
                ret @ Flow::Return(_) => return Ok(ret),
            }
        }

        Ok(Flow::Normal)
    }

    // ==================== Assignment ====================

    /// Store `value` through an identifier, member or index target. Nested
    /// paths are written back all the way to the root variable.
    fn assign(&mut self, program: &Rc<Program>, target: ExprId, value: ScriptValue) -> Result<()> {
        enum Step<'a> {
            Member(&'a str),
            Index(ExprId),
        }

        let mut steps = Vec::new();
        let mut root = target;
        loop {
            match &program.expr(root).kind {
                ExprKind::Member { object, name } => {
                    steps.push(Step::Member(name));
                    root = *object;
                }
                ExprKind::Index { object, index } => {
                    steps.push(Step::Index(*index));
                    root = *object;
                }
                _ => break,
            }
        }
        steps.reverse();

        // Keys are evaluated outermost first
        let mut path = Vec::with_capacity(steps.len());
        for step in steps {
            path.push(match step {
                Step::Member(name) => PathKey::Member(name.to_string()),
                Step::Index(index) => match self.eval(program, index)? {
                    ScriptValue::String(s) => PathKey::Index(s),
                    ScriptValue::Number(n) => PathKey::Index(number_key(n)),
                    _ => PathKey::Unusable,
                },
            });
        }

        match &program.expr(root).kind {
            ExprKind::Identifier(name) if path.is_empty() => self.env.assign(name, value),
            ExprKind::Identifier(name) => {
                if let Some(slot) = self.env.lookup_mut(name) {
                    write_path(slot, &path, value);
                }
            }
            _ => {
                // Temporary root such as `f().x = 1`: evaluated for effects only
                let mut temp = self.eval(program, root)?;
                write_path(&mut temp, &path, value);
            }
        }
        Ok(())
    }

    // ==================== Expressions ====================

    fn eval(&mut self, program: &Rc<Program>, id: ExprId) -> Result<ScriptValue> {
        ensure_sufficient_stack(|| self.eval_inner(program, id))
    }

    fn eval_inner(&mut self, program: &Rc<Program>, id: ExprId) -> Result<ScriptValue> {
        let expr = program.expr(id);
        let line = expr.line;

        Ok(match &expr.kind {
            ExprKind::Number(n) => ScriptValue::Number(*n),
            ExprKind::String(s) => ScriptValue::String(s.clone()),
            ExprKind::Bool(b) => ScriptValue::Bool(*b),
            ExprKind::Nil => ScriptValue::Nil,
            ExprKind::Identifier(name) => self.env.lookup(name).cloned().unwrap_or_default(),
            ExprKind::Binary { op: BinOp::And, left, right } => {
                let left = self.eval(program, *left)?;
                if !left.is_truthy() {
                    return Ok(left);
                }
                self.eval(program, *right)?
            }
            ExprKind::Binary { op: BinOp::Or, left, right } => {
                let left = self.eval(program, *left)?;
                if left.is_truthy() {
                    return Ok(left);
                }
                self.eval(program, *right)?
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.eval(program, *left)?;
                let right = self.eval(program, *right)?;
                operators::binary(*op, &left, &right)
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.eval(program, *operand)?;
                operators::unary(*op, &operand)
            }
            ExprKind::Call { callee, args } => {
                let callee = self.eval(program, *callee)?;
                let mut values = Vec::with_capacity(args.len());
                for &arg in args {
                    values.push(self.eval(program, arg)?);
                }
                self.call_value(&callee, values, line)?
            }
            ExprKind::Index { object, index } => {
                let object = self.eval(program, *object)?;
                let index = self.eval(program, *index)?;
                match (&object, &index) {
                    (ScriptValue::Table(t), ScriptValue::String(key)) => t.get(key).cloned().unwrap_or_default(),
                    (ScriptValue::Table(t), ScriptValue::Number(n)) => {
                        t.get(&number_key(*n)).cloned().unwrap_or_default()
                    }
                    _ => ScriptValue::Nil,
                }
            }
            ExprKind::Member { object, name } => {
                let object = self.eval(program, *object)?;
                read_member(&object, name)
            }
            ExprKind::Table(entries) => {
                let mut table = ScriptTable::new();
                for &(key, value) in entries {
                    let key = match self.eval(program, key)? {
                        ScriptValue::Number(n) => number_key(n),
                        other => other.to_string(),
                    };
                    let value = self.eval(program, value)?;
                    table.set(key, value);
                }
                ScriptValue::Table(table)
            }
            ExprKind::Function(func) => self.define_function(program, *func),
        })
    }

    // ==================== Calls ====================

    fn call_value(&mut self, callee: &ScriptValue, args: Vec<ScriptValue>, line: usize) -> Result<ScriptValue> {
        match callee {
            ScriptValue::NativeFunction(native) => {
                native.call(&args).map_err(|e| Error::runtime(format!("{:#}", e), line))
            }
            ScriptValue::Function(func) => self.call_script(*func, args, line),
            _ => Err(Error::runtime("Attempt to call non-function value", line)),
        }
    }

    fn call_script(&mut self, func: FunctionRef, args: Vec<ScriptValue>, line: usize) -> Result<ScriptValue> {
        let Some(stored) = self.functions.get(func.0) else {
            error!("Function reference {} does not resolve ({} functions defined)", func.0, self.functions.len());
            return Err(Error::runtime("Invalid function reference", line));
        };
        let program = Rc::clone(&stored.program);
        let def = program.function(stored.func);

        if self.call_depth >= self.limits.max_call_depth {
            return Err(Error::runtime(
                format!("Maximum call depth of {} exceeded", self.limits.max_call_depth),
                line,
            ));
        }

        self.call_depth += 1;
        let result = self.scoped(|this| {
            let mut args = args.into_iter();
            for param in &def.params {
                this.env.define_local(param.as_str(), args.next().unwrap_or_default());
            }
            this.exec_block(&program, &def.body)
        });
        self.call_depth -= 1;

        Ok(match result? {
            Flow::Return(value) => value,
            Flow::Normal | Flow::Break => ScriptValue::Nil,
        })
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn read_member(object: &ScriptValue, name: &str) -> ScriptValue {
    match object {
        ScriptValue::Table(t) => t.get(name).cloned().unwrap_or_default(),
        ScriptValue::Vector3(v) => match name {
            "x" => ScriptValue::Number(v.x as f64),
            "y" => ScriptValue::Number(v.y as f64),
            "z" => ScriptValue::Number(v.z as f64),
            _ => ScriptValue::Nil,
        },
        _ => ScriptValue::Nil,
    }
}

fn write_path(slot: &mut ScriptValue, path: &[PathKey], value: ScriptValue) {
    let Some((step, rest)) = path.split_first() else {
        *slot = value;
        return;
    };

    let key = match step {
        PathKey::Member(key) | PathKey::Index(key) => key,
        PathKey::Unusable => return,
    };

    match slot {
        ScriptValue::Table(table) if rest.is_empty() => table.set(key.as_str(), value),
        ScriptValue::Table(table) => {
            if let Some(child) = table.get_mut(key) {
                write_path(child, rest, value);
            }
        }
        ScriptValue::Vector3(v) if rest.is_empty() && matches!(step, PathKey::Member(_)) => {
            let ScriptValue::Number(n) = value else {
                return;
            };
            match key.as_str() {
                "x" => v.x = n as f32,
                "y" => v.y = n as f32,
                "z" => v.z = n as f32,
                _ => {}
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parse;
    use glam::Vec3;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    fn compile(source: &str) -> Rc<Program> {
        Rc::new(parse(source).expect("Failed to parse"))
    }

    fn run(source: &str) -> ScriptValue {
        Interpreter::new().execute(&compile(source)).expect("Failed to execute")
    }

    fn run_err(source: &str) -> Error {
        Interpreter::new().execute(&compile(source)).unwrap_err()
    }

    fn num(n: f64) -> ScriptValue {
        ScriptValue::Number(n)
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(run("return 1 + 2 * 3"), num(7.0));
        assert_eq!(run("return (1 + 2) * 3"), num(9.0));
        assert_eq!(run("return 2 ^ 3 ^ 2"), num(512.0));
        assert_eq!(run("return -2 ^ 2"), num(-4.0));
        assert_eq!(run("return 10 / 2 .. ''"), ScriptValue::from("5"));
    }

    #[test]
    fn test_short_circuit_skips_native() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);

        let mut interp = Interpreter::new();
        interp.register_native("sideEffect", move |_| {
            counter.set(counter.get() + 1);
            Ok(ScriptValue::Bool(true))
        });

        let result = interp.execute(&compile("return false and sideEffect()")).unwrap();
        assert_eq!(result, ScriptValue::Bool(false));
        interp.execute(&compile("local x = true or sideEffect()")).unwrap();
        assert_eq!(calls.get(), 0);

        interp.execute(&compile("local x = nil or sideEffect()")).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_block_locals_and_implicit_globals() {
        let source = r#"
            if true then
                local hidden = 1
                created = 2
            end
            return hidden
        "#;
        let mut interp = Interpreter::new();
        assert_eq!(interp.execute(&compile(source)).unwrap(), ScriptValue::Nil);
        assert_eq!(interp.get_global("created"), num(2.0));
        assert!(!interp.has_global("hidden"));
    }

    #[test]
    fn test_assignment_updates_enclosing_local() {
        let source = r#"
            function f()
                local count = 0
                for i = 1, 3 do
                    count = count + i
                end
                return count
            end
            return f()
        "#;
        let mut interp = Interpreter::new();
        assert_eq!(interp.execute(&compile(source)).unwrap(), num(6.0));
        assert!(!interp.has_global("count"));
    }

    #[test]
    fn test_tables_are_copied_on_assignment() {
        assert_eq!(run("local a = {x = 1} local b = a b.x = 2 return a.x"), num(1.0));
        assert_eq!(run("local a = {x = 1} local b = a b.x = 2 return b.x"), num(2.0));
    }

    #[test]
    fn test_nested_assignment_writes_back_to_root() {
        assert_eq!(run("local a = { b = { c = 1 } } a.b.c = 5 return a.b.c"), num(5.0));
        assert_eq!(run("local t = { {1, 2}, {3, 4} } t[2][1] = 9 return t[2][1]"), num(9.0));
        assert_eq!(run("local a = {} a.missing.c = 1 return a.missing"), ScriptValue::Nil);
    }

    #[test]
    fn test_index_keys_truncate_numbers() {
        assert_eq!(run("local t = {} t[1.9] = 'one' return t[1]"), ScriptValue::from("one"));
        assert_eq!(run("local t = { [2] = 'two' } return t['2']"), ScriptValue::from("two"));
        assert_eq!(run("local t = {} t[true] = 1 return #t"), num(0.0));
    }

    #[test]
    fn test_while_hits_iteration_cap_exactly() {
        let mut interp = Interpreter::new();
        let err = interp.execute(&compile("n = 0\nwhile true do n = n + 1 end")).unwrap_err();
        assert_eq!(err.message(), "Maximum iterations exceeded in while loop");
        assert_eq!(err.line(), 2);
        assert_eq!(interp.get_global("n"), num(1_000_000.0));
    }

    #[test]
    fn test_custom_iteration_limit() {
        let limits = Limits { max_iterations: 10, ..Limits::default() };

        let mut interp = Interpreter::with_limits(limits);
        let err = interp.execute(&compile("n = 0 repeat n = n + 1 until false")).unwrap_err();
        assert_eq!(err.message(), "Maximum iterations exceeded in repeat loop");
        assert_eq!(interp.get_global("n"), num(10.0));

        let mut interp = Interpreter::with_limits(limits);
        let err = interp.execute(&compile("for i = 1, 100 do end")).unwrap_err();
        assert_eq!(err.message(), "Maximum iterations exceeded in for loop");
        assert!(interp.execute(&compile("return 1")).is_err());

        let mut interp = Interpreter::with_limits(limits);
        assert!(interp.execute(&compile("for i = 1, 10 do end")).is_ok());
    }

    #[test]
    fn test_numeric_for() {
        assert_eq!(run("local s = 0 for i=1,5 do s = s + i end return s"), num(15.0));
        assert_eq!(run("local s = 0 for i = 5, 1, -2 do s = s + i end return s"), num(9.0));
        assert_eq!(run("local s = 0 for i = 1, 0 do s = s + 1 end return s"), num(0.0));
        assert_eq!(run("for i = 1, 3 do end return i"), ScriptValue::Nil);
    }

    #[test]
    fn test_numeric_for_errors() {
        let err = run_err("for i = 1, 'x' do end");
        assert_eq!(err.message(), "For loop bounds must be numbers");
        let err = run_err("\nfor i = 1, 5, 0 do end");
        assert_eq!(err.to_string(), "For loop step cannot be zero at line 2");
    }

    #[test]
    fn test_generic_for_order_and_bindings() {
        let source = r#"
            local t = { 10, 20, name = "x" }
            local s = ""
            for k, v, extra in t do
                s = s .. k .. "=" .. v .. tostring(extra == nil) .. ";"
            end
            return s
        "#;
        let mut interp = Interpreter::new();
        interp.register_native("tostring", |args| {
            Ok(ScriptValue::String(args.first().cloned().unwrap_or_default().to_string()))
        });
        assert_eq!(
            interp.execute(&compile(source)).unwrap(),
            ScriptValue::from("1=10true;2=20true;name=xtrue;")
        );
        assert_eq!(run("local n = 0 for k in 42 do n = n + 1 end return n"), num(0.0));
    }

    #[test]
    fn test_repeat_condition_sees_body_locals() {
        let source = "local n = 0 repeat local done = n >= 3 n = n + 1 until done return n";
        assert_eq!(run(source), num(4.0));
    }

    #[test]
    fn test_break_exits_nearest_loop_only() {
        let source = r#"
            local outer = 0
            for i = 1, 3 do
                for j = 1, 10 do
                    if j == 2 then break end
                end
                outer = outer + 1
            end
            return outer
        "#;
        assert_eq!(run(source), num(3.0));
    }

    #[test]
    fn test_break_outside_loop_ends_function() {
        let source = r#"
            function f()
                reached = 1
                break
                reached = 2
            end
            local r = f()
            return r
        "#;
        let mut interp = Interpreter::new();
        assert_eq!(interp.execute(&compile(source)).unwrap(), ScriptValue::Nil);
        assert_eq!(interp.get_global("reached"), num(1.0));
    }

    #[test]
    fn test_function_calls() {
        assert_eq!(run("function Add(a,b) return a+b end return Add(2,3)"), num(5.0));
        assert_eq!(run("function f(a, b) return b end return f(1)"), ScriptValue::Nil);
        assert_eq!(run("function f(a) return a end return f(1, 2, 3)"), num(1.0));
        assert_eq!(run("function f() return 1, 2 end return f()"), num(1.0));
        assert_eq!(run("function f() end return f()"), ScriptValue::Nil);
    }

    #[test]
    fn test_recursion() {
        let source = r#"
            function fib(n)
                if n < 2 then return n end
                return fib(n - 1) + fib(n - 2)
            end
            return fib(15)
        "#;
        assert_eq!(run(source), num(610.0));
        assert_eq!(
            run("local function sum(n) if n == 0 then return 0 end return n + sum(n - 1) end return sum(4)"),
            num(10.0)
        );
    }

    #[test]
    fn test_call_depth_limit() {
        let err = run_err("function f(n) return f(n + 1) end\nreturn f(0)");
        assert_eq!(err.message(), "Maximum call depth of 200 exceeded");

        let limits = Limits { max_call_depth: 5, ..Limits::default() };
        let mut interp = Interpreter::with_limits(limits);
        let program = compile("function depth(n) if n == 0 then return 0 end return 1 + depth(n - 1) end");
        interp.execute(&program).unwrap();
        assert_eq!(interp.call_function("depth", &[num(4.0)]).unwrap(), num(4.0));
        assert!(interp.call_function("depth", &[num(5.0)]).is_err());
    }

    #[test]
    fn test_callee_sees_caller_scope() {
        let source = r#"
            function show() return secret end
            function caller()
                local secret = 42
                return show()
            end
            return caller()
        "#;
        assert_eq!(run(source), num(42.0));
    }

    #[test]
    fn test_method_call_passes_self() {
        let source = "local obj = { v = 3, get = function(self, k) return self.v * k end } return obj:get(2)";
        assert_eq!(run(source), num(6.0));
    }

    #[test]
    fn test_division_by_zero_is_nil() {
        assert_eq!(run("return 1/0"), ScriptValue::Nil);
        assert_eq!(run("return 1/0 == nil"), ScriptValue::Bool(true));
    }

    #[test]
    fn test_mixed_type_comparisons_are_false() {
        assert_eq!(run("return 1 < '2'"), ScriptValue::Bool(false));
        assert_eq!(run("return 1 >= '2'"), ScriptValue::Bool(false));
        assert_eq!(run("return 1 == '1'"), ScriptValue::Bool(false));
        assert_eq!(run("return 'a' < 'b'"), ScriptValue::Bool(true));
    }

    #[test]
    fn test_vector_members() {
        let mut interp = Interpreter::new();
        interp.set_global("v", ScriptValue::from(Vec3::new(1.0, 2.0, 3.0)));
        let result = interp.execute(&compile("v.x = 5 v.y = 'bad' return v.x + v.y + v.z")).unwrap();
        assert_eq!(result, num(10.0));
        assert_eq!(interp.get_global("v"), ScriptValue::from(Vec3::new(5.0, 2.0, 3.0)));
    }

    #[test]
    fn test_native_error_becomes_runtime_error() {
        let mut interp = Interpreter::new();
        interp.register_native("fail", |_| Err(anyhow::anyhow!("host exploded")));
        let err = interp.execute(&compile("local a = 1\n\nfail()")).unwrap_err();
        assert_eq!(err.to_string(), "host exploded at line 3");
        assert_eq!(interp.error_line(), 3);
    }

    #[test]
    fn test_calling_non_function() {
        let err = run_err("local x = 1\nx()");
        assert_eq!(err.to_string(), "Attempt to call non-function value at line 2");

        let mut interp = Interpreter::new();
        let err = interp.call_function("Missing", &[]).unwrap_err();
        assert_eq!(err.to_string(), "Attempt to call non-function value 'Missing' at line 0");
    }

    #[test]
    fn test_invalid_function_reference() {
        let mut interp = Interpreter::new();
        interp.set_global("ghost", ScriptValue::Function(FunctionRef(99)));
        let err = interp.call_function("ghost", &[]).unwrap_err();
        assert_eq!(err.message(), "Invalid function reference");
    }

    #[test]
    fn test_first_error_wins_until_cleared() {
        let mut interp = Interpreter::new();
        interp.execute(&compile("function OnUpdate(dt) return dt * 2 end")).unwrap();

        let err = interp.execute(&compile("\nlocal x = nil\nx()")).unwrap_err();
        assert_eq!(err.line(), 3);
        assert!(interp.has_error());

        let again = interp.call_function("OnUpdate", &[num(1.0)]).unwrap_err();
        assert_eq!(again, err);
        assert_eq!(interp.error_message(), "Attempt to call non-function value");

        interp.clear_error();
        assert_eq!(interp.error_line(), -1);
        assert_eq!(interp.call_function("OnUpdate", &[num(1.5)]).unwrap(), num(3.0));
    }

    #[test]
    fn test_reexecution() {
        let program = compile("function Add(a, b) return a + b end return Add(1, 2)");

        let mut first = Interpreter::new();
        let mut second = Interpreter::new();
        assert_eq!(first.execute(&program).unwrap(), second.execute(&program).unwrap());

        assert_eq!(first.execute(&program).unwrap(), num(3.0));
        assert!(first.has_function("Add"));
    }

    #[test]
    fn test_function_table_stays_bounded() {
        let program = compile(
            "function OnUpdate(dt) local cb = function() return dt end return cb() end",
        );
        let mut interp = Interpreter::new();
        interp.execute(&program).unwrap();
        assert_eq!(interp.call_function("OnUpdate", &[num(0.5)]).unwrap(), num(0.5));
        let defined = interp.functions.len();
        assert_eq!(defined, 2);

        for tick in 0..1_000 {
            assert_eq!(interp.call_function("OnUpdate", &[num(tick as f64)]).unwrap(), num(tick as f64));
        }
        for _ in 0..100 {
            interp.execute(&program).unwrap();
        }
        assert_eq!(interp.functions.len(), defined);

        // A different program gets its own slot
        interp.execute(&compile("function Other() end")).unwrap();
        assert_eq!(interp.functions.len(), defined + 1);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut interp = Interpreter::new();
        interp.execute(&compile("function F() end g = 1")).unwrap();
        interp.reset();
        assert!(!interp.has_function("F"));
        assert!(!interp.has_global("g"));
    }

    #[test]
    fn test_deep_expression_nesting() {
        let depth = 1_000;
        let source = format!("return {}1{}", "(1 + ".repeat(depth), ")".repeat(depth));
        assert_eq!(run(&source), num(1_001.0));
    }
}
