//! Standard library and host-independent engine API
//!
//! Natives receive copies of their arguments, so nothing here can mutate a
//! script's variables; library functions that "modify" a table return the
//! modified copy instead.

pub mod builtins;
pub mod math;
pub mod string;
pub mod vec3;

use crate::runtime::{Interpreter, ScriptTable, ScriptValue};

/// `print`, `type`, `tonumber`, `tostring`, `pairs`, `ipairs` and the
/// `math`, `string` and `table` libraries
pub fn register_standard_library(interp: &mut Interpreter) {
    builtins::register(interp);
    math::register(interp);
    string::register(interp);
}

/// `Log`, `Vec3` and `Vec3Utils`
pub fn register_engine_api(interp: &mut Interpreter) {
    builtins::register_log(interp);
    vec3::register(interp);
}

fn number_arg(args: &[ScriptValue], index: usize) -> Option<f64> {
    args.get(index).and_then(ScriptValue::as_number)
}

fn string_arg(args: &[ScriptValue], index: usize) -> Option<&str> {
    args.get(index).and_then(ScriptValue::as_str)
}

/// Build a library table from named entries
fn library<I>(entries: I) -> ScriptValue
where
    I: IntoIterator<Item = (&'static str, ScriptValue)>,
{
    ScriptValue::Table(entries.into_iter().map(|(name, value)| (name.to_string(), value)).collect::<ScriptTable>())
}

#[cfg(test)]
pub(crate) fn run_with_libraries(source: &str) -> ScriptValue {
    let program = std::rc::Rc::new(crate::frontend::parse(source).expect("Failed to parse"));
    let mut interp = Interpreter::new();
    register_standard_library(&mut interp);
    register_engine_api(&mut interp);
    interp.execute(&program).expect("Failed to execute")
}
