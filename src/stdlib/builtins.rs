//! Global built-in functions and script logging.

use crate::runtime::{Interpreter, ScriptValue};
use crate::stdlib::library;
use log::{error, info, warn};

pub fn register(interp: &mut Interpreter) {
    interp.register_native("print", |args| {
        let line: Vec<String> = args.iter().map(ToString::to_string).collect();
        info!("[Script] {}", line.join("\t"));
        Ok(ScriptValue::Nil)
    });

    interp.register_native("type", |args| {
        Ok(ScriptValue::from(args.first().map_or("nil", ScriptValue::type_name)))
    });

    interp.register_native("tonumber", |args| Ok(to_number(args.first())));

    interp.register_native("tostring", |args| {
        Ok(ScriptValue::String(args.first().map_or_else(|| "nil".to_string(), ToString::to_string)))
    });

    // Iteration over tables is built into `for ... in`; these only pass
    // the table through
    interp.register_native("pairs", |args| Ok(table_or_nil(args.first())));
    interp.register_native("ipairs", |args| Ok(table_or_nil(args.first())));
}

/// The `Log` table: `Info`, `Warning` and `Error`
pub fn register_log(interp: &mut Interpreter) {
    interp.set_global(
        "Log",
        library([
            (
                "Info",
                ScriptValue::native(|args| {
                    info!("[Script] {}", concat(args));
                    Ok(ScriptValue::Nil)
                }),
            ),
            (
                "Warning",
                ScriptValue::native(|args| {
                    warn!("[Script] {}", concat(args));
                    Ok(ScriptValue::Nil)
                }),
            ),
            (
                "Error",
                ScriptValue::native(|args| {
                    error!("[Script] {}", concat(args));
                    Ok(ScriptValue::Nil)
                }),
            ),
        ]),
    );
}

fn concat(args: &[ScriptValue]) -> String {
    args.iter().map(ToString::to_string).collect()
}

fn to_number(value: Option<&ScriptValue>) -> ScriptValue {
    match value {
        Some(ScriptValue::Number(n)) => ScriptValue::Number(*n),
        Some(ScriptValue::String(s)) => s.trim().parse::<f64>().map_or(ScriptValue::Nil, ScriptValue::Number),
        _ => ScriptValue::Nil,
    }
}

fn table_or_nil(value: Option<&ScriptValue>) -> ScriptValue {
    match value {
        Some(table @ ScriptValue::Table(_)) => table.clone(),
        _ => ScriptValue::Nil,
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::ScriptValue;
    use crate::stdlib::run_with_libraries as run;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_type() {
        assert_eq!(run("return type(1)"), ScriptValue::from("number"));
        assert_eq!(run("return type('s')"), ScriptValue::from("string"));
        assert_eq!(run("return type({})"), ScriptValue::from("table"));
        assert_eq!(run("return type(print)"), ScriptValue::from("function"));
        assert_eq!(run("return type(Vec3(1, 2, 3))"), ScriptValue::from("vec3"));
        assert_eq!(run("return type()"), ScriptValue::from("nil"));
    }

    #[test]
    fn test_tonumber() {
        assert_eq!(run("return tonumber('42')"), ScriptValue::Number(42.0));
        assert_eq!(run("return tonumber(' 2.5 ')"), ScriptValue::Number(2.5));
        assert_eq!(run("return tonumber(7)"), ScriptValue::Number(7.0));
        assert_eq!(run("return tonumber('abc')"), ScriptValue::Nil);
        assert_eq!(run("return tonumber(true)"), ScriptValue::Nil);
    }

    #[test]
    fn test_tostring() {
        assert_eq!(run("return tostring(15)"), ScriptValue::from("15"));
        assert_eq!(run("return tostring(nil)"), ScriptValue::from("nil"));
        assert_eq!(run("return tostring({})"), ScriptValue::from("[table]"));
    }

    #[test]
    fn test_pairs_iteration() {
        let source = r#"
            local t = { a = 1, b = 2, c = 3 }
            local sum = 0
            for k, v in pairs(t) do sum = sum + v end
            for i, v in ipairs({ 10, 20 }) do sum = sum + v end
            return sum
        "#;
        assert_eq!(run(source), ScriptValue::Number(36.0));
        assert_eq!(run("return pairs(3)"), ScriptValue::Nil);
    }

    #[test]
    fn test_print_and_log_return_nil() {
        assert_eq!(run("return print('a', 1, nil)"), ScriptValue::Nil);
        assert_eq!(run("Log.Warning('low hp: ', 3) return Log.Info('ok')"), ScriptValue::Nil);
    }
}
