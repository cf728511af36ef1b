//! The `string` and `table` libraries.
//!
//! String positions count characters, not bytes, to agree with the `#`
//! operator.

use crate::runtime::value::number_key;
use crate::runtime::{Interpreter, ScriptValue};
use crate::stdlib::{library, number_arg, string_arg};

/// `string.sub(s, i [, j])`: 1-based inclusive, negative positions count
/// from the end
fn sub(args: &[ScriptValue]) -> ScriptValue {
    let Some(s) = string_arg(args, 0) else {
        return ScriptValue::from("");
    };

    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    let resolve = |pos: i64| if pos < 0 { len + pos + 1 } else { pos };

    let start = resolve(number_arg(args, 1).map_or(1, |n| n.trunc() as i64)).max(1);
    let end = resolve(number_arg(args, 2).map_or(len, |n| n.trunc() as i64)).min(len);

    if start > end {
        return ScriptValue::from("");
    }
    ScriptValue::String(chars[(start - 1) as usize..end as usize].iter().collect())
}

fn map_string(args: &[ScriptValue], f: fn(&str) -> String) -> ScriptValue {
    ScriptValue::String(string_arg(args, 0).map_or_else(String::new, f))
}

pub fn register(interp: &mut Interpreter) {
    let string = library([
        (
            "len",
            ScriptValue::native(|args| {
                Ok(ScriptValue::Number(string_arg(args, 0).map_or(0, |s| s.chars().count()) as f64))
            }),
        ),
        ("sub", ScriptValue::native(|args| Ok(sub(args)))),
        ("upper", ScriptValue::native(|args| Ok(map_string(args, str::to_uppercase)))),
        ("lower", ScriptValue::native(|args| Ok(map_string(args, str::to_lowercase)))),
        (
            "format",
            ScriptValue::native(|args| Ok(ScriptValue::String(args.iter().map(ToString::to_string).collect()))),
        ),
    ]);
    interp.set_global("string", string);

    let table = library([
        ("insert", ScriptValue::native(|args| Ok(insert(args)))),
        ("remove", ScriptValue::native(|args| Ok(remove(args)))),
    ]);
    interp.set_global("table", table);
}

/// `table.insert(t, v)`: a copy of `t` with `v` stored at `#t + 1`
fn insert(args: &[ScriptValue]) -> ScriptValue {
    match args {
        [ScriptValue::Table(table), value, ..] => {
            let mut table = table.clone();
            let key = (table.len() + 1).to_string();
            table.set(key, value.clone());
            ScriptValue::Table(table)
        }
        _ => ScriptValue::Nil,
    }
}

/// `table.remove(t, i)`: the value stored at `i`
fn remove(args: &[ScriptValue]) -> ScriptValue {
    match args {
        [ScriptValue::Table(table), ScriptValue::Number(index), ..] => {
            table.get(&number_key(*index)).cloned().unwrap_or_default()
        }
        _ => ScriptValue::Nil,
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::ScriptValue;
    use crate::stdlib::run_with_libraries as run;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> ScriptValue {
        ScriptValue::from(s)
    }

    #[test]
    fn test_len_upper_lower() {
        assert_eq!(run("return string.len('hello')"), ScriptValue::Number(5.0));
        assert_eq!(run("return string.len(42)"), ScriptValue::Number(0.0));
        assert_eq!(run("return string.upper('MiXed')"), text("MIXED"));
        assert_eq!(run("return string.lower('MiXed')"), text("mixed"));
        assert_eq!(run("return string.upper(nil)"), text(""));
    }

    #[test]
    fn test_sub() {
        assert_eq!(run("return string.sub('hello', 2, 4)"), text("ell"));
        assert_eq!(run("return string.sub('hello', 2)"), text("ello"));
        assert_eq!(run("return string.sub('hello', -3)"), text("llo"));
        assert_eq!(run("return string.sub('hello', 1, -2)"), text("hell"));
        assert_eq!(run("return string.sub('hello', 0, 100)"), text("hello"));
        assert_eq!(run("return string.sub('hello', 4, 2)"), text(""));
        assert_eq!(run("return string.sub(5, 1)"), text(""));
    }

    #[test]
    fn test_format_concatenates_arguments() {
        assert_eq!(run("return string.format('hp=', 10, ' alive=', true)"), text("hp=10 alive=true"));
    }

    #[test]
    fn test_table_insert_returns_extended_copy() {
        let source = r#"
            local list = { "a" }
            local grown = table.insert(list, "b")
            return #list .. "/" .. #grown .. "/" .. grown[2]
        "#;
        assert_eq!(run(source), text("1/2/b"));
        assert_eq!(run("return table.insert(5, 1)"), ScriptValue::Nil);
    }

    #[test]
    fn test_table_remove_returns_value() {
        assert_eq!(run("return table.remove({ 'x', 'y' }, 2)"), text("y"));
        assert_eq!(run("return table.remove({ 'x' }, 5)"), ScriptValue::Nil);
    }
}
