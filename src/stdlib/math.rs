//! The `math` library.

use crate::runtime::{Interpreter, ScriptValue};
use crate::stdlib::{library, number_arg};
use rand::Rng;
use std::f64::consts::PI;

/// Wrap a one-argument numeric function; non-number input yields nil
fn unary(f: fn(f64) -> f64) -> ScriptValue {
    ScriptValue::native(move |args| Ok(number_arg(args, 0).map_or(ScriptValue::Nil, |n| ScriptValue::Number(f(n)))))
}

/// Fold numeric arguments; a non-number first argument counts as 0 and
/// later non-numbers are skipped
fn fold(f: fn(f64, f64) -> f64) -> ScriptValue {
    ScriptValue::native(move |args| {
        if args.is_empty() {
            return Ok(ScriptValue::Nil);
        }
        let first = number_arg(args, 0).unwrap_or(0.0);
        let result = args[1..].iter().filter_map(ScriptValue::as_number).fold(first, f);
        Ok(ScriptValue::Number(result))
    })
}

fn clamp(args: &[ScriptValue]) -> ScriptValue {
    if args.len() < 3 {
        return ScriptValue::Nil;
    }
    let value = number_arg(args, 0).unwrap_or(0.0);
    let min = number_arg(args, 1).unwrap_or(0.0);
    let max = number_arg(args, 2).unwrap_or(1.0);
    // max/min rather than f64::clamp, which panics when min > max
    ScriptValue::Number(value.max(min).min(max))
}

/// `random()` in [0, 1), `random(n)` in 1..=n, `random(a, b)` in a..=b
fn random(args: &[ScriptValue]) -> ScriptValue {
    let mut rng = rand::thread_rng();

    let (low, high) = match (args.len(), number_arg(args, 0), number_arg(args, 1)) {
        (0, _, _) => return ScriptValue::Number(rng.gen::<f64>()),
        (1, Some(n), _) => (1, n.trunc() as i64),
        (_, Some(a), Some(b)) => (a.trunc() as i64, b.trunc() as i64),
        _ => return ScriptValue::Nil,
    };

    if low > high {
        return ScriptValue::Nil;
    }
    ScriptValue::Number(rng.gen_range(low..=high) as f64)
}

pub fn register(interp: &mut Interpreter) {
    let math = library([
        ("pi", ScriptValue::Number(PI)),
        ("huge", ScriptValue::Number(f64::INFINITY)),
        ("abs", unary(f64::abs)),
        ("floor", unary(f64::floor)),
        ("ceil", unary(f64::ceil)),
        ("sqrt", unary(f64::sqrt)),
        ("sin", unary(f64::sin)),
        ("cos", unary(f64::cos)),
        ("tan", unary(f64::tan)),
        ("asin", unary(f64::asin)),
        ("acos", unary(f64::acos)),
        ("atan", unary(f64::atan)),
        ("rad", unary(f64::to_radians)),
        ("deg", unary(f64::to_degrees)),
        (
            "atan2",
            ScriptValue::native(|args| match (number_arg(args, 0), number_arg(args, 1)) {
                (Some(y), Some(x)) => Ok(ScriptValue::Number(y.atan2(x))),
                _ => Ok(ScriptValue::Nil),
            }),
        ),
        ("min", fold(f64::min)),
        ("max", fold(f64::max)),
        ("clamp", ScriptValue::native(|args| Ok(clamp(args)))),
        ("random", ScriptValue::native(|args| Ok(random(args)))),
    ]);
    interp.set_global("math", math);
}
