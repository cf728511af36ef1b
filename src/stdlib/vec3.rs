//! `Vec3` constructor and `Vec3Utils`, backed by glam.

use crate::runtime::{Interpreter, ScriptValue};
use crate::stdlib::{library, number_arg};
use glam::Vec3;

fn vec_arg(args: &[ScriptValue], index: usize) -> Option<Vec3> {
    args.get(index).and_then(ScriptValue::as_vec3)
}

fn component(args: &[ScriptValue], index: usize) -> f32 {
    number_arg(args, index).unwrap_or(0.0) as f32
}

fn length(args: &[ScriptValue]) -> ScriptValue {
    ScriptValue::Number(vec_arg(args, 0).map_or(0.0, |v| v.length() as f64))
}

fn normalize(args: &[ScriptValue]) -> ScriptValue {
    match vec_arg(args, 0) {
        Some(v) if v.length() > 0.0001 => ScriptValue::Vector3(v.normalize()),
        Some(v) => ScriptValue::Vector3(v),
        None => ScriptValue::Vector3(Vec3::ZERO),
    }
}

/// Combine two vector arguments; anything else yields `fallback`
fn binary(args: &[ScriptValue], fallback: ScriptValue, f: fn(Vec3, Vec3) -> ScriptValue) -> ScriptValue {
    match (vec_arg(args, 0), vec_arg(args, 1)) {
        (Some(a), Some(b)) => f(a, b),
        _ => fallback,
    }
}

fn lerp(args: &[ScriptValue]) -> ScriptValue {
    match (vec_arg(args, 0), vec_arg(args, 1), number_arg(args, 2)) {
        (Some(a), Some(b), Some(t)) => ScriptValue::Vector3(a.lerp(b, t as f32)),
        _ => ScriptValue::Vector3(Vec3::ZERO),
    }
}

pub fn register(interp: &mut Interpreter) {
    interp.register_native("Vec3", |args| {
        Ok(ScriptValue::Vector3(Vec3::new(component(args, 0), component(args, 1), component(args, 2))))
    });

    let utils = library([
        ("Length", ScriptValue::native(|args| Ok(length(args)))),
        ("Normalize", ScriptValue::native(|args| Ok(normalize(args)))),
        (
            "Dot",
            ScriptValue::native(|args| {
                Ok(binary(args, ScriptValue::Number(0.0), |a, b| ScriptValue::Number(a.dot(b) as f64)))
            }),
        ),
        (
            "Cross",
            ScriptValue::native(|args| {
                Ok(binary(args, ScriptValue::Vector3(Vec3::ZERO), |a, b| ScriptValue::Vector3(a.cross(b))))
            }),
        ),
        (
            "Distance",
            ScriptValue::native(|args| {
                Ok(binary(args, ScriptValue::Number(0.0), |a, b| ScriptValue::Number(a.distance(b) as f64)))
            }),
        ),
        ("Lerp", ScriptValue::native(|args| Ok(lerp(args)))),
    ]);
    interp.set_global("Vec3Utils", utils);
}
