//! Operator semantics.
//!
//! Operators never fail: an unsupported operand combination yields `nil`
//! for arithmetic and `false` for ordering comparisons.

use crate::frontend::ast::{BinOp, UnaryOp};
use crate::runtime::value::{ScriptValue, NUMBER_EPSILON};
use glam::Vec3;

type V = ScriptValue;

/// Apply a binary operator to two evaluated operands.
///
/// `and`/`or` are normally short-circuited by the interpreter; here they
/// simply return the deciding operand.
pub fn binary(op: BinOp, left: &V, right: &V) -> V {
    match op {
        BinOp::Add => add(left, right),
        BinOp::Sub => sub(left, right),
        BinOp::Mul => mul(left, right),
        BinOp::Div => div(left, right),
        BinOp::Mod => match (left, right) {
            (V::Number(a), V::Number(b)) => V::Number(a % b),
            _ => V::Nil,
        },
        BinOp::Pow => match (left, right) {
            (V::Number(a), V::Number(b)) => V::Number(a.powf(*b)),
            _ => V::Nil,
        },
        BinOp::Concat => V::String(format!("{}{}", left, right)),
        BinOp::Eq => V::Bool(left == right),
        BinOp::Ne => V::Bool(left != right),
        BinOp::Lt => V::Bool(less_than(left, right)),
        BinOp::Le => V::Bool(less_equal(left, right)),
        BinOp::Gt => V::Bool(comparable(left, right) && !less_equal(left, right)),
        BinOp::Ge => V::Bool(comparable(left, right) && !less_than(left, right)),
        BinOp::And => {
            if left.is_truthy() {
                right.clone()
            } else {
                left.clone()
            }
        }
        BinOp::Or => {
            if left.is_truthy() {
                left.clone()
            } else {
                right.clone()
            }
        }
    }
}

pub fn unary(op: UnaryOp, operand: &V) -> V {
    match op {
        UnaryOp::Neg => match operand {
            V::Number(n) => V::Number(-n),
            V::Vector3(v) => V::Vector3(-*v),
            _ => V::Nil,
        },
        UnaryOp::Not => V::Bool(!operand.is_truthy()),
        UnaryOp::Len => match operand {
            V::String(s) => V::Number(s.chars().count() as f64),
            V::Table(t) => V::Number(t.len() as f64),
            _ => V::Number(0.0),
        },
    }
}

fn add(left: &V, right: &V) -> V {
    match (left, right) {
        (V::Number(a), V::Number(b)) => V::Number(a + b),
        (V::String(_), _) | (_, V::String(_)) => V::String(format!("{}{}", left, right)),
        (V::Vector3(a), V::Vector3(b)) => V::Vector3(*a + *b),
        _ => V::Nil,
    }
}

fn sub(left: &V, right: &V) -> V {
    match (left, right) {
        (V::Number(a), V::Number(b)) => V::Number(a - b),
        (V::Vector3(a), V::Vector3(b)) => V::Vector3(*a - *b),
        _ => V::Nil,
    }
}

fn mul(left: &V, right: &V) -> V {
    match (left, right) {
        (V::Number(a), V::Number(b)) => V::Number(a * b),
        (V::Vector3(v), V::Number(s)) | (V::Number(s), V::Vector3(v)) => V::Vector3(*v * *s as f32),
        _ => V::Nil,
    }
}

/// Any zero divisor yields nil
fn div(left: &V, right: &V) -> V {
    match (left, right) {
        (V::Number(_), V::Number(b)) if *b == 0.0 => V::Nil,
        (V::Number(a), V::Number(b)) => V::Number(a / b),
        (V::Vector3(_), V::Number(s)) if *s == 0.0 => V::Nil,
        (V::Vector3(v), V::Number(s)) => V::Vector3(*v / *s as f32),
        (V::Number(_), V::Vector3(v)) if v.cmpeq(Vec3::ZERO).any() => V::Nil,
        (V::Number(s), V::Vector3(v)) => V::Vector3(Vec3::splat(*s as f32) / *v),
        _ => V::Nil,
    }
}

fn comparable(left: &V, right: &V) -> bool {
    matches!((left, right), (V::Number(_), V::Number(_)) | (V::String(_), V::String(_)))
}

fn less_than(left: &V, right: &V) -> bool {
    match (left, right) {
        (V::Number(a), V::Number(b)) => a < b,
        (V::String(a), V::String(b)) => a < b,
        _ => false,
    }
}

fn less_equal(left: &V, right: &V) -> bool {
    match (left, right) {
        (V::Number(a), V::Number(b)) => a < b || (a - b).abs() < NUMBER_EPSILON,
        (V::String(a), V::String(b)) => a <= b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn num(n: f64) -> V {
        V::Number(n)
    }

    fn vec3(x: f32, y: f32, z: f32) -> V {
        V::Vector3(Vec3::new(x, y, z))
    }

    #[test]
    fn test_number_arithmetic() {
        assert_eq!(binary(BinOp::Add, &num(1.0), &num(2.0)), num(3.0));
        assert_eq!(binary(BinOp::Sub, &num(1.0), &num(2.0)), num(-1.0));
        assert_eq!(binary(BinOp::Mul, &num(4.0), &num(2.5)), num(10.0));
        assert_eq!(binary(BinOp::Div, &num(7.0), &num(2.0)), num(3.5));
        assert_eq!(binary(BinOp::Mod, &num(7.0), &num(3.0)), num(1.0));
        assert_eq!(binary(BinOp::Pow, &num(2.0), &num(10.0)), num(1024.0));
    }

    #[test]
    fn test_division_by_zero_is_nil() {
        assert!(binary(BinOp::Div, &num(1.0), &num(0.0)).is_nil());
        assert!(binary(BinOp::Div, &vec3(1.0, 1.0, 1.0), &num(0.0)).is_nil());
        assert!(binary(BinOp::Div, &num(1.0), &vec3(1.0, 0.0, 1.0)).is_nil());
    }

    #[test]
    fn test_plus_concatenates_strings() {
        assert_eq!(binary(BinOp::Add, &V::from("hp: "), &num(10.0)), V::from("hp: 10"));
        assert_eq!(binary(BinOp::Add, &num(1.5), &V::from("x")), V::from("1.5x"));
        assert_eq!(binary(BinOp::Concat, &V::Nil, &V::Bool(true)), V::from("niltrue"));
    }

    #[test]
    fn test_vector_arithmetic() {
        let a = vec3(1.0, 2.0, 3.0);
        let b = vec3(1.0, 1.0, 1.0);
        assert_eq!(binary(BinOp::Add, &a, &b), vec3(2.0, 3.0, 4.0));
        assert_eq!(binary(BinOp::Sub, &a, &b), vec3(0.0, 1.0, 2.0));
        assert_eq!(binary(BinOp::Mul, &a, &num(2.0)), vec3(2.0, 4.0, 6.0));
        assert_eq!(binary(BinOp::Mul, &num(2.0), &a), vec3(2.0, 4.0, 6.0));
        assert_eq!(binary(BinOp::Div, &a, &num(2.0)), vec3(0.5, 1.0, 1.5));
        assert_eq!(binary(BinOp::Div, &num(6.0), &a), vec3(6.0, 3.0, 2.0));
        assert_eq!(unary(UnaryOp::Neg, &a), vec3(-1.0, -2.0, -3.0));
    }

    #[test]
    fn test_unsupported_operands() {
        assert!(binary(BinOp::Sub, &V::from("a"), &num(1.0)).is_nil());
        assert!(binary(BinOp::Mul, &V::Bool(true), &num(1.0)).is_nil());
        assert!(unary(UnaryOp::Neg, &V::from("a")).is_nil());
        assert_eq!(binary(BinOp::Lt, &num(1.0), &V::from("2")), V::Bool(false));
        assert_eq!(binary(BinOp::Gt, &num(1.0), &V::from("2")), V::Bool(false));
        assert_eq!(binary(BinOp::Ge, &V::Nil, &V::Nil), V::Bool(false));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(binary(BinOp::Lt, &num(1.0), &num(2.0)), V::Bool(true));
        assert_eq!(binary(BinOp::Le, &num(2.0), &num(2.0)), V::Bool(true));
        assert_eq!(binary(BinOp::Gt, &num(2.0), &num(2.0)), V::Bool(false));
        assert_eq!(binary(BinOp::Ge, &num(2.0), &num(2.0)), V::Bool(true));
        assert_eq!(binary(BinOp::Lt, &V::from("apple"), &V::from("banana")), V::Bool(true));
        assert_eq!(binary(BinOp::Ge, &V::from("b"), &V::from("a")), V::Bool(true));
    }

    #[test]
    fn test_length_operator() {
        assert_eq!(unary(UnaryOp::Len, &V::from("héllo")), num(5.0));
        assert_eq!(unary(UnaryOp::Len, &num(3.0)), num(0.0));
        assert_eq!(unary(UnaryOp::Not, &V::Nil), V::Bool(true));
    }

    #[test]
    fn test_logical_operators_return_deciding_operand() {
        assert_eq!(binary(BinOp::And, &num(1.0), &num(2.0)), num(2.0));
        assert_eq!(binary(BinOp::And, &V::Nil, &num(2.0)), V::Nil);
        assert_eq!(binary(BinOp::Or, &V::Bool(false), &V::from("x")), V::from("x"));
    }
}
