//! Runtime values for the Xi Script interpreter.
//!
//! Tables and vectors are value types: cloning a `ScriptValue` deep-copies
//! the table, so a script never observes aliasing between two variables.

use glam::Vec3;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Numbers closer than this compare equal
pub const NUMBER_EPSILON: f64 = 1e-10;

/// Signature of host functions callable from scripts
pub type NativeFn = dyn Fn(&[ScriptValue]) -> anyhow::Result<ScriptValue>;

/// Index into an interpreter's function table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionRef(pub usize);

/// A host function
#[derive(Clone)]
pub struct NativeFunction(Rc<NativeFn>);

impl NativeFunction {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[ScriptValue]) -> anyhow::Result<ScriptValue> + 'static,
    {
        NativeFunction(Rc::new(f))
    }

    pub fn call(&self, args: &[ScriptValue]) -> anyhow::Result<ScriptValue> {
        (self.0)(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<native function>")
    }
}

/// Runtime value in the Xi Script interpreter.
#[derive(Debug, Clone, Default)]
pub enum ScriptValue {
    #[default]
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Vector3(Vec3),
    Table(ScriptTable),
    Function(FunctionRef),
    NativeFunction(NativeFunction),
    /// Opaque host handle
    UserData(u64),
}

impl ScriptValue {
    /// Wrap a host closure as a callable value
    pub fn native<F>(f: F) -> Self
    where
        F: Fn(&[ScriptValue]) -> anyhow::Result<ScriptValue> + 'static,
    {
        ScriptValue::NativeFunction(NativeFunction::new(f))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Nil => "nil",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Number(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Vector3(_) => "vec3",
            ScriptValue::Table(_) => "table",
            ScriptValue::Function(_) | ScriptValue::NativeFunction(_) => "function",
            ScriptValue::UserData(_) => "userdata",
        }
    }

    /// Nil and false are falsy, everything else is truthy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, ScriptValue::Nil | ScriptValue::Bool(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, ScriptValue::Nil)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, ScriptValue::Function(_) | ScriptValue::NativeFunction(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScriptValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            ScriptValue::Vector3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&ScriptTable> {
        match self {
            ScriptValue::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut ScriptTable> {
        match self {
            ScriptValue::Table(t) => Some(t),
            _ => None,
        }
    }
}

/// Decimal representation used for numbers everywhere a string is needed
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "nan".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "inf" } else { "-inf" }).to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Nil => f.write_str("nil"),
            ScriptValue::Bool(b) => write!(f, "{}", b),
            ScriptValue::Number(n) => f.write_str(&format_number(*n)),
            ScriptValue::String(s) => f.write_str(s),
            ScriptValue::Vector3(v) => write!(f, "Vec3({}, {}, {})", v.x, v.y, v.z),
            ScriptValue::Table(_) => f.write_str("[table]"),
            ScriptValue::Function(_) => f.write_str("[function]"),
            ScriptValue::NativeFunction(_) => f.write_str("[native function]"),
            ScriptValue::UserData(_) => f.write_str("[userdata]"),
        }
    }
}

impl PartialEq for ScriptValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScriptValue::Nil, ScriptValue::Nil) => true,
            (ScriptValue::Bool(a), ScriptValue::Bool(b)) => a == b,
            (ScriptValue::Number(a), ScriptValue::Number(b)) => (a - b).abs() < NUMBER_EPSILON,
            (ScriptValue::String(a), ScriptValue::String(b)) => a == b,
            (ScriptValue::Vector3(a), ScriptValue::Vector3(b)) => a == b,
            // Reference-like values have no identity once copied
            _ => false,
        }
    }
}

impl From<f64> for ScriptValue {
    fn from(n: f64) -> Self {
        ScriptValue::Number(n)
    }
}

impl From<f32> for ScriptValue {
    fn from(n: f32) -> Self {
        ScriptValue::Number(n as f64)
    }
}

impl From<i32> for ScriptValue {
    fn from(n: i32) -> Self {
        ScriptValue::Number(n as f64)
    }
}

impl From<bool> for ScriptValue {
    fn from(b: bool) -> Self {
        ScriptValue::Bool(b)
    }
}

impl From<&str> for ScriptValue {
    fn from(s: &str) -> Self {
        ScriptValue::String(s.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(s: String) -> Self {
        ScriptValue::String(s)
    }
}

impl From<Vec3> for ScriptValue {
    fn from(v: Vec3) -> Self {
        ScriptValue::Vector3(v)
    }
}

impl From<ScriptTable> for ScriptValue {
    fn from(t: ScriptTable) -> Self {
        ScriptValue::Table(t)
    }
}

// ==================== Tables ====================

/// String-keyed table with deterministic iteration order
#[derive(Debug, Clone, Default)]
pub struct ScriptTable {
    entries: BTreeMap<String, ScriptValue>,
}

/// Table key for a numeric index: truncated toward zero, in decimal
pub fn number_key(n: f64) -> String {
    (n.trunc() as i64).to_string()
}

/// `Some(i)` when `key` is the canonical decimal form of an integer
fn integer_key(key: &str) -> Option<i64> {
    let n: i64 = key.parse().ok()?;
    (n.to_string() == key).then_some(n)
}

impl ScriptTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ScriptValue> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut ScriptValue> {
        self.entries.get_mut(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: ScriptValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<ScriptValue> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with integer keys first in numeric order, then the rest
    /// lexicographically
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScriptValue)> {
        let mut numeric: Vec<(i64, &str, &ScriptValue)> = self
            .entries
            .iter()
            .filter_map(|(k, v)| integer_key(k).map(|n| (n, k.as_str(), v)))
            .collect();
        numeric.sort_by_key(|(n, _, _)| *n);

        let named = self
            .entries
            .iter()
            .filter(|(k, _)| integer_key(k).is_none())
            .map(|(k, v)| (k.as_str(), v));

        numeric.into_iter().map(|(_, k, v)| (k, v)).chain(named)
    }
}

impl FromIterator<(String, ScriptValue)> for ScriptTable {
    fn from_iter<I: IntoIterator<Item = (String, ScriptValue)>>(iter: I) -> Self {
        ScriptTable { entries: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_truthiness() {
        assert!(!ScriptValue::Nil.is_truthy());
        assert!(!ScriptValue::Bool(false).is_truthy());
        assert!(ScriptValue::Number(0.0).is_truthy());
        assert!(ScriptValue::from("").is_truthy());
        assert!(ScriptValue::Table(ScriptTable::new()).is_truthy());
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(ScriptValue::from(15.0).to_string(), "15");
        assert_eq!(ScriptValue::from(-3.0).to_string(), "-3");
        assert_eq!(ScriptValue::from(2.5).to_string(), "2.5");
        assert_eq!(ScriptValue::from(0.1).to_string(), "0.1");
        assert_eq!(ScriptValue::from(f64::NAN).to_string(), "nan");
        assert_eq!(ScriptValue::from(f64::INFINITY).to_string(), "inf");
        assert_eq!(ScriptValue::from(f64::NEG_INFINITY).to_string(), "-inf");
    }

    #[test]
    fn test_display_other_variants() {
        assert_eq!(ScriptValue::Nil.to_string(), "nil");
        assert_eq!(ScriptValue::Bool(true).to_string(), "true");
        assert_eq!(ScriptValue::from(Vec3::new(1.0, 2.5, -3.0)).to_string(), "Vec3(1, 2.5, -3)");
        assert_eq!(ScriptValue::Table(ScriptTable::new()).to_string(), "[table]");
        assert_eq!(ScriptValue::Function(FunctionRef(0)).to_string(), "[function]");
        assert_eq!(ScriptValue::native(|_| Ok(ScriptValue::Nil)).to_string(), "[native function]");
        assert_eq!(ScriptValue::UserData(7).to_string(), "[userdata]");
    }

    #[test]
    fn test_equality_rules() {
        assert_eq!(ScriptValue::from(0.1 + 0.2), ScriptValue::from(0.3));
        assert_ne!(ScriptValue::from(1.0), ScriptValue::from("1"));
        assert_eq!(ScriptValue::from("a"), ScriptValue::from("a"));

        let table = ScriptValue::Table(ScriptTable::new());
        assert_ne!(table.clone(), table);
        assert_ne!(ScriptValue::UserData(1), ScriptValue::UserData(1));
        assert_ne!(ScriptValue::Function(FunctionRef(0)), ScriptValue::Function(FunctionRef(0)));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(ScriptValue::Nil.type_name(), "nil");
        assert_eq!(ScriptValue::from(true).type_name(), "boolean");
        assert_eq!(ScriptValue::from(Vec3::ZERO).type_name(), "vec3");
        assert_eq!(ScriptValue::native(|_| Ok(ScriptValue::Nil)).type_name(), "function");
    }

    #[test]
    fn test_table_iteration_order() {
        let mut table = ScriptTable::new();
        table.set("b", ScriptValue::from(1.0));
        table.set("10", ScriptValue::from(2.0));
        table.set("2", ScriptValue::from(3.0));
        table.set("a", ScriptValue::from(4.0));
        table.set("-1", ScriptValue::from(5.0));
        table.set("01", ScriptValue::from(6.0));

        let keys: Vec<&str> = table.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["-1", "2", "10", "01", "a", "b"]);
    }

    #[test]
    fn test_copy_semantics() {
        let mut original = ScriptTable::new();
        original.set("x", ScriptValue::from(1.0));
        let a = ScriptValue::Table(original);

        let mut b = a.clone();
        if let Some(t) = b.as_table_mut() {
            t.set("x", ScriptValue::from(2.0));
        }

        let read = |v: &ScriptValue| v.as_table().and_then(|t| t.get("x")).and_then(|x| x.as_number());
        assert_eq!(read(&a), Some(1.0));
        assert_eq!(read(&b), Some(2.0));
    }

    #[test]
    fn test_number_key_truncates() {
        assert_eq!(number_key(3.0), "3");
        assert_eq!(number_key(2.9), "2");
        assert_eq!(number_key(-1.5), "-1");
    }
}
