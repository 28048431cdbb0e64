//! Runtime values.
//!
//! Scalars are held by value.  Lists, maps and instances are reference-shared:
//! cloning a [`Value`] clones the handle, so a mutation through one binding is
//! visible through every alias.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::env::Instance;
use super::error::{Result, ScriptError};
use super::ir::Node;

pub type List = Rc<RefCell<Vec<Value>>>;
pub type Map = Rc<RefCell<BTreeMap<String, Value>>>;

/// A script runtime value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(List),
    Map(Map),
    Instance(Rc<Instance>),
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(Rc::new(RefCell::new(map)))
    }
}

// ── Display ───────────────────────────────────────────────────────────────────

fn fmt_float(x: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        write!(f, "{:.1}", x)
    } else {
        write!(f, "{x}")
    }
}

/// Containers currently being written, so a self-containing value prints
/// `[...]` or `{...}` at the point where it repeats.
type Seen = Vec<*const ()>;

fn write_value(
    value: &Value,
    f: &mut fmt::Formatter<'_>,
    nested: bool,
    seen: &mut Seen,
) -> fmt::Result {
    match value {
        Value::Null => f.write_str("null"),
        Value::Bool(b) => write!(f, "{b}"),
        Value::Int(n) => write!(f, "{n}"),
        Value::Float(x) => fmt_float(*x, f),
        Value::Str(s) if nested => write!(f, "{s:?}"),
        Value::Str(s) => f.write_str(s),
        Value::List(items) => {
            let ptr = Rc::as_ptr(items) as *const ();
            if seen.contains(&ptr) {
                return f.write_str("[...]");
            }
            seen.push(ptr);
            f.write_str("[")?;
            for (i, v) in items.borrow().iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_value(v, f, true, seen)?;
            }
            seen.pop();
            f.write_str("]")
        }
        Value::Map(map) => {
            let ptr = Rc::as_ptr(map) as *const ();
            if seen.contains(&ptr) {
                return f.write_str("{...}");
            }
            seen.push(ptr);
            write_entries(f, map.borrow().iter(), seen)?;
            seen.pop();
            Ok(())
        }
        Value::Instance(inst) => {
            write!(f, "{} ", inst.class)?;
            let ptr = Rc::as_ptr(inst) as *const ();
            if seen.contains(&ptr) {
                return f.write_str("{...}");
            }
            seen.push(ptr);
            write_entries(f, inst.attrs.borrow().iter(), seen)?;
            seen.pop();
            Ok(())
        }
    }
}

fn write_entries<'a>(
    f: &mut fmt::Formatter<'_>,
    entries: impl Iterator<Item = (&'a String, &'a Value)>,
    seen: &mut Seen,
) -> fmt::Result {
    f.write_str("{")?;
    for (i, (k, v)) in entries.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{k:?}: ")?;
        write_value(v, f, true, seen)?;
    }
    f.write_str("}")
}

/// Top-level strings print bare; strings inside containers are quoted.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(self, f, false, &mut Vec::new())
    }
}

// ── Equality ──────────────────────────────────────────────────────────────────

/// Container pairs already under comparison.  Meeting a pair again means both
/// sides loop back the same way, so that branch counts as equal.
type Pairs = Vec<(*const (), *const ())>;

fn containers_eq<T>(
    a: &Rc<RefCell<T>>,
    b: &Rc<RefCell<T>>,
    pairs: &mut Pairs,
    eq: impl FnOnce(&T, &T, &mut Pairs) -> bool,
) -> bool {
    if Rc::ptr_eq(a, b) {
        return true;
    }
    let pair = (Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ());
    if pairs.contains(&pair) {
        return true;
    }
    pairs.push(pair);
    let equal = eq(&*a.borrow(), &*b.borrow(), pairs);
    pairs.pop();
    equal
}

fn values_eq(a: &Value, b: &Value, pairs: &mut Pairs) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::List(a), Value::List(b)) => containers_eq(a, b, pairs, |a, b, pairs| {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_eq(x, y, pairs))
        }),
        (Value::Map(a), Value::Map(b)) => containers_eq(a, b, pairs, |a, b, pairs| {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|((ka, va), (kb, vb))| ka == kb && values_eq(va, vb, pairs))
        }),
        (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// Loose equality: ints and floats compare numerically, containers compare
/// element-wise, instances compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        values_eq(self, other, &mut Vec::new())
    }
}

// ── Repetition ────────────────────────────────────────────────────────────────

/// Largest string (in bytes) or list (in elements) that `*` will build.
pub const MAX_REPEAT: usize = 1 << 26;

/// Clamp a repeat count to zero and check the result size against
/// [`MAX_REPEAT`].
fn repeat_count(len: usize, n: i64) -> Result<usize> {
    let count = usize::try_from(n.max(0)).unwrap_or(usize::MAX);
    match len.checked_mul(count) {
        Some(0) => Ok(0),
        Some(total) if total <= MAX_REPEAT => Ok(count),
        _ => Err(ScriptError::native(
            "*",
            format!("repetition result too large ({len} x {n} exceeds {MAX_REPEAT})"),
        )),
    }
}

// ── Numeric view ──────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(x) => x,
        }
    }
}

impl Value {
    fn num(&self) -> Option<Num> {
        match self {
            Value::Int(n) => Some(Num::Int(*n)),
            Value::Float(x) => Some(Num::Float(*x)),
            Value::Bool(b) => Some(Num::Int(i64::from(*b))),
            _ => None,
        }
    }

    /// Name of the value's type, as returned by the `type` operation.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
            Value::Instance(_) => "instance",
        }
    }

    /// Truthiness: null, `false`, zero, and empty strings and containers are
    /// falsy; everything else is truthy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Map(map) => !map.borrow().is_empty(),
            Value::Instance(_) => true,
        }
    }

    /// Coerce to an integer: floats truncate, numeric strings parse.
    pub fn to_int(&self) -> Result<i64> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Float(x) if x.is_finite() => Ok(x.trunc() as i64),
            Value::Str(s) => s
                .trim()
                .parse()
                .map_err(|_| ScriptError::mismatch(format!("invalid integer literal '{s}'"))),
            other => Err(ScriptError::mismatch(format!(
                "cannot convert {} '{other}' to int",
                other.type_name()
            ))),
        }
    }

    /// Coerce to a float: numbers convert, numeric strings parse.
    pub fn to_float(&self) -> Result<f64> {
        match self {
            Value::Str(s) => s
                .trim()
                .parse()
                .map_err(|_| ScriptError::mismatch(format!("invalid number '{s}'"))),
            other => other.num().map(Num::as_f64).ok_or_else(|| {
                ScriptError::mismatch(format!("cannot convert {} to float", other.type_name()))
            }),
        }
    }

    /// Build a value from an IR/JSON literal without evaluating it.
    pub fn from_json(node: &Node) -> Value {
        match node {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(*b),
            Node::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Node::String(s) => Value::Str(s.clone()),
            Node::Array(items) => items.iter().map(Value::from_json).collect::<Vec<_>>().into(),
            Node::Object(map) => map
                .iter()
                .map(|(k, v)| (k.clone(), Value::from_json(v)))
                .collect::<BTreeMap<_, _>>()
                .into(),
        }
    }

    // ── Operators ─────────────────────────────────────────────────────────────

    fn unsupported(op: &str, a: &Value, b: &Value) -> ScriptError {
        ScriptError::mismatch(format!(
            "unsupported operand types for {op}: '{}' and '{}'",
            a.type_name(),
            b.type_name()
        ))
    }

    /// `+`: string concatenation when either side is a string, list
    /// concatenation for two lists, numeric addition otherwise.
    pub fn add(&self, rhs: &Value) -> Result<Value> {
        match (self, rhs) {
            (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::Str(format!("{self}{rhs}"))),
            (Value::List(a), Value::List(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                Ok(items.into())
            }
            _ => match (self.num(), rhs.num()) {
                (Some(Num::Int(a)), Some(Num::Int(b))) => Ok(a
                    .checked_add(b)
                    .map_or(Value::Float(a as f64 + b as f64), Value::Int)),
                (Some(a), Some(b)) => Ok(Value::Float(a.as_f64() + b.as_f64())),
                _ => Err(Self::unsupported("+", self, rhs)),
            },
        }
    }

    pub fn sub(&self, rhs: &Value) -> Result<Value> {
        match (self.num(), rhs.num()) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => Ok(a
                .checked_sub(b)
                .map_or(Value::Float(a as f64 - b as f64), Value::Int)),
            (Some(a), Some(b)) => Ok(Value::Float(a.as_f64() - b.as_f64())),
            _ => Err(Self::unsupported("-", self, rhs)),
        }
    }

    /// `*`: numeric product; a string or list times an int repeats it.
    /// Repetition is capped at [`MAX_REPEAT`] bytes or elements.
    pub fn mul(&self, rhs: &Value) -> Result<Value> {
        match (self, rhs) {
            (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
                let count = repeat_count(s.len(), *n)?;
                let mut out = String::new();
                out.try_reserve_exact(s.len() * count)
                    .map_err(|e| ScriptError::native("*", e.to_string()))?;
                for _ in 0..count {
                    out.push_str(s);
                }
                Ok(Value::Str(out))
            }
            (Value::List(items), Value::Int(n)) | (Value::Int(n), Value::List(items)) => {
                let items = items.borrow();
                let count = repeat_count(items.len(), *n)?;
                let mut out = Vec::new();
                out.try_reserve_exact(items.len() * count)
                    .map_err(|e| ScriptError::native("*", e.to_string()))?;
                for _ in 0..count {
                    out.extend(items.iter().cloned());
                }
                Ok(out.into())
            }
            _ => match (self.num(), rhs.num()) {
                (Some(Num::Int(a)), Some(Num::Int(b))) => Ok(a
                    .checked_mul(b)
                    .map_or(Value::Float(a as f64 * b as f64), Value::Int)),
                (Some(a), Some(b)) => Ok(Value::Float(a.as_f64() * b.as_f64())),
                _ => Err(Self::unsupported("*", self, rhs)),
            },
        }
    }

    /// `/`: true division, always a float.
    pub fn div(&self, rhs: &Value) -> Result<Value> {
        match (self.num(), rhs.num()) {
            (Some(a), Some(b)) => {
                if b.as_f64() == 0.0 {
                    return Err(ScriptError::DivisionByZero);
                }
                Ok(Value::Float(a.as_f64() / b.as_f64()))
            }
            _ => Err(Self::unsupported("/", self, rhs)),
        }
    }

    /// `%`: the result takes the sign of the divisor.
    pub fn rem(&self, rhs: &Value) -> Result<Value> {
        match (self.num(), rhs.num()) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => {
                if b == 0 {
                    return Err(ScriptError::DivisionByZero);
                }
                // i64::MIN % -1 overflows; its result is 0.
                let r = a.checked_rem(b).unwrap_or(0);
                Ok(Value::Int(if r != 0 && (r < 0) != (b < 0) { r + b } else { r }))
            }
            (Some(a), Some(b)) => {
                let (a, b) = (a.as_f64(), b.as_f64());
                if b == 0.0 {
                    return Err(ScriptError::DivisionByZero);
                }
                let r = a % b;
                Ok(Value::Float(if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r }))
            }
            _ => Err(Self::unsupported("%", self, rhs)),
        }
    }

    /// Evaluate a comparison operator (`==`, `!=`, `<`, `>`, `<=`, `>=`).
    pub fn compare(&self, op: &str, rhs: &Value) -> Result<bool> {
        use std::cmp::Ordering;

        match op {
            "==" => return Ok(self == rhs),
            "!=" => return Ok(self != rhs),
            _ => {}
        }
        let ord = match (self, rhs) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => match (self.num(), rhs.num()) {
                (Some(Num::Int(a)), Some(Num::Int(b))) => Some(a.cmp(&b)),
                (Some(a), Some(b)) => a.as_f64().partial_cmp(&b.as_f64()),
                _ => return Err(Self::unsupported(op, self, rhs)),
            },
        };
        // NaN compares false against everything.
        let Some(ord) = ord else { return Ok(false) };
        Ok(match op {
            "<" => ord == Ordering::Less,
            ">" => ord == Ordering::Greater,
            "<=" => ord != Ordering::Greater,
            ">=" => ord != Ordering::Less,
            other => return Err(ScriptError::invalid(format!("unknown comparison '{other}'"))),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn list(items: Vec<Value>) -> Value {
        items.into()
    }

    #[test]
    fn display_scalars() {
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from("hi").to_string(), "hi");
    }

    #[test]
    fn display_containers_quote_strings() {
        let v = list(vec![Value::Int(1), "a".into(), list(vec![])]);
        assert_eq!(v.to_string(), r#"[1, "a", []]"#);
        let m = Value::from_json(&json!({"b": 2, "a": "x"}));
        assert_eq!(m.to_string(), r#"{"a": "x", "b": 2}"#);
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.truthy());
        assert!(!Value::Int(0).truthy());
        assert!(!Value::from("").truthy());
        assert!(!list(vec![]).truthy());
        assert!(Value::from("0").truthy());
        assert!(Value::Float(0.1).truthy());
    }

    #[test]
    fn add_coerces_to_string() {
        assert_eq!(Value::from("a").add(&Value::Int(1)).unwrap(), Value::from("a1"));
        assert_eq!(Value::Int(1).add(&Value::from("a")).unwrap(), Value::from("1a"));
        assert_eq!(Value::Int(2).add(&Value::Int(3)).unwrap(), Value::Int(5));
    }

    #[test]
    fn add_overflow_promotes_to_float() {
        let v = Value::Int(i64::MAX).add(&Value::Int(1)).unwrap();
        assert!(matches!(v, Value::Float(_)));
    }

    #[test]
    fn add_rejects_mismatched_containers() {
        assert!(list(vec![]).add(&Value::Int(1)).is_err());
    }

    #[test]
    fn true_division() {
        assert_eq!(Value::Int(5).div(&Value::Int(2)).unwrap(), Value::Float(2.5));
        assert!(matches!(
            Value::Int(4).div(&Value::Int(0)),
            Err(ScriptError::DivisionByZero)
        ));
    }

    #[test]
    fn remainder_follows_divisor_sign() {
        assert_eq!(Value::Int(-7).rem(&Value::Int(3)).unwrap(), Value::Int(2));
        assert_eq!(Value::Int(7).rem(&Value::Int(-3)).unwrap(), Value::Int(-2));
        assert!(Value::Int(1).rem(&Value::Int(0)).is_err());
    }

    #[test]
    fn string_repeat() {
        assert_eq!(Value::from("ab").mul(&Value::Int(3)).unwrap(), Value::from("ababab"));
        assert_eq!(Value::Int(-2).mul(&Value::from("ab")).unwrap(), Value::from(""));
        assert_eq!(Value::from("").mul(&Value::Int(i64::MAX)).unwrap(), Value::from(""));
    }

    #[test]
    fn oversized_repeat_is_an_error() {
        let err = Value::from("ab").mul(&Value::Int(i64::MAX)).unwrap_err();
        assert!(matches!(err, ScriptError::Native { .. }), "{err:?}");

        let xs = list(vec![Value::Int(1), Value::Int(2)]);
        assert!(xs.mul(&Value::Int(i64::MAX)).is_err());
        assert!(xs.mul(&Value::Int((MAX_REPEAT / 2 + 1) as i64)).is_err());
        assert_eq!(xs.mul(&Value::Int(2)).unwrap().to_string(), "[1, 2, 1, 2]");
        assert_eq!(list(vec![]).mul(&Value::Int(i64::MAX)).unwrap().to_string(), "[]");
    }

    #[test]
    fn self_containing_list_prints_marker() {
        let xs = list(vec![Value::Int(1)]);
        if let Value::List(items) = &xs {
            items.borrow_mut().push(xs.clone());
        }
        assert_eq!(xs.to_string(), "[1, [...]]");

        let outer = list(vec![xs.clone(), xs.clone()]);
        assert_eq!(outer.to_string(), "[[1, [...]], [1, [...]]]");
    }

    #[test]
    fn self_containing_map_prints_marker() {
        let m: Value = BTreeMap::new().into();
        if let Value::Map(map) = &m {
            map.borrow_mut().insert("me".into(), m.clone());
            map.borrow_mut().insert("n".into(), Value::from("x"));
        }
        assert_eq!(m.to_string(), r#"{"me": {...}, "n": "x"}"#);
    }

    #[test]
    fn cyclic_lists_compare_without_looping() {
        let cyclic = |head: i64| {
            let xs = list(vec![Value::Int(head)]);
            if let Value::List(items) = &xs {
                items.borrow_mut().push(xs.clone());
            }
            xs
        };
        let (a, b, c) = (cyclic(1), cyclic(1), cyclic(2));
        assert_eq!(a, a.clone());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, list(vec![Value::Int(1)]));
    }

    #[test]
    fn numeric_equality_crosses_types() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Int(1), Value::from("1"));
    }

    #[test]
    fn comparisons() {
        assert!(Value::Int(1).compare("<", &Value::Float(1.5)).unwrap());
        assert!(Value::from("a").compare("<", &Value::from("b")).unwrap());
        assert!(Value::Int(2).compare(">=", &Value::Int(2)).unwrap());
        assert!(Value::Int(1).compare("<", &Value::from("x")).is_err());
    }

    #[test]
    fn lists_are_shared() {
        let a = list(vec![Value::Int(1)]);
        let b = a.clone();
        if let Value::List(items) = &b {
            items.borrow_mut().push(Value::Int(2));
        }
        assert_eq!(a.to_string(), "[1, 2]");
    }

    #[test]
    fn from_json_numbers() {
        assert!(matches!(Value::from_json(&json!(3)), Value::Int(3)));
        assert!(matches!(Value::from_json(&json!(1.5)), Value::Float(_)));
    }

    #[test]
    fn int_coercion() {
        assert_eq!(Value::from(" 12 ").to_int().unwrap(), 12);
        assert_eq!(Value::Float(3.9).to_int().unwrap(), 3);
        assert!(Value::from("x").to_int().is_err());
    }
}
