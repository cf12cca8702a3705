//! Conversion between wire values (JSON) and the host's native values.
//!
//! Argument coercion is shallow by default: aggregates arriving on the wire
//! are flattened to their JSON text unless the tool's input shape asks for a
//! structured value, in which case [`to_native_deep`] is used for that field.

use std::fmt;

use indexmap::IndexMap;
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Ordered string-keyed mapping of native values.
pub type Mapping = IndexMap<String, NativeValue>;

/// The host's native value representation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(into = "Value", from = "Value")]
pub enum NativeValue {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<NativeValue>),
    Map(Mapping),
}

/// How a wire `null` is represented natively.
///
/// `EmptyString` keeps compatibility with hosts that reject null property
/// values. It is lossy: a null does not survive a round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    #[default]
    EmptyString,
    Nil,
}

impl NativeValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats; nothing else converts.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Mapping> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }
}

// ── Wire → native ───────────────────────────────────────────────

/// Convert a wire value using the default null policy.
pub fn to_native(wire: &Value) -> NativeValue {
    to_native_with(wire, NullPolicy::default())
}

/// Shallow conversion of a single wire value.
pub fn to_native_with(wire: &Value, policy: NullPolicy) -> NativeValue {
    match wire {
        Value::String(s) => NativeValue::String(s.clone()),
        Value::Number(n) => number_to_native(n),
        Value::Bool(b) => NativeValue::Bool(*b),
        Value::Null => null_to_native(policy),
        Value::Array(_) | Value::Object(_) => NativeValue::String(wire.to_string()),
    }
}

/// Recursive conversion that keeps arrays and objects structured.
pub fn to_native_deep(wire: &Value, policy: NullPolicy) -> NativeValue {
    match wire {
        Value::Array(items) => {
            NativeValue::Array(items.iter().map(|v| to_native_deep(v, policy)).collect())
        }
        Value::Object(fields) => NativeValue::Map(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), to_native_deep(v, policy)))
                .collect(),
        ),
        scalar => to_native_with(scalar, policy),
    }
}

/// Integral numbers in the 32-bit signed range become `Int`; everything else
/// (fractions, `3.0`, large magnitudes) becomes `Float`.
fn number_to_native(n: &Number) -> NativeValue {
    match n.as_i64().and_then(|i| i32::try_from(i).ok()) {
        Some(i) => NativeValue::Int(i64::from(i)),
        None => NativeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
    }
}

fn null_to_native(policy: NullPolicy) -> NativeValue {
    match policy {
        NullPolicy::EmptyString => NativeValue::String(String::new()),
        NullPolicy::Nil => NativeValue::Nil,
    }
}

// ── Native → wire ───────────────────────────────────────────────

pub fn to_wire(native: &NativeValue) -> Value {
    match native {
        NativeValue::Nil => Value::Null,
        NativeValue::Bool(b) => Value::Bool(*b),
        NativeValue::Int(i) => Value::from(*i),
        NativeValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        NativeValue::String(s) => Value::String(s.clone()),
        NativeValue::Array(items) => Value::Array(items.iter().map(to_wire).collect()),
        NativeValue::Map(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), to_wire(v)))
                .collect(),
        ),
    }
}

/// Whether a property schema asks for a structured value. Untyped schemas
/// (`true`, `{}` or a bare description) accept anything, so they count.
pub fn wants_aggregate(property_schema: &Value) -> bool {
    match property_schema {
        Value::Bool(accepts_all) => *accepts_all,
        Value::Object(schema) => match schema.get("type") {
            None => !schema.contains_key("$ref"),
            Some(Value::String(t)) => t == "object" || t == "array",
            Some(Value::Array(types)) => types
                .iter()
                .any(|t| t == "object" || t == "array"),
            Some(_) => false,
        },
        _ => false,
    }
}

// ── Conversions ─────────────────────────────────────────────────

impl From<Value> for NativeValue {
    fn from(wire: Value) -> Self {
        to_native_deep(&wire, NullPolicy::Nil)
    }
}

impl From<NativeValue> for Value {
    fn from(native: NativeValue) -> Self {
        to_wire(&native)
    }
}

impl From<&str> for NativeValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for NativeValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for NativeValue {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<i64> for NativeValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for NativeValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<Mapping> for NativeValue {
    fn from(m: Mapping) -> Self {
        Self::Map(m)
    }
}

/// Strings print raw; everything else prints as compact JSON.
impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            other => write!(f, "{}", to_wire(other)),
        }
    }
}

/// Accepts any JSON value.
impl JsonSchema for NativeValue {
    fn schema_name() -> String {
        "NativeValue".to_string()
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        Schema::Bool(true)
    }

    fn is_referenceable() -> bool {
        false
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_round_trip() {
        for wire in [
            json!("hello"),
            json!(""),
            json!(true),
            json!(false),
            json!(0),
            json!(-17),
            json!(i32::MAX),
            json!(i32::MIN),
        ] {
            assert_eq!(to_wire(&to_native(&wire)), wire, "round trip of {wire}");
        }
    }

    #[test]
    fn null_becomes_empty_string_by_default() {
        assert_eq!(to_native(&Value::Null), NativeValue::String(String::new()));
        assert_eq!(to_wire(&to_native(&Value::Null)), json!(""));
    }

    #[test]
    fn null_policy_nil_keeps_null() {
        let native = to_native_with(&Value::Null, NullPolicy::Nil);
        assert!(native.is_nil());
        assert_eq!(to_wire(&native), Value::Null);
    }

    #[test]
    fn integers_outside_i32_become_floats() {
        let big = i64::from(i32::MAX) + 1;
        assert_eq!(to_native(&json!(big)), NativeValue::Float(2_147_483_648.0));
        assert_eq!(to_native(&json!(2.5)), NativeValue::Float(2.5));
        assert_eq!(to_native(&json!(3.0)), NativeValue::Float(3.0));
        assert_eq!(to_native(&json!(42)), NativeValue::Int(42));
    }

    #[test]
    fn aggregates_flatten_to_json_text() {
        let native = to_native(&json!({"x": 1, "y": 2}));
        let text = native.as_str().unwrap();
        let reparsed: Value = serde_json::from_str(text).unwrap();
        assert_eq!(reparsed, json!({"x": 1, "y": 2}));

        assert_eq!(to_native(&json!([1, 2])), NativeValue::String("[1,2]".into()));
    }

    #[test]
    fn deep_conversion_keeps_structure() {
        let native = to_native_deep(&json!({"x": 1, "y": [true, null]}), NullPolicy::EmptyString);
        let map = native.as_map().unwrap();
        assert_eq!(map["x"], NativeValue::Int(1));
        assert_eq!(
            map["y"],
            NativeValue::Array(vec![NativeValue::Bool(true), NativeValue::String(String::new())])
        );
    }

    #[test]
    fn non_finite_floats_serialise_as_null() {
        assert_eq!(to_wire(&NativeValue::Float(f64::NAN)), Value::Null);
    }

    #[test]
    fn aggregate_detection() {
        assert!(wants_aggregate(&json!(true)));
        assert!(wants_aggregate(&json!({"description": "New value"})));
        assert!(wants_aggregate(&json!({"type": "object"})));
        assert!(wants_aggregate(&json!({"type": ["array", "null"]})));
        assert!(!wants_aggregate(&json!({"type": "string"})));
        assert!(!wants_aggregate(&json!({"type": ["string", "null"]})));
    }

    #[test]
    fn serde_uses_wire_representation() {
        let v: NativeValue = serde_json::from_value(json!({"a": [1, 2.5, null]})).unwrap();
        let map = v.as_map().unwrap();
        assert_eq!(
            map["a"],
            NativeValue::Array(vec![
                NativeValue::Int(1),
                NativeValue::Float(2.5),
                NativeValue::Nil
            ])
        );
        assert_eq!(serde_json::to_value(&v).unwrap(), json!({"a": [1, 2.5, null]}));
    }
}
