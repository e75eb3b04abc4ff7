//! Attribute value type.
//!
//! Attributes are dynamically typed: a model declares a type tag, but the
//! backing store holds whatever was written. [`Value`] is the runtime
//! representation shared by the store, declared defaults, typecasters and
//! mass-assignment input.
//!
//! ## Blankness
//!
//! [`Value::is_blank`] is the single definition of "absent-ish" used by the
//! query accessor (`name?`) and by the boolean typecaster:
//!
//! | Value | Blank |
//! |-------|-------|
//! | `Nil` | yes |
//! | `Bool(false)` | yes |
//! | `Str` containing only whitespace | yes |
//! | anything else (including `0`, empty lists and maps) | no |

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Insertion-ordered string-keyed map of values, used for nested values and
/// for mass-assignment input.
pub type Params = IndexMap<String, Value>;

/// Runtime representation of an attribute value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    List(Vec<Value>),
    Map(Params),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Whether this value counts as absent for presence checks.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Nil => true,
            Value::Bool(b) => !b,
            Value::Str(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn is_present(&self) -> bool {
        !self.is_blank()
    }

    /// Short name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Date(_) => "date",
            Value::DateTime(_) => "date_time",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Params> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Renders the value the way it appears inside a list or map:
    /// strings quoted, nil spelled out.
    fn inspect(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Str(s) => format!("{:?}", s),
            other => other.to_string(),
        }
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

/// Natural string rendering, as used by the `string` typecaster.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::Str(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => {
                f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, false))
            }
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(Value::inspect).collect();
                write!(f, "[{}]", inner.join(", "))
            }
            Value::Map(map) => {
                let inner: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{:?} => {}", k, v.inspect()))
                    .collect();
                write!(f, "{{{}}}", inner.join(", "))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<DateTime<chrono::Utc>> for Value {
    fn from(dt: DateTime<chrono::Utc>) -> Self {
        Value::DateTime(dt.fixed_offset())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Params> for Value {
    fn from(map: Params) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Nil, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Nil, Value::Float),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Nil => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Date(_) | Value::DateTime(_) => serializer.collect_str(self),
            Value::List(items) => serializer.collect_seq(items),
            Value::Map(map) => serializer.collect_map(map),
        }
    }
}

// Dates arrive as plain strings; the `date`/`date_time` typecasters turn them
// back into temporal values on read.
impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values() {
        assert!(Value::Nil.is_blank());
        assert!(Value::Bool(false).is_blank());
        assert!(Value::from("").is_blank());
        assert!(Value::from(" \t\n").is_blank());
    }

    #[test]
    fn present_values() {
        assert!(Value::Bool(true).is_present());
        assert!(Value::Int(0).is_present());
        assert!(Value::from(" x ").is_present());
        assert!(Value::List(vec![]).is_present());
        assert!(Value::Map(Params::new()).is_present());
    }

    #[test]
    fn display_renders_naturally() {
        assert_eq!(Value::Int(6).to_string(), "6");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::Float(1.3).to_string(), "1.3");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Nil.to_string(), "");
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(Value::Date(date).to_string(), "2024-03-09");
    }

    #[test]
    fn display_inspects_nested_values() {
        let list = Value::List(vec![Value::Int(1), Value::from("a"), Value::Nil]);
        assert_eq!(list.to_string(), r#"[1, "a", nil]"#);

        let mut map = Params::new();
        map.insert("k".into(), Value::Int(2));
        assert_eq!(Value::Map(map).to_string(), r#"{"k" => 2}"#);
    }

    #[test]
    fn from_json_keeps_integers_integral() {
        let json: serde_json::Value = serde_json::json!({"a": 1, "b": 1.5, "c": [null, "x"]});
        let value = Value::from(json);
        let map = value.as_map().unwrap();
        assert_eq!(map["a"], Value::Int(1));
        assert_eq!(map["b"], Value::Float(1.5));
        assert_eq!(
            map["c"],
            Value::List(vec![Value::Nil, Value::Str("x".into())])
        );
    }

    #[test]
    fn serializes_dates_as_strings() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let json = serde_json::to_string(&Value::Date(date)).unwrap();
        assert_eq!(json, r#""2024-01-02""#);
        assert_eq!(serde_json::to_string(&Value::Nil).unwrap(), "null");
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Nil);
        assert_eq!(Value::from(Some(3i64)), Value::Int(3));
    }
}
