//! # Typecasters
//!
//! A typecaster is a pure coercion function bound to a [`TypeTag`]. The
//! `type:` option of an attribute names a tag; the type-coercing accessor
//! layer looks the tag up in its model's [`Typecasters`] table on every
//! coercing read.
//!
//! ## Built-in Tags
//!
//! | Tag | Aliases | Result |
//! |-----|---------|--------|
//! | `boolean` | `bool` | `Bool` |
//! | `date` | | `Date` |
//! | `date_time` | `datetime` | `DateTime` |
//! | `float` | | `Float` |
//! | `integer` | | `Int` |
//! | `string` | | `Str` |
//!
//! Every function is total: input that cannot be converted yields
//! [`Value::Nil`], never an error. A tag missing from the table is only an
//! error once something tries to coerce through it.
//!
//! ## Per-Model Copies
//!
//! [`Typecasters::defaults`] is built once per process. Every model handle
//! clones it at construction, so overriding an entry on one model never
//! affects another.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// Name of a coercion rule, as given in an attribute's `type:` option.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTag(Cow<'static, str>);

impl TypeTag {
    pub const BOOLEAN: TypeTag = TypeTag(Cow::Borrowed("boolean"));
    pub const BOOL: TypeTag = TypeTag(Cow::Borrowed("bool"));
    pub const DATE: TypeTag = TypeTag(Cow::Borrowed("date"));
    pub const DATE_TIME: TypeTag = TypeTag(Cow::Borrowed("date_time"));
    pub const DATETIME: TypeTag = TypeTag(Cow::Borrowed("datetime"));
    pub const FLOAT: TypeTag = TypeTag(Cow::Borrowed("float"));
    pub const INTEGER: TypeTag = TypeTag(Cow::Borrowed("integer"));
    pub const STRING: TypeTag = TypeTag(Cow::Borrowed("string"));

    pub fn new(tag: impl Into<String>) -> Self {
        TypeTag(Cow::Owned(tag.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeTag {
    fn from(tag: &str) -> Self {
        TypeTag::new(tag)
    }
}

impl From<String> for TypeTag {
    fn from(tag: String) -> Self {
        TypeTag::new(tag)
    }
}

/// A total coercion function.
pub type Typecaster = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// The passthrough used for attributes declared without a type.
pub fn identity() -> Typecaster {
    Arc::new(|value: &Value| value.clone())
}

static DEFAULT_TYPECASTERS: Lazy<Typecasters> = Lazy::new(|| {
    let mut table = Typecasters::empty();
    table.insert(TypeTag::BOOLEAN, Arc::new(cast_boolean));
    table.insert(TypeTag::DATE, Arc::new(cast_date));
    table.insert(TypeTag::DATE_TIME, Arc::new(cast_date_time));
    table.insert(TypeTag::FLOAT, Arc::new(cast_float));
    table.insert(TypeTag::INTEGER, Arc::new(cast_integer));
    table.insert(TypeTag::STRING, Arc::new(cast_string));
    table.alias(TypeTag::BOOL, &TypeTag::BOOLEAN);
    table.alias(TypeTag::DATETIME, &TypeTag::DATE_TIME);
    table
});

/// Table from type tag to coercion function.
#[derive(Clone, Default)]
pub struct Typecasters {
    casters: HashMap<TypeTag, Typecaster>,
}

impl Typecasters {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The shared built-in table.
    pub fn defaults() -> &'static Typecasters {
        &DEFAULT_TYPECASTERS
    }

    pub fn get(&self, tag: &TypeTag) -> Option<&Typecaster> {
        self.casters.get(tag)
    }

    pub fn contains(&self, tag: &TypeTag) -> bool {
        self.casters.contains_key(tag)
    }

    /// Registers `caster` under `tag`, returning the entry it replaced.
    pub fn insert(&mut self, tag: TypeTag, caster: Typecaster) -> Option<Typecaster> {
        self.casters.insert(tag, caster)
    }

    /// Makes `alias` resolve to the caster currently registered for `target`.
    /// Returns false when `target` is unknown.
    pub fn alias(&mut self, alias: TypeTag, target: &TypeTag) -> bool {
        match self.casters.get(target).cloned() {
            Some(caster) => {
                self.casters.insert(alias, caster);
                true
            }
            None => false,
        }
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&TypeTag> {
        let mut tags: Vec<&TypeTag> = self.casters.keys().collect();
        tags.sort();
        tags
    }
}

impl fmt::Debug for Typecasters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.tags()).finish()
    }
}

/// Tokens that coerce to `false` regardless of anything else.
pub const FALSE_VALUES: &[&str] = &[
    "n", "N", "no", "No", "NO", "false", "False", "FALSE", "off", "Off", "OFF", "f", "F",
];

pub fn cast_boolean(value: &Value) -> Value {
    let truthy = match value {
        Value::Str(s) if FALSE_VALUES.contains(&s.as_str()) => false,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Str(s) if starts_numeric(s) => leading_float(s) != 0.0,
        Value::List(items) => !items.is_empty(),
        Value::Map(map) => !map.is_empty(),
        other => other.is_present(),
    };
    Value::Bool(truthy)
}

pub fn cast_date(value: &Value) -> Value {
    match value {
        Value::Date(d) => Value::Date(*d),
        Value::DateTime(dt) => Value::Date(dt.date_naive()),
        Value::Nil | Value::List(_) | Value::Map(_) => Value::Nil,
        other => parse_date(&other.to_string()).map_or(Value::Nil, Value::Date),
    }
}

pub fn cast_date_time(value: &Value) -> Value {
    match value {
        Value::DateTime(dt) => Value::DateTime(*dt),
        Value::Date(d) => Value::from(midnight_utc(*d)),
        Value::Nil | Value::List(_) | Value::Map(_) => Value::Nil,
        other => parse_date_time(&other.to_string()).map_or(Value::Nil, Value::DateTime),
    }
}

pub fn cast_float(value: &Value) -> Value {
    match value {
        Value::Float(f) => Value::Float(*f),
        Value::Int(i) => Value::Float(*i as f64),
        Value::Str(s) => parse_float(s).map_or(Value::Nil, Value::Float),
        _ => Value::Nil,
    }
}

pub fn cast_integer(value: &Value) -> Value {
    match value {
        Value::Int(i) => Value::Int(*i),
        Value::Float(f) if f.is_finite() && f.abs() < 9.2e18 => Value::Int(f.trunc() as i64),
        Value::Str(s) => parse_integer(s).map_or(Value::Nil, Value::Int),
        _ => Value::Nil,
    }
}

pub fn cast_string(value: &Value) -> Value {
    match value {
        Value::Nil => Value::Nil,
        Value::Str(s) => Value::Str(s.clone()),
        other => Value::Str(other.to_string()),
    }
}

fn starts_numeric(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    digits.bytes().next().is_some_and(|b| b.is_ascii_digit())
}

/// Value of the longest numeric prefix of `s`, or 0.0 when there is none.
fn leading_float(s: &str) -> f64 {
    let bytes = s.as_bytes();
    let mut end = 0;
    if bytes.first() == Some(&b'-') {
        end = 1;
    }
    let digits_from = end;
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'_') {
        end += 1;
    }
    if end == digits_from {
        return 0.0;
    }
    if bytes.get(end) == Some(&b'.') && bytes.get(end + 1).is_some_and(u8::is_ascii_digit) {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+') | Some(b'-')) {
            exp += 1;
        }
        if bytes.get(exp).is_some_and(u8::is_ascii_digit) {
            end = exp;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
        }
    }
    let cleaned: String = s[..end].chars().filter(|c| *c != '_').collect();
    cleaned.parse().unwrap_or(0.0)
}

fn has_misplaced_underscore(s: &str) -> bool {
    s.starts_with('_') || s.ends_with('_') || s.contains("__")
}

fn parse_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, unsigned) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let lower = unsigned.to_ascii_lowercase();
    let (radix, digits) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (8, rest)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest)
    } else {
        (10, lower.as_str())
    };
    if digits.is_empty() || has_misplaced_underscore(digits) {
        return None;
    }
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    if !cleaned.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = i128::from_str_radix(&cleaned, radix).ok()?;
    let signed = if negative { -magnitude } else { magnitude };
    i64::try_from(signed).ok()
}

fn parse_float(s: &str) -> Option<f64> {
    let s = s.trim();
    if !s.bytes().any(|b| b.is_ascii_digit()) || has_misplaced_underscore(s) {
        return None;
    }
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E' | '_');
    if !s.chars().all(allowed) {
        return None;
    }
    let cleaned: String = s.chars().filter(|c| *c != '_').collect();
    cleaned.parse().ok()
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%a, %d %b %Y",
];

const OFFSET_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const NAIVE_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn midnight_utc(date: NaiveDate) -> DateTime<FixedOffset> {
    date.and_time(chrono::NaiveTime::MIN).and_utc().fixed_offset()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| parse_date_time(s).map(|dt| dt.date_naive()))
}

fn parse_date_time(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt);
    }
    if let Some(dt) = OFFSET_DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt);
    }
    if let Some(naive) = NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(naive.and_utc().fixed_offset());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .map(midnight_utc)
}
