//! Converted values.
//!
//! `Value` is what the typed converter hands back to the binding layer:
//! the literal shapes plus the converter-produced ones (timestamps, dates).
//! Maps and sets keep insertion order all the way out to the CLI.

use chrono::{NaiveDate, NaiveDateTime};
use ordered_float::OrderedFloat;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::literal::{self, Literal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

/// Pass-through for descriptor-free conversion: every literal shape has a
/// value counterpart.
impl From<Literal> for Value {
    fn from(lit: Literal) -> Self {
        match lit {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(b),
            Literal::Int(i) => Value::Int(i),
            Literal::Float(x) => Value::Float(x),
            Literal::Str(s) => Value::Str(s),
            Literal::Bytes(b) => Value::Bytes(b),
            Literal::Seq(xs) => Value::List(xs.into_iter().map(Value::from).collect()),
            Literal::Tuple(xs) => Value::Tuple(xs.into_iter().map(Value::from).collect()),
            Literal::Set(xs) => Value::Set(xs.into_iter().map(Value::from).collect()),
            Literal::Map(pairs) => Value::Map(
                pairs
                    .into_iter()
                    .map(|(k, v)| (Value::from(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => literal::fmt_float(x.0, f),
            Value::Str(s) => f.write_str(s),
            Value::Bytes(b) => literal::fmt_bytes(b, f),
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::List(xs) => fmt_seq(f, "[", xs, "]"),
            Value::Tuple(xs) => {
                f.write_str("(")?;
                for (i, x) in xs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{x}")?;
                }
                if xs.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Value::Set(xs) => {
                if xs.is_empty() {
                    return f.write_str("set()");
                }
                fmt_seq(f, "{", xs, "}")
            }
            Value::Map(pairs) => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

fn fmt_seq(
    f: &mut std::fmt::Formatter<'_>,
    open: &str,
    xs: &[Value],
    close: &str,
) -> std::fmt::Result {
    f.write_str(open)?;
    for (i, x) in xs.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{x}")?;
    }
    f.write_str(close)
}

/// JSON view for the CLI. Tuples and sets flatten to arrays, timestamps and
/// byte buffers to strings, non-string map keys to their display form
/// (serde_json's `preserve_order` keeps map entries in insertion order).
impl Serialize for Value {
    fn serialize<S>(&self, ser: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => ser.serialize_unit(),
            Value::Bool(b) => ser.serialize_bool(*b),
            Value::Int(i) => ser.serialize_i64(*i),
            Value::Float(x) => ser.serialize_f64(x.0),
            Value::Str(s) => ser.serialize_str(s),
            Value::Bytes(_) | Value::DateTime(_) | Value::Date(_) => ser.collect_str(self),
            Value::List(xs) | Value::Tuple(xs) | Value::Set(xs) => ser.collect_seq(xs),
            Value::Map(pairs) => {
                let mut map = ser.serialize_map(Some(pairs.len()))?;
                for (k, v) in pairs {
                    match k {
                        Value::Str(s) => map.serialize_entry(s, v)?,
                        other => map.serialize_entry(&other.to_string(), v)?,
                    }
                }
                map.end()
            }
        }
    }
}
