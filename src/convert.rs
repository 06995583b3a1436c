//! Typed conversion: descriptor × raw token → typed value.
//!
//! Two layers mirror the two places a descriptor meets data. `convert_token`
//! works on the raw command-line token; container descriptors literal-parse
//! the token and hand the pieces to `convert_parsed`, which recurses over
//! parsed elements. Failures are values all the way out; container
//! conversions are all-or-nothing.

use chrono::{NaiveDate, NaiveDateTime};
use ordered_float::OrderedFloat;

use crate::descriptor::{Conv, PrimId, Ty};
use crate::error::ConvertError;
use crate::literal::{parse_loose, Literal};
use crate::value::Value;

pub type Outcome = Result<Value, ConvertError>;

/// Spelling that selects the absence variant of a sum. Exact match, no
/// trimming or case folding.
const NONE_TOKEN: &str = "None";

// ----------------------------- Token level -------------------------------- //

pub fn convert_token(ty: &Ty, raw: &str) -> Outcome {
    match ty {
        Ty::Any => Ok(parse_loose(raw).into()),
        Ty::Null => {
            if raw == NONE_TOKEN {
                Ok(Value::Null)
            } else {
                Err(conversion(raw, ty))
            }
        }
        Ty::OneOf(variants) => {
            // absence short-circuits: no other variant is attempted
            if raw == NONE_TOKEN && variants.contains(&Ty::Null) {
                return Ok(Value::Null);
            }
            for variant in variants {
                if *variant == Ty::Null {
                    continue;
                }
                if let Ok(value) = convert_token(variant, raw) {
                    return Ok(value);
                }
            }
            Err(ConvertError::NoVariant {
                offending: raw.to_string(),
                target: ty.to_string(),
            })
        }
        // containers and buffers go through the literal grammar; a grammar
        // violation leaves the whole token as an opaque string, which then
        // fails the shape check downstream
        Ty::List(_) | Ty::Tuple { .. } | Ty::Set(_) | Ty::Dict { .. } | Ty::Bytes => {
            convert_parsed(ty, &parse_loose(raw))
        }
        Ty::Prim { id, conv } => match conv {
            Some(conv) => conv_token(*conv, raw, ty),
            None => coerce_token(*id, raw, ty),
        },
    }
}

/// Scalar registered converters take the raw token.
fn conv_token(conv: Conv, raw: &str, ty: &Ty) -> Outcome {
    match conv {
        Conv::DateTime => Ok(Value::DateTime(parse_timestamp(raw)?)),
        Conv::Date => Ok(Value::Date(parse_timestamp(raw)?.date())),
        Conv::Truthy => Ok(Value::Bool(raw == "True")),
        Conv::Custom(f) => {
            f(&Literal::Str(raw.to_string())).ok_or_else(|| conversion(raw, ty))
        }
    }
}

fn coerce_token(id: PrimId, raw: &str, ty: &Ty) -> Outcome {
    match id {
        PrimId::Int => raw
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| conversion(raw, ty)),
        PrimId::Float => raw
            .trim()
            .parse::<f64>()
            .map(|x| Value::Float(OrderedFloat(x)))
            .map_err(|_| conversion(raw, ty)),
        PrimId::Str => Ok(Value::Str(raw.to_string())),
        // bool/datetime/date always carry a converter
        _ => Err(conversion(raw, ty)),
    }
}

// ----------------------------- Element level ------------------------------ //

pub fn convert_parsed(ty: &Ty, lit: &Literal) -> Outcome {
    match ty {
        Ty::Any => Ok(lit.clone().into()),
        Ty::Null => match lit {
            Literal::Null => Ok(Value::Null),
            other => Err(conversion_lit(other, ty)),
        },
        Ty::OneOf(variants) => {
            if *lit == Literal::Null && variants.contains(&Ty::Null) {
                return Ok(Value::Null);
            }
            for variant in variants {
                if *variant == Ty::Null {
                    continue;
                }
                if let Ok(value) = convert_parsed(variant, lit) {
                    return Ok(value);
                }
            }
            Err(ConvertError::NoVariant {
                offending: lit.to_string(),
                target: ty.to_string(),
            })
        }
        Ty::List(elem) => match lit {
            Literal::Seq(xs) => {
                let mut out = Vec::with_capacity(xs.len());
                for x in xs {
                    out.push(convert_parsed(elem, x)?);
                }
                Ok(Value::List(out))
            }
            other => Err(conversion_lit(other, ty)),
        },
        Ty::Set(elem) => match lit {
            Literal::Set(xs) => {
                let mut out = Vec::with_capacity(xs.len());
                for x in xs {
                    let v = convert_parsed(elem, x)?;
                    // conversion can collapse distinct literals, re-dedup
                    if !out.contains(&v) {
                        out.push(v);
                    }
                }
                Ok(Value::Set(out))
            }
            other => Err(conversion_lit(other, ty)),
        },
        Ty::Tuple { elems, splat } => match lit {
            Literal::Tuple(xs) => {
                let mut out = Vec::with_capacity(xs.len());
                if *splat {
                    let any = Ty::Any;
                    let elem = elems.first().unwrap_or(&any);
                    for x in xs {
                        out.push(convert_parsed(elem, x)?);
                    }
                } else {
                    if xs.len() != elems.len() {
                        return Err(ConvertError::Arity {
                            offending: lit.to_string(),
                            target: ty.to_string(),
                            expected: elems.len(),
                            actual: xs.len(),
                        });
                    }
                    for (elem, x) in elems.iter().zip(xs) {
                        out.push(convert_parsed(elem, x)?);
                    }
                }
                Ok(Value::Tuple(out))
            }
            other => Err(conversion_lit(other, ty)),
        },
        Ty::Dict { key, value } => match lit {
            Literal::Map(pairs) => {
                let mut out = Vec::with_capacity(pairs.len());
                for (lk, lv) in pairs {
                    out.push((convert_parsed(key, lk)?, convert_parsed(value, lv)?));
                }
                Ok(Value::Map(out))
            }
            other => Err(conversion_lit(other, ty)),
        },
        Ty::Bytes => bytes_from(lit),
        Ty::Prim { id, conv } => match conv {
            Some(conv) => conv_parsed(*conv, lit, ty),
            None => coerce_parsed(*id, lit, ty),
        },
    }
}

fn bytes_from(lit: &Literal) -> Outcome {
    match lit {
        Literal::Bytes(b) => Ok(Value::Bytes(b.clone())),
        Literal::Str(s) => Ok(Value::Bytes(s.as_bytes().to_vec())),
        // fixed-width big-endian representation
        Literal::Int(i) => Ok(Value::Bytes(i.to_be_bytes().to_vec())),
        other => Err(ConvertError::Unsupported {
            offending: other.to_string(),
            target: Ty::Bytes.to_string(),
        }),
    }
}

/// Registered converters over a parsed element.
fn conv_parsed(conv: Conv, lit: &Literal, ty: &Ty) -> Outcome {
    match conv {
        Conv::DateTime => match lit {
            Literal::Str(s) => Ok(Value::DateTime(parse_timestamp(s)?)),
            other => Err(ConvertError::Timestamp(other.to_string())),
        },
        Conv::Date => match lit {
            Literal::Str(s) => Ok(Value::Date(parse_timestamp(s)?.date())),
            other => Err(ConvertError::Timestamp(other.to_string())),
        },
        // true only for the exact spelling `True` or an actual true;
        // everything else is false, never an error
        Conv::Truthy => Ok(Value::Bool(match lit {
            Literal::Str(s) => s == "True",
            Literal::Bool(b) => *b,
            _ => false,
        })),
        Conv::Custom(f) => f(lit).ok_or_else(|| conversion_lit(lit, ty)),
    }
}

/// Converterless primitives coerce the way the host constructors would.
fn coerce_parsed(id: PrimId, lit: &Literal, ty: &Ty) -> Outcome {
    match id {
        PrimId::Int => match lit {
            Literal::Int(i) => Ok(Value::Int(*i)),
            Literal::Bool(b) => Ok(Value::Int(*b as i64)),
            Literal::Float(x) => Ok(Value::Int(x.0.trunc() as i64)),
            Literal::Str(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| conversion_lit(lit, ty)),
            other => Err(conversion_lit(other, ty)),
        },
        PrimId::Float => match lit {
            Literal::Float(x) => Ok(Value::Float(*x)),
            Literal::Int(i) => Ok(Value::Float(OrderedFloat(*i as f64))),
            Literal::Bool(b) => Ok(Value::Float(OrderedFloat(if *b { 1.0 } else { 0.0 }))),
            Literal::Str(s) => s
                .trim()
                .parse::<f64>()
                .map(|x| Value::Float(OrderedFloat(x)))
                .map_err(|_| conversion_lit(lit, ty)),
            other => Err(conversion_lit(other, ty)),
        },
        // stringification accepts anything: a string stays itself, the rest
        // render in their source spelling
        PrimId::Str => Ok(Value::Str(match lit {
            Literal::Str(s) => s.clone(),
            other => other.to_string(),
        })),
        _ => Err(conversion_lit(lit, ty)),
    }
}

// ----------------------------- Timestamps --------------------------------- //

const DATETIME_PATTERNS: [&str; 4] = [
    "%Y-%m-%d-%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y%m%d%H%M%S",
];

const DATE_PATTERNS: [&str; 2] = ["%Y/%m/%d", "%Y-%m-%d"];

/// Fixed pattern list, tried in order; a date-only match has zero time
/// fields. Exhausting all patterns is the only failure.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime, ConvertError> {
    for pattern in DATETIME_PATTERNS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, pattern) {
            return Ok(dt);
        }
    }
    for pattern in DATE_PATTERNS {
        if let Ok(d) = NaiveDate::parse_from_str(text, pattern) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(dt);
            }
        }
    }
    Err(ConvertError::Timestamp(text.to_string()))
}

// ----------------------------- Error helpers ------------------------------ //

fn conversion(offending: &str, target: &Ty) -> ConvertError {
    ConvertError::Conversion {
        offending: offending.to_string(),
        target: target.to_string(),
    }
}

fn conversion_lit(lit: &Literal, target: &Ty) -> ConvertError {
    conversion(&lit.to_string(), target)
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{resolve_in, Dialect};
    use crate::error::FailureKind;

    fn ty(annot: &str) -> Ty {
        resolve_in(Dialect::Modern, annot).unwrap()
    }

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Value {
        Value::DateTime(
            NaiveDate::from_ymd_opt(y, mo, d)
                .unwrap()
                .and_hms_opt(h, mi, s)
                .unwrap(),
        )
    }

    #[test]
    fn untyped_token_is_a_literal() {
        assert_eq!(convert_token(&Ty::Any, "42").unwrap(), Value::Int(42));
        assert_eq!(
            convert_token(&Ty::Any, "not a literal ()").unwrap(),
            Value::Str("not a literal ()".to_string())
        );
    }

    #[test]
    fn map_with_bareword_keys() {
        assert_eq!(
            convert_token(&ty("dict<str, int>"), "{a: 1, b: 2}").unwrap(),
            Value::Map(vec![
                (Value::Str("a".into()), Value::Int(1)),
                (Value::Str("b".into()), Value::Int(2)),
            ])
        );
        assert_eq!(
            convert_token(&ty("dict<str, str>"), "{a: b}").unwrap(),
            Value::Map(vec![(Value::Str("a".into()), Value::Str("b".into()))])
        );
    }

    #[test]
    fn union_order_is_priority() {
        // int comes first, so "5" is the integer, not the string
        assert_eq!(
            convert_token(&ty("int | str"), "5").unwrap(),
            Value::Int(5)
        );
        assert_eq!(
            convert_token(&ty("str | int"), "5").unwrap(),
            Value::Str("5".into())
        );
    }

    #[test]
    fn absence_short_circuits() {
        assert_eq!(
            convert_token(&ty("option<int>"), "None").unwrap(),
            Value::Null
        );
        // even when no variant could ever parse the sentinel
        assert_eq!(
            convert_token(&ty("option<datetime>"), "None").unwrap(),
            Value::Null
        );
        // but only the exact spelling
        let err = convert_token(&ty("option<int>"), "none").unwrap_err();
        assert_eq!(err.kind(), FailureKind::NoVariantMatched);
    }

    #[test]
    fn union_exhaustion_reports_no_variant() {
        let err = convert_token(&ty("int | datetime"), "xyz").unwrap_err();
        assert_eq!(err.kind(), FailureKind::NoVariantMatched);
        assert_eq!(err.offending(), "xyz");
        assert_eq!(err.target(), Some("int | datetime"));
    }

    #[test]
    fn tuple_arity_is_exact() {
        let err = convert_token(&ty("tuple<int, str>"), "(1,2,3)").unwrap_err();
        assert_eq!(err.kind(), FailureKind::ArityMismatch);

        assert_eq!(
            convert_token(&ty("tuple<int, str>"), "(1, 2)").unwrap(),
            Value::Tuple(vec![Value::Int(1), Value::Str("2".into())])
        );
    }

    #[test]
    fn splat_tuple_broadcasts() {
        assert_eq!(
            convert_token(&ty("tuple<int, ...>"), "(1, 2, 3)").unwrap(),
            Value::Tuple(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn timestamp_patterns_in_order() {
        assert_eq!(
            convert_token(&ty("datetime"), "2023-09-24 12:52:33").unwrap(),
            dt(2023, 9, 24, 12, 52, 33)
        );
        assert_eq!(
            convert_token(&ty("datetime"), "2023-09-24-12:52:33").unwrap(),
            dt(2023, 9, 24, 12, 52, 33)
        );
        assert_eq!(
            convert_token(&ty("datetime"), "20230924125233").unwrap(),
            dt(2023, 9, 24, 12, 52, 33)
        );
        // date-only patterns zero the time fields
        assert_eq!(
            convert_token(&ty("datetime"), "2023/09/24").unwrap(),
            dt(2023, 9, 24, 0, 0, 0)
        );
        let err = convert_token(&ty("datetime"), "24.09.2023").unwrap_err();
        assert_eq!(err.kind(), FailureKind::UnparsableTimestamp);
    }

    #[test]
    fn date_keeps_the_date_part() {
        assert_eq!(
            convert_token(&ty("date"), "2023-09-24 12:52:33").unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2023, 9, 24).unwrap())
        );
    }

    #[test]
    fn truthy_is_exactly_capital_true() {
        assert_eq!(convert_token(&ty("bool"), "True").unwrap(), Value::Bool(true));
        // the narrow contract: lowercase is false, not an error
        assert_eq!(convert_token(&ty("bool"), "true").unwrap(), Value::Bool(false));
        assert_eq!(convert_token(&ty("bool"), "1").unwrap(), Value::Bool(false));
        assert_eq!(
            convert_parsed(&ty("bool"), &Literal::Bool(true)).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn sequence_broadcasts_and_fails_whole() {
        assert_eq!(
            convert_token(&ty("list<int>"), "[1, 2, 3, 4, 5]").unwrap(),
            Value::List((1..=5).map(Value::Int).collect())
        );
        // one bad element discards the whole container
        let err = convert_token(&ty("list<int>"), "[1, 2, x]").unwrap_err();
        assert_eq!(err.kind(), FailureKind::ConversionError);
    }

    #[test]
    fn set_elements_convert_and_dedup() {
        assert_eq!(
            convert_token(&ty("set<str>"), "{1, 2}").unwrap(),
            Value::Set(vec![Value::Str("1".into()), Value::Str("2".into())])
        );
        // stringification collapses 1 and '1'
        assert_eq!(
            convert_token(&ty("set<str>"), "{1, '1'}").unwrap(),
            Value::Set(vec![Value::Str("1".into())])
        );
    }

    #[test]
    fn bytes_sources() {
        assert_eq!(
            convert_token(&Ty::Bytes, "b'xyz'").unwrap(),
            Value::Bytes(b"xyz".to_vec())
        );
        // bareword token: encoded with the fixed text encoding
        assert_eq!(
            convert_token(&Ty::Bytes, "xyz").unwrap(),
            Value::Bytes(b"xyz".to_vec())
        );
        // integer: fixed-width big-endian
        assert_eq!(
            convert_token(&Ty::Bytes, "300").unwrap(),
            Value::Bytes(vec![0, 0, 0, 0, 0, 0, 1, 44])
        );
        let err = convert_token(&Ty::Bytes, "[1, 2]").unwrap_err();
        assert_eq!(err.kind(), FailureKind::UnsupportedType);
    }

    #[test]
    fn nested_maps_with_timestamps() {
        assert_eq!(
            convert_token(&ty("dict<int, dict<str, datetime>>"), "{1: {2: '2023-09-10'}}")
                .unwrap(),
            Value::Map(vec![(
                Value::Int(1),
                Value::Map(vec![(Value::Str("2".into()), dt(2023, 9, 10, 0, 0, 0))]),
            )])
        );
    }

    #[test]
    fn union_elements_inside_a_list() {
        assert_eq!(
            convert_token(&ty("list<union<datetime, str>>"), "[1, '2023-09-24 12:52:33']")
                .unwrap(),
            Value::List(vec![
                Value::Str("1".into()),
                dt(2023, 9, 24, 12, 52, 33),
            ])
        );
    }

    #[test]
    fn failed_inner_dict_falls_to_the_string_variant() {
        let annot = "dict<str, int | datetime | none> | str";
        assert_eq!(
            convert_token(&ty(annot), "{xxx: yyy}").unwrap(),
            Value::Str("{xxx: yyy}".into())
        );
        assert_eq!(
            convert_token(&ty(annot), "{xxx: 1}").unwrap(),
            Value::Map(vec![(Value::Str("xxx".into()), Value::Int(1))])
        );
        assert_eq!(
            convert_token(&ty(annot), "{xxx: None}").unwrap(),
            Value::Map(vec![(Value::Str("xxx".into()), Value::Null)])
        );
    }

    #[test]
    fn unknown_children_pass_through() {
        assert_eq!(
            convert_token(&ty("dict"), "{a: [1, true]}").unwrap(),
            Value::Map(vec![(
                Value::Str("a".into()),
                Value::List(vec![Value::Int(1), Value::Str("true".into())]),
            )])
        );
    }

    #[test]
    fn custom_converters_slot_in() {
        fn double(lit: &Literal) -> Option<Value> {
            match lit {
                Literal::Int(i) => Some(Value::Int(i * 2)),
                _ => None,
            }
        }
        let ty = Ty::prim_with(PrimId::Int, Conv::Custom(double));
        assert_eq!(
            convert_parsed(&ty, &Literal::Int(21)).unwrap(),
            Value::Int(42)
        );
        let err = convert_parsed(&ty, &Literal::Str("x".into())).unwrap_err();
        assert_eq!(err.kind(), FailureKind::ConversionError);
    }

    #[test]
    fn primitive_coercions() {
        assert_eq!(convert_token(&ty("int"), "42").unwrap(), Value::Int(42));
        assert_eq!(
            convert_token(&ty("float"), "4.25").unwrap(),
            Value::Float(OrderedFloat(4.25))
        );
        assert_eq!(
            convert_token(&ty("str"), "anything at all").unwrap(),
            Value::Str("anything at all".into())
        );
        assert_eq!(
            convert_parsed(&ty("int"), &Literal::Float(OrderedFloat(4.9))).unwrap(),
            Value::Int(4)
        );
        assert_eq!(
            convert_parsed(&ty("float"), &Literal::Int(3)).unwrap(),
            Value::Float(OrderedFloat(3.0))
        );
        let err = convert_token(&ty("int"), "4.5").unwrap_err();
        assert_eq!(err.kind(), FailureKind::ConversionError);
    }
}
