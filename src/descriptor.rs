//! Type descriptors and the annotation resolver.
//!
//! An annotation string like `dict<str, int | none>` becomes an immutable
//! descriptor tree `Ty`, built once per parameter. Both union spellings —
//! the classic `union<...>`/`option<...>` forms and the `a | b` pipe sugar —
//! normalize to one `OneOf` shape, so the converter never sees surface
//! syntax. Nullability is not its own node: `option<T>` is `OneOf` with a
//! trailing `Null` variant.

use once_cell::sync::Lazy;

use crate::error::ResolveError;
use crate::literal::Literal;
use crate::value::Value;

// ------------------------------- Descriptors ------------------------------ //

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimId {
    Int,
    Float,
    Str,
    Bool,
    DateTime,
    Date,
}

impl PrimId {
    pub fn name(self) -> &'static str {
        match self {
            PrimId::Int => "int",
            PrimId::Float => "float",
            PrimId::Str => "str",
            PrimId::Bool => "bool",
            PrimId::DateTime => "datetime",
            PrimId::Date => "date",
        }
    }
}

/// Registered converter attached to a primitive. A closed set of tagged
/// strategies chosen by descriptor kind, plus a hook for embedders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conv {
    /// Six fixed date/time patterns, first match wins.
    DateTime,
    /// Same patterns, keeping the date part.
    Date,
    /// True iff spelled exactly `True` or already boolean-true.
    Truthy,
    /// Embedder-supplied conversion; `None` means the converter rejected.
    Custom(fn(&Literal) -> Option<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    Prim { id: PrimId, conv: Option<Conv> },
    /// The absence marker. Only meaningful on its own or as a `OneOf`
    /// variant; `option<T>` resolves to `OneOf([T, Null])`.
    Null,
    /// Disjoint alternatives, tried in declaration order. Never empty.
    OneOf(Vec<Ty>),
    List(Box<Ty>),
    /// `splat` marks the single-element `tuple<T, ...>` form, which
    /// broadcasts over the actual arity instead of pinning it.
    Tuple { elems: Vec<Ty>, splat: bool },
    Set(Box<Ty>),
    Dict { key: Box<Ty>, value: Box<Ty> },
    Bytes,
    /// No usable annotation: opaque literal pass-through.
    Any,
}

impl Ty {
    /// Primitive with its default registered converter.
    pub fn prim(id: PrimId) -> Ty {
        let conv = match id {
            PrimId::Bool => Some(Conv::Truthy),
            PrimId::DateTime => Some(Conv::DateTime),
            PrimId::Date => Some(Conv::Date),
            PrimId::Int | PrimId::Float | PrimId::Str => None,
        };
        Ty::Prim { id, conv }
    }

    /// Primitive with an embedder-supplied converter.
    pub fn prim_with(id: PrimId, conv: Conv) -> Ty {
        Ty::Prim { id, conv: Some(conv) }
    }
}

impl std::fmt::Display for Ty {
    /// Canonical annotation spelling, used in error messages and `describe`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ty::Prim { id, .. } => f.write_str(id.name()),
            Ty::Null => f.write_str("none"),
            Ty::Bytes => f.write_str("bytes"),
            Ty::Any => f.write_str("any"),
            Ty::OneOf(variants) => {
                for (i, v) in variants.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{v}")?;
                }
                Ok(())
            }
            Ty::List(elem) => write!(f, "list<{elem}>"),
            Ty::Set(elem) => write!(f, "set<{elem}>"),
            Ty::Dict { key, value } => write!(f, "dict<{key}, {value}>"),
            Ty::Tuple { elems, splat } => {
                f.write_str("tuple<")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{e}")?;
                }
                if *splat {
                    f.write_str(", ...")?;
                }
                f.write_str(">")
            }
        }
    }
}

// ------------------------------- Dialect ---------------------------------- //

/// Which union spellings the resolver recognizes. Pinned per process from
/// `ARGCAST_ANNOT_DIALECT` on first use, never mutated afterwards, so
/// resolution is safe to run concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Classic spellings only (`union<...>`, `option<...>`).
    Legacy,
    /// Classic spellings plus the `a | b` pipe sugar.
    Modern,
}

impl Dialect {
    pub fn pipe_unions(self) -> bool {
        matches!(self, Dialect::Modern)
    }

    fn name(self) -> &'static str {
        match self {
            Dialect::Legacy => "legacy",
            Dialect::Modern => "modern",
        }
    }
}

static DIALECT: Lazy<Dialect> = Lazy::new(|| {
    match std::env::var("ARGCAST_ANNOT_DIALECT").as_deref() {
        Ok("legacy") => Dialect::Legacy,
        _ => Dialect::Modern,
    }
});

pub fn dialect() -> Dialect {
    *DIALECT
}

// ------------------------------- Resolver --------------------------------- //

/// Resolve an annotation under the process dialect.
pub fn resolve(annot: &str) -> Result<Ty, ResolveError> {
    resolve_in(dialect(), annot)
}

pub fn resolve_in(dialect: Dialect, annot: &str) -> Result<Ty, ResolveError> {
    let annot = annot.trim();
    if annot.is_empty() {
        return Err(ResolveError::Empty);
    }

    // pipe sugar first: `a | b | c` at bracket depth 0
    let parts = split_top(annot, '|')?;
    if parts.len() > 1 {
        if !dialect.pipe_unions() {
            return Err(ResolveError::PipeDisabled {
                spelling: annot.to_string(),
                dialect: dialect.name(),
            });
        }
        let mut variants = Vec::new();
        for part in parts {
            push_variant(&mut variants, resolve_in(dialect, part)?);
        }
        return Ok(Ty::OneOf(variants));
    }

    let (name, params) = match annot.find('<') {
        Some(open) => {
            let inner = annot[open..]
                .strip_prefix('<')
                .and_then(|rest| rest.strip_suffix('>'))
                .ok_or_else(|| ResolveError::Unbalanced(annot.to_string()))?;
            (annot[..open].trim(), Some(inner))
        }
        None => (annot, None),
    };

    match name.to_ascii_lowercase().as_str() {
        "int" | "integer" => Ok(Ty::prim(PrimId::Int)),
        "float" => Ok(Ty::prim(PrimId::Float)),
        "str" | "string" => Ok(Ty::prim(PrimId::Str)),
        "bool" => Ok(Ty::prim(PrimId::Bool)),
        "datetime" | "timestamp" => Ok(Ty::prim(PrimId::DateTime)),
        "date" => Ok(Ty::prim(PrimId::Date)),
        "bytes" => Ok(Ty::Bytes),
        "none" | "null" => Ok(Ty::Null),
        "any" | "_" => Ok(Ty::Any),
        "list" | "vec" => one_param(dialect, "list", params).map(|e| Ty::List(Box::new(e))),
        "set" => one_param(dialect, "set", params).map(|e| Ty::Set(Box::new(e))),
        "dict" | "map" => match params {
            None => Ok(Ty::Dict {
                key: Box::new(Ty::Any),
                value: Box::new(Ty::Any),
            }),
            Some(inner) => {
                let parts = split_top(inner, ',')?;
                if parts.len() != 2 {
                    return Err(ResolveError::ParamCount {
                        name: "dict".to_string(),
                        expected: 2,
                        spelling: annot.to_string(),
                    });
                }
                Ok(Ty::Dict {
                    key: Box::new(resolve_in(dialect, parts[0])?),
                    value: Box::new(resolve_in(dialect, parts[1])?),
                })
            }
        },
        "tuple" => tuple_params(dialect, annot, params),
        "option" | "optional" => {
            let inner = one_param(dialect, "option", params)?;
            let mut variants = Vec::new();
            push_variant(&mut variants, inner);
            push_variant(&mut variants, Ty::Null);
            Ok(Ty::OneOf(variants))
        }
        "union" => {
            let Some(inner) = params else {
                return Err(ResolveError::EmptyUnion(annot.to_string()));
            };
            let mut variants = Vec::new();
            for part in split_top(inner, ',')? {
                push_variant(&mut variants, resolve_in(dialect, part)?);
            }
            Ok(Ty::OneOf(variants))
        }
        // unrecognized names pass tokens through as opaque literals
        _ => Ok(Ty::Any),
    }
}

fn one_param(
    dialect: Dialect,
    name: &str,
    params: Option<&str>,
) -> Result<Ty, ResolveError> {
    let Some(inner) = params else {
        // bare container spelling: children default to pass-through
        return Ok(Ty::Any);
    };
    let parts = split_top(inner, ',')?;
    if parts.len() != 1 {
        return Err(ResolveError::ParamCount {
            name: name.to_string(),
            expected: 1,
            spelling: inner.to_string(),
        });
    }
    resolve_in(dialect, parts[0])
}

fn tuple_params(
    dialect: Dialect,
    annot: &str,
    params: Option<&str>,
) -> Result<Ty, ResolveError> {
    let Some(inner) = params else {
        // bare `tuple` accepts any arity of anything
        return Ok(Ty::Tuple {
            elems: vec![Ty::Any],
            splat: true,
        });
    };
    let parts = split_top(inner, ',')?;
    let mut elems = Vec::new();
    let mut splat = false;
    for (i, part) in parts.iter().enumerate() {
        if part.trim() == "..." {
            if i + 1 != parts.len() {
                return Err(ResolveError::BadSplat(annot.to_string()));
            }
            splat = true;
        } else {
            elems.push(resolve_in(dialect, part)?);
        }
    }
    if splat && elems.len() != 1 {
        return Err(ResolveError::BadSplat(annot.to_string()));
    }
    Ok(Ty::Tuple { elems, splat })
}

/// Append a resolved variant, flattening nested unions and keeping a single
/// absence marker.
fn push_variant(acc: &mut Vec<Ty>, ty: Ty) {
    match ty {
        Ty::OneOf(inner) => {
            for v in inner {
                push_variant(acc, v);
            }
        }
        Ty::Null if acc.contains(&Ty::Null) => {}
        other => acc.push(other),
    }
}

/// Split at `sep` outside angle brackets, erroring on unbalanced input.
fn split_top(s: &str, sep: char) -> Result<Vec<&str>, ResolveError> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth < 0 {
                    return Err(ResolveError::Unbalanced(s.to_string()));
                }
            }
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ResolveError::Unbalanced(s.to_string()));
    }
    parts.push(&s[start..]);
    Ok(parts)
}

// ------------------------------- Tests ------------------------------------ //
