//! argcast — type-directed parsing of command-line argument tokens.
//!
//! A raw token plus an optional type annotation becomes a typed value: the
//! resolver turns the annotation into an immutable descriptor tree once per
//! parameter, the typed converter walks descriptor and token together, and
//! a token without a usable annotation falls back to the restricted literal
//! grammar (with the whole token as an opaque string when even that fails).
//!
//! Everything is synchronous and side-effect free apart from one read-once
//! process-wide annotation dialect, so conversion can run concurrently
//! across independent tokens.

pub mod cli;
pub mod convert;
pub mod descriptor;
pub mod error;
pub mod literal;
pub mod value;

pub use convert::{convert_parsed, convert_token, Outcome};
pub use descriptor::{resolve, Conv, Dialect, PrimId, Ty};
pub use error::{ConvertError, FailureKind, ResolveError};
pub use literal::{parse_literal, parse_loose, Literal};
pub use value::Value;

/// Per-argument dispatch: a declared descriptor drives the typed converter;
/// without one the literal fallback applies, which cannot fail.
pub fn convert_arg(ty: Option<&Ty>, raw: &str) -> Outcome {
    match ty {
        Some(ty) => convert::convert_token(ty, raw),
        None => Ok(literal::parse_loose(raw).into()),
    }
}
