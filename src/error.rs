//! Failure values crossing the engine's boundaries.
//!
//! Every conversion failure travels as a value; nothing in the core panics
//! or throws past a component edge. The CLI is the only place a failure
//! becomes a user-visible error and a non-zero exit status.

use thiserror::Error;

/// Coarse classification of a conversion failure, for callers that dispatch
/// on the category rather than the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    SyntaxInvalid,
    NoVariantMatched,
    ArityMismatch,
    ConversionError,
    UnparsableTimestamp,
    UnsupportedType,
}

/// A failed token conversion: what kind of failure, the offending text, and
/// (when one exists) the target type spelling it was aimed at.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertError {
    #[error("invalid literal syntax in `{0}`")]
    Syntax(String),

    #[error("no variant of {target} matched `{offending}`")]
    NoVariant { offending: String, target: String },

    #[error("{target} expects {expected} elements, `{offending}` has {actual}")]
    Arity {
        offending: String,
        target: String,
        expected: usize,
        actual: usize,
    },

    #[error("cannot convert `{offending}` to {target}")]
    Conversion { offending: String, target: String },

    #[error("cannot parse `{0}` as date/datetime")]
    Timestamp(String),

    #[error("unsupported source `{offending}` for {target}")]
    Unsupported { offending: String, target: String },
}

impl ConvertError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ConvertError::Syntax(_) => FailureKind::SyntaxInvalid,
            ConvertError::NoVariant { .. } => FailureKind::NoVariantMatched,
            ConvertError::Arity { .. } => FailureKind::ArityMismatch,
            ConvertError::Conversion { .. } => FailureKind::ConversionError,
            ConvertError::Timestamp(_) => FailureKind::UnparsableTimestamp,
            ConvertError::Unsupported { .. } => FailureKind::UnsupportedType,
        }
    }

    /// The substring that failed to convert.
    pub fn offending(&self) -> &str {
        match self {
            ConvertError::Syntax(text) | ConvertError::Timestamp(text) => text,
            ConvertError::NoVariant { offending, .. }
            | ConvertError::Arity { offending, .. }
            | ConvertError::Conversion { offending, .. }
            | ConvertError::Unsupported { offending, .. } => offending,
        }
    }

    /// Canonical spelling of the target type, when the failure had one.
    pub fn target(&self) -> Option<&str> {
        match self {
            ConvertError::Syntax(_) | ConvertError::Timestamp(_) => None,
            ConvertError::NoVariant { target, .. }
            | ConvertError::Arity { target, .. }
            | ConvertError::Conversion { target, .. }
            | ConvertError::Unsupported { target, .. } => Some(target),
        }
    }
}

/// A type annotation the resolver could not turn into a descriptor.
/// Raised once per parameter, before any token is converted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("empty type annotation")]
    Empty,

    #[error("unbalanced angle brackets in `{0}`")]
    Unbalanced(String),

    #[error("union annotation needs at least one variant: `{0}`")]
    EmptyUnion(String),

    #[error("`...` is only valid after a single element type in a tuple: `{0}`")]
    BadSplat(String),

    #[error("{name} takes {expected} type parameter(s), got `{spelling}`")]
    ParamCount {
        name: String,
        expected: usize,
        spelling: String,
    },

    #[error("`|` unions are not recognized by the {dialect} annotation dialect: `{spelling}`")]
    PipeDisabled {
        spelling: String,
        dialect: &'static str,
    },
}
