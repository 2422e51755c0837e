//! # Calculator Error Type
//!
//! [`CalcError`] is the single error surface of the calculator pipeline. It
//! covers table construction, lexing, parsing and evaluation. Conversions
//! from the underlying error types are derived with `#[from]`, so `?` works
//! at every call site.
use llk::{ParseError, Span};
use llk_gen::BuildError;
use smartstring::alias::String;
use std::num::ParseIntError;
use thiserror::Error;

fn at(span: &Option<Span>) -> String {
    match span {
        Some(s) => format!(" at {}", s.start).as_str().into(),
        None => String::new(),
    }
}

/// Represents all possible errors that can occur within the calculator.
///
/// # Examples
/// ```rust
/// # use llk_calc::CalcError;
/// # fn demo(s: &str) -> Result<i64, CalcError> {
/// let n: i64 = s.parse()?; // ParseIntError -> CalcError via #[from]
/// # Ok(n) }
/// assert!(demo("12").is_ok());
/// assert!(matches!(demo("x"), Err(CalcError::ParseInt(_))));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalcError {
    /// The calculator grammar could not be turned into tables.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Syntax or lifecycle error reported by the runtime.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Integer literal out of range.
    #[error(transparent)]
    ParseInt(#[from] ParseIntError),

    #[error("unrecognized input `{text}`{}", at(.span))]
    Lex { text: String, span: Option<Span> },

    #[error("undefined variable {name}{}", at(.span))]
    UndefinedVariable { name: String, span: Option<Span> },

    #[error("division by zero{}", at(.span))]
    DivisionByZero { span: Option<Span> },

    #[error("arithmetic overflow{}", at(.span))]
    Overflow { span: Option<Span> },

    /// The grammar and the driver disagree; indicates a bug.
    #[error("internal error: {0}")]
    Internal(&'static str),
}
