//! Runtime error type.
//!
//! Every failed parse surfaces as a [`ParseError`]. Syntax errors carry the
//! offending token's name and span together with the terminals that would
//! have been accepted at that point; semantic errors carry the message of the
//! failing callback.

use crate::Span;
use smartstring::alias::String;
use thiserror::Error;

/// Errors reported by [`Parser`](crate::Parser).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The current token is not acceptable here.
    #[error("unexpected {found} at {span:?}, expected {}", list(.expected))]
    UnexpectedToken {
        /// Name of the token that was fed.
        found: String,
        /// Names of the tokens that would have been accepted.
        expected: Vec<String>,
        /// Span of the offending token.
        span: Option<Span>,
    },

    /// Every alternative of a resolver chain failed.
    #[error("no viable alternative for {symbol} at {found} ({span:?})")]
    NoViableAlternative {
        /// Name of the symbol whose decision failed.
        symbol: String,
        /// Name of the token where the decision started.
        found: String,
        span: Option<Span>,
    },

    /// An `action`, `argument`, `enter` or `leave` callback failed.
    #[error("semantic error at {span:?}: {message}")]
    Semantic { message: String, span: Option<Span> },

    /// `feed_token` was called before `start_parse`.
    #[error("parser not started")]
    NotStarted,

    /// `feed_token` was called after the parse completed or failed.
    #[error("parse already finished")]
    Finished,
}

fn list(names: &[String]) -> String {
    match names {
        [] => "nothing".into(),
        [one] => one.clone(),
        [init @ .., last] => {
            let mut s = String::new();
            for (i, name) in init.iter().enumerate() {
                if i > 0 {
                    s.push_str(", ");
                }
                s.push_str(name);
            }
            s.push_str(" or ");
            s.push_str(last);
            s
        }
    }
}
