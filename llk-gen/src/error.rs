//! Build-time error type.

use llk::Position;
use smartstring::alias::String;
use thiserror::Error;

/// Errors reported while collecting a grammar or building its tables.
///
/// Every variant is fatal to the build: no partially resolved table is
/// ever returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("no start symbol")]
    NoStart,

    #[error("symbol {symbol} has no productions{}", at(.pos))]
    NoProductions {
        symbol: String,
        pos: Option<Position>,
    },

    #[error("{node} is not a symbol")]
    NotASymbol { node: String },

    #[error("symbol {symbol} is {}nullable but declared otherwise{}", not(.nullable), at(.pos))]
    NullabilityMismatch {
        symbol: String,
        nullable: bool,
        pos: Option<Position>,
    },

    #[error("sync on non-nullable symbol {symbol}{}", at(.pos))]
    SyncOnNonNullable {
        symbol: String,
        pos: Option<Position>,
    },

    #[error("conflicting specifiers on {symbol}: {reason}{}", at(.pos))]
    ConflictingSpecifiers {
        symbol: String,
        reason: String,
        pos: Option<Position>,
    },

    #[error("resolver of {symbol} is never used{}", at(.pos))]
    UnusedResolver {
        symbol: String,
        pos: Option<Position>,
    },

    /// No decision within the lookahead limit. `path` is one token sequence
    /// on which the candidates cannot be told apart.
    #[error("{symbol} is ambiguous on `{path}` between {}{}", .productions.join(" | "), at(.pos))]
    Ambiguity {
        symbol: String,
        path: String,
        productions: Vec<String>,
        pos: Option<Position>,
    },

    #[error("conflict depth {depth} exceeded while resolving {symbol} on {token} (likely left recursion){}", at(.pos))]
    ConflictDepth {
        symbol: String,
        token: String,
        depth: usize,
        pos: Option<Position>,
    },

    #[error("expansion limit exceeded while resolving {symbol} on {token} (likely left recursion){}", at(.pos))]
    ExpansionLimit {
        symbol: String,
        token: String,
        pos: Option<Position>,
    },

    #[error("conflict on {symbol}, {token} left unresolved")]
    UnresolvedConflict { symbol: String, token: String },
}

fn not(nullable: &bool) -> &'static str {
    if *nullable { "" } else { "not " }
}

fn at(pos: &Option<Position>) -> String {
    match pos {
        Some(p) => format!(" at {p}").as_str().into(),
        None => String::new(),
    }
}
