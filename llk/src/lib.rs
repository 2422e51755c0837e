//! Copyright (c) 2005–2025 IKH Software, Inc.
//!
//! Released under the terms of the GNU Lesser General Public License, version 3.0
//! or (at your option) any later version (LGPL-3.0-or-later).
//!
//! Runtime for LL(k) parsers generated by `llk-gen`.
//!
//! The parser is driven one token at a time: the host lexes, calls
//! [`Parser::feed_token`] and gets back [`Feed::Continue`], [`Feed::Done`] or
//! a [`ParseError`]. Decisions needing more than one token of lookahead go
//! through lookahead DFAs and, when the grammar asks for it, speculative
//! resolvers that are rolled back when they fail.

mod ast;
mod data;
mod error;
mod parser;
mod span;
mod token;

pub use crate::ast::{Ast, AstNode};
pub use crate::data::{Callbacks, DfaId, DfaState, DfaTarget, NodeIndex, ParserData, ParserNode, SymbolId};
pub use crate::error::ParseError;
pub use crate::parser::{Feed, Parser, ParserCtx, ParserDriver, ParserStats};
pub use crate::span::{Position, Span};
pub use crate::token::{ANY, END, Token, TokenBuffer, TokenId};
