//! Copyright (c) 2005–2025 IKH Software, Inc.
//!
//! Released under the terms of the GNU Lesser General Public License, version 3.0
//! or (at your option) any later version (LGPL-3.0-or-later).
//!
//! LL(k) parser table generator.
//!
//! A grammar is collected with [`GrammarBuilder`] and turned into [`Tables`]
//! by [`build`]. The tables implement [`llk::ParserData`] and drive the
//! push-style [`llk::Parser`] directly.
//!
//! The build runs in three steps:
//!  * FIRST/FOLLOW analysis and validation of nullability pragmas,
//!  * an LL(1) parse table in which colliding productions become conflicts,
//!  * lookahead-DFA construction for every conflict, including wildcard
//!    elimination and resolver chains.
//!
//! Any unresolved conflict aborts the build with a [`BuildError`].

mod analysis;
mod config;
mod error;
mod grammar;
mod ladfa;
mod symtab;
mod table;
mod tables;
pub mod write;

pub use config::BuildConfig;
pub use error::BuildError;
pub use grammar::{Grammar, GrammarBuilder, NodeId, Resolver, SymbolNode};
pub use ladfa::{Else, LaDfaNode};
pub use symtab::Symtab;
pub use tables::{TableNode, Tables, build};
