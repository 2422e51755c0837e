//! # llk-calc
//!
//! A small demonstration crate built on **llk**, providing a complete,
//! minimal example of a lexer–parser pipeline for a calculator language.
//!
//! The grammar is assembled with [`llk_gen::GrammarBuilder`], turned into
//! tables by [`llk_gen::build`] and driven token by token through
//! [`llk::Parser`]. Statements that begin with an identifier need two
//! tokens of lookahead (`x = ...` versus `x + ...`), which exercises the
//! lookahead-DFA path of the generator.
//!
//! ## Example
//!
//! ```rust
//! use llk_calc::{CalcParser, SymTab};
//! use llk_gen::BuildConfig;
//!
//! let calc = CalcParser::new(&BuildConfig::default()).unwrap();
//! let mut symtab = SymTab::new();
//! let values = calc.eval("a = 1 + 2 * 3; a - 1;", &mut symtab).unwrap();
//! assert_eq!(values, [7, 6]);
//! assert_eq!(symtab.get("a"), Some(7));
//! ```
//!
//! ## Modules
//!
//! - [`grammar`]: the calculator grammar and its semantic action ids
//! - [`lexer`]: `logos`-based tokenization with line/column spans
//! - [`parser`]: the evaluating driver and the [`CalcParser`] front end
//! - [`symtab`]: variable storage
//! - [`token`]: lexemes and the token type fed to the runtime
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod symtab;
pub mod token;

pub use error::CalcError;
pub use grammar::{Op, calc_grammar, calc_tables};
pub use lexer::{CalcLexer, TokenMap};
pub use parser::{CalcParser, CalcParserDriver};
pub use symtab::SymTab;
pub use token::{CalcToken, Lexeme, TokenValue};
