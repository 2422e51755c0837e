//! # Calculator Tokens
//!
//! This module defines the lexemes recognized by the calculator and the
//! token type fed to the parser runtime:
//!
//! - [`Lexeme`]: the `logos` lexeme kinds, each with the terminal name used
//!   in the calculator grammar,
//! - [`TokenValue`]: the payload carried by a token,
//! - [`CalcToken`]: the token implementing [`llk::Token`].
use llk::{Span, Token, TokenId};
use logos::Logos;
use smartstring::alias::String;

/// Lexeme kinds. Whitespace and `#` line comments are skipped.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"#[^\n]*")]
pub enum Lexeme {
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[regex(r"[0-9]+")]
    Number,
    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(";")]
    Semi,
}

impl Lexeme {
    pub const COUNT: usize = 10;

    /// Every lexeme, in declaration order.
    pub const ALL: [Lexeme; Lexeme::COUNT] = [
        Lexeme::Ident,
        Lexeme::Number,
        Lexeme::Assign,
        Lexeme::Plus,
        Lexeme::Minus,
        Lexeme::Star,
        Lexeme::Slash,
        Lexeme::LParen,
        Lexeme::RParen,
        Lexeme::Semi,
    ];

    /// Terminal name in the calculator grammar.
    pub fn name(self) -> &'static str {
        match self {
            Lexeme::Ident => "ident",
            Lexeme::Number => "number",
            Lexeme::Assign => "=",
            Lexeme::Plus => "+",
            Lexeme::Minus => "-",
            Lexeme::Star => "*",
            Lexeme::Slash => "/",
            Lexeme::LParen => "(",
            Lexeme::RParen => ")",
            Lexeme::Semi => ";",
        }
    }
}

/// The payload carried by a lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenValue {
    /// No associated data (operators, punctuation, end of input).
    None,

    /// Identifier name.
    Ident(String),

    /// Integer literal.
    Number(i64),
}

/// A calculator token as fed to [`llk::Parser`].
///
/// # Example
/// ```rust
/// # use llk_calc::{CalcToken, TokenValue};
/// # use llk::{Token, span};
/// let tok = CalcToken {
///     token_id: 3,
///     value: TokenValue::Number(99),
///     span: span!(0, 0, 0, 2),
/// };
///
/// assert_eq!(tok.token_id(), 3);
/// assert_eq!(tok.span(), span!(0, 0, 0, 2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalcToken {
    /// Terminal index in the calculator tables.
    pub token_id: TokenId,
    pub value: TokenValue,
    pub span: Option<Span>,
}

impl Token for CalcToken {
    fn token_id(&self) -> TokenId {
        self.token_id
    }

    fn span(&self) -> Option<Span> {
        self.span
    }
}
