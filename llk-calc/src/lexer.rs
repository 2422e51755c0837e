//! # Calculator Lexer
//!
//! Wraps a `logos` lexer and turns its lexemes into [`CalcToken`]s carrying
//! the terminal indices of the calculator tables and 0-based line/column
//! spans.

use crate::{CalcError, CalcToken, Lexeme, TokenValue};
use llk::{Position, Span, TokenId};
use llk_gen::Tables;
use logos::Logos;

/// Terminal index of every [`Lexeme`] in a particular set of tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenMap {
    ids: [TokenId; Lexeme::COUNT],
}

impl TokenMap {
    pub fn new(tables: &Tables) -> Result<Self, CalcError> {
        let mut ids = [0; Lexeme::COUNT];
        for (slot, lexeme) in ids.iter_mut().zip(Lexeme::ALL) {
            *slot = tables
                .token(lexeme.name())
                .ok_or(CalcError::Internal("lexeme missing from the grammar"))?;
        }
        Ok(Self { ids })
    }

    pub fn id(&self, lexeme: Lexeme) -> TokenId {
        self.ids[lexeme as usize]
    }
}

/// Iterator over the tokens of a source string.
pub struct CalcLexer<'s> {
    inner: logos::Lexer<'s, Lexeme>,
    map: TokenMap,
    /// Byte offset of the start of every line.
    lines: Vec<usize>,
}

impl<'s> CalcLexer<'s> {
    pub fn new(source: &'s str, map: TokenMap) -> Self {
        let lines = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            inner: Lexeme::lexer(source),
            map,
            lines,
        }
    }

    fn locate(&self, offset: usize) -> Position {
        let line = self.lines.partition_point(|&start| start <= offset) - 1;
        let start = self.lines[line];
        let column = self.inner.source()[start..offset].chars().count();
        Position::new(line, column)
    }

    /// Span of the end of input, for the final end token.
    pub fn end_span(&self) -> Option<Span> {
        let end = self.locate(self.inner.source().len());
        Some(Span::new(end, end))
    }
}

impl Iterator for CalcLexer<'_> {
    type Item = Result<CalcToken, CalcError>;

    fn next(&mut self) -> Option<Self::Item> {
        let lexeme = self.inner.next()?;
        let range = self.inner.span();
        let span = Some(Span::new(
            self.locate(range.start),
            self.locate(range.end),
        ));
        let text = self.inner.slice();
        let Ok(lexeme) = lexeme else {
            return Some(Err(CalcError::Lex {
                text: text.into(),
                span,
            }));
        };
        let value = match lexeme {
            Lexeme::Ident => TokenValue::Ident(text.into()),
            Lexeme::Number => match text.parse() {
                Ok(n) => TokenValue::Number(n),
                Err(e) => return Some(Err(e.into())),
            },
            _ => TokenValue::None,
        };
        log::trace!("lexeme {:?} {:?} at {:?}", lexeme, text, span);
        Some(Ok(CalcToken {
            token_id: self.map.id(lexeme),
            value,
            span,
        }))
    }
}
