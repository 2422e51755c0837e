//! Tokens and the retained token window shared by the main cursor and the
//! resolver cursors.

use crate::Span;
use std::collections::VecDeque;
use std::fmt::Debug;

/// Index of a terminal in the grammar's token alphabet.
pub type TokenId = usize;

/// Reserved terminal: end of input.
pub const END: TokenId = 0;

/// Reserved terminal: wildcard matching any concrete token except [`END`].
pub const ANY: TokenId = 1;

/// A lexical token as seen by the runtime.
///
/// The host lexer produces these; the runtime only inspects the terminal
/// index and carries the value around for callbacks, locators and the AST.
pub trait Token: Clone + Debug {
    /// Returns the terminal index of this token.
    fn token_id(&self) -> TokenId;

    /// Returns the source span of this token, if known.
    fn span(&self) -> Option<Span> {
        None
    }
}

/// Tokens fed by the caller and not yet released.
///
/// Positions are absolute: the first token ever pushed has position `0`.
/// Tokens are removed only through [`TokenBuffer::release`], which the
/// parser calls with the lowest position any cursor may still rewind to.
#[derive(Debug, Clone)]
pub struct TokenBuffer<T> {
    tokens: VecDeque<T>,
    base: usize,
}

impl<T> Default for TokenBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TokenBuffer<T> {
    pub fn new() -> Self {
        Self {
            tokens: VecDeque::new(),
            base: 0,
        }
    }

    /// Appends a token and returns its absolute position.
    pub fn push(&mut self, token: T) -> usize {
        self.tokens.push_back(token);
        self.end() - 1
    }

    /// Returns the token at absolute position `pos`, if it is still retained
    /// and has been fed.
    pub fn get(&self, pos: usize) -> Option<&T> {
        pos.checked_sub(self.base)
            .and_then(|offset| self.tokens.get(offset))
    }

    /// Absolute position of the oldest retained token.
    pub fn base(&self) -> usize {
        self.base
    }

    /// Absolute position one past the newest token.
    pub fn end(&self) -> usize {
        self.base + self.tokens.len()
    }

    /// Number of retained tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Drops every token whose position is below `low`.
    pub fn release(&mut self, low: usize) {
        while self.base < low && !self.tokens.is_empty() {
            self.tokens.pop_front();
            self.base += 1;
        }
    }

    /// Forgets all tokens and restarts positions at zero.
    pub fn clear(&mut self) {
        self.tokens.clear();
        self.base = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_survive_release() {
        let mut buf = TokenBuffer::new();
        for c in ['a', 'b', 'c', 'd'] {
            buf.push(c);
        }
        assert_eq!(buf.end(), 4);
        buf.release(2);
        assert_eq!(buf.base(), 2);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.get(1), None);
        assert_eq!(buf.get(2), Some(&'c'));
        assert_eq!(buf.get(3), Some(&'d'));
        assert_eq!(buf.get(4), None);
        assert_eq!(buf.push('e'), 4);
    }

    #[test]
    fn release_never_passes_the_end() {
        let mut buf = TokenBuffer::new();
        buf.push(1u8);
        buf.release(10);
        assert!(buf.is_empty());
        assert_eq!(buf.base(), 1);
        assert_eq!(buf.push(2), 1);
    }
}
