//! Concrete syntax tree built while parsing.
//!
//! Nodes live in a flat arena; symbol nodes keep the indices of their
//! children in input order. Only committed derivations are recorded: nothing
//! is added while a resolver is speculating.

use crate::{ParserData, SymbolId, Token};
use smartstring::alias::String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode<T> {
    Symbol { symbol: SymbolId, children: Vec<usize> },
    Token(T),
}

#[derive(Debug, Clone)]
pub struct Ast<T> {
    nodes: Vec<AstNode<T>>,
    roots: Vec<usize>,
    open: Vec<usize>,
}

impl<T> Default for Ast<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Ast<T> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            open: Vec::new(),
        }
    }

    fn attach(&mut self, node: AstNode<T>) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(node);
        match self.open.last() {
            Some(&parent) => {
                if let AstNode::Symbol { children, .. } = &mut self.nodes[parent] {
                    children.push(idx);
                }
            }
            None => self.roots.push(idx),
        }
        idx
    }

    /// Opens a node for `symbol` under the innermost open node.
    pub fn open(&mut self, symbol: SymbolId) -> usize {
        let idx = self.attach(AstNode::Symbol {
            symbol,
            children: Vec::new(),
        });
        self.open.push(idx);
        idx
    }

    /// Appends a token leaf under the innermost open node.
    pub fn token(&mut self, token: T) -> usize {
        self.attach(AstNode::Token(token))
    }

    /// Closes the innermost open node.
    pub fn close(&mut self) -> Option<usize> {
        self.open.pop()
    }

    /// Number of nodes currently open.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn node(&self, idx: usize) -> Option<&AstNode<T>> {
        self.nodes.get(idx)
    }

    pub fn nodes(&self) -> &[AstNode<T>] {
        &self.nodes
    }

    /// Top-level nodes, normally the single start-symbol node.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn root(&self) -> Option<usize> {
        self.roots.first().copied()
    }
}

impl<T: Token> Ast<T> {
    /// Renders the tree as an s-expression using the table's names,
    /// e.g. `(S a (B b))`.
    pub fn to_sexp<D: ParserData + ?Sized>(&self, data: &D) -> String {
        let mut out = String::new();
        for (i, &root) in self.roots.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            self.write_sexp(data, root, &mut out);
        }
        out
    }

    fn write_sexp<D: ParserData + ?Sized>(&self, data: &D, idx: usize, out: &mut String) {
        match &self.nodes[idx] {
            AstNode::Token(token) => out.push_str(data.token_name(token.token_id())),
            AstNode::Symbol { symbol, children } => {
                out.push('(');
                out.push_str(data.symbol_name(*symbol));
                for &child in children {
                    out.push(' ');
                    self.write_sexp(data, child, out);
                }
                out.push(')');
            }
        }
    }
}
