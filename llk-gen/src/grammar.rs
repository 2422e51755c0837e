//! Grammar model and the collect phase that produces it.
//!
//! Nodes are addressed by typed [`NodeId`] handles carrying their local index
//! (position within their kind's table). [`GrammarBuilder::finish`] freezes
//! the collected model into a [`Grammar`], which also assigns every node its
//! master index: tokens first, then epsilon, symbols, sequences, actions,
//! arguments and beacons. Lookahead-DFA nodes are numbered after all of them
//! once conflicts are resolved.

use crate::{BuildError, Symtab};
use indexmap::IndexMap;
use llk::{ANY, END, Position, TokenId};
use smartstring::alias::String;

/// Handle of a grammar node: kind plus local index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Token(TokenId),
    Epsilon,
    Symbol(usize),
    Sequence(usize),
    Action(usize),
    Argument(usize),
    Beacon(usize),
}

impl NodeId {
    /// Nodes that never match input and are skipped during prediction.
    pub fn is_transparent(self) -> bool {
        matches!(
            self,
            NodeId::Epsilon | NodeId::Action(_) | NodeId::Argument(_) | NodeId::Beacon(_)
        )
    }
}

/// A semantic tiebreaker attached to a symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolver {
    /// Root of the resolver subgrammar.
    pub node: NodeId,
    pub priority: i32,
}

/// A nonterminal and its alternatives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolNode {
    pub name: String,
    pub alts: Vec<NodeId>,
    pub resolver: Option<Resolver>,
    /// Lookahead limit override.
    pub lookahead: Option<usize>,
    /// Declared nullability, checked against the computed one.
    pub nullable: Option<bool>,
    pub sync: bool,
    pub enter: bool,
    pub leave: bool,
}

impl SymbolNode {
    fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            alts: Vec::new(),
            resolver: None,
            lookahead: None,
            nullable: None,
            sync: false,
            enter: false,
            leave: false,
        }
    }
}

/// Collects a grammar.
///
/// Terminal `0` is `$end` and terminal `1` is `$any`, the wildcard. Specifier
/// errors are recorded and reported by [`GrammarBuilder::finish`].
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
    tokens: Symtab,
    symbol_names: Symtab,
    symbols: Vec<SymbolNode>,
    sequences: Vec<Vec<NodeId>>,
    actions: Symtab,
    arguments: Symtab,
    beacons: Symtab,
    start: Option<usize>,
    positions: IndexMap<NodeId, Position>,
    errors: Vec<BuildError>,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarBuilder {
    pub fn new() -> Self {
        let mut tokens = Symtab::new();
        tokens.add("$end");
        tokens.add("$any");
        Self {
            tokens,
            symbol_names: Symtab::new(),
            symbols: Vec::new(),
            sequences: Vec::new(),
            actions: Symtab::new(),
            arguments: Symtab::new(),
            beacons: Symtab::new(),
            start: None,
            positions: IndexMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn token(&mut self, name: &str) -> NodeId {
        NodeId::Token(self.tokens.add(name))
    }

    pub fn end(&self) -> NodeId {
        NodeId::Token(END)
    }

    pub fn any(&self) -> NodeId {
        NodeId::Token(ANY)
    }

    pub fn epsilon(&self) -> NodeId {
        NodeId::Epsilon
    }

    pub fn symbol(&mut self, name: &str) -> NodeId {
        let idx = self.symbol_names.add(name);
        if idx == self.symbols.len() {
            self.symbols.push(SymbolNode::new(name));
        }
        NodeId::Symbol(idx)
    }

    /// Concatenation of `items`. Nested sequences are spliced in and
    /// epsilons dropped; an empty result is epsilon and a single item is
    /// returned as is.
    pub fn seq(&mut self, items: impl IntoIterator<Item = NodeId>) -> NodeId {
        let mut children = Vec::new();
        for item in items {
            match item {
                NodeId::Sequence(q) => children.extend_from_slice(&self.sequences[q]),
                NodeId::Epsilon => {}
                item => children.push(item),
            }
        }
        match children.len() {
            0 => NodeId::Epsilon,
            1 => children[0],
            _ => {
                self.sequences.push(children);
                NodeId::Sequence(self.sequences.len() - 1)
            }
        }
    }

    pub fn action(&mut self, name: &str) -> NodeId {
        NodeId::Action(self.actions.add(name))
    }

    pub fn argument(&mut self, name: &str) -> NodeId {
        NodeId::Argument(self.arguments.add(name))
    }

    pub fn beacon(&mut self, name: &str) -> NodeId {
        NodeId::Beacon(self.beacons.add(name))
    }

    /// Appends `production` to the alternatives of `symbol`.
    pub fn alt(&mut self, symbol: NodeId, production: NodeId) -> &mut Self {
        self.update(symbol, |s| {
            s.alts.push(production);
            None
        })
    }

    pub fn resolver(&mut self, symbol: NodeId, resolver: NodeId, priority: i32) -> &mut Self {
        self.update(symbol, |s| {
            if s.resolver.is_some() {
                return Some("resolver given twice");
            }
            s.resolver = Some(Resolver {
                node: resolver,
                priority,
            });
            None
        })
    }

    pub fn lookahead(&mut self, symbol: NodeId, k: usize) -> &mut Self {
        self.update(symbol, |s| {
            if k == 0 {
                return Some("lookahead must be at least 1");
            }
            if s.lookahead.is_some_and(|old| old != k) {
                return Some("lookahead given twice");
            }
            s.lookahead = Some(k);
            None
        })
    }

    pub fn declare_nullable(&mut self, symbol: NodeId, nullable: bool) -> &mut Self {
        self.update(symbol, |s| {
            if s.nullable.is_some_and(|old| old != nullable) {
                return Some("declared both nullable and non-nullable");
            }
            s.nullable = Some(nullable);
            None
        })
    }

    pub fn sync(&mut self, symbol: NodeId) -> &mut Self {
        self.update(symbol, |s| {
            s.sync = true;
            None
        })
    }

    pub fn enter(&mut self, symbol: NodeId) -> &mut Self {
        self.update(symbol, |s| {
            s.enter = true;
            None
        })
    }

    pub fn leave(&mut self, symbol: NodeId) -> &mut Self {
        self.update(symbol, |s| {
            s.leave = true;
            None
        })
    }

    pub fn start(&mut self, symbol: NodeId) -> &mut Self {
        match symbol {
            NodeId::Symbol(s) => self.start = Some(s),
            other => self.errors.push(BuildError::NotASymbol {
                node: format!("{other:?}").as_str().into(),
            }),
        }
        self
    }

    /// Records the source position of `node` for diagnostics.
    pub fn position(&mut self, node: NodeId, pos: Position) -> &mut Self {
        self.positions.insert(node, pos);
        self
    }

    fn update(
        &mut self,
        symbol: NodeId,
        f: impl FnOnce(&mut SymbolNode) -> Option<&'static str>,
    ) -> &mut Self {
        match symbol {
            NodeId::Symbol(s) => {
                if let Some(reason) = f(&mut self.symbols[s]) {
                    self.errors.push(BuildError::ConflictingSpecifiers {
                        symbol: self.symbols[s].name.clone(),
                        reason: reason.into(),
                        pos: self.positions.get(&symbol).copied(),
                    });
                }
            }
            other => self.errors.push(BuildError::NotASymbol {
                node: format!("{other:?}").as_str().into(),
            }),
        }
        self
    }

    /// Freezes the collected grammar.
    pub fn finish(self) -> Result<Grammar, BuildError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }
        let start = self.start.ok_or(BuildError::NoStart)?;
        for (i, s) in self.symbols.iter().enumerate() {
            if s.alts.is_empty() {
                return Err(BuildError::NoProductions {
                    symbol: s.name.clone(),
                    pos: self.positions.get(&NodeId::Symbol(i)).copied(),
                });
            }
        }
        let grammar = Grammar {
            tokens: self.tokens,
            symbols: self.symbols,
            sequences: self.sequences,
            actions: self.actions,
            arguments: self.arguments,
            beacons: self.beacons,
            start,
            positions: self.positions,
        };
        log::debug!(
            "grammar: {} tokens, {} symbols, {} sequences, {} nodes",
            grammar.n_tokens(),
            grammar.n_symbols(),
            grammar.sequences.len(),
            grammar.n_nodes()
        );
        Ok(grammar)
    }
}

/// A frozen grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    tokens: Symtab,
    symbols: Vec<SymbolNode>,
    sequences: Vec<Vec<NodeId>>,
    actions: Symtab,
    arguments: Symtab,
    beacons: Symtab,
    start: usize,
    positions: IndexMap<NodeId, Position>,
}

impl Grammar {
    pub fn n_tokens(&self) -> usize {
        self.tokens.len()
    }

    pub fn n_symbols(&self) -> usize {
        self.symbols.len()
    }

    pub fn n_sequences(&self) -> usize {
        self.sequences.len()
    }

    /// Number of grammar nodes, i.e. the first master index free for
    /// lookahead-DFA nodes.
    pub fn n_nodes(&self) -> usize {
        self.beacon_base() + self.beacons.len()
    }

    pub fn tokens(&self) -> &Symtab {
        &self.tokens
    }

    pub fn actions(&self) -> &Symtab {
        &self.actions
    }

    pub fn arguments(&self) -> &Symtab {
        &self.arguments
    }

    pub fn beacons(&self) -> &Symtab {
        &self.beacons
    }

    pub fn token_name(&self, token: TokenId) -> &str {
        self.tokens.sym(token).unwrap_or("?")
    }

    pub fn symbols(&self) -> &[SymbolNode] {
        &self.symbols
    }

    pub fn symbol(&self, symbol: usize) -> &SymbolNode {
        &self.symbols[symbol]
    }

    pub fn sequence(&self, sequence: usize) -> &[NodeId] {
        &self.sequences[sequence]
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn position(&self, node: NodeId) -> Option<Position> {
        self.positions.get(&node).copied()
    }

    fn symbol_base(&self) -> usize {
        self.tokens.len() + 1
    }

    fn sequence_base(&self) -> usize {
        self.symbol_base() + self.symbols.len()
    }

    fn action_base(&self) -> usize {
        self.sequence_base() + self.sequences.len()
    }

    fn argument_base(&self) -> usize {
        self.action_base() + self.actions.len()
    }

    fn beacon_base(&self) -> usize {
        self.argument_base() + self.arguments.len()
    }

    /// Master index of `node`.
    pub fn master(&self, node: NodeId) -> usize {
        match node {
            NodeId::Token(t) => t,
            NodeId::Epsilon => self.tokens.len(),
            NodeId::Symbol(s) => self.symbol_base() + s,
            NodeId::Sequence(q) => self.sequence_base() + q,
            NodeId::Action(a) => self.action_base() + a,
            NodeId::Argument(a) => self.argument_base() + a,
            NodeId::Beacon(b) => self.beacon_base() + b,
        }
    }

    /// Inverse of [`Grammar::master`] over `0..n_nodes()`.
    pub fn node_at(&self, master: usize) -> Option<NodeId> {
        let node = if master < self.tokens.len() {
            NodeId::Token(master)
        } else if master < self.symbol_base() {
            NodeId::Epsilon
        } else if master < self.sequence_base() {
            NodeId::Symbol(master - self.symbol_base())
        } else if master < self.action_base() {
            NodeId::Sequence(master - self.sequence_base())
        } else if master < self.argument_base() {
            NodeId::Action(master - self.action_base())
        } else if master < self.beacon_base() {
            NodeId::Argument(master - self.argument_base())
        } else if master < self.n_nodes() {
            NodeId::Beacon(master - self.beacon_base())
        } else {
            return None;
        };
        Some(node)
    }

    /// All nodes in master order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.n_nodes()).filter_map(|m| self.node_at(m))
    }

    /// Human-readable rendering of a node for diagnostics.
    pub fn describe(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.describe_into(node, &mut out);
        out
    }

    fn describe_into(&self, node: NodeId, out: &mut String) {
        match node {
            NodeId::Token(t) => out.push_str(self.token_name(t)),
            NodeId::Epsilon => out.push('ε'),
            NodeId::Symbol(s) => out.push_str(&self.symbols[s].name),
            NodeId::Sequence(q) => {
                for (i, &child) in self.sequences[q].iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    self.describe_into(child, out);
                }
            }
            NodeId::Action(a) => {
                out.push('{');
                out.push_str(self.actions.sym(a).unwrap_or("?"));
                out.push('}');
            }
            NodeId::Argument(a) => {
                out.push('(');
                out.push_str(self.arguments.sym(a).unwrap_or("?"));
                out.push(')');
            }
            NodeId::Beacon(b) => {
                out.push('@');
                out.push_str(self.beacons.sym(b).unwrap_or("?"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_flattens_and_collapses() {
        let mut g = GrammarBuilder::new();
        let a = g.token("a");
        let b = g.token("b");
        let c = g.token("c");
        let eps = g.epsilon();
        let none: [NodeId; 0] = [];
        assert_eq!(g.seq(none), NodeId::Epsilon);
        assert_eq!(g.seq([a]), a);
        assert_eq!(g.seq([eps, a, eps]), a);
        let ab = g.seq([a, b]);
        let abc = g.seq([ab, c]);
        let s = g.symbol("S");
        g.alt(s, abc).start(s);
        let grammar = g.finish().unwrap();
        let NodeId::Sequence(q) = abc else {
            panic!("expected sequence");
        };
        assert_eq!(grammar.sequence(q), &[a, b, c]);
        assert_eq!(grammar.describe(abc).as_str(), "a b c");
    }

    #[test]
    fn master_order_groups_kinds() {
        let mut g = GrammarBuilder::new();
        let s = g.symbol("S");
        let act = g.action("go");
        let a = g.token("a");
        let at = g.beacon("x");
        let body = g.seq([at, a, act]);
        g.alt(s, body).start(s);
        let grammar = g.finish().unwrap();
        assert_eq!(grammar.n_tokens(), 3);
        assert_eq!(grammar.master(a), 2);
        assert_eq!(grammar.master(NodeId::Epsilon), 3);
        assert_eq!(grammar.master(s), 4);
        assert_eq!(grammar.master(body), 5);
        assert_eq!(grammar.master(act), 6);
        assert_eq!(grammar.master(at), 7);
        assert_eq!(grammar.n_nodes(), 8);
        for node in grammar.nodes() {
            assert_eq!(grammar.node_at(grammar.master(node)), Some(node));
        }
        assert_eq!(grammar.node_at(8), None);
        assert_eq!(grammar.describe(body).as_str(), "@x a {go}");
    }

    #[test]
    fn finish_reports_collect_errors() {
        let g = GrammarBuilder::new();
        assert_eq!(g.finish(), Err(BuildError::NoStart));

        let mut g = GrammarBuilder::new();
        let s = g.symbol("S");
        g.start(s);
        assert!(matches!(
            g.finish(),
            Err(BuildError::NoProductions { .. })
        ));

        let mut g = GrammarBuilder::new();
        let s = g.symbol("S");
        let a = g.token("a");
        g.alt(s, a).start(s).lookahead(s, 0);
        assert!(matches!(
            g.finish(),
            Err(BuildError::ConflictingSpecifiers { .. })
        ));

        let mut g = GrammarBuilder::new();
        let s = g.symbol("S");
        let a = g.token("a");
        g.alt(a, s).start(s);
        assert!(matches!(g.finish(), Err(BuildError::NotASymbol { .. })));
    }
}
