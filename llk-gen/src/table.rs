// Initial LL(1) parse table with conflict cells.

use crate::analysis::{Sets, expand_any};
use crate::{BuildConfig, Grammar, NodeId};
use llk::{END, TokenId};

/// A table cell before conflict resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Production(NodeId),
    /// Index into [`ParseTable::conflicts`].
    Conflict(usize),
}

/// Candidates competing for one cell. Lives only until the lookahead-DFA
/// builder has resolved it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConflictNode {
    pub symbol: usize,
    pub token: TokenId,
    /// Candidate productions in order of appearance.
    pub candidates: Vec<NodeId>,
    /// Largest lookahead override among the candidates, if any.
    pub lookahead: Option<usize>,
}

impl ConflictNode {
    /// Lookahead budget for this conflict.
    pub fn limit(&self, config: &BuildConfig) -> usize {
        self.lookahead
            .map_or(config.lookahead, |k| k.min(config.lookahead))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseTable {
    n_tokens: usize,
    cells: Vec<Cell>,
    pub conflicts: Vec<ConflictNode>,
}

impl ParseTable {
    pub fn cell(&self, symbol: usize, token: TokenId) -> Cell {
        self.cells
            .get(symbol * self.n_tokens + token)
            .copied()
            .unwrap_or(Cell::Empty)
    }

    fn insert(&mut self, grammar: &Grammar, symbol: usize, token: TokenId, production: NodeId) {
        let idx = symbol * self.n_tokens + token;
        match self.cells[idx] {
            Cell::Empty => self.cells[idx] = Cell::Production(production),
            Cell::Production(p) if p == production => {}
            Cell::Production(p) => {
                let c = ConflictNode {
                    symbol,
                    token,
                    candidates: vec![p, production],
                    lookahead: None,
                };
                self.conflicts.push(c);
                self.cells[idx] = Cell::Conflict(self.conflicts.len() - 1);
                log::trace!(
                    "conflict {},{}: {} | {}",
                    grammar.symbol(symbol).name,
                    grammar.token_name(token),
                    grammar.describe(p),
                    grammar.describe(production)
                );
            }
            Cell::Conflict(c) => {
                let candidates = &mut self.conflicts[c].candidates;
                if !candidates.contains(&production) {
                    candidates.push(production);
                }
            }
        }
    }
}

/// Fills the table from the analysis. Colliding productions become
/// conflicts; wildcard productions compete for every concrete token.
pub fn fill(grammar: &Grammar, sets: &Sets) -> ParseTable {
    let n_tokens = grammar.n_tokens();
    let mut table = ParseTable {
        n_tokens,
        cells: vec![Cell::Empty; grammar.n_symbols() * n_tokens],
        conflicts: Vec::new(),
    };
    for (s, symbol) in grammar.symbols().iter().enumerate() {
        let node = NodeId::Symbol(s);
        for &alt in &symbol.alts {
            let mut tokens = expand_any(sets.first(grammar, alt), n_tokens);
            if sets.nullable(grammar, alt) {
                tokens.extend(expand_any(sets.follow(grammar, node), n_tokens));
                if sets.is_final(grammar, node) {
                    tokens.push(END);
                }
            }
            tokens.sort_unstable();
            tokens.dedup();
            for t in tokens {
                table.insert(grammar, s, t, alt);
            }
        }
    }

    for c in table.conflicts.iter_mut() {
        let own = grammar.symbol(c.symbol).lookahead;
        c.lookahead = c
            .candidates
            .iter()
            .map(|&p| match p {
                NodeId::Symbol(s) => grammar.symbol(s).lookahead.or(own),
                _ => own,
            })
            .max()
            .flatten();
    }
    log::debug!(
        "parse table {}x{}, {} conflicts",
        grammar.n_symbols(),
        n_tokens,
        table.conflicts.len()
    );
    table
}
