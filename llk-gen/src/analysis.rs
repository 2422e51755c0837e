// FIRST/FOLLOW computation over the grammar node graph.

use crate::{BuildError, Grammar, NodeId};
use fixedbitset::FixedBitSet;
use llk::{ANY, END, TokenId};

/// Materialized analysis results, indexed by master index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sets {
    pub first: Vec<Vec<TokenId>>,
    pub follow: Vec<Vec<TokenId>>,
    pub nullable: Vec<bool>,
    /// The node can end the input (end-of-input may follow it).
    pub fin: Vec<bool>,
}

impl Sets {
    pub fn first(&self, grammar: &Grammar, node: NodeId) -> &[TokenId] {
        &self.first[grammar.master(node)]
    }

    pub fn follow(&self, grammar: &Grammar, node: NodeId) -> &[TokenId] {
        &self.follow[grammar.master(node)]
    }

    pub fn nullable(&self, grammar: &Grammar, node: NodeId) -> bool {
        self.nullable[grammar.master(node)]
    }

    pub fn is_final(&self, grammar: &Grammar, node: NodeId) -> bool {
        self.fin[grammar.master(node)]
    }
}

/// Merges `src` into `dst` and reports whether `dst` grew.
fn merge(dst: &mut FixedBitSet, src: &FixedBitSet) -> bool {
    let before = dst.count_ones(..);
    dst.union_with(src);
    dst.count_ones(..) != before
}

fn raise(flag: &mut bool, value: bool) -> bool {
    if value && !*flag {
        *flag = true;
        true
    } else {
        false
    }
}

/// Runs the FIRST/FOLLOW fixed point and materializes the result.
///
/// The start symbol is final. Resolver roots get no extra context: what
/// follows a resolver match is never inspected, and the runtime covers a
/// miss at the tail of a resolver with the symbol's empty alternative.
pub fn analyze(grammar: &Grammar) -> Sets {
    let n_nodes = grammar.n_nodes();
    let n_tokens = grammar.n_tokens();
    let mut first = vec![FixedBitSet::with_capacity(n_tokens); n_nodes];
    let mut follow = vec![FixedBitSet::with_capacity(n_tokens); n_nodes];
    let mut nullable = vec![false; n_nodes];
    let mut fin = vec![false; n_nodes];

    for node in grammar.nodes() {
        let m = grammar.master(node);
        match node {
            NodeId::Token(t) => first[m].insert(t),
            _ if node.is_transparent() => nullable[m] = true,
            _ => {}
        }
    }
    fin[grammar.master(NodeId::Symbol(grammar.start()))] = true;

    let mut rounds = 0;
    let mut changed = true;
    while changed {
        changed = false;
        rounds += 1;
        for (i, s) in grammar.symbols().iter().enumerate() {
            let m = grammar.master(NodeId::Symbol(i));
            for &alt in &s.alts {
                let a = grammar.master(alt);
                let src = first[a].clone();
                changed |= merge(&mut first[m], &src);
                let alt_nullable = nullable[a];
                changed |= raise(&mut nullable[m], alt_nullable);
                let src = follow[m].clone();
                changed |= merge(&mut follow[a], &src);
                let sym_fin = fin[m];
                changed |= raise(&mut fin[a], sym_fin);
            }
        }
        for q in 0..grammar.n_sequences() {
            let m = grammar.master(NodeId::Sequence(q));
            let children: Vec<usize> = grammar
                .sequence(q)
                .iter()
                .map(|&c| grammar.master(c))
                .collect();

            let mut all_nullable = true;
            for &c in &children {
                let src = first[c].clone();
                changed |= merge(&mut first[m], &src);
                if !nullable[c] {
                    all_nullable = false;
                    break;
                }
            }
            changed |= raise(&mut nullable[m], all_nullable);

            let mut trailing = follow[m].clone();
            let mut trailing_fin = fin[m];
            for &c in children.iter().rev() {
                changed |= merge(&mut follow[c], &trailing);
                changed |= raise(&mut fin[c], trailing_fin);
                if nullable[c] {
                    trailing.union_with(&first[c]);
                } else {
                    trailing = first[c].clone();
                    trailing_fin = false;
                }
            }
        }
    }
    log::debug!("FIRST/FOLLOW fixed point after {rounds} rounds");

    let materialize = |sets: Vec<FixedBitSet>| -> Vec<Vec<TokenId>> {
        sets.iter().map(|s| s.ones().collect()).collect()
    };
    Sets {
        first: materialize(first),
        follow: materialize(follow),
        nullable,
        fin,
    }
}

/// Checks declared nullability and `sync` pragmas against the analysis.
pub fn validate(grammar: &Grammar, sets: &Sets) -> Result<(), BuildError> {
    for (i, s) in grammar.symbols().iter().enumerate() {
        let node = NodeId::Symbol(i);
        let nullable = sets.nullable(grammar, node);
        if s.nullable.is_some_and(|declared| declared != nullable) {
            return Err(BuildError::NullabilityMismatch {
                symbol: s.name.clone(),
                nullable,
                pos: grammar.position(node),
            });
        }
        if s.sync && !nullable {
            return Err(BuildError::SyncOnNonNullable {
                symbol: s.name.clone(),
                pos: grammar.position(node),
            });
        }
    }
    Ok(())
}

/// Concrete tokens a set of terminals stands for: the wildcard expands to
/// every terminal except `$end` and itself.
pub fn expand_any(tokens: &[TokenId], n_tokens: usize) -> Vec<TokenId> {
    if tokens.contains(&ANY) {
        let mut out: Vec<TokenId> = tokens.iter().copied().filter(|&t| t == END).collect();
        out.extend(2..n_tokens);
        out
    } else {
        tokens.to_vec()
    }
}
