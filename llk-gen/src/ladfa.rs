//! Lookahead-DFA construction.
//!
//! A conflict is resolved by simulating every candidate production as a
//! *thread* and stepping all threads one token at a time, breadth first,
//! until the surviving threads agree on a production. Each step produces a
//! build state with four buckets:
//!
//! * `active`: threads that matched the token and still have input to match,
//! * `redirected`: threads that reached a symbol carrying a resolver,
//! * `completed`: threads that matched the token and ran out of input,
//! * `epsilon`: threads that ran out of input without matching.
//!
//! Wildcard matches never tie with a concrete match or an epsilon completion:
//! such threads are dropped from the state. Resolver threads are turned into
//! an if/then/else chain by descending priority whose last `else` is the
//! decision made by the remaining threads.

use crate::grammar::Resolver;
use crate::table::{Cell, ConflictNode, ParseTable};
use crate::{BuildConfig, BuildError, Grammar, NodeId};
use llk::{ANY, END, TokenId};

/// Upper bound on node expansions per build state.
const EXPANSION_LIMIT: usize = 1 << 16;

/// A node of a finished lookahead DFA. Productions and resolvers are master
/// indices; DFA links are indices into the DFA array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LaDfaNode {
    Leaf {
        production: usize,
    },
    Internal {
        /// Sorted by token.
        transitions: Vec<(TokenId, usize)>,
        default: Option<usize>,
    },
    Resolver {
        resolver: usize,
        priority: i32,
        then: usize,
        otherwise: Option<Else>,
    },
}

/// The `else` branch of a resolver node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Else {
    Dfa(usize),
    Production(usize),
}

/// How a conflict was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// One token of lookahead plus thread elimination was enough.
    Production(NodeId),
    /// Root of the DFA deciding the conflict.
    Dfa(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Match {
    None,
    Concrete,
    Wildcard,
}

#[derive(Clone, Debug)]
struct Thread {
    production: NodeId,
    /// Candidate order, lower wins.
    order: usize,
    stack: Vec<NodeId>,
    matched: Match,
    resolver: Option<(usize, Resolver)>,
    forks: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Decision {
    /// Needs more lookahead.
    Open,
    Leaf(NodeId),
    /// Only resolver threads are left.
    Nothing,
}

#[derive(Debug)]
struct BuildState {
    active: Vec<Thread>,
    redirected: Vec<Thread>,
    completed: Vec<Thread>,
    epsilon: Vec<Thread>,
    token: Option<TokenId>,
    parent: Option<usize>,
    transitions: Vec<(TokenId, usize)>,
    decision: Decision,
}

impl BuildState {
    fn new() -> Self {
        Self {
            active: Vec::new(),
            redirected: Vec::new(),
            completed: Vec::new(),
            epsilon: Vec::new(),
            token: None,
            parent: None,
            transitions: Vec::new(),
            decision: Decision::Open,
        }
    }

    fn is_dead(&self) -> bool {
        self.active.is_empty()
            && self.redirected.is_empty()
            && self.completed.is_empty()
            && self.epsilon.is_empty()
    }

    /// Non-resolver threads, epsilon completions first.
    fn deciding(&self) -> impl Iterator<Item = &Thread> {
        self.epsilon
            .iter()
            .chain(&self.completed)
            .chain(&self.active)
    }

    fn eliminate_wildcards(&mut self) {
        let concrete = !self.epsilon.is_empty()
            || self
                .active
                .iter()
                .chain(&self.completed)
                .any(|t| t.matched == Match::Concrete);
        if concrete {
            self.active.retain(|t| t.matched != Match::Wildcard);
            self.completed.retain(|t| t.matched != Match::Wildcard);
        }
    }

    /// The production every non-resolver thread agrees on.
    fn resolved(&self) -> Option<NodeId> {
        let mut productions = self.deciding().map(|t| t.production);
        let first = productions.next()?;
        productions.all(|p| p == first).then_some(first)
    }

    /// Two different productions completed on the same token path. More
    /// lookahead cannot tell them apart.
    fn split(&self) -> bool {
        let distinct = |bucket: &[Thread]| {
            bucket
                .first()
                .is_some_and(|f| bucket.iter().any(|t| t.production != f.production))
        };
        distinct(self.completed.as_slice()) || distinct(self.epsilon.as_slice())
    }

    /// Production taken when no transition applies.
    fn default(&self) -> Option<NodeId> {
        self.epsilon
            .first()
            .or_else(|| self.completed.first())
            .map(|t| t.production)
    }
}

/// Resolves conflicts into lookahead DFAs.
pub struct LaDfaBuilder<'a> {
    grammar: &'a Grammar,
    table: &'a ParseTable,
    config: &'a BuildConfig,
    /// Per symbol: its resolver took part in some decision.
    used: Vec<bool>,
}

impl<'a> LaDfaBuilder<'a> {
    pub fn new(grammar: &'a Grammar, table: &'a ParseTable, config: &'a BuildConfig) -> Self {
        Self {
            grammar,
            table,
            config,
            used: vec![false; grammar.n_symbols()],
        }
    }

    /// Whether the resolver of `symbol` was used by any decision so far.
    pub fn resolver_used(&self, symbol: usize) -> bool {
        self.used[symbol]
    }

    /// Resolves one conflict, appending DFA nodes to `dfas` when more than a
    /// single token is needed.
    pub fn resolve(
        &mut self,
        conflict: &ConflictNode,
        dfas: &mut Vec<LaDfaNode>,
    ) -> Result<Resolution, BuildError> {
        let limit = conflict.limit(self.config);
        log::debug!(
            "resolving {} on {} ({} candidates, lookahead {})",
            self.grammar.symbol(conflict.symbol).name,
            self.grammar.token_name(conflict.token),
            conflict.candidates.len(),
            limit
        );

        let mut state0 = BuildState::new();
        state0.active = conflict
            .candidates
            .iter()
            .enumerate()
            .map(|(order, &production)| Thread {
                production,
                order,
                stack: vec![production],
                matched: Match::None,
                resolver: None,
                forks: 0,
            })
            .collect();
        let mut states = vec![state0];
        let mut frontier = vec![0];

        for depth in 1..=limit {
            let mut next = Vec::new();
            for &s in &frontier {
                let tokens: Vec<TokenId> = if depth == 1 {
                    vec![conflict.token]
                } else {
                    (0..self.grammar.n_tokens()).filter(|&t| t != ANY).collect()
                };
                for token in tokens {
                    let mut succ = self.step(&states[s], token, depth == 1, conflict)?;
                    if succ.is_dead() {
                        continue;
                    }
                    succ.eliminate_wildcards();
                    for bucket in [&mut succ.completed, &mut succ.epsilon] {
                        bucket.sort_by_key(|t| t.order);
                    }
                    let id = states.len();
                    succ.token = Some(token);
                    succ.parent = Some(s);
                    succ.decision = if succ.deciding().next().is_none() {
                        Decision::Nothing
                    } else if let Some(p) = succ.resolved() {
                        Decision::Leaf(p)
                    } else {
                        Decision::Open
                    };
                    let stuck = succ.decision == Decision::Open
                        && (succ.active.is_empty() || succ.split());
                    log::trace!(
                        "state {id} <- {s} on {}: active={} redirected={} completed={} epsilon={} {:?}",
                        self.grammar.token_name(token),
                        succ.active.len(),
                        succ.redirected.len(),
                        succ.completed.len(),
                        succ.epsilon.len(),
                        succ.decision
                    );
                    states.push(succ);
                    states[s].transitions.push((token, id));
                    if stuck {
                        return Err(self.ambiguity(conflict, &states, id));
                    }
                    if states[id].decision == Decision::Open {
                        next.push(id);
                    }
                }
            }
            frontier = next;
            if frontier.is_empty() {
                break;
            }
        }
        if let Some(&s) = frontier.first() {
            return Err(self.ambiguity(conflict, &states, s));
        }

        for state in &states {
            for t in &state.redirected {
                if let Some((symbol, _)) = t.resolver {
                    self.used[symbol] = true;
                }
            }
        }

        if let [(_, only)] = states[0].transitions.as_slice() {
            let state = &states[*only];
            if let (true, Decision::Leaf(p)) = (self.chain(state).is_empty(), state.decision) {
                log::debug!("resolved to {}", self.grammar.describe(p));
                return Ok(Resolution::Production(p));
            }
        }
        if states[0].transitions.is_empty() {
            return Err(BuildError::UnresolvedConflict {
                symbol: self.grammar.symbol(conflict.symbol).name.clone(),
                token: self.grammar.token_name(conflict.token).into(),
            });
        }

        let base = dfas.len();
        let mut nodes = Vec::new();
        self.materialize(&states, 0, None, base, &mut nodes);
        log::debug!("resolved with {} DFA nodes", nodes.len());
        dfas.extend(nodes);
        Ok(Resolution::Dfa(base))
    }

    /// Advances every active thread of `state` over `token`.
    fn step(
        &self,
        state: &BuildState,
        token: TokenId,
        first: bool,
        conflict: &ConflictNode,
    ) -> Result<BuildState, BuildError> {
        let mut succ = BuildState::new();
        let mut budget = EXPANSION_LIMIT;
        for thread in &state.active {
            let mut thread = thread.clone();
            thread.matched = Match::None;
            self.advance(thread, token, first, conflict, &mut succ, &mut budget)?;
        }
        Ok(succ)
    }

    fn advance(
        &self,
        thread: Thread,
        token: TokenId,
        first: bool,
        conflict: &ConflictNode,
        succ: &mut BuildState,
        budget: &mut usize,
    ) -> Result<(), BuildError> {
        let mut work = vec![thread];
        while let Some(mut th) = work.pop() {
            loop {
                if *budget == 0 {
                    return Err(BuildError::ExpansionLimit {
                        symbol: self.grammar.symbol(conflict.symbol).name.clone(),
                        token: self.grammar.token_name(conflict.token).into(),
                        pos: self.grammar.position(NodeId::Symbol(conflict.symbol)),
                    });
                }
                *budget -= 1;
                let Some(&top) = th.stack.last() else {
                    if th.matched == Match::None {
                        succ.epsilon.push(th);
                    } else {
                        succ.completed.push(th);
                    }
                    break;
                };
                match top {
                    NodeId::Token(expected) => {
                        if th.matched != Match::None {
                            succ.active.push(th);
                            break;
                        }
                        th.stack.pop();
                        th.matched = if expected == token {
                            Match::Concrete
                        } else if expected == ANY && token != END {
                            Match::Wildcard
                        } else {
                            break;
                        };
                    }
                    NodeId::Sequence(q) => {
                        th.stack.pop();
                        th.stack
                            .extend(self.grammar.sequence(q).iter().rev().copied());
                    }
                    NodeId::Symbol(s) => {
                        if th.matched != Match::None {
                            succ.active.push(th);
                            break;
                        }
                        if let (true, Some(r)) = (first, self.grammar.symbol(s).resolver) {
                            th.resolver = Some((s, r));
                            succ.redirected.push(th);
                            break;
                        }
                        th.stack.pop();
                        match self.table.cell(s, token) {
                            Cell::Empty => break,
                            Cell::Production(p) => th.stack.push(p),
                            Cell::Conflict(c) => {
                                if th.forks >= self.config.conflict_depth {
                                    return Err(BuildError::ConflictDepth {
                                        symbol: self.grammar.symbol(conflict.symbol).name.clone(),
                                        token: self.grammar.token_name(conflict.token).into(),
                                        depth: self.config.conflict_depth,
                                        pos: self.grammar.position(NodeId::Symbol(conflict.symbol)),
                                    });
                                }
                                for &p in self.table.conflicts[c].candidates.iter().rev() {
                                    let mut fork = th.clone();
                                    fork.forks += 1;
                                    fork.stack.push(p);
                                    work.push(fork);
                                }
                                break;
                            }
                        }
                    }
                    NodeId::Epsilon | NodeId::Action(_) | NodeId::Argument(_) | NodeId::Beacon(_) => {
                        th.stack.pop();
                    }
                }
            }
        }
        Ok(())
    }

    /// Builds the ambiguity diagnostic for state `s`, reconstructing the
    /// token path from State 0.
    fn ambiguity(&self, conflict: &ConflictNode, states: &[BuildState], s: usize) -> BuildError {
        let mut path = Vec::new();
        let mut cur = Some(s);
        while let Some(i) = cur {
            if let Some(t) = states[i].token {
                path.push(self.grammar.token_name(t));
            }
            cur = states[i].parent;
        }
        path.reverse();
        let state = &states[s];
        let threads: Vec<&Thread> = if state.split() {
            state.epsilon.iter().chain(&state.completed).collect()
        } else {
            state.deciding().collect()
        };
        let mut productions: Vec<NodeId> = Vec::new();
        for t in threads {
            if !productions.contains(&t.production) {
                productions.push(t.production);
            }
        }
        productions.sort_by_key(|p| conflict.candidates.iter().position(|c| c == p));
        BuildError::Ambiguity {
            symbol: self.grammar.symbol(conflict.symbol).name.clone(),
            path: path.join(" ").as_str().into(),
            productions: productions
                .into_iter()
                .map(|p| self.grammar.describe(p))
                .collect(),
            pos: self.grammar.position(NodeId::Symbol(conflict.symbol)),
        }
    }

    /// Resolver links of a state by descending priority, with degenerate
    /// links removed.
    fn chain(&self, state: &BuildState) -> Vec<(Resolver, NodeId)> {
        let mut threads: Vec<&Thread> = state.redirected.iter().collect();
        threads.sort_by_key(|t| {
            let priority = t.resolver.map_or(0, |(_, r)| r.priority);
            (std::cmp::Reverse(priority), t.order)
        });
        let mut links: Vec<(Resolver, NodeId)> = Vec::new();
        for t in threads {
            let Some((_, r)) = t.resolver else {
                continue;
            };
            if links.iter().any(|(l, then)| l.node == r.node && *then == t.production) {
                continue;
            }
            if links.last().is_some_and(|(_, then)| *then == t.production) {
                continue;
            }
            links.push((r, t.production));
        }
        if let Decision::Leaf(p) = state.decision {
            while links.last().is_some_and(|(_, then)| *then == p) {
                links.pop();
            }
        }
        links
    }

    /// Emits the nodes for state `s` and returns where its decision starts.
    fn materialize(
        &self,
        states: &[BuildState],
        s: usize,
        inherited: Option<NodeId>,
        base: usize,
        nodes: &mut Vec<LaDfaNode>,
    ) -> Option<Else> {
        let state = &states[s];
        let mut target = match state.decision {
            Decision::Leaf(p) => Some(Else::Production(self.grammar.master(p))),
            Decision::Nothing => None,
            Decision::Open => {
                let idx = nodes.len();
                nodes.push(LaDfaNode::Leaf { production: 0 });
                let default = state.default().or(inherited);
                let mut transitions = Vec::new();
                for &(token, child) in &state.transitions {
                    let dfa = match self.materialize(states, child, default, base, nodes) {
                        Some(Else::Dfa(d)) => d,
                        Some(Else::Production(p)) => {
                            nodes.push(LaDfaNode::Leaf { production: p });
                            base + nodes.len() - 1
                        }
                        None => continue,
                    };
                    transitions.push((token, dfa));
                }
                nodes[idx] = LaDfaNode::Internal {
                    transitions,
                    default: default.map(|p| self.grammar.master(p)),
                };
                Some(Else::Dfa(base + idx))
            }
        };
        for (r, then) in self.chain(state).into_iter().rev() {
            nodes.push(LaDfaNode::Resolver {
                resolver: self.grammar.master(r.node),
                priority: r.priority,
                then: self.grammar.master(then),
                otherwise: target,
            });
            target = Some(Else::Dfa(base + nodes.len() - 1));
        }
        target
    }
}
