//! The table interface the runtime walks.
//!
//! A [`ParserData`] implementation exposes the finished parse table, the
//! node array addressed by master index and the lookahead-DFA array. Code
//! generators emit static implementations; `llk_gen::Tables` implements it
//! over the in-memory build result.

use crate::TokenId;

/// Master index of a grammar node.
pub type NodeIndex = usize;

/// Local index of a nonterminal.
pub type SymbolId = usize;

/// Local index of a lookahead-DFA node.
pub type DfaId = usize;

/// A grammar node as the runtime sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserNode<'a> {
    /// A terminal to match (possibly the wildcard).
    Token(TokenId),
    /// The empty production.
    Epsilon,
    /// A nonterminal reference.
    Symbol(SymbolId),
    /// A concatenation of nodes, in order.
    Sequence(&'a [NodeIndex]),
    /// A user action callback.
    Action(usize),
    /// An argument bound when the preceding symbol is entered.
    Argument(usize),
    /// A locator arming a slot for the next matched token.
    Beacon(usize),
    /// The entry of a lookahead decision.
    LaDfa(DfaId),
}

/// Where a failed resolver continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DfaTarget {
    /// Keep deciding with more lookahead.
    Dfa(DfaId),
    /// Take this production.
    Node(NodeIndex),
}

/// The shape of one lookahead-DFA node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DfaState {
    /// Decision made: substitute this production.
    Leaf(NodeIndex),
    /// Consume the current token through [`ParserData::dfa_transition`];
    /// take `default` when no transition exists.
    Switch { default: Option<NodeIndex> },
    /// Speculatively match `resolver`; on success substitute `then`,
    /// otherwise continue with `otherwise`.
    Resolver {
        resolver: NodeIndex,
        then: NodeIndex,
        otherwise: Option<DfaTarget>,
    },
}

/// Which commit-only callbacks a symbol declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Callbacks {
    pub enter: bool,
    pub leave: bool,
}

/// Generated parse tables.
pub trait ParserData {
    /// Returns the node at master index `index`.
    fn node(&self, index: NodeIndex) -> ParserNode<'_>;

    /// Returns the master index of the node for `symbol`.
    fn symbol_node(&self, symbol: SymbolId) -> NodeIndex;

    /// Returns the production (or lookahead-DFA entry) predicted for
    /// `symbol` when the current token is `token`.
    fn lookup(&self, symbol: SymbolId, token: TokenId) -> Option<NodeIndex>;

    /// Returns the shape of a lookahead-DFA node.
    fn dfa(&self, dfa: DfaId) -> DfaState;

    /// Returns the successor of a `Switch` node on `token`.
    fn dfa_transition(&self, dfa: DfaId, token: TokenId) -> Option<DfaId>;

    /// The first nullable alternative of `symbol`, taken when a lookup
    /// misses while a resolver is speculating. Anything may follow a
    /// resolver match, so the table row alone cannot tell.
    fn empty_production(&self, _symbol: SymbolId) -> Option<NodeIndex> {
        None
    }

    fn callbacks(&self, _symbol: SymbolId) -> Callbacks {
        Callbacks::default()
    }

    /// Tokens with a table entry for `symbol`, for diagnostics.
    fn expected(&self, symbol: SymbolId) -> Vec<TokenId>;

    /// Tokens with a transition out of `dfa`, for diagnostics.
    fn dfa_expected(&self, dfa: DfaId) -> Vec<TokenId>;

    fn symbol_name(&self, symbol: SymbolId) -> &str;

    fn token_name(&self, token: TokenId) -> &str;
}
