use crate::analysis;
use crate::ladfa::{Else, LaDfaBuilder, LaDfaNode, Resolution};
use crate::table::{self, Cell};
use crate::{BuildConfig, BuildError, Grammar, NodeId};
use llk::{
    Callbacks, DfaId, DfaState, DfaTarget, NodeIndex, ParserData, ParserNode, SymbolId, TokenId,
};
use smartstring::alias::String;

/// A node of the finished tables, addressed by master index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableNode {
    Token(TokenId),
    Epsilon,
    Symbol(usize),
    Sequence(Vec<NodeIndex>),
    Action(usize),
    Argument(usize),
    Beacon(usize),
    LaDfa(DfaId),
}

/// The build result: parse table, node array and lookahead DFAs.
///
/// Rebuilding from an unchanged grammar yields an equal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    pub(crate) tokens: Vec<String>,
    pub(crate) symbols: Vec<String>,
    pub(crate) actions: Vec<String>,
    pub(crate) arguments: Vec<String>,
    pub(crate) beacons: Vec<String>,
    pub(crate) nodes: Vec<TableNode>,
    pub(crate) symbol_nodes: Vec<NodeIndex>,
    pub(crate) callbacks: Vec<Callbacks>,
    pub(crate) first: Vec<Vec<TokenId>>,
    pub(crate) follow: Vec<Vec<TokenId>>,
    pub(crate) nullable: Vec<bool>,
    /// Per symbol: its first nullable alternative.
    pub(crate) empty: Vec<Option<NodeIndex>>,
    pub(crate) table: Vec<Option<NodeIndex>>,
    pub(crate) dfas: Vec<LaDfaNode>,
    pub(crate) start: SymbolId,
}

/// Builds the tables for `grammar`.
///
/// Runs the FIRST/FOLLOW analysis, fills the parse table and resolves every
/// conflict in (symbol, token) order. The first failure aborts the build.
pub fn build(grammar: &Grammar, config: &BuildConfig) -> Result<Tables, BuildError> {
    let sets = analysis::analyze(grammar);
    analysis::validate(grammar, &sets)?;
    let table = table::fill(grammar, &sets);

    let mut nodes: Vec<TableNode> = grammar
        .nodes()
        .map(|node| match node {
            NodeId::Token(t) => TableNode::Token(t),
            NodeId::Epsilon => TableNode::Epsilon,
            NodeId::Symbol(s) => TableNode::Symbol(s),
            NodeId::Sequence(q) => TableNode::Sequence(
                grammar
                    .sequence(q)
                    .iter()
                    .map(|&c| grammar.master(c))
                    .collect(),
            ),
            NodeId::Action(a) => TableNode::Action(a),
            NodeId::Argument(a) => TableNode::Argument(a),
            NodeId::Beacon(b) => TableNode::Beacon(b),
        })
        .collect();

    let mut order: Vec<usize> = (0..table.conflicts.len()).collect();
    order.sort_by_key(|&c| (table.conflicts[c].symbol, table.conflicts[c].token));
    let mut builder = LaDfaBuilder::new(grammar, &table, config);
    let mut dfas = Vec::new();
    let mut resolved = vec![None; table.conflicts.len()];
    for c in order {
        resolved[c] = Some(match builder.resolve(&table.conflicts[c], &mut dfas)? {
            Resolution::Production(p) => grammar.master(p),
            Resolution::Dfa(root) => {
                nodes.push(TableNode::LaDfa(root));
                nodes.len() - 1
            }
        });
    }

    for (s, symbol) in grammar.symbols().iter().enumerate() {
        if symbol.resolver.is_some() && !builder.resolver_used(s) {
            return Err(BuildError::UnusedResolver {
                symbol: symbol.name.clone(),
                pos: grammar.position(NodeId::Symbol(s)),
            });
        }
    }

    let n_tokens = grammar.n_tokens();
    let mut cells = Vec::with_capacity(grammar.n_symbols() * n_tokens);
    for s in 0..grammar.n_symbols() {
        for t in 0..n_tokens {
            cells.push(match table.cell(s, t) {
                Cell::Empty => None,
                Cell::Production(p) => Some(grammar.master(p)),
                Cell::Conflict(c) => Some(resolved[c].ok_or_else(|| {
                    BuildError::UnresolvedConflict {
                        symbol: grammar.symbol(s).name.clone(),
                        token: grammar.token_name(t).into(),
                    }
                })?),
            });
        }
    }

    let symbol_ids = || (0..grammar.n_symbols()).map(NodeId::Symbol);
    let tables = Tables {
        tokens: grammar.tokens().names(),
        symbols: grammar.symbols().iter().map(|s| s.name.clone()).collect(),
        actions: grammar.actions().names(),
        arguments: grammar.arguments().names(),
        beacons: grammar.beacons().names(),
        nodes,
        symbol_nodes: (0..grammar.n_symbols())
            .map(|s| grammar.master(NodeId::Symbol(s)))
            .collect(),
        callbacks: grammar
            .symbols()
            .iter()
            .map(|s| Callbacks {
                enter: s.enter,
                leave: s.leave,
            })
            .collect(),
        first: symbol_ids()
            .map(|s| sets.first(grammar, s).to_vec())
            .collect(),
        follow: symbol_ids()
            .map(|s| sets.follow(grammar, s).to_vec())
            .collect(),
        nullable: symbol_ids().map(|s| sets.nullable(grammar, s)).collect(),
        empty: grammar
            .symbols()
            .iter()
            .map(|s| {
                s.alts
                    .iter()
                    .find(|&&alt| sets.nullable(grammar, alt))
                    .map(|&alt| grammar.master(alt))
            })
            .collect(),
        table: cells,
        dfas,
        start: grammar.start(),
    };
    log::debug!(
        "tables: {} nodes, {} conflicts, {} DFA nodes",
        tables.nodes.len(),
        table.conflicts.len(),
        tables.dfas.len()
    );
    Ok(tables)
}

impl Tables {
    pub fn start(&self) -> SymbolId {
        self.start
    }

    pub fn n_tokens(&self) -> usize {
        self.tokens.len()
    }

    pub fn n_symbols(&self) -> usize {
        self.symbols.len()
    }

    pub fn token(&self, name: &str) -> Option<TokenId> {
        self.tokens.iter().position(|t| t == name)
    }

    pub fn symbol(&self, name: &str) -> Option<SymbolId> {
        self.symbols.iter().position(|s| s == name)
    }

    pub fn action(&self, name: &str) -> Option<usize> {
        self.actions.iter().position(|a| a == name)
    }

    pub fn argument(&self, name: &str) -> Option<usize> {
        self.arguments.iter().position(|a| a == name)
    }

    pub fn beacon(&self, name: &str) -> Option<usize> {
        self.beacons.iter().position(|b| b == name)
    }

    pub fn nodes(&self) -> &[TableNode] {
        &self.nodes
    }

    pub fn dfas(&self) -> &[LaDfaNode] {
        &self.dfas
    }

    /// The finished table entry for `(symbol, token)`.
    pub fn entry(&self, symbol: SymbolId, token: TokenId) -> Option<NodeIndex> {
        if token >= self.tokens.len() {
            return None;
        }
        self.table
            .get(symbol * self.tokens.len() + token)
            .copied()
            .flatten()
    }

    /// Renders a node for diagnostics.
    pub fn describe(&self, node: NodeIndex) -> String {
        let name = |names: &[String], i: usize| names.get(i).cloned().unwrap_or_else(|| "?".into());
        match &self.nodes[node] {
            TableNode::Token(t) => name(&self.tokens, *t),
            TableNode::Epsilon => "ε".into(),
            TableNode::Symbol(s) => name(&self.symbols, *s),
            TableNode::Sequence(children) => {
                let mut out = String::new();
                for (i, &c) in children.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(&self.describe(c));
                }
                out
            }
            TableNode::Action(a) => format!("{{{}}}", name(&self.actions, *a)).as_str().into(),
            TableNode::Argument(a) => format!("({})", name(&self.arguments, *a)).as_str().into(),
            TableNode::Beacon(b) => format!("@{}", name(&self.beacons, *b)).as_str().into(),
            TableNode::LaDfa(d) => format!("LaDfa({d})").as_str().into(),
        }
    }
}

impl ParserData for Tables {
    fn node(&self, index: NodeIndex) -> ParserNode<'_> {
        match &self.nodes[index] {
            TableNode::Token(t) => ParserNode::Token(*t),
            TableNode::Epsilon => ParserNode::Epsilon,
            TableNode::Symbol(s) => ParserNode::Symbol(*s),
            TableNode::Sequence(children) => ParserNode::Sequence(children),
            TableNode::Action(a) => ParserNode::Action(*a),
            TableNode::Argument(a) => ParserNode::Argument(*a),
            TableNode::Beacon(b) => ParserNode::Beacon(*b),
            TableNode::LaDfa(d) => ParserNode::LaDfa(*d),
        }
    }

    fn symbol_node(&self, symbol: SymbolId) -> NodeIndex {
        self.symbol_nodes[symbol]
    }

    fn lookup(&self, symbol: SymbolId, token: TokenId) -> Option<NodeIndex> {
        self.entry(symbol, token)
    }

    fn dfa(&self, dfa: DfaId) -> DfaState {
        match &self.dfas[dfa] {
            LaDfaNode::Leaf { production } => DfaState::Leaf(*production),
            LaDfaNode::Internal { default, .. } => DfaState::Switch { default: *default },
            LaDfaNode::Resolver {
                resolver,
                then,
                otherwise,
                ..
            } => DfaState::Resolver {
                resolver: *resolver,
                then: *then,
                otherwise: otherwise.map(|e| match e {
                    Else::Dfa(d) => DfaTarget::Dfa(d),
                    Else::Production(p) => DfaTarget::Node(p),
                }),
            },
        }
    }

    fn dfa_transition(&self, dfa: DfaId, token: TokenId) -> Option<DfaId> {
        match &self.dfas[dfa] {
            LaDfaNode::Internal { transitions, .. } => transitions
                .binary_search_by_key(&token, |&(t, _)| t)
                .ok()
                .map(|i| transitions[i].1),
            _ => None,
        }
    }

    fn empty_production(&self, symbol: SymbolId) -> Option<NodeIndex> {
        self.empty.get(symbol).copied().flatten()
    }

    fn callbacks(&self, symbol: SymbolId) -> Callbacks {
        self.callbacks[symbol]
    }

    fn expected(&self, symbol: SymbolId) -> Vec<TokenId> {
        (0..self.tokens.len())
            .filter(|&t| self.entry(symbol, t).is_some())
            .collect()
    }

    fn dfa_expected(&self, dfa: DfaId) -> Vec<TokenId> {
        match &self.dfas[dfa] {
            LaDfaNode::Internal { transitions, .. } => transitions.iter().map(|&(t, _)| t).collect(),
            _ => Vec::new(),
        }
    }

    fn symbol_name(&self, symbol: SymbolId) -> &str {
        self.symbols.get(symbol).map_or("?", |s| s.as_str())
    }

    fn token_name(&self, token: TokenId) -> &str {
        self.tokens.get(token).map_or("?", |t| t.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GrammarBuilder;
    use llk::{END, Feed, ParseError, Parser, ParserCtx, ParserDriver, Token};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Tok(TokenId);

    impl Token for Tok {
        fn token_id(&self) -> TokenId {
            self.0
        }
    }

    #[derive(Default)]
    struct Recorder {
        log: Vec<std::string::String>,
        /// Action index that fails.
        reject: Option<usize>,
    }

    impl ParserDriver for Recorder {
        type ParserData = Tables;
        type Token = Tok;
        type Error = std::string::String;

        fn action(&mut self, ctx: &ParserCtx<Tok>, action: usize) -> Result<(), Self::Error> {
            if self.reject == Some(action) {
                return Err("rejected".into());
            }
            if !ctx.is_speculating() {
                self.log.push(format!("act {action}"));
            }
            Ok(())
        }
        fn enter(&mut self, _ctx: &ParserCtx<Tok>, symbol: SymbolId) -> Result<(), Self::Error> {
            self.log.push(format!("enter {symbol}"));
            Ok(())
        }
        fn leave(&mut self, _ctx: &ParserCtx<Tok>, symbol: SymbolId) -> Result<(), Self::Error> {
            self.log.push(format!("leave {symbol}"));
            Ok(())
        }
    }

    struct Outcome {
        sexp: std::string::String,
        log: Vec<std::string::String>,
        rollbacks: usize,
    }

    fn parse_with(tables: &Tables, driver: Recorder, input: &[&str]) -> Result<Outcome, ParseError> {
        let mut parser = Parser::new(tables, driver);
        parser.start_parse(tables.start(), true);
        for name in input {
            let t = tables.token(name).unwrap();
            assert_eq!(parser.feed_token(Tok(t))?, Feed::Continue);
            assert!(parser.ctx().buffered() <= tables.n_tokens());
        }
        assert_eq!(parser.feed_token(Tok(END))?, Feed::Done);
        assert!(parser.ctx().symbol_stack().is_empty());
        assert_eq!(parser.ctx().resolver_depth(), 0);
        let sexp = parser.take_ast().unwrap().to_sexp(tables).to_string();
        let rollbacks = parser.stats().rollbacks;
        Ok(Outcome {
            sexp,
            log: parser.into_driver().log,
            rollbacks,
        })
    }

    fn parse(tables: &Tables, input: &[&str]) -> Result<Outcome, ParseError> {
        parse_with(tables, Recorder::default(), input)
    }

    /// E -> T E';  E' -> '+' T E' | ε;  T -> 'n' | '(' E ')'
    #[test]
    fn conflict_free_grammar_needs_no_dfa() {
        init_logger();
        let mut g = GrammarBuilder::new();
        let e = g.symbol("E");
        let e2 = g.symbol("E'");
        let t = g.symbol("T");
        let plus = g.token("+");
        let n = g.token("n");
        let lp = g.token("(");
        let rp = g.token(")");
        let eps = g.epsilon();
        let p = g.seq([t, e2]);
        g.alt(e, p);
        let p = g.seq([plus, t, e2]);
        g.alt(e2, p).alt(e2, eps);
        g.alt(t, n);
        let p = g.seq([lp, e, rp]);
        g.alt(t, p).start(e);
        let tables = build(&g.finish().unwrap(), &BuildConfig::default()).unwrap();
        assert!(tables.dfas().is_empty());
        assert!(
            !tables
                .nodes()
                .iter()
                .any(|n| matches!(n, TableNode::LaDfa(_)))
        );
        let out = parse(&tables, &["n", "+", "(", "n", ")"]).unwrap();
        assert_eq!(out.sexp, "(E (T n) (E' + (T ( (E (T n) (E')) )) (E')))");
        let err = parse(&tables, &["n", "n"]).err().unwrap();
        let ParseError::UnexpectedToken { expected, .. } = err else {
            panic!("unexpected error {err}");
        };
        assert_eq!(
            expected.iter().map(|e| e.as_str()).collect::<Vec<_>>(),
            ["$end", "+", ")"]
        );
    }

    /// S -> 'a' 'b' {first} | 'a' 'c' {second}
    fn two_token_tables() -> Tables {
        let mut g = GrammarBuilder::new();
        let s = g.symbol("S");
        let a = g.token("a");
        let b = g.token("b");
        let c = g.token("c");
        g.token("d");
        let first = g.action("first");
        let second = g.action("second");
        let p1 = g.seq([a, b, first]);
        let p2 = g.seq([a, c, second]);
        g.alt(s, p1).alt(s, p2).start(s);
        build(&g.finish().unwrap(), &BuildConfig::default()).unwrap()
    }

    #[test]
    fn two_token_lookahead_selects_alternative() {
        init_logger();
        let tables = two_token_tables();
        let first = tables.action("first").unwrap();
        let second = tables.action("second").unwrap();
        let out = parse(&tables, &["a", "b"]).unwrap();
        assert_eq!(out.sexp, "(S a b)");
        assert_eq!(out.log, [format!("act {first}")]);
        let out = parse(&tables, &["a", "c"]).unwrap();
        assert_eq!(out.sexp, "(S a c)");
        assert_eq!(out.log, [format!("act {second}")]);
    }

    #[test]
    fn two_token_lookahead_reports_expected() {
        init_logger();
        let tables = two_token_tables();
        let mut parser = Parser::new(&tables, Recorder::default());
        parser.start_parse(tables.start(), false);
        let a = tables.token("a").unwrap();
        let d = tables.token("d").unwrap();
        assert_eq!(parser.feed_token(Tok(a)), Ok(Feed::Continue));
        match parser.feed_token(Tok(d)) {
            Err(ParseError::UnexpectedToken {
                found, expected, ..
            }) => {
                assert_eq!(found.as_str(), "d");
                assert_eq!(
                    expected.iter().map(|e| e.as_str()).collect::<Vec<_>>(),
                    ["b", "c"]
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn k_tokens_need_lookahead_k() {
        init_logger();
        let grammar = || {
            let mut g = GrammarBuilder::new();
            let s = g.symbol("S");
            let a = g.token("a");
            let b = g.token("b");
            let c = g.token("c");
            let d = g.token("d");
            let p1 = g.seq([a, b, c]);
            let p2 = g.seq([a, b, d]);
            g.alt(s, p1).alt(s, p2).start(s);
            g.finish().unwrap()
        };
        let err = build(&grammar(), &BuildConfig::default().with_lookahead(2)).unwrap_err();
        assert!(matches!(err, BuildError::Ambiguity { .. }));
        let tables = build(&grammar(), &BuildConfig::default().with_lookahead(3)).unwrap();
        assert_eq!(parse(&tables, &["a", "b", "d"]).unwrap().sexp, "(S a b d)");
        assert_eq!(parse(&tables, &["a", "b", "c"]).unwrap().sexp, "(S a b c)");
    }

    #[test]
    fn symbol_lookahead_override_caps_the_search() {
        init_logger();
        let mut g = GrammarBuilder::new();
        let s = g.symbol("S");
        let a = g.token("a");
        let b = g.token("b");
        let c = g.token("c");
        let p1 = g.seq([a, a, b]);
        let p2 = g.seq([a, a, c]);
        g.alt(s, p1).alt(s, p2).start(s).lookahead(s, 2);
        let err = build(&g.finish().unwrap(), &BuildConfig::default()).unwrap_err();
        let BuildError::Ambiguity { path, .. } = err else {
            panic!("unexpected {err:?}");
        };
        assert_eq!(path.as_str(), "a a");
    }

    /// S -> any 'x' {wild} | 'y' 'x' {exact}
    #[test]
    fn wildcard_is_a_fallback() {
        init_logger();
        let mut g = GrammarBuilder::new();
        let s = g.symbol("S");
        let any = g.any();
        let x = g.token("x");
        let y = g.token("y");
        g.token("z");
        let wild = g.action("wild");
        let exact = g.action("exact");
        let p1 = g.seq([any, x, wild]);
        let p2 = g.seq([y, x, exact]);
        g.alt(s, p1).alt(s, p2).start(s);
        let tables = build(&g.finish().unwrap(), &BuildConfig::default()).unwrap();
        assert!(tables.dfas().is_empty());
        let wild = format!("act {}", tables.action("wild").unwrap());
        let exact = format!("act {}", tables.action("exact").unwrap());
        assert_eq!(parse(&tables, &["y", "x"]).unwrap().log, [exact]);
        assert_eq!(parse(&tables, &["z", "x"]).unwrap().log, [wild.clone()]);
        assert_eq!(parse(&tables, &["x", "x"]).unwrap().log, [wild]);
    }

    /// S -> S1 | S2;  S1 -> 'a' 'b';  S2 -> 'a' T;  T -> 'b' | 'c'
    /// with `resolve('a' 'b') priority(5)` on S1 when `resolver` is set.
    fn resolver_grammar(resolver: bool, with_s1: bool) -> Grammar {
        let mut g = GrammarBuilder::new();
        let s = g.symbol("S");
        let s1 = g.symbol("S1");
        let s2 = g.symbol("S2");
        let t = g.symbol("T");
        let a = g.token("a");
        let b = g.token("b");
        let c = g.token("c");
        let ab = g.seq([a, b]);
        g.alt(s1, ab);
        let at = g.seq([a, t]);
        g.alt(s2, at);
        g.alt(t, b).alt(t, c);
        if with_s1 {
            g.alt(s, s1);
        }
        g.alt(s, s2).start(s);
        for sym in [s1, s2, t] {
            g.enter(sym).leave(sym);
        }
        if resolver {
            let r = g.seq([a, b]);
            g.resolver(s1, r, 5);
        }
        g.finish().unwrap()
    }

    #[test]
    fn resolver_commits_on_match() {
        init_logger();
        let tables = build(&resolver_grammar(true, true), &BuildConfig::default()).unwrap();
        let out = parse(&tables, &["a", "b"]).unwrap();
        assert_eq!(out.sexp, "(S (S1 a b))");
        assert_eq!(out.log, ["enter 1", "leave 1"]);
        assert_eq!(out.rollbacks, 0);
    }

    #[test]
    fn resolver_rollback_matches_else_only_grammar() {
        init_logger();
        let with = build(&resolver_grammar(true, true), &BuildConfig::default()).unwrap();
        let without = build(&resolver_grammar(false, false), &BuildConfig::default()).unwrap();
        assert!(without.dfas().is_empty());
        let a = parse(&with, &["a", "c"]).unwrap();
        let b = parse(&without, &["a", "c"]).unwrap();
        assert_eq!(a.rollbacks, 1);
        assert_eq!(a.sexp, "(S (S2 a (T c)))");
        assert_eq!(a.sexp, b.sexp);
        assert_eq!(a.log, b.log);
    }

    /// S -> resolve('a' {pred}) P | Q;  P -> 'a' {p};  Q -> 'a' {q}
    #[test]
    fn semantic_predicate_failure_rolls_back() {
        init_logger();
        let mut g = GrammarBuilder::new();
        let s = g.symbol("S");
        let p = g.symbol("P");
        let q = g.symbol("Q");
        let a = g.token("a");
        let pred = g.action("pred");
        let pa = g.action("p");
        let qa = g.action("q");
        let body = g.seq([a, pa]);
        g.alt(p, body);
        let body = g.seq([a, qa]);
        g.alt(q, body);
        g.alt(s, p).alt(s, q).start(s);
        let r = g.seq([a, pred]);
        g.resolver(p, r, 0);
        let tables = build(&g.finish().unwrap(), &BuildConfig::default()).unwrap();
        let p_act = format!("act {}", tables.action("p").unwrap());
        let q_act = format!("act {}", tables.action("q").unwrap());

        let out = parse(&tables, &["a"]).unwrap();
        assert_eq!(out.log, [p_act]);
        assert_eq!(out.sexp, "(S (P a))");

        let driver = Recorder {
            reject: tables.action("pred"),
            ..Default::default()
        };
        let out = parse_with(&tables, driver, &["a"]).unwrap();
        assert_eq!(out.log, [q_act]);
        assert_eq!(out.sexp, "(S (Q a))");
        assert_eq!(out.rollbacks, 1);
    }

    /// S -> S1 | S2 | S3;  S1 -> 'a' 'b' 'd';  S2 -> 'a' 'b' 'c';  S3 -> 'a' 'c'
    /// with `resolve('a' 'b' 'd')` on S1.
    #[test]
    fn resolver_rollback_resumes_the_dfa() {
        init_logger();
        let mut g = GrammarBuilder::new();
        let s = g.symbol("S");
        let s1 = g.symbol("S1");
        let s2 = g.symbol("S2");
        let s3 = g.symbol("S3");
        let a = g.token("a");
        let b = g.token("b");
        let c = g.token("c");
        let d = g.token("d");
        g.alt(s, s1).alt(s, s2).alt(s, s3).start(s);
        let p = g.seq([a, b, d]);
        g.alt(s1, p);
        let p = g.seq([a, b, c]);
        g.alt(s2, p);
        let p = g.seq([a, c]);
        g.alt(s3, p);
        let r = g.seq([a, b, d]);
        g.resolver(s1, r, 1);
        let tables = build(&g.finish().unwrap(), &BuildConfig::default()).unwrap();

        let out = parse(&tables, &["a", "b", "d"]).unwrap();
        assert_eq!(out.sexp, "(S (S1 a b d))");
        assert_eq!(out.rollbacks, 0);
        let out = parse(&tables, &["a", "b", "c"]).unwrap();
        assert_eq!(out.sexp, "(S (S2 a b c))");
        assert_eq!(out.rollbacks, 1);
        let out = parse(&tables, &["a", "c"]).unwrap();
        assert_eq!(out.sexp, "(S (S3 a c))");
        assert_eq!(out.rollbacks, 1);
    }

    /// S -> X | Y | Z;  X -> 'a' 'c' 'd';  Y -> 'a' 'c' 'e';  Z -> U 'e';
    /// U -> 'b' | ε, with `resolve('a' U)` on X.
    #[test]
    fn resolver_over_shared_nullable_symbol() {
        init_logger();
        let mut g = GrammarBuilder::new();
        let s = g.symbol("S");
        let x = g.symbol("X");
        let y = g.symbol("Y");
        let z = g.symbol("Z");
        let u = g.symbol("U");
        let a = g.token("a");
        let b = g.token("b");
        let c = g.token("c");
        let d = g.token("d");
        let e = g.token("e");
        let eps = g.epsilon();
        g.alt(s, x).alt(s, y).alt(s, z).start(s);
        let p = g.seq([a, c, d]);
        g.alt(x, p);
        let p = g.seq([a, c, e]);
        g.alt(y, p);
        let p = g.seq([u, e]);
        g.alt(z, p);
        g.alt(u, b).alt(u, eps);
        let r = g.seq([a, u]);
        g.resolver(x, r, 1);
        let tables = build(&g.finish().unwrap(), &BuildConfig::default()).unwrap();

        let u = tables.symbol("U").unwrap();
        let b = tables.token("b").unwrap();
        assert!(matches!(tables.nodes()[tables.entry(u, b).unwrap()], TableNode::Token(_)));
        assert_eq!(tables.follow[u], [tables.token("e").unwrap()]);

        // `c` cannot follow U in the main grammar; inside the resolver U
        // falls back to its empty alternative.
        let out = parse(&tables, &["a", "c", "d"]).unwrap();
        assert_eq!(out.sexp, "(S (X a c d))");
        assert_eq!(out.rollbacks, 0);
        assert_eq!(parse(&tables, &["b", "e"]).unwrap().sexp, "(S (Z (U b) e))");
        assert_eq!(parse(&tables, &["e"]).unwrap().sexp, "(S (Z (U) e))");
    }

    /// S -> A 'x' | B;  A -> 'a' 'b' | 'a' 'c';  B -> 'a' 'd'
    #[test]
    fn nested_conflict_parses_through_both_dfas() {
        init_logger();
        let mut g = GrammarBuilder::new();
        let s = g.symbol("S");
        let a_sym = g.symbol("A");
        let b_sym = g.symbol("B");
        let a = g.token("a");
        let b = g.token("b");
        let c = g.token("c");
        let d = g.token("d");
        let x = g.token("x");
        let p = g.seq([a_sym, x]);
        g.alt(s, p).alt(s, b_sym).start(s);
        let p = g.seq([a, b]);
        g.alt(a_sym, p);
        let p = g.seq([a, c]);
        g.alt(a_sym, p);
        let p = g.seq([a, d]);
        g.alt(b_sym, p);
        let tables = build(&g.finish().unwrap(), &BuildConfig::default()).unwrap();
        assert_eq!(parse(&tables, &["a", "c", "x"]).unwrap().sexp, "(S (A a c) x)");
        assert_eq!(parse(&tables, &["a", "b", "x"]).unwrap().sexp, "(S (A a b) x)");
        assert_eq!(parse(&tables, &["a", "d"]).unwrap().sexp, "(S (B a d))");
    }

    #[test]
    fn unused_resolver_is_rejected() {
        let mut g = GrammarBuilder::new();
        let s = g.symbol("S");
        let a = g.token("a");
        g.alt(s, a).start(s).resolver(s, a, 1);
        assert!(matches!(
            build(&g.finish().unwrap(), &BuildConfig::default()),
            Err(BuildError::UnusedResolver { .. })
        ));
    }

    #[test]
    fn left_recursion_is_reported() {
        let mut g = GrammarBuilder::new();
        let e = g.symbol("E");
        let n = g.token("n");
        let plus = g.token("+");
        let rec = g.seq([e, plus, n]);
        g.alt(e, rec).alt(e, n).start(e);
        let err = build(&g.finish().unwrap(), &BuildConfig::default()).unwrap_err();
        assert!(matches!(err, BuildError::ConflictDepth { depth: 8, .. }));
        assert!(err.to_string().contains("left recursion"));
    }

    #[test]
    fn rebuild_is_identical() {
        let grammar = resolver_grammar(true, true);
        let config = BuildConfig::default();
        let a = build(&grammar, &config).unwrap();
        let b = build(&grammar, &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, build(&grammar.clone(), &config).unwrap());
    }

    /// P -> Stat P | ε;  Stat -> 'a' 'b' ';' | 'a' 'c' ';'
    #[test]
    fn long_input_keeps_buffer_bounded() {
        init_logger();
        let mut g = GrammarBuilder::new();
        let prog = g.symbol("P");
        let stat = g.symbol("Stat");
        let a = g.token("a");
        let b = g.token("b");
        let c = g.token("c");
        let semi = g.token(";");
        let eps = g.epsilon();
        let body = g.seq([stat, prog]);
        g.alt(prog, body).alt(prog, eps).start(prog);
        let s1 = g.seq([a, b, semi]);
        let s2 = g.seq([a, c, semi]);
        g.alt(stat, s1).alt(stat, s2);
        let tables = build(&g.finish().unwrap(), &BuildConfig::default()).unwrap();

        let mut parser = Parser::new(&tables, Recorder::default());
        parser.start_parse(tables.start(), false);
        let mut max = 0;
        for i in 0..500 {
            let second = if i % 2 == 0 { "b" } else { "c" };
            for name in ["a", second, ";"] {
                let t = tables.token(name).unwrap();
                assert_eq!(parser.feed_token(Tok(t)), Ok(Feed::Continue));
                max = max.max(parser.ctx().buffered());
            }
        }
        assert_eq!(parser.feed_token(Tok(END)), Ok(Feed::Done));
        assert!(max <= 2);
        assert_eq!(parser.stats().lookaheads, 500);
    }

    #[test]
    fn nullability_mismatch_fails_the_build() {
        let mut g = GrammarBuilder::new();
        let s = g.symbol("S");
        let a = g.token("a");
        g.alt(s, a).start(s).declare_nullable(s, true);
        assert!(matches!(
            build(&g.finish().unwrap(), &BuildConfig::default()),
            Err(BuildError::NullabilityMismatch {
                nullable: false,
                ..
            })
        ));
    }
}
