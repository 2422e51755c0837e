use crate::{
    ANY, Ast, Callbacks, DfaId, DfaState, DfaTarget, END, NodeIndex, ParseError, ParserData,
    ParserNode, SymbolId, Token, TokenBuffer, TokenId,
};
use smartstring::alias::String;
use std::fmt::Display;

/// Outcome of feeding one token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feed {
    /// More tokens are needed.
    Continue,
    /// The start symbol was matched and end of input was seen.
    Done,
}

/// Host callbacks invoked while parsing.
///
/// `action` runs during speculation as well (actions are the semantic
/// predicates of resolvers) and may check [`ParserCtx::is_speculating`].
/// `argument`, `enter` and `leave` only run for committed derivations.
pub trait ParserDriver {
    type ParserData: ParserData;
    type Token: Token;
    type Error: Display;

    fn action(&mut self, ctx: &ParserCtx<Self::Token>, action: usize) -> Result<(), Self::Error>;

    fn argument(
        &mut self,
        _ctx: &ParserCtx<Self::Token>,
        _argument: usize,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    fn enter(&mut self, _ctx: &ParserCtx<Self::Token>, _symbol: SymbolId) -> Result<(), Self::Error> {
        Ok(())
    }

    fn leave(&mut self, _ctx: &ParserCtx<Self::Token>, _symbol: SymbolId) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserStats {
    pub tokens: usize,
    pub matches: usize,
    pub lookaheads: usize,
    pub resolvers: usize,
    pub rollbacks: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Status {
    Idle,
    Running,
    Done,
    Failed,
}

/// One entry of the prediction stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Frame {
    /// End of input expected.
    End,
    /// A node still to be satisfied.
    Node(NodeIndex),
    /// A symbol whose production is on the stack above this frame.
    /// Speculative entries never fire `leave` and own no AST node.
    Entered { symbol: SymbolId, speculative: bool },
    /// A lookahead decision in progress, started at token `entry`.
    Lookahead { dfa: DfaId, entry: usize },
    /// A decision waiting for the resolver above it to match.
    Resolving,
}

/// A resolver under speculative evaluation.
#[derive(Clone, Copy, Debug)]
struct ResolverFrame {
    /// Stack index of the `Resolving` frame.
    frame: usize,
    /// Token position where the decision started.
    entry: usize,
    /// Token position where the resolver link was reached.
    resume: usize,
    then: NodeIndex,
    otherwise: Option<DfaTarget>,
}

/// Parser state visible to callbacks.
pub struct ParserCtx<T> {
    tokens: TokenBuffer<T>,
    pos: usize,
    matched: bool,
    stack: Vec<Frame>,
    symbols: Vec<SymbolId>,
    resolvers: Vec<ResolverFrame>,
    locators: Vec<Option<T>>,
    armed: Option<usize>,
    last: Option<T>,
    ast: Option<Ast<T>>,
    stats: ParserStats,
    status: Status,
}

impl<T: Token> Default for ParserCtx<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Token> ParserCtx<T> {
    pub fn new() -> Self {
        Self {
            tokens: TokenBuffer::new(),
            pos: 0,
            matched: false,
            stack: Vec::new(),
            symbols: Vec::new(),
            resolvers: Vec::new(),
            locators: Vec::new(),
            armed: None,
            last: None,
            ast: None,
            stats: ParserStats::default(),
            status: Status::Idle,
        }
    }

    fn reset(&mut self, build_ast: bool) {
        self.tokens.clear();
        self.pos = 0;
        self.matched = false;
        self.stack.clear();
        self.symbols.clear();
        self.resolvers.clear();
        self.locators.clear();
        self.armed = None;
        self.last = None;
        self.ast = build_ast.then(Ast::new);
        self.stats = ParserStats::default();
    }

    /// Moves past a matched token and returns the id of the current one,
    /// or `None` when it has not been fed yet.
    fn advance(&mut self) -> Option<TokenId> {
        if self.matched {
            self.pos += 1;
            self.matched = false;
        }
        self.tokens.get(self.pos).map(Token::token_id)
    }

    /// Lowest token position any cursor may still rewind to.
    fn low_water(&self) -> usize {
        let mut low = self.pos;
        for r in &self.resolvers {
            low = low.min(r.entry);
        }
        if let Some(Frame::Lookahead { entry, .. }) = self.stack.last() {
            low = low.min(*entry);
        }
        low
    }

    /// The token under the main cursor (or the resolver cursor while
    /// speculating).
    pub fn current_token(&self) -> Option<&T> {
        self.tokens.get(self.pos)
    }

    /// The last token matched by a committed derivation.
    pub fn last_token(&self) -> Option<&T> {
        self.last.as_ref()
    }

    /// The token bound to locator `slot` by its beacon.
    pub fn locator(&self, slot: usize) -> Option<&T> {
        self.locators.get(slot).and_then(Option::as_ref)
    }

    pub fn is_speculating(&self) -> bool {
        !self.resolvers.is_empty()
    }

    pub fn prediction_depth(&self) -> usize {
        self.stack.len()
    }

    /// Symbols currently entered, outermost first.
    pub fn symbol_stack(&self) -> &[SymbolId] {
        &self.symbols
    }

    pub fn resolver_depth(&self) -> usize {
        self.resolvers.len()
    }

    /// Number of tokens currently retained.
    pub fn buffered(&self) -> usize {
        self.tokens.len()
    }

    pub fn stats(&self) -> &ParserStats {
        &self.stats
    }

    pub fn ast(&self) -> Option<&Ast<T>> {
        self.ast.as_ref()
    }

    fn syntax_error<D: ParserData + ?Sized>(&self, data: &D, expected: Vec<TokenId>) -> ParseError {
        let token = self.current_token();
        ParseError::UnexpectedToken {
            found: token.map_or("nothing".into(), |t| data.token_name(t.token_id()).into()),
            expected: expected
                .into_iter()
                .map(|t| data.token_name(t).into())
                .collect(),
            span: token.and_then(Token::span),
        }
    }

    fn semantic_error(&self, message: impl Display) -> ParseError {
        ParseError::Semantic {
            message: message.to_string().into(),
            span: self.current_token().and_then(Token::span),
        }
    }

    pub fn dump_state<D: ParserData + ?Sized>(&self, data: &D) {
        let mut output = String::new();
        for frame in &self.stack {
            let s: std::string::String = match frame {
                Frame::End => "$".into(),
                Frame::Node(n) => format!("{:?}", data.node(*n)),
                Frame::Entered {
                    symbol,
                    speculative,
                } => format!(
                    "<{}{}>",
                    data.symbol_name(*symbol),
                    if *speculative { "?" } else { "" }
                ),
                Frame::Lookahead { dfa, entry } => format!("LaDfa({dfa}@{entry})"),
                Frame::Resolving => "Resolving".into(),
            };
            output.push_str(&s);
            output.push_str("  ");
        }
        log::trace!(
            "[{}] pos={}{} tokens={}..{}  {}",
            self.resolvers.len(),
            self.pos,
            if self.matched { "+" } else { "" },
            self.tokens.base(),
            self.tokens.end(),
            output
        );
    }
}

/// Token-driven LL(k) parser.
///
/// The caller feeds tokens one at a time through [`Parser::feed_token`] and
/// finishes with a token whose id is [`END`].
pub struct Parser<'d, D: ParserDriver> {
    data: &'d D::ParserData,
    driver: D,
    ctx: ParserCtx<D::Token>,
}

impl<'d, D: ParserDriver> Parser<'d, D> {
    pub fn new(data: &'d D::ParserData, driver: D) -> Self {
        Self {
            data,
            driver,
            ctx: ParserCtx::new(),
        }
    }

    pub fn ctx(&self) -> &ParserCtx<D::Token> {
        &self.ctx
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    pub fn stats(&self) -> ParserStats {
        self.ctx.stats.clone()
    }

    pub fn take_ast(&mut self) -> Option<Ast<D::Token>> {
        self.ctx.ast.take()
    }

    /// Prepares a parse of `symbol`. Any previous parse state is discarded.
    pub fn start_parse(&mut self, symbol: SymbolId, build_ast: bool) {
        self.ctx.reset(build_ast);
        self.ctx.stack.push(Frame::End);
        self.ctx.stack.push(Frame::Node(self.data.symbol_node(symbol)));
        self.ctx.status = Status::Running;
        log::trace!("start {}", self.data.symbol_name(symbol));
    }

    /// Feeds the next token and runs the parser until it needs another one.
    pub fn feed_token(&mut self, token: D::Token) -> Result<Feed, ParseError> {
        match self.ctx.status {
            Status::Idle => return Err(ParseError::NotStarted),
            Status::Done | Status::Failed => return Err(ParseError::Finished),
            Status::Running => {}
        }
        self.ctx.tokens.push(token);
        self.ctx.stats.tokens += 1;
        let result = self.run();
        match result {
            Ok(Feed::Done) => self.ctx.status = Status::Done,
            Ok(Feed::Continue) => {}
            Err(_) => self.ctx.status = Status::Failed,
        }
        let low = self.ctx.low_water();
        self.ctx.tokens.release(low);
        result
    }

    fn run(&mut self) -> Result<Feed, ParseError> {
        let data = self.data;
        loop {
            if log::log_enabled!(log::Level::Trace) {
                self.ctx.dump_state(data);
            }
            let Some(&frame) = self.ctx.stack.last() else {
                return Ok(Feed::Done);
            };
            let top = self.ctx.stack.len() - 1;
            match frame {
                Frame::End => {
                    let Some(id) = self.ctx.advance() else {
                        return Ok(Feed::Continue);
                    };
                    if id != END {
                        return Err(self.ctx.syntax_error(data, vec![END]));
                    }
                    self.ctx.stack.pop();
                    log::trace!("Accept");
                    return Ok(Feed::Done);
                }

                Frame::Entered {
                    symbol,
                    speculative,
                } => {
                    self.ctx.stack.pop();
                    self.ctx.symbols.pop();
                    if !speculative {
                        if data.callbacks(symbol).leave {
                            if let Err(e) = self.driver.leave(&self.ctx, symbol) {
                                return Err(self.ctx.semantic_error(e));
                            }
                        }
                        if let Some(ast) = self.ctx.ast.as_mut() {
                            ast.close();
                        }
                    }
                }

                Frame::Resolving => {
                    let Some(r) = self.ctx.resolvers.pop() else {
                        return Err(self.ctx.semantic_error("resolver stack underflow"));
                    };
                    log::trace!("Commit resolver, then {}", r.then);
                    self.ctx.pos = r.entry;
                    self.ctx.matched = false;
                    self.ctx.stack[top] = Frame::Node(r.then);
                }

                Frame::Lookahead { dfa, entry } => match data.dfa(dfa) {
                    DfaState::Leaf(production) => {
                        log::trace!("LaDfa {dfa} resolved to {production}");
                        self.ctx.pos = entry;
                        self.ctx.matched = false;
                        self.ctx.stack[top] = Frame::Node(production);
                    }
                    DfaState::Resolver {
                        resolver,
                        then,
                        otherwise,
                    } => {
                        log::trace!("LaDfa {dfa} enters resolver {resolver}");
                        self.ctx.resolvers.push(ResolverFrame {
                            frame: top,
                            entry,
                            resume: self.ctx.pos,
                            then,
                            otherwise,
                        });
                        self.ctx.stats.resolvers += 1;
                        self.ctx.pos = entry;
                        self.ctx.matched = false;
                        self.ctx.stack[top] = Frame::Resolving;
                        self.ctx.stack.push(Frame::Node(resolver));
                    }
                    DfaState::Switch { default } => {
                        let Some(id) = self.ctx.advance() else {
                            return Ok(Feed::Continue);
                        };
                        match (data.dfa_transition(dfa, id), default) {
                            (Some(next), _) => {
                                self.ctx.pos += 1;
                                self.ctx.stack[top] = Frame::Lookahead { dfa: next, entry };
                            }
                            (None, Some(production)) => {
                                self.ctx.pos = entry;
                                self.ctx.stack[top] = Frame::Node(production);
                            }
                            (None, None) => {
                                let err = self.ctx.syntax_error(data, data.dfa_expected(dfa));
                                self.fail(err)?;
                            }
                        }
                    }
                },

                Frame::Node(node) => {
                    if !self.step(node, top)? {
                        return Ok(Feed::Continue);
                    }
                }
            }
        }
    }

    /// Executes the node on top of the stack. Returns `false` when it needs a
    /// token that has not been fed yet.
    fn step(&mut self, node: NodeIndex, top: usize) -> Result<bool, ParseError> {
        let data = self.data;
        match data.node(node) {
            ParserNode::Token(expected) => {
                let Some(id) = self.ctx.advance() else {
                    return Ok(false);
                };
                let ok = if expected == ANY { id != END } else { id == expected };
                if !ok {
                    let err = self.ctx.syntax_error(data, vec![expected]);
                    return self.fail(err).map(|()| true);
                }
                self.ctx.stack.pop();
                self.ctx.matched = true;
                self.ctx.stats.matches += 1;
                if !self.ctx.is_speculating() {
                    if let Some(token) = self.ctx.tokens.get(self.ctx.pos).cloned() {
                        if let Some(slot) = self.ctx.armed.take() {
                            if self.ctx.locators.len() <= slot {
                                self.ctx.locators.resize(slot + 1, None);
                            }
                            self.ctx.locators[slot] = Some(token.clone());
                        }
                        if let Some(ast) = self.ctx.ast.as_mut() {
                            ast.token(token.clone());
                        }
                        self.ctx.last = Some(token);
                    }
                }
            }

            ParserNode::Symbol(symbol) => {
                let Some(id) = self.ctx.advance() else {
                    return Ok(false);
                };
                let production = match data.lookup(symbol, id) {
                    None if self.ctx.is_speculating() => data.empty_production(symbol),
                    found => found,
                };
                let Some(production) = production else {
                    let err = self.ctx.syntax_error(data, data.expected(symbol));
                    return self.fail(err).map(|()| true);
                };
                self.ctx.stack.pop();
                let speculative = self.ctx.is_speculating();
                if !speculative {
                    self.bind_arguments()?;
                    let Callbacks { enter, .. } = data.callbacks(symbol);
                    if enter {
                        if let Err(e) = self.driver.enter(&self.ctx, symbol) {
                            return Err(self.ctx.semantic_error(e));
                        }
                    }
                    if let Some(ast) = self.ctx.ast.as_mut() {
                        ast.open(symbol);
                    }
                }
                log::trace!("Enter {} -> {}", data.symbol_name(symbol), production);
                self.ctx.symbols.push(symbol);
                self.ctx.stack.push(Frame::Entered {
                    symbol,
                    speculative,
                });
                self.ctx.stack.push(Frame::Node(production));
            }

            ParserNode::Sequence(children) => {
                self.ctx.stack.pop();
                self.ctx
                    .stack
                    .extend(children.iter().rev().map(|&c| Frame::Node(c)));
            }

            ParserNode::Action(action) => {
                self.ctx.stack.pop();
                if let Err(e) = self.driver.action(&self.ctx, action) {
                    let err = self.ctx.semantic_error(e);
                    return self.fail(err).map(|()| true);
                }
            }

            ParserNode::Beacon(slot) => {
                self.ctx.stack.pop();
                if !self.ctx.is_speculating() {
                    self.ctx.armed = Some(slot);
                }
            }

            ParserNode::Epsilon | ParserNode::Argument(_) => {
                self.ctx.stack.pop();
            }

            ParserNode::LaDfa(dfa) => {
                if self.ctx.advance().is_none() {
                    return Ok(false);
                }
                self.ctx.stats.lookaheads += 1;
                self.ctx.stack[top] = Frame::Lookahead {
                    dfa,
                    entry: self.ctx.pos,
                };
            }
        }
        Ok(true)
    }

    /// Fires `argument` for the argument nodes directly below the top.
    fn bind_arguments(&mut self) -> Result<(), ParseError> {
        let data = self.data;
        let mut args = Vec::new();
        for frame in self.ctx.stack.iter().rev() {
            match frame {
                Frame::Node(n) => match data.node(*n) {
                    ParserNode::Argument(arg) => args.push(arg),
                    _ => break,
                },
                _ => break,
            }
        }
        for arg in args {
            if let Err(e) = self.driver.argument(&self.ctx, arg) {
                return Err(self.ctx.semantic_error(e));
            }
        }
        Ok(())
    }

    /// Reports `err`, or rolls back the innermost resolver when speculating.
    fn fail(&mut self, err: ParseError) -> Result<(), ParseError> {
        if self.ctx.is_speculating() {
            log::trace!("Rollback on {err}");
            self.rollback()
        } else {
            Err(err)
        }
    }

    /// Unwinds to the innermost resolver's decision and takes its else
    /// branch. Symbols entered above it are dropped without `leave`.
    fn rollback(&mut self) -> Result<(), ParseError> {
        let mut failed = None;
        while let Some(r) = self.ctx.resolvers.pop() {
            self.ctx.stats.rollbacks += 1;
            while self.ctx.stack.len() > r.frame + 1 {
                if let Some(Frame::Entered { .. }) = self.ctx.stack.pop() {
                    self.ctx.symbols.pop();
                }
            }
            self.ctx.matched = false;
            match r.otherwise {
                Some(DfaTarget::Dfa(dfa)) => {
                    self.ctx.pos = r.resume;
                    self.ctx.stack[r.frame] = Frame::Lookahead {
                        dfa,
                        entry: r.entry,
                    };
                    return Ok(());
                }
                Some(DfaTarget::Node(production)) => {
                    self.ctx.pos = r.entry;
                    self.ctx.stack[r.frame] = Frame::Node(production);
                    return Ok(());
                }
                None => {
                    self.ctx.pos = r.entry;
                    failed = Some(self.ctx.symbols.last().copied());
                    self.ctx.stack.truncate(r.frame);
                }
            }
        }
        let data = self.data;
        let token = self.ctx.current_token();
        Err(ParseError::NoViableAlternative {
            symbol: failed
                .flatten()
                .map_or("?".into(), |s| data.symbol_name(s).into()),
            found: token.map_or("nothing".into(), |t| data.token_name(t.token_id()).into()),
            span: token.and_then(Token::span),
        })
    }
}
