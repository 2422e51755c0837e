//! # Calculator Parser
//!
//! This module couples the calculator tables with the semantic actions that
//! evaluate statements. It exposes:
//!
//! - [`CalcParserDriver`]: the [`ParserDriver`] keeping the value stack and
//!   the variable table,
//! - [`CalcParser`]: owns the built tables and evaluates whole sources.
//!
//! ## Behavior highlights
//! - Operands are read through locators: the `number` and `var` actions look
//!   at the token captured by the beacon in front of them.
//! - **Assignments** store the value in the symbol table and evaluate to the
//!   assigned value.
//! - Arithmetic is checked; overflow and division by zero are errors that
//!   point at the operator's right operand.

use crate::grammar::{LIT, Op, TARGET, VAR};
use crate::lexer::{CalcLexer, TokenMap};
use crate::{CalcError, CalcToken, SymTab, TokenValue, calc_tables};
use llk::{END, Feed, ParseError, Parser, ParserCtx, ParserDriver, Span, Token};
use llk_gen::{BuildConfig, Tables};

/// Evaluates calculator statements as the parser commits them.
pub struct CalcParserDriver<'s> {
    symtab: &'s mut SymTab,
    values: Vec<i64>,
    results: Vec<i64>,
    /// Typed copy of the last error returned to the runtime.
    failure: Option<CalcError>,
}

impl<'s> CalcParserDriver<'s> {
    pub fn new(symtab: &'s mut SymTab) -> Self {
        Self {
            symtab,
            values: Vec::new(),
            results: Vec::new(),
            failure: None,
        }
    }

    /// Values of the statements evaluated so far.
    pub fn results(&self) -> &[i64] {
        &self.results
    }

    fn pop(&mut self) -> Result<i64, CalcError> {
        self.values
            .pop()
            .ok_or(CalcError::Internal("value stack underflow"))
    }

    fn ident(ctx: &ParserCtx<CalcToken>, slot: usize) -> Result<(&str, Option<Span>), CalcError> {
        match ctx.locator(slot) {
            Some(CalcToken {
                value: TokenValue::Ident(name),
                span,
                ..
            }) => Ok((name.as_str(), *span)),
            _ => Err(CalcError::Internal("identifier locator not bound")),
        }
    }

    fn binary(
        &mut self,
        ctx: &ParserCtx<CalcToken>,
        f: fn(i64, i64) -> Option<i64>,
    ) -> Result<(), CalcError> {
        let b = self.pop()?;
        let a = self.pop()?;
        let value = f(a, b).ok_or_else(|| CalcError::Overflow {
            span: ctx.last_token().and_then(Token::span),
        })?;
        self.values.push(value);
        Ok(())
    }

    fn apply(&mut self, ctx: &ParserCtx<CalcToken>, op: Op) -> Result<(), CalcError> {
        match op {
            Op::Number => match ctx.locator(LIT) {
                Some(CalcToken {
                    value: TokenValue::Number(n),
                    ..
                }) => self.values.push(*n),
                _ => return Err(CalcError::Internal("literal locator not bound")),
            },
            Op::Var => {
                let (name, span) = Self::ident(ctx, VAR)?;
                let value = self.symtab.get(name).ok_or_else(|| CalcError::UndefinedVariable {
                    name: name.into(),
                    span,
                })?;
                self.values.push(value);
            }
            Op::Add => self.binary(ctx, i64::checked_add)?,
            Op::Sub => self.binary(ctx, i64::checked_sub)?,
            Op::Mul => self.binary(ctx, i64::checked_mul)?,
            Op::Div => {
                if self.values.last() == Some(&0) {
                    return Err(CalcError::DivisionByZero {
                        span: ctx.last_token().and_then(Token::span),
                    });
                }
                self.binary(ctx, i64::checked_div)?;
            }
            Op::Neg => {
                let a = self.pop()?;
                let value = a.checked_neg().ok_or_else(|| CalcError::Overflow {
                    span: ctx.last_token().and_then(Token::span),
                })?;
                self.values.push(value);
            }
            Op::Assign => {
                let value = self.pop()?;
                let (name, _) = Self::ident(ctx, TARGET)?;
                self.symtab.set(name, value);
                log::debug!("{name} = {value}");
                self.results.push(value);
            }
            Op::Print => {
                let value = self.pop()?;
                self.results.push(value);
            }
        }
        Ok(())
    }
}

impl ParserDriver for CalcParserDriver<'_> {
    type ParserData = Tables;
    type Token = CalcToken;
    type Error = CalcError;

    fn action(&mut self, ctx: &ParserCtx<CalcToken>, action: usize) -> Result<(), CalcError> {
        let op = Op::from_index(action).ok_or(CalcError::Internal("unknown action"))?;
        self.apply(ctx, op).inspect_err(|e| self.failure = Some(e.clone()))
    }
}

/// The calculator: built tables plus the lexeme-to-terminal map.
#[derive(Debug, Clone)]
pub struct CalcParser {
    tables: Tables,
    map: TokenMap,
}

impl CalcParser {
    pub fn new(config: &BuildConfig) -> Result<Self, CalcError> {
        let tables = calc_tables(config)?;
        let map = TokenMap::new(&tables)?;
        Ok(Self { tables, map })
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Evaluates every statement of `source` and returns their values.
    ///
    /// Variables live in `symtab` and survive across calls; statements that
    /// completed before an error keep their assignments.
    pub fn eval(&self, source: &str, symtab: &mut SymTab) -> Result<Vec<i64>, CalcError> {
        let mut parser = Parser::new(&self.tables, CalcParserDriver::new(symtab));
        parser.start_parse(self.tables.start(), false);
        let mut lexer = CalcLexer::new(source, self.map);
        for token in lexer.by_ref() {
            Self::feed(&mut parser, token?)?;
        }
        let end = CalcToken {
            token_id: END,
            value: TokenValue::None,
            span: lexer.end_span(),
        };
        match Self::feed(&mut parser, end)? {
            Feed::Done => {}
            Feed::Continue => return Err(CalcError::Internal("parser did not finish")),
        }
        log::info!("{:?}", parser.stats());
        Ok(parser.into_driver().results)
    }

    fn feed(parser: &mut Parser<CalcParserDriver>, token: CalcToken) -> Result<Feed, CalcError> {
        match parser.feed_token(token) {
            Ok(feed) => Ok(feed),
            Err(ParseError::Semantic { message, span }) => Err(parser
                .driver_mut()
                .failure
                .take()
                .unwrap_or(ParseError::Semantic { message, span }.into())),
            Err(e) => Err(e.into()),
        }
    }
}
