//! # Calculator Grammar
//!
//! ```text
//! Program  -> Stat Program | ε
//! Stat     -> @target ident '=' Expr ';' {assign}
//!           | Expr ';' {print}
//! Expr     -> Term ExprTail
//! ExprTail -> '+' Term {add} ExprTail | '-' Term {sub} ExprTail | ε
//! Term     -> Factor TermTail
//! TermTail -> '*' Factor {mul} TermTail | '/' Factor {div} TermTail | ε
//! Factor   -> @lit number {number} | @var ident {var}
//!           | '(' Expr ')' | '-' Factor {neg}
//! ```
//!
//! Both alternatives of `Stat` can start with `ident`; the table builder
//! resolves that conflict with a two-token lookahead DFA.

use crate::Lexeme;
use llk_gen::{BuildConfig, BuildError, Grammar, GrammarBuilder, NodeId, Tables};

/// Semantic actions of the calculator, in action-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Assign,
    Print,
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    Number,
    Var,
}

impl Op {
    pub const ALL: [Op; 9] = [
        Op::Assign,
        Op::Print,
        Op::Add,
        Op::Sub,
        Op::Mul,
        Op::Div,
        Op::Neg,
        Op::Number,
        Op::Var,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Op::Assign => "assign",
            Op::Print => "print",
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Mul => "mul",
            Op::Div => "div",
            Op::Neg => "neg",
            Op::Number => "number",
            Op::Var => "var",
        }
    }

    pub fn from_index(action: usize) -> Option<Op> {
        Op::ALL.get(action).copied()
    }
}

/// Locator slot of the literal operand.
pub const LIT: usize = 0;
/// Locator slot of the variable operand.
pub const VAR: usize = 1;
/// Locator slot of the assignment target.
pub const TARGET: usize = 2;

/// Builds the calculator grammar.
pub fn calc_grammar() -> Result<Grammar, BuildError> {
    let mut g = GrammarBuilder::new();

    // Interned first so that indices match `Op::ALL` and the slot constants.
    let [assign, print, add, sub, mul, div, neg, number_op, var_op] =
        Op::ALL.map(|op| g.action(op.name()));
    let [lit, var, target] = ["lit", "var", "target"].map(|name| g.beacon(name));

    let [ident, number, eq, plus, minus, star, slash, lparen, rparen, semi]: [NodeId;
        Lexeme::COUNT] = Lexeme::ALL.map(|l| g.token(l.name()));

    let program = g.symbol("Program");
    let stat = g.symbol("Stat");
    let expr = g.symbol("Expr");
    let expr_tail = g.symbol("ExprTail");
    let term = g.symbol("Term");
    let term_tail = g.symbol("TermTail");
    let factor = g.symbol("Factor");
    let eps = g.epsilon();

    let p = g.seq([stat, program]);
    g.alt(program, p).alt(program, eps);
    g.start(program).declare_nullable(program, true);

    let p = g.seq([target, ident, eq, expr, semi, assign]);
    g.alt(stat, p);
    let p = g.seq([expr, semi, print]);
    g.alt(stat, p).lookahead(stat, 2);

    let p = g.seq([term, expr_tail]);
    g.alt(expr, p);
    let p = g.seq([plus, term, add, expr_tail]);
    g.alt(expr_tail, p);
    let p = g.seq([minus, term, sub, expr_tail]);
    g.alt(expr_tail, p).alt(expr_tail, eps);

    let p = g.seq([factor, term_tail]);
    g.alt(term, p);
    let p = g.seq([star, factor, mul, term_tail]);
    g.alt(term_tail, p);
    let p = g.seq([slash, factor, div, term_tail]);
    g.alt(term_tail, p).alt(term_tail, eps);

    let p = g.seq([lit, number, number_op]);
    g.alt(factor, p);
    let p = g.seq([var, ident, var_op]);
    g.alt(factor, p);
    let p = g.seq([lparen, expr, rparen]);
    g.alt(factor, p);
    let p = g.seq([minus, factor, neg]);
    g.alt(factor, p);

    g.finish()
}

/// Builds the calculator grammar and its tables.
pub fn calc_tables(config: &BuildConfig) -> Result<Tables, BuildError> {
    llk_gen::build(&calc_grammar()?, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use llk_gen::TableNode;

    #[test]
    fn indices_follow_declaration_order() {
        let tables = calc_tables(&BuildConfig::default()).unwrap();
        for (i, op) in Op::ALL.iter().enumerate() {
            assert_eq!(tables.action(op.name()), Some(i));
            assert_eq!(Op::from_index(i), Some(*op));
        }
        assert_eq!(tables.beacon("lit"), Some(LIT));
        assert_eq!(tables.beacon("var"), Some(VAR));
        assert_eq!(tables.beacon("target"), Some(TARGET));
    }

    #[test]
    fn statement_conflict_needs_a_dfa() {
        let tables = calc_tables(&BuildConfig::default()).unwrap();
        let stat = tables.symbol("Stat").unwrap();
        let ident = tables.token("ident").unwrap();
        let entry = tables.entry(stat, ident).unwrap();
        assert!(matches!(tables.nodes()[entry], TableNode::LaDfa(_)));
        assert!(!tables.dfas().is_empty());
    }

    #[test]
    fn single_token_lookahead_is_not_enough() {
        assert!(matches!(
            calc_tables(&BuildConfig::default().with_lookahead(1)),
            Err(BuildError::Ambiguity { .. })
        ));
    }
}
