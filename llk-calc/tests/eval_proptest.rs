//! Property-based tests for the calculator pipeline.
//!
//! Random expression trees are rendered to source text, evaluated through the
//! generated tables and compared with a direct evaluation of the tree.

use llk_calc::{CalcError, CalcParser, SymTab};
use llk_gen::BuildConfig;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Expr {
    Num(i64),
    Var(usize),
    Neg(Box<Expr>),
    Bin(char, Box<Expr>, Box<Expr>),
}

const VARS: [(&str, i64); 3] = [("a", 3), ("b", -5), ("c", 11)];

impl Expr {
    fn render(&self, out: &mut String) {
        match self {
            Expr::Num(n) => out.push_str(&n.to_string()),
            Expr::Var(i) => out.push_str(VARS[*i].0),
            Expr::Neg(e) => {
                out.push_str("-(");
                e.render(out);
                out.push(')');
            }
            Expr::Bin(op, a, b) => {
                out.push('(');
                a.render(out);
                out.push(' ');
                out.push(*op);
                out.push(' ');
                b.render(out);
                out.push(')');
            }
        }
    }

    /// `None` on overflow or division by zero.
    fn value(&self) -> Option<i64> {
        match self {
            Expr::Num(n) => Some(*n),
            Expr::Var(i) => Some(VARS[*i].1),
            Expr::Neg(e) => e.value()?.checked_neg(),
            Expr::Bin(op, a, b) => {
                let (a, b) = (a.value()?, b.value()?);
                match op {
                    '+' => a.checked_add(b),
                    '-' => a.checked_sub(b),
                    '*' => a.checked_mul(b),
                    _ => a.checked_div(b),
                }
            }
        }
    }
}

fn expr_strategy() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (0i64..1000).prop_map(Expr::Num),
        (0usize..VARS.len()).prop_map(Expr::Var),
    ];
    leaf.prop_recursive(6, 64, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|e| Expr::Neg(Box::new(e))),
            (
                prop_oneof![Just('+'), Just('-'), Just('*'), Just('/')],
                inner.clone(),
                inner
            )
                .prop_map(|(op, a, b)| Expr::Bin(op, Box::new(a), Box::new(b))),
        ]
    })
}

fn prelude() -> String {
    VARS.iter()
        .map(|(name, value)| format!("{name} = {value};\n"))
        .collect()
}

proptest! {
    #[test]
    fn evaluation_matches_the_tree(expr in expr_strategy()) {
        let calc = CalcParser::new(&BuildConfig::default()).unwrap();
        let mut source = prelude();
        expr.render(&mut source);
        source.push_str(";\n");
        let result = calc.eval(&source, &mut SymTab::new());
        match expr.value() {
            Some(v) => {
                let values = result.unwrap();
                prop_assert_eq!(values.last().copied(), Some(v));
                prop_assert_eq!(values.len(), VARS.len() + 1);
            }
            None => {
                let arithmetic = matches!(
                    result,
                    Err(CalcError::DivisionByZero { .. } | CalcError::Overflow { .. })
                );
                prop_assert!(arithmetic, "unexpected {:?}", result);
            }
        }
    }

    #[test]
    fn rebuilding_tables_is_deterministic(lookahead in 2usize..6) {
        let config = BuildConfig::default().with_lookahead(lookahead);
        let a = CalcParser::new(&config).unwrap();
        let b = CalcParser::new(&config).unwrap();
        prop_assert_eq!(a.tables(), b.tables());
    }

    #[test]
    fn whitespace_does_not_change_results(expr in expr_strategy(), pad in " {0,3}") {
        let calc = CalcParser::new(&BuildConfig::default()).unwrap();
        let mut compact = prelude();
        expr.render(&mut compact);
        compact.push(';');
        let spaced: String = compact
            .chars()
            .flat_map(|c| {
                let sep = if c.is_ascii_alphanumeric() { "" } else { pad.as_str() };
                std::iter::once(c).chain(sep.chars())
            })
            .collect();
        let a = calc.eval(&compact, &mut SymTab::new());
        let b = calc.eval(&spaced, &mut SymTab::new());
        match (a, b) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(_), Err(_)) => {}
            (a, b) => prop_assert!(false, "{:?} vs {:?}", a, b),
        }
    }
}
