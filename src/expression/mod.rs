//! Invariant-culture arithmetic evaluator for rule expressions.
//!
//! This is the XPath-flavoured subset that rule data files are written in:
//! `+ - * / div mod`, comparisons, `and`/`or` and a handful of functions.
//! Names such as `Rating` or `Body` must already be substituted away; any
//! identifier still present is a syntax error.

mod parser;

use strum_macros::{EnumString, IntoStaticStr};

use crate::error::ExpressionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => lhs / rhs,
            // XPath `mod` truncates like the remainder operator.
            BinaryOp::Mod => lhs % rhs,
            BinaryOp::Eq => truth(lhs == rhs),
            BinaryOp::Ne => truth(lhs != rhs),
            BinaryOp::Lt => truth(lhs < rhs),
            BinaryOp::Le => truth(lhs <= rhs),
            BinaryOp::Gt => truth(lhs > rhs),
            BinaryOp::Ge => truth(lhs >= rhs),
            BinaryOp::And => truth(lhs != 0.0 && rhs != 0.0),
            BinaryOp::Or => truth(lhs != 0.0 || rhs != 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Function {
    Floor,
    Ceiling,
    Round,
    Abs,
    Number,
    Min,
    Max,
    Not,
    True,
    False,
}

impl Function {
    // (minimum, maximum) argument count; `None` means unbounded.
    fn arity(self) -> (usize, Option<usize>) {
        match self {
            Function::True | Function::False => (0, Some(0)),
            Function::Min | Function::Max => (1, None),
            _ => (1, Some(1)),
        }
    }

    fn call(self, args: &[f64]) -> Result<f64, ExpressionError> {
        let (min, max) = self.arity();
        if args.len() < min || max.is_some_and(|max| args.len() > max) {
            return Err(ExpressionError::Arity {
                name: self.into(),
                expected: min,
                got: args.len(),
            });
        }

        Ok(match self {
            Function::Floor => args[0].floor(),
            Function::Ceiling => args[0].ceil(),
            // XPath round(): halves go toward positive infinity.
            Function::Round => (args[0] + 0.5).floor(),
            Function::Abs => args[0].abs(),
            Function::Number => args[0],
            Function::Not => truth(args[0] == 0.0),
            Function::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
            Function::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Function::True => 1.0,
            Function::False => 0.0,
        })
    }
}

fn truth(condition: bool) -> f64 {
    if condition { 1.0 } else { 0.0 }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

impl Expr {
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        parser::parse(source)
    }

    pub fn eval(&self) -> Result<f64, ExpressionError> {
        match self {
            Expr::Number(n) => Ok(*n),
            Expr::Neg(inner) => Ok(-inner.eval()?),
            Expr::Binary(op, lhs, rhs) => Ok(op.apply(lhs.eval()?, rhs.eval()?)),
            Expr::Call(function, args) => {
                let values = args
                    .iter()
                    .map(Expr::eval)
                    .collect::<Result<Vec<_>, _>>()?;
                function.call(&values)
            }
        }
    }
}

/// Parse and evaluate `source`, rejecting results that are not finite.
pub fn evaluate_invariant(source: &str) -> Result<f64, ExpressionError> {
    let value = Expr::parse(source)?.eval()?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ExpressionError::NotFinite(source.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> f64 {
        evaluate_invariant(source).expect("expression should evaluate")
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(eval("2 + 3 * 4"), 14.0);
        assert_eq!(eval("(2 + 3) * 4"), 20.0);
        assert_eq!(eval("10 - 4 - 3"), 3.0);
        assert_eq!(eval("12 div 2 div 3"), 2.0);
        assert_eq!(eval("7 mod 4"), 3.0);
        assert_eq!(eval("3*2-4"), 2.0);
    }

    #[test]
    fn test_unary_minus_and_decimals() {
        assert_eq!(eval("-3 + 5"), 2.0);
        assert_eq!(eval("2 - -1"), 3.0);
        assert_eq!(eval("0.5 * 4"), 2.0);
        assert_eq!(eval(".25 * 8"), 2.0);
        assert_eq!(eval("16000 * 0.1"), 1600.0);
    }

    #[test]
    fn test_trailing_decimal_literal_keeps_fraction() {
        assert_eq!(eval("0.1"), 0.1);
        assert_eq!(eval("3 * 2.5"), 7.5);
        assert_eq!(eval("1 + 0.5"), 1.5);
        assert_eq!(eval("4 * .25"), 1.0);
        assert_eq!(eval("3."), 3.0);
        assert_eq!(Expr::parse("2.5"), Ok(Expr::Number(2.5)));
        assert!(matches!(
            evaluate_invariant("1.2.3"),
            Err(ExpressionError::Syntax { .. })
        ));
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(eval("3 > 2"), 1.0);
        assert_eq!(eval("3 <= 2"), 0.0);
        assert_eq!(eval("2 != 2"), 0.0);
        assert_eq!(eval("1 = 1 and 2 > 3"), 0.0);
        assert_eq!(eval("1 = 1 or 2 > 3"), 1.0);
        assert_eq!(eval("number(4 > 3) * 10"), 10.0);
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("ceiling(7 div 3)"), 3.0);
        assert_eq!(eval("floor(7 div 3)"), 2.0);
        assert_eq!(eval("round(2.5)"), 3.0);
        assert_eq!(eval("round(-2.5)"), -2.0);
        assert_eq!(eval("max(1, 6, 3)"), 6.0);
        assert_eq!(eval("min(4, 2)"), 2.0);
        assert_eq!(eval("not(0)"), 1.0);
        assert_eq!(eval("true() + true()"), 2.0);
    }

    #[test]
    fn test_failures() {
        assert_eq!(evaluate_invariant(""), Err(ExpressionError::Empty));
        assert_eq!(evaluate_invariant("   "), Err(ExpressionError::Empty));
        assert!(matches!(
            evaluate_invariant("Rating * 2"),
            Err(ExpressionError::Syntax { .. })
        ));
        assert!(matches!(
            evaluate_invariant("2 +"),
            Err(ExpressionError::Syntax { .. })
        ));
        assert!(matches!(
            evaluate_invariant("4 / 0"),
            Err(ExpressionError::NotFinite(_))
        ));
        assert!(matches!(
            evaluate_invariant("floor(1, 2)"),
            Err(ExpressionError::Arity { name: "floor", .. })
        ));
    }
}
