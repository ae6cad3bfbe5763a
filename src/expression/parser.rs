use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, char, multispace0, satisfy},
    combinator::{map, map_res, not, value},
    error::Error,
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
};

use super::{BinaryOp, Expr, Function};
use crate::error::ExpressionError;

type Res<'a, T> = IResult<&'a str, T>;

/// Parse a complete expression; anything left over is a syntax error.
pub(super) fn parse(source: &str) -> Result<Expr, ExpressionError> {
    if source.trim().is_empty() {
        return Err(ExpressionError::Empty);
    }

    let syntax = |remaining: &str| ExpressionError::Syntax {
        input: source.to_string(),
        remaining: remaining.to_string(),
    };

    match terminated(or_expr, multispace0).parse(source) {
        Ok(("", expr)) => Ok(expr),
        Ok((remaining, _)) => Err(syntax(remaining)),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(syntax(e.input)),
        Err(nom::Err::Incomplete(_)) => Err(syntax("")),
    }
}

fn ws<'a, O>(
    inner: impl Parser<&'a str, Output = O, Error = Error<&'a str>>,
) -> impl Parser<&'a str, Output = O, Error = Error<&'a str>> {
    delimited(multispace0, inner, multispace0)
}

// Word operators must not run into a following identifier ("mod" vs "model").
fn keyword<'a>(
    word: &'static str,
) -> impl Parser<&'a str, Output = &'a str, Error = Error<&'a str>> {
    terminated(
        tag(word),
        not(satisfy(|c: char| c.is_alphanumeric() || c == '_')),
    )
}

// Left-associative chain of `operand (operator operand)*`.
fn binary_chain<'a>(
    input: &'a str,
    operand: fn(&'a str) -> Res<'a, Expr>,
    operator: fn(&'a str) -> Res<'a, BinaryOp>,
) -> Res<'a, Expr> {
    let (input, first) = operand(input)?;
    let (input, rest) = many0(pair(ws(operator), operand)).parse(input)?;

    let expr = rest.into_iter().fold(first, |lhs, (op, rhs)| {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    });
    Ok((input, expr))
}

fn or_expr(input: &str) -> Res<'_, Expr> {
    binary_chain(input, and_expr, or_operator)
}

fn or_operator(input: &str) -> Res<'_, BinaryOp> {
    value(BinaryOp::Or, keyword("or")).parse(input)
}

fn and_expr(input: &str) -> Res<'_, Expr> {
    binary_chain(input, comparison, and_operator)
}

fn and_operator(input: &str) -> Res<'_, BinaryOp> {
    value(BinaryOp::And, keyword("and")).parse(input)
}

fn comparison(input: &str) -> Res<'_, Expr> {
    binary_chain(input, additive, comparison_operator)
}

fn comparison_operator(input: &str) -> Res<'_, BinaryOp> {
    alt((
        value(BinaryOp::Le, tag("<=")),
        value(BinaryOp::Ge, tag(">=")),
        value(BinaryOp::Ne, tag("!=")),
        value(BinaryOp::Lt, char('<')),
        value(BinaryOp::Gt, char('>')),
        value(BinaryOp::Eq, char('=')),
    ))
    .parse(input)
}

fn additive(input: &str) -> Res<'_, Expr> {
    binary_chain(input, multiplicative, additive_operator)
}

fn additive_operator(input: &str) -> Res<'_, BinaryOp> {
    alt((
        value(BinaryOp::Add, char('+')),
        value(BinaryOp::Sub, char('-')),
    ))
    .parse(input)
}

fn multiplicative(input: &str) -> Res<'_, Expr> {
    binary_chain(input, unary, multiplicative_operator)
}

fn multiplicative_operator(input: &str) -> Res<'_, BinaryOp> {
    alt((
        value(BinaryOp::Mul, char('*')),
        value(BinaryOp::Div, char('/')),
        value(BinaryOp::Div, keyword("div")),
        value(BinaryOp::Mod, keyword("mod")),
    ))
    .parse(input)
}

fn unary(input: &str) -> Res<'_, Expr> {
    preceded(
        multispace0,
        alt((
            map(preceded(char('-'), unary), |expr| Expr::Neg(Box::new(expr))),
            primary,
        )),
    )
    .parse(input)
}

fn primary(input: &str) -> Res<'_, Expr> {
    alt((
        number,
        call,
        delimited(char('('), ws(or_expr), char(')')),
    ))
    .parse(input)
}

/// Invariant-culture number literal: `12`, `0.5`, `.5`, `3.`
fn number(input: &str) -> Res<'_, Expr> {
    map(
        map_res(
            take_while1(|c: char| c.is_ascii_digit() || c == '.'),
            |literal: &str| literal.parse::<f64>(),
        ),
        Expr::Number,
    )
    .parse(input)
}

fn call(input: &str) -> Res<'_, Expr> {
    let (input, function) = map_res(alpha1, |name: &str| name.parse::<Function>()).parse(input)?;
    let (input, args) = delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), or_expr),
        preceded(multispace0, char(')')),
    )
    .parse(input)?;
    Ok((input, Expr::Call(function, args)))
}
