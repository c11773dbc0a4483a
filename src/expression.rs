//! Text form of conditional expressions, e.g.
//! `$(HTTP_COOKIE{tier}) == 'gold' & ($(QUERY_STRING{beta}) != '' | $(HTTP_HOST) == 'beta.example.com')`.
//!
//! `&` and `|` chains become a [`GroupExpression`] folded left to right,
//! with no precedence between the two operators. Parentheses nest groups.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, opt, value},
    error::{context, convert_error, VerboseError},
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
    Finish, IResult,
};
use thiserror::Error;

use crate::ast::{
    BooleanExpression, BooleanOperator, ComparisonExpression, ComparisonOperator, GroupExpression,
    ValueExpression, VariableExpression,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExpressionParseError {
    #[error("Empty expression")]
    Empty,
    #[error("Invalid expression: {0}")]
    Syntax(String),
}

pub type ParserResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Parses the text of an ESI `test` attribute.
pub fn parse_expression(input: &str) -> Result<BooleanExpression, ExpressionParseError> {
    if input.trim().is_empty() {
        return Err(ExpressionParseError::Empty);
    }
    all_consuming(delimited(multispace0, parse_chain, multispace0))(input)
        .finish()
        .map(|(_, expression)| expression)
        .map_err(|e| ExpressionParseError::Syntax(convert_error(input, e)))
}

fn ws<'a, O>(
    inner: impl FnMut(&'a str) -> ParserResult<'a, O>,
) -> impl FnMut(&'a str) -> ParserResult<'a, O> {
    delimited(multispace0, inner, multispace0)
}

#[tracing::instrument(level = "trace", skip(input))]
fn parse_chain(input: &str) -> ParserResult<BooleanExpression> {
    context(
        "boolean chain",
        map(
            pair(
                parse_term,
                many0(pair(ws(parse_boolean_operator), parse_term)),
            ),
            |(first, rest)| {
                if rest.is_empty() {
                    return first;
                }
                rest.into_iter()
                    .fold(GroupExpression::starting_with(first), |group, (op, term)| {
                        group.push(op, term)
                    })
                    .into()
            },
        ),
    )(input)
}

fn parse_term(input: &str) -> ParserResult<BooleanExpression> {
    context(
        "term",
        alt((
            map(
                delimited(ws(char('(')), parse_chain, ws(char(')'))),
                |inner| match inner {
                    BooleanExpression::Group(group) => BooleanExpression::Group(group),
                    comparison => GroupExpression::starting_with(comparison).into(),
                },
            ),
            map(parse_comparison, BooleanExpression::Comparison),
        )),
    )(input)
}

#[tracing::instrument(level = "trace", skip(input))]
fn parse_comparison(input: &str) -> ParserResult<ComparisonExpression> {
    context(
        "comparison",
        map(
            tuple((
                ws(parse_value),
                ws(parse_comparison_operator),
                ws(parse_value),
            )),
            |(left, operator, right)| ComparisonExpression::new(left, operator, right),
        ),
    )(input)
}

fn parse_boolean_operator(input: &str) -> ParserResult<BooleanOperator> {
    context(
        "boolean operator",
        alt((
            value(BooleanOperator::And, alt((tag("&&"), tag("&")))),
            value(BooleanOperator::Or, alt((tag("||"), tag("|")))),
        )),
    )(input)
}

fn parse_comparison_operator(input: &str) -> ParserResult<ComparisonOperator> {
    context(
        "comparison operator",
        alt((
            value(ComparisonOperator::GreaterOrEqual, tag(">=")),
            value(ComparisonOperator::LessOrEqual, tag("<=")),
            value(ComparisonOperator::Equal, tag("==")),
            value(ComparisonOperator::NotEqual, tag("!=")),
            value(ComparisonOperator::GreaterThan, tag(">")),
            value(ComparisonOperator::LessThan, tag("<")),
        )),
    )(input)
}

fn parse_value(input: &str) -> ParserResult<ValueExpression> {
    context(
        "value",
        alt((
            map(parse_variable, ValueExpression::Variable),
            map(parse_string_literal, ValueExpression::Constant),
        )),
    )(input)
}

fn parse_string_literal(input: &str) -> ParserResult<String> {
    context(
        "string literal",
        map(
            delimited(char('\''), take_till(|c: char| c == '\''), char('\'')),
            str::to_string,
        ),
    )(input)
}

fn parse_identifier(input: &str) -> ParserResult<&str> {
    context(
        "variable name",
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    )(input)
}

fn parse_variable_key(input: &str) -> ParserResult<String> {
    context(
        "variable key",
        delimited(
            char('{'),
            alt((
                parse_string_literal,
                map(take_till(|c: char| c == '}'), |key: &str| key.trim().to_string()),
            )),
            char('}'),
        ),
    )(input)
}

fn parse_variable(input: &str) -> ParserResult<VariableExpression> {
    context(
        "variable",
        map(
            preceded(
                tag("$("),
                tuple((parse_identifier, opt(parse_variable_key), char(')'))),
            ),
            |(name, key, _)| VariableExpression {
                name: name.to_string(),
                key,
            },
        ),
    )(input)
}
