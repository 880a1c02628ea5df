//! The parslet registry driving the precedence-climbing parser.
//!
//! Every token class that can start an expression has a *prefix* parslet.
//! Every token class that can continue one has an *infix* parslet together
//! with a [`BindingPower`]. Binary operators use a right power slightly above
//! their left power, which makes chains of equal precedence group to the left.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::ast::{AstNode, Expr, Operator};
use crate::diagnostics::PretextError;
use crate::syntax::parser::Parser;
use crate::syntax::token::{Keyword, Token, TokenKind};
use crate::{err_ctx, err_msg};

/// Right binding power of `=`, shared with indexed assignment.
const ASSIGN_RIGHT: f32 = 1.1;

// ============================================================================
// CORE TYPES
// ============================================================================

pub type PrefixParslet =
    Box<dyn Fn(&mut Parser<'_>, Token) -> Result<AstNode, PretextError> + Send + Sync>;

pub type InfixParslet =
    Box<dyn Fn(&mut Parser<'_>, AstNode, Token) -> Result<AstNode, PretextError> + Send + Sync>;

/// How tightly an infix or postfix operator binds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindingPower {
    /// Compared against the caller's minimum precedence.
    pub left: f32,
    /// Minimum precedence for the right operand; `None` for postfix forms
    /// and forms with their own closing delimiter.
    pub right: Option<f32>,
}

/// The key parslets are registered under. Literal categories match on the
/// category alone; operators, punctuation and keywords also match on payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
    Number,
    String,
    Identifier,
    None,
    Operator(&'static str),
    Punct(char),
    Keyword(Keyword),
}

impl TokenClass {
    pub fn of(kind: &TokenKind) -> Option<TokenClass> {
        match kind {
            TokenKind::Number(_) => Some(TokenClass::Number),
            TokenKind::String(_) => Some(TokenClass::String),
            TokenKind::Identifier(_) => Some(TokenClass::Identifier),
            TokenKind::None => Some(TokenClass::None),
            TokenKind::Operator(op) => Some(TokenClass::Operator(*op)),
            TokenKind::Punct(c) => Some(TokenClass::Punct(*c)),
            TokenKind::Keyword(k) => Some(TokenClass::Keyword(*k)),
            TokenKind::Native(_) | TokenKind::Eof => None,
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Default)]
pub struct Grammar {
    prefix: HashMap<TokenClass, PrefixParslet>,
    infix: HashMap<TokenClass, (InfixParslet, BindingPower)>,
}

impl Grammar {
    pub fn prefix_for(&self, kind: &TokenKind) -> Option<&PrefixParslet> {
        self.prefix.get(&TokenClass::of(kind)?)
    }

    pub fn infix_for(&self, kind: &TokenKind) -> Option<&(InfixParslet, BindingPower)> {
        self.infix.get(&TokenClass::of(kind)?)
    }

    pub fn register_prefix<F>(&mut self, class: TokenClass, parslet: F)
    where
        F: Fn(&mut Parser<'_>, Token) -> Result<AstNode, PretextError> + Send + Sync + 'static,
    {
        self.prefix.insert(class, Box::new(parslet));
    }

    pub fn register_infix<F>(&mut self, class: TokenClass, parslet: F, power: BindingPower)
    where
        F: Fn(&mut Parser<'_>, AstNode, Token) -> Result<AstNode, PretextError>
            + Send
            + Sync
            + 'static,
    {
        self.infix.insert(class, (Box::new(parslet), power));
    }

    pub fn register_terminal(&mut self, class: TokenClass) {
        self.register_prefix(class, |_, token| parse_terminal(token));
    }

    pub fn register_unary(&mut self, symbol: &'static str, op: Operator, precedence: f32) {
        self.register_prefix(
            TokenClass::Operator(symbol),
            move |parser, token| {
                let operand = parser.parse_expression(precedence)?;
                let span = token.span.join(&operand.span);
                Ok(Expr::Operation {
                    op,
                    operands: vec![operand],
                }
                .at(span))
            },
        );
    }

    pub fn register_binary(&mut self, symbol: &'static str, op: Operator, powers: (f32, f32)) {
        let (left, right) = powers;
        self.register_infix(
            TokenClass::Operator(symbol),
            move |parser, lhs, _| {
                let rhs = parser.parse_expression(right)?;
                let span = lhs.span.join(&rhs.span);
                Ok(Expr::Operation {
                    op,
                    operands: vec![lhs, rhs],
                }
                .at(span))
            },
            BindingPower {
                left,
                right: Some(right),
            },
        );
    }

    pub fn register_postfix(&mut self, symbol: &'static str, op: Operator, precedence: f32) {
        self.register_infix(
            TokenClass::Operator(symbol),
            move |_, operand, token| {
                let span = operand.span.join(&token.span);
                Ok(Expr::Operation {
                    op,
                    operands: vec![operand],
                }
                .at(span))
            },
            BindingPower {
                left: precedence,
                right: None,
            },
        );
    }

    /// The Pretext expression grammar.
    pub fn standard() -> Self {
        let mut g = Grammar::default();

        g.register_terminal(TokenClass::Number);
        g.register_terminal(TokenClass::String);
        g.register_terminal(TokenClass::Identifier);
        g.register_terminal(TokenClass::None);

        g.register_prefix(TokenClass::Keyword(Keyword::If), parse_if);
        g.register_prefix(TokenClass::Keyword(Keyword::Loop), parse_loop);
        g.register_prefix(TokenClass::Punct('('), parse_group);
        g.register_prefix(TokenClass::Operator("["), parse_list);
        g.register_unary("-", Operator::Negate, 10.0);

        g.register_binary(";", Operator::Sequence, (0.0, 0.1));
        g.register_binary("in", Operator::In, (1.0, 1.1));
        g.register_binary("=", Operator::Assign, (1.0, ASSIGN_RIGHT));
        g.register_binary(":=", Operator::Declare, (1.0, 1.1));
        g.register_binary("<", Operator::Less, (1.0, 1.1));
        g.register_binary("||", Operator::Or, (1.0, 1.1));
        g.register_binary(">=", Operator::GreaterEqual, (2.0, 2.1));
        g.register_binary("<=", Operator::LessEqual, (2.0, 2.1));
        g.register_binary("==", Operator::Equal, (2.0, 2.1));
        g.register_binary("+", Operator::Add, (2.0, 2.1));
        g.register_binary("-", Operator::Sub, (2.0, 2.1));
        g.register_binary("*", Operator::Mul, (3.0, 3.1));
        g.register_binary("/", Operator::Div, (3.0, 3.1));

        g.register_postfix("!", Operator::Factorial, 11.0);
        g.register_postfix("...", Operator::Spread, 12.0);
        g.register_postfix("++", Operator::Increment, 2.0);
        g.register_postfix("--", Operator::Decrement, 2.0);

        g.register_infix(
            TokenClass::Operator("["),
            parse_index,
            BindingPower {
                left: 13.0,
                right: None,
            },
        );
        g.register_infix(
            TokenClass::Punct('('),
            parse_application,
            BindingPower {
                left: 100.0,
                right: None,
            },
        );

        g
    }
}

pub static GRAMMAR: Lazy<Grammar> = Lazy::new(Grammar::standard);

// ============================================================================
// PARSLETS
// ============================================================================

fn parse_terminal(token: Token) -> Result<AstNode, PretextError> {
    let expr = match token.kind {
        TokenKind::Number(n) => Expr::Number(n),
        TokenKind::String(s) => Expr::String(s),
        TokenKind::Identifier(name) => Expr::Identifier(name),
        TokenKind::None => Expr::None,
        other => return Err(err_msg!(Parse, "Token {} is not a literal", other)),
    };
    Ok(expr.at(token.span))
}

fn parse_if(parser: &mut Parser<'_>, token: Token) -> Result<AstNode, PretextError> {
    let condition = parser.parse_expression(-1.0)?;
    let (then_block, mut end) = parser.parse_block()?;
    let else_block = if parser.tokens().peek()?.is_keyword(Keyword::Else) {
        parser.tokens().consume()?;
        let (block, block_end) = parser.parse_block()?;
        end = block_end;
        block
    } else {
        Vec::new().into()
    };
    Ok(Expr::If {
        condition,
        then_block,
        else_block,
    }
    .at(token.span.join(&end)))
}

fn parse_loop(parser: &mut Parser<'_>, token: Token) -> Result<AstNode, PretextError> {
    parser.expect_punct('(')?;
    let condition = parser.parse_expression(-1.0)?;
    parser.expect_punct(')')?;
    let (body, end) = parser.parse_block()?;
    Ok(Expr::Loop { condition, body }.at(token.span.join(&end)))
}

fn parse_group(parser: &mut Parser<'_>, _token: Token) -> Result<AstNode, PretextError> {
    let inner = parser.parse_expression(-1.0)?;
    parser.expect_punct(')')?;
    Ok(inner)
}

/// Comma-separated expressions up to (and including) `close`.
fn parse_separated(
    parser: &mut Parser<'_>,
    close: char,
) -> Result<(Vec<AstNode>, Token), PretextError> {
    let mut items = Vec::new();
    while !parser.tokens().peek()?.is_punct(close) {
        items.push(parser.parse_expression(-1.0)?);
        if !parser.tokens().peek()?.is_punct(close) {
            parser.expect_punct(',')?;
        }
    }
    let closing = parser.tokens().next_token()?;
    Ok((items, closing))
}

fn parse_list(parser: &mut Parser<'_>, token: Token) -> Result<AstNode, PretextError> {
    let (items, closing) = parse_separated(parser, ']')?;
    Ok(Expr::List(items).at(token.span.join(&closing.span)))
}

fn parse_index(parser: &mut Parser<'_>, target: AstNode, _token: Token) -> Result<AstNode, PretextError> {
    let index = parser.parse_expression(-1.0)?;
    let closing = parser.expect_punct(']')?;

    // The stored value binds like the right side of a plain `=`.
    if parser.tokens().peek()?.is_operator("=") {
        parser.tokens().consume()?;
        let value = parser.parse_expression(ASSIGN_RIGHT)?;
        let span = target.span.join(&value.span);
        return Ok(Expr::Operation {
            op: Operator::IndexAssign,
            operands: vec![target, index, value],
        }
        .at(span));
    }

    let span = target.span.join(&closing.span);
    Ok(Expr::Operation {
        op: Operator::Index,
        operands: vec![target, index],
    }
    .at(span))
}

fn parse_application(
    parser: &mut Parser<'_>,
    callee: AstNode,
    _token: Token,
) -> Result<AstNode, PretextError> {
    let Some(name) = callee.value.as_identifier().map(str::to_string) else {
        return Err(err_ctx!(
            Parse,
            format!("Only identifiers can be applied, found {}", callee.value.pretty()),
            callee.span
        ));
    };
    let (args, closing) = parse_separated(parser, ')')?;
    Ok(Expr::Application { callee: name, args }.at(callee.span.join(&closing.span)))
}
