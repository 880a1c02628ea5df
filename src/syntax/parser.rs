//! Pretext Parser
//!
//! Turns the token stream into top-level statements. Statements are macro
//! definitions, native-text lines, or expressions; expressions are parsed by
//! precedence climbing over the tables in [`crate::syntax::grammar`].

use log::debug;

use crate::ast::{AstNode, Block, Expr, Operator, Param, Span};
use crate::diagnostics::PretextError;
use crate::err_ctx;
use crate::syntax::grammar::{Grammar, GRAMMAR};
use crate::syntax::lexer::{Lexer, TokenStream};
use crate::syntax::token::{Keyword, Token, TokenKind};

/// Minimum precedence that accepts every operator.
pub const LOWEST: f32 = -1.0;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parses a whole source file into its top-level statements.
pub fn parse(source: &str, escape: char) -> Result<Vec<AstNode>, PretextError> {
    Parser::new(Lexer::new(source, escape)).parse_program()
}

/// Parses the code between the parentheses of an escape expression. The code
/// must hold exactly one expression. `offset` is the byte position of `code`
/// in the enclosing file.
pub fn parse_escape_expression(
    code: &str,
    escape: char,
    offset: usize,
) -> Result<AstNode, PretextError> {
    let mut parser = Parser::new(Lexer::macro_mode(code, escape).at_offset(offset));
    let expr = parser.parse_expression(LOWEST)?;
    let next = parser.tokens().peek()?;
    if !next.is_eof() {
        return Err(err_ctx!(
            Parse,
            format!("Unexpected trailing {} in escape expression", next),
            next.span
        ));
    }
    Ok(expr)
}

// ============================================================================
// PARSER
// ============================================================================

pub struct Parser<'a> {
    tokens: TokenStream<'a>,
    grammar: &'static Grammar,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            tokens: TokenStream::new(lexer),
            grammar: &GRAMMAR,
        }
    }

    pub fn tokens(&mut self) -> &mut TokenStream<'a> {
        &mut self.tokens
    }

    pub fn parse_program(&mut self) -> Result<Vec<AstNode>, PretextError> {
        let mut statements = Vec::new();
        while !self.tokens.peek()?.is_eof() {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    pub fn parse_statement(&mut self) -> Result<AstNode, PretextError> {
        let token = self.tokens.next_token()?;
        match token.kind {
            TokenKind::Keyword(Keyword::Macro) => self.parse_macro(token.span),
            TokenKind::Native(text) => Ok(Expr::Native(text).at(token.span)),
            _ => {
                self.tokens.push_back(token);
                self.parse_expression(LOWEST)
            }
        }
    }

    /// Precedence climbing: parse a prefix form, then keep absorbing infix
    /// and postfix forms whose left binding power reaches `min_prec`.
    pub fn parse_expression(&mut self, min_prec: f32) -> Result<AstNode, PretextError> {
        let token = self.tokens.next_token()?;
        let Some(prefix) = self.grammar.prefix_for(&token.kind) else {
            return Err(err_ctx!(
                Parse,
                format!("Cannot begin an expression with {}", token),
                token.span
            ));
        };
        let mut left = prefix(self, token)?;

        loop {
            let next = self.tokens.peek()?;
            let Some((infix, power)) = self.grammar.infix_for(&next.kind) else {
                break;
            };
            if power.left < min_prec {
                break;
            }
            let token = self.tokens.next_token()?;
            left = infix(self, left, token)?;
        }

        Ok(left)
    }

    /// `{ statement* }`, returning the statements and the span of the
    /// closing brace.
    pub fn parse_block(&mut self) -> Result<(Block, Span), PretextError> {
        self.expect_punct('{')?;
        let mut body = Vec::new();
        loop {
            let next = self.tokens.peek()?;
            if next.is_punct('}') {
                break;
            }
            if next.is_eof() {
                return Err(err_ctx!(
                    Parse,
                    "Expected: `}`, but got: end of input",
                    next.span,
                    "every `{` needs a matching `}`"
                ));
            }
            body.push(self.parse_statement()?);
        }
        let closing = self.tokens.next_token()?;
        Ok((body.into(), closing.span))
    }

    pub fn expect_punct(&mut self, expected: char) -> Result<Token, PretextError> {
        let token = self.tokens.next_token()?;
        if token.is_punct(expected) {
            Ok(token)
        } else {
            Err(err_ctx!(
                Parse,
                format!("Expected: `{}`, but got: {}", expected, token),
                token.span
            ))
        }
    }

    /// `MACRO name(p1, p2, rest...) { body }`. The header is parsed as an
    /// application whose arguments become the formal parameters.
    fn parse_macro(&mut self, keyword_span: Span) -> Result<AstNode, PretextError> {
        let header = self.parse_expression(LOWEST)?;
        let Expr::Application { callee, args } = &*header.value else {
            return Err(err_ctx!(
                Parse,
                format!("Expected a macro header like `name(params)`, found {}", header.value.pretty()),
                header.span
            ));
        };

        let mut params: Vec<Param> = Vec::with_capacity(args.len());
        for arg in args {
            if params.last().is_some_and(|p| p.variadic) {
                return Err(err_ctx!(
                    Parse,
                    "Variable argument must be last to macro",
                    arg.span
                ));
            }
            params.push(formal_parameter(arg)?);
        }

        let (body, end) = self.parse_block()?;
        debug!("parsed macro definition `{}` with {} parameter(s)", callee, params.len());
        Ok(Expr::MacroDef {
            name: callee.clone(),
            params,
            body,
        }
        .at(keyword_span.join(&end)))
    }
}

fn formal_parameter(arg: &AstNode) -> Result<Param, PretextError> {
    match &*arg.value {
        Expr::Identifier(name) => Ok(Param {
            name: name.clone(),
            variadic: false,
        }),
        Expr::Operation {
            op: Operator::Spread,
            operands,
        } => match operands.first().and_then(|o| o.value.as_identifier()) {
            Some(name) => Ok(Param {
                name: name.to_string(),
                variadic: true,
            }),
            None => Err(err_ctx!(Parse, "Only identifiers can be spread", arg.span)),
        },
        other => Err(err_ctx!(
            Parse,
            format!("Macro parameters must be identifiers, found {}", other.pretty()),
            arg.span
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(code: &str) -> String {
        parse_escape_expression(code, '$', 0)
            .expect("parses")
            .value
            .pretty()
    }

    #[test]
    fn binary_operators_group_left() {
        assert_eq!(expr("1 - 2 - 3"), "(- (- 1 2) 3)");
        assert_eq!(expr("8 / 4 / 2"), "(/ (/ 8 4) 2)");
    }

    #[test]
    fn precedence_levels() {
        assert_eq!(expr("1 + 2 * 3"), "(+ 1 (* 2 3))");
        assert_eq!(expr("x = 1 + 2"), "(= x (+ 1 2))");
        assert_eq!(expr("a = 1 ; b = 2"), "(; (= a 1) (= b 2))");
        assert_eq!(expr("-3!"), "(- (! 3))");
    }

    #[test]
    fn postfix_and_indexing() {
        assert_eq!(expr("i++"), "(++ i)");
        assert_eq!(expr("xs[1]"), "([ xs 1)");
        assert_eq!(expr("xs[0] = 99"), "([= xs 0 99)");
    }

    #[test]
    fn application_and_lists() {
        assert_eq!(expr("f(1, g(2), [3, 4])"), "(f 1 (g 2) [3, 4])");
        assert_eq!(expr("f()"), "(f)");
        assert_eq!(expr("[]"), "[]");
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        let err = parse_escape_expression("1 2", '$', 0).unwrap_err();
        assert!(err.to_string().contains("trailing"));
    }

    #[test]
    fn only_identifiers_can_be_applied() {
        let err = parse_escape_expression("(1)(2)", '$', 0).unwrap_err();
        assert!(err.to_string().contains("Only identifiers"));
    }

    #[test]
    fn spread_parameter_must_be_last() {
        let err = parse("MACRO f(a..., b) { a }\n", '$').unwrap_err();
        assert!(err.to_string().contains("must be last"));
    }

    #[test]
    fn escape_expression_spans_are_shifted() {
        let node = parse_escape_expression("a + b", '$', 40).expect("parses");
        assert_eq!(node.span, Span::new(40, 45));
    }

    #[test]
    fn mismatched_closer_reports_expected_token() {
        let err = parse_escape_expression("(1 + 2]", '$', 0).unwrap_err();
        assert!(err.to_string().contains("Expected: `)`"));
    }
}
