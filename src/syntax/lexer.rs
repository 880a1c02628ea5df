//! The dual-mode Pretext lexer.
//!
//! Outside macro blocks the lexer is in *native* mode and hands out whole
//! lines of text. The `MACRO` keyword at the start of a line switches it into
//! *macro* mode, where ordinary code tokens are produced until the brace that
//! closes the outermost block. Escape sub-expressions found inside native text
//! are lexed by a separate instance created with [`Lexer::macro_mode`], which
//! never leaves macro mode.
//!
//! Tokens are produced lazily. [`TokenStream`] adds the single token of
//! lookahead the parser needs.

use log::trace;

use crate::ast::Span;
use crate::diagnostics::PretextError;
use crate::err_ctx;
use crate::syntax::token::{Keyword, Token, TokenKind, OPERATORS, PUNCTUATION, WORD_OPERATORS};

const MACRO_KEYWORD: &str = "MACRO";

// ============================================================================
// LEXER
// ============================================================================

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    escape: char,
    in_macro: bool,
    block_depth: usize,
    /// Set for escape sub-expressions: closing a block never returns to
    /// native mode.
    pinned: bool,
    done: bool,
    /// Added to every span, so fragments lexed on their own still point
    /// into the enclosing file.
    offset: usize,
}

impl<'a> Lexer<'a> {
    /// A lexer over a whole source file, starting in native mode.
    pub fn new(src: &'a str, escape: char) -> Self {
        Self {
            src,
            pos: 0,
            escape,
            in_macro: false,
            block_depth: 0,
            pinned: false,
            done: false,
            offset: 0,
        }
    }

    /// A lexer over a code fragment that stays in macro mode throughout.
    pub fn macro_mode(src: &'a str, escape: char) -> Self {
        Self {
            in_macro: true,
            pinned: true,
            ..Self::new(src, escape)
        }
    }

    /// Reports spans shifted by `offset` bytes.
    pub fn at_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Produces the next token. After the end-of-stream token has been
    /// returned, further calls keep returning it.
    pub fn next_token(&mut self) -> Result<Token, PretextError> {
        let token = if self.in_macro {
            self.lex_macro()?
        } else {
            self.lex_native()?
        };
        trace!("token {} at {}..{}", token.kind, token.span.start, token.span.end);
        Ok(token)
    }

    // ------------------------------------------------------------------------
    // Character helpers
    // ------------------------------------------------------------------------

    fn span(&self, start: usize, end: usize) -> Span {
        Span::new(start + self.offset, end + self.offset)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Advances past the end of the current line (including its newline) and
    /// returns the byte offset reached.
    fn skip_line(&mut self) -> usize {
        self.pos = match self.rest().find('\n') {
            Some(i) => self.pos + i + 1,
            None => self.src.len(),
        };
        self.pos
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.src[start..self.pos]
    }

    fn eof(&mut self) -> Token {
        self.done = true;
        Token::new(TokenKind::Eof, self.span(self.src.len(), self.src.len()))
    }

    // ------------------------------------------------------------------------
    // Native mode
    // ------------------------------------------------------------------------

    fn lex_native(&mut self) -> Result<Token, PretextError> {
        if self.done || self.pos >= self.src.len() {
            return Ok(self.eof());
        }

        let start = self.pos;
        self.eat_while(char::is_whitespace);

        if self.at_macro_keyword() {
            let keyword_start = self.pos;
            self.pos += MACRO_KEYWORD.len();
            self.in_macro = true;
            self.block_depth = 0;
            return Ok(Token::new(
                TokenKind::Keyword(Keyword::Macro),
                self.span(keyword_start, self.pos),
            ));
        }

        let end = self.skip_line();
        Ok(Token::new(
            TokenKind::Native(self.src[start..end].to_string()),
            self.span(start, end),
        ))
    }

    fn at_macro_keyword(&self) -> bool {
        let rest = self.rest();
        rest.starts_with(MACRO_KEYWORD)
            && !rest[MACRO_KEYWORD.len()..]
                .chars()
                .next()
                .is_some_and(is_ident_char)
    }

    // ------------------------------------------------------------------------
    // Macro mode
    // ------------------------------------------------------------------------

    fn lex_macro(&mut self) -> Result<Token, PretextError> {
        loop {
            self.eat_while(char::is_whitespace);
            match self.peek_char() {
                None => return Ok(self.eof()),
                Some(c) if c == self.escape => break,
                Some('#') => {
                    self.skip_line();
                }
                Some(_) => break,
            }
        }

        let start = self.pos;

        if let Some(op) = self.match_operator() {
            return Ok(Token::new(TokenKind::Operator(op), self.span(start, self.pos)));
        }

        let Some(c) = self.bump() else {
            return Ok(self.eof());
        };

        if c == self.escape {
            let text_start = self.pos;
            let end = self.skip_line();
            return Ok(Token::new(
                TokenKind::Native(self.src[text_start..end].to_string()),
                self.span(text_start, end),
            ));
        }

        if PUNCTUATION.contains(&c) {
            match c {
                '{' => self.block_depth += 1,
                '}' => {
                    self.block_depth = self.block_depth.saturating_sub(1);
                    if !self.pinned {
                        self.in_macro = self.block_depth > 0;
                    }
                }
                _ => {}
            }
            return Ok(Token::new(TokenKind::Punct(c), self.span(start, self.pos)));
        }

        if c == '"' {
            return self.lex_string(start);
        }

        if is_number_char(c) {
            return self.lex_number(start, c);
        }

        if is_ident_char(c) {
            let ident = &self.src[start..start + c.len_utf8()];
            let tail = self.eat_while(is_ident_char);
            let text = format!("{}{}", ident, tail);
            let span = self.span(start, self.pos);
            let kind = if let Some(keyword) = Keyword::from_ident(&text) {
                TokenKind::Keyword(keyword)
            } else if text == "none" {
                TokenKind::None
            } else if let Some(op) = WORD_OPERATORS.iter().find(|op| **op == text) {
                TokenKind::Operator(op)
            } else {
                TokenKind::Identifier(text)
            };
            return Ok(Token::new(kind, span));
        }

        Err(err_ctx!(
            Lex,
            format!("Character cannot be recognized in token: {}", c),
            self.span(start, self.pos)
        ))
    }

    /// Maximal munch over the operator table: keep extending the candidate
    /// while some operator still has it as a prefix, then settle on the
    /// longest candidate that is an operator in its own right.
    fn match_operator(&mut self) -> Option<&'static str> {
        let rest = self.rest();
        let mut best = None;
        for (i, c) in rest.char_indices() {
            let candidate = &rest[..i + c.len_utf8()];
            if !OPERATORS.iter().any(|op| op.starts_with(candidate)) {
                break;
            }
            if let Some(op) = OPERATORS.iter().find(|op| **op == candidate) {
                best = Some(*op);
            }
        }
        if let Some(op) = best {
            self.pos += op.len();
        }
        best
    }

    fn lex_string(&mut self, start: usize) -> Result<Token, PretextError> {
        let body = self.eat_while(|c| c != '"');
        if self.bump().is_none() {
            return Err(err_ctx!(
                Lex,
                "Unterminated string literal",
                self.span(start, self.pos),
                "string literals end at the next `\"`"
            ));
        }
        Ok(Token::new(
            TokenKind::String(body.to_string()),
            self.span(start, self.pos),
        ))
    }

    fn lex_number(&mut self, start: usize, first: char) -> Result<Token, PretextError> {
        self.eat_while(is_number_char);
        let text = &self.src[start..self.pos];
        let normalized = if first == '.' {
            format!("0{}", text)
        } else {
            text.to_string()
        };
        let span = self.span(start, self.pos);
        let value = normalized
            .parse::<f64>()
            .map_err(|_| err_ctx!(Lex, format!("Invalid number literal: {}", text), span))?;
        Ok(Token::new(TokenKind::Number(value), span))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, PretextError>;

    /// Yields every token including the final end-of-stream token, then stops.
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let token = self.next_token();
        if token.is_err() {
            self.done = true;
        }
        Some(token)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

// ============================================================================
// TOKEN STREAM: one token of lookahead
// ============================================================================

pub struct TokenStream<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Token>,
}

impl<'a> TokenStream<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            lexer,
            peeked: None,
        }
    }

    /// Returns the buffered token if there is one, else pulls from the lexer.
    pub fn next_token(&mut self) -> Result<Token, PretextError> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.lexer.next_token(),
        }
    }

    pub fn peek(&mut self) -> Result<&Token, PretextError> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next_token()?,
        };
        Ok(self.peeked.insert(token))
    }

    /// Discards the next token.
    pub fn consume(&mut self) -> Result<(), PretextError> {
        self.next_token().map(|_| ())
    }

    /// Puts a token back in front of the stream. At most one token can be
    /// buffered, so this is only valid right after `next_token`.
    pub fn push_back(&mut self, token: Token) {
        debug_assert!(self.peeked.is_none(), "lookahead buffer already full");
        self.peeked = Some(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src, '$')
            .map(|t| t.expect("lexes").kind)
            .collect()
    }

    fn macro_kinds(src: &str) -> Vec<TokenKind> {
        Lexer::macro_mode(src, '$')
            .map(|t| t.expect("lexes").kind)
            .collect()
    }

    #[test]
    fn native_lines_pass_through() {
        assert_eq!(
            kinds("hello\n  world $(x)\n"),
            vec![
                TokenKind::Native("hello\n".into()),
                TokenKind::Native("  world $(x)\n".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn macro_keyword_switches_mode_until_block_closes() {
        let tokens = kinds("MACRO f(a) { a }\nafter\n");
        assert_eq!(tokens[0], TokenKind::Keyword(Keyword::Macro));
        assert_eq!(tokens[1], TokenKind::Identifier("f".into()));
        assert_eq!(tokens[2], TokenKind::Punct('('));
        assert_eq!(tokens[5], TokenKind::Punct('{'));
        assert_eq!(tokens[7], TokenKind::Punct('}'));
        assert_eq!(tokens[8], TokenKind::Native("\nafter\n".into()));
    }

    #[test]
    fn nested_blocks_do_not_leave_macro_mode_early() {
        let tokens = kinds("MACRO f() { if 1 { 2 } 3 }\n");
        assert!(tokens.contains(&TokenKind::Number(3.0)));
        assert_eq!(tokens.last(), Some(&TokenKind::Eof));
    }

    #[test]
    fn word_starting_with_macro_is_native_text() {
        assert_eq!(
            kinds("MACROS are fun\n"),
            vec![TokenKind::Native("MACROS are fun\n".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn escape_inside_macro_yields_rest_of_line() {
        let tokens = kinds("MACRO f() {\n  $Hi $(1)!\n}\n");
        assert!(tokens.contains(&TokenKind::Native("Hi $(1)!\n".into())));
    }

    #[test]
    fn maximal_munch_picks_longest_operator() {
        assert_eq!(
            macro_kinds("a := b ++ <= == ..."),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Operator(":="),
                TokenKind::Identifier("b".into()),
                TokenKind::Operator("++"),
                TokenKind::Operator("<="),
                TokenKind::Operator("=="),
                TokenKind::Operator("..."),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn munch_backs_off_to_shorter_exact_operator() {
        // "." is a prefix of "..." but no operator itself.
        assert_eq!(
            macro_kinds("x-.5"),
            vec![
                TokenKind::Identifier("x".into()),
                TokenKind::Operator("-"),
                TokenKind::Number(0.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn literals_and_keywords() {
        assert_eq!(
            macro_kinds("if else loop none \"a b\" 12.5 index in # comment\n_x"),
            vec![
                TokenKind::Keyword(Keyword::If),
                TokenKind::Keyword(Keyword::Else),
                TokenKind::Keyword(Keyword::Loop),
                TokenKind::None,
                TokenKind::String("a b".into()),
                TokenKind::Number(12.5),
                TokenKind::Identifier("index".into()),
                TokenKind::Operator("in"),
                TokenKind::Identifier("_x".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unknown_character_is_fatal() {
        let err = Lexer::macro_mode("a @ b", '$')
            .find_map(|t| t.err())
            .expect("lex error");
        assert!(err.to_string().contains('@'));
        assert_eq!(err.span(), Some(Span::new(2, 3)));
    }

    #[test]
    fn unterminated_string_is_fatal() {
        let err = Lexer::macro_mode("\"open", '$')
            .find_map(|t| t.err())
            .expect("lex error");
        assert!(err.to_string().contains("Unterminated"));
    }

    #[test]
    fn stream_peek_then_push_back() {
        let mut stream = TokenStream::new(Lexer::macro_mode("1 2", '$'));
        assert_eq!(stream.peek().unwrap().kind, TokenKind::Number(1.0));
        let one = stream.next_token().unwrap();
        stream.push_back(one);
        assert_eq!(stream.next_token().unwrap().kind, TokenKind::Number(1.0));
        stream.consume().unwrap();
        assert!(stream.peek().unwrap().is_eof());
    }
}
