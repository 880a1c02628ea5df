//! Token model shared by the lexer and the parser.

use std::fmt;

use crate::ast::Span;

/// Reserved words of macro mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Macro,
    If,
    Else,
    Loop,
}

impl Keyword {
    pub fn from_ident(text: &str) -> Option<Keyword> {
        match text {
            "MACRO" => Some(Keyword::Macro),
            "if" => Some(Keyword::If),
            "else" => Some(Keyword::Else),
            "loop" => Some(Keyword::Loop),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Macro => "MACRO",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::Loop => "loop",
        }
    }
}

/// Every operator spelling the lexer recognises.
pub const OPERATORS: &[&str] = &[
    "+", "-", "*", "/", "!", ";", "=", "...", ":=", "<", "[", "++", "--", "==", ">=", "||", "<=",
];

/// Operators spelled as words; recognised only as a whole identifier.
pub const WORD_OPERATORS: &[&str] = &["in"];

/// Single-character bracket and punctuation tokens.
pub const PUNCTUATION: &[char] = &['(', ')', '{', '}', ']', ','];

/// The category and payload of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Operator(&'static str),
    Number(f64),
    String(String),
    Identifier(String),
    Punct(char),
    Keyword(Keyword),
    /// A raw line of native text.
    Native(String),
    None,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }

    pub fn is_operator(&self, op: &str) -> bool {
        matches!(self.kind, TokenKind::Operator(o) if o == op)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Operator(op) => write!(f, "operator `{}`", op),
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::String(s) => write!(f, "string \"{}\"", s),
            TokenKind::Identifier(name) => write!(f, "identifier `{}`", name),
            TokenKind::Punct(c) => write!(f, "`{}`", c),
            TokenKind::Keyword(k) => write!(f, "keyword `{}`", k.as_str()),
            TokenKind::Native(text) => write!(f, "native text {:?}", text),
            TokenKind::None => write!(f, "`none`"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}
