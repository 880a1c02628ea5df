//! AST module for the Pretext language
//!
//! The parser produces a closed set of immutable nodes. Blocks are shared
//! (`Arc<[AstNode]>`) so a closure can hold on to its body without copying it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// A byte range in the source text.
///
/// # Examples
///
/// ```rust
/// use pretext::ast::Span;
/// let span = Span { start: 0, end: 5 };
/// assert_eq!(span.len(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest span covering both `self` and `other`.
    pub fn join(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Wrapper for carrying source span information with any value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithSpan<T> {
    pub value: T,
    pub span: Span,
}

/// Canonical AST node type.
pub type AstNode = WithSpan<Arc<Expr>>;

/// An ordered statement list (the body of a block).
pub type Block = Arc<[AstNode]>;

/// Operators that can head an [`Expr::Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Negate,
    Factorial,
    Sequence,
    Assign,
    Declare,
    Less,
    LessEqual,
    GreaterEqual,
    Equal,
    Or,
    Increment,
    Decrement,
    Index,
    IndexAssign,
    Spread,
    In,
}

impl Operator {
    /// Source spelling of the operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub | Operator::Negate => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Factorial => "!",
            Operator::Sequence => ";",
            Operator::Assign => "=",
            Operator::Declare => ":=",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
            Operator::Equal => "==",
            Operator::Or => "||",
            Operator::Increment => "++",
            Operator::Decrement => "--",
            Operator::Index => "[",
            Operator::IndexAssign => "[=",
            Operator::Spread => "...",
            Operator::In => "in",
        }
    }
}

/// A formal parameter of a macro.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub variadic: bool,
}

/// The core AST node for Pretext statements and expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number(f64),
    None,
    String(String),
    Identifier(String),
    /// One to three operands, in source order.
    Operation {
        op: Operator,
        operands: Vec<AstNode>,
    },
    List(Vec<AstNode>),
    If {
        condition: AstNode,
        then_block: Block,
        else_block: Block,
    },
    Loop {
        condition: AstNode,
        body: Block,
    },
    MacroDef {
        name: String,
        params: Vec<Param>,
        body: Block,
    },
    Application {
        callee: String,
        args: Vec<AstNode>,
    },
    /// A raw line of output text, still containing its escape expressions.
    Native(String),
}

// ============================================================================
// PUBLIC API IMPLEMENTATION
// ============================================================================

impl Expr {
    /// Wraps the expression into a node carrying `span`.
    pub fn at(self, span: Span) -> AstNode {
        WithSpan {
            value: Arc::new(self),
            span,
        }
    }

    pub fn is_application(&self) -> bool {
        matches!(self, Expr::Application { .. })
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Expr::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Pretty-prints the expression in a parenthesised prefix form.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pretext::ast::Expr;
    /// let expr = Expr::Identifier("foo".to_string());
    /// assert_eq!(expr.pretty(), "foo");
    /// assert_eq!(Expr::Number(3.5).pretty(), "3.5");
    /// ```
    pub fn pretty(&self) -> String {
        match self {
            Expr::Number(n) => n.to_string(),
            Expr::None => "none".to_string(),
            Expr::String(s) => format!("\"{}\"", s),
            Expr::Identifier(name) => name.clone(),
            Expr::Operation { op, operands } => {
                let mut parts = vec![op.symbol().to_string()];
                parts.extend(operands.iter().map(|o| o.value.pretty()));
                format!("({})", parts.join(" "))
            }
            Expr::List(items) => format!("[{}]", Self::pretty_nodes(items, ", ")),
            Expr::If {
                condition,
                then_block,
                else_block,
            } => format!(
                "(if {} {} {})",
                condition.value.pretty(),
                Self::pretty_block(then_block),
                Self::pretty_block(else_block)
            ),
            Expr::Loop { condition, body } => format!(
                "(loop {} {})",
                condition.value.pretty(),
                Self::pretty_block(body)
            ),
            Expr::MacroDef { name, params, body } => {
                let params = params
                    .iter()
                    .map(|p| {
                        if p.variadic {
                            format!("{}...", p.name)
                        } else {
                            p.name.clone()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("(MACRO {} ({}) {})", name, params, Self::pretty_block(body))
            }
            Expr::Application { callee, args } => {
                if args.is_empty() {
                    format!("({})", callee)
                } else {
                    format!("({} {})", callee, Self::pretty_nodes(args, " "))
                }
            }
            Expr::Native(text) => format!("(native {:?})", text),
        }
    }

    // ------------------------------------------------------------------------
    // Pretty-printing helpers
    // ------------------------------------------------------------------------

    fn pretty_nodes(nodes: &[AstNode], sep: &str) -> String {
        nodes
            .iter()
            .map(|n| n.value.pretty())
            .collect::<Vec<_>>()
            .join(sep)
    }

    fn pretty_block(block: &[AstNode]) -> String {
        format!("{{{}}}", Self::pretty_nodes(block, " "))
    }
}
