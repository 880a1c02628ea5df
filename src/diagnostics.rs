//! # Overview
//!
//! Unified, `miette`-based diagnostics for the Pretext engine. Every failure
//! raised by the lexer, the parser, or the interpreter is a [`PretextError`].
//! None of them is recoverable: the first error aborts the run.
//!
//! # Error Construction Macros
//!
//! - `err_msg!(Parse, "Unexpected token {}", tok)` builds an error with a
//!   formatted message and no location.
//! - `err_ctx!(Eval, "Identifier x not bound.", span)` attaches a span.
//! - `err_ctx!(Eval, "...", span, help)` attaches a span and a help line.
//!
//! Errors are created without source text. The engine attaches the file
//! being interpreted once, at the top, via [`PretextError::with_source`].

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

use crate::ast::Span;

pub type SourceArc = Arc<NamedSource<String>>;

/// Type-safe classification of a [`PretextError`], used by tests and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Unrecognised characters, unterminated string literals
    Lex,
    /// Unexpected tokens, mismatched delimiters, malformed macro headers
    Parse,
    /// Unbound identifiers, bad indices, arity errors, unbalanced escapes
    Eval,
    /// Operand kinds an operator does not accept
    TypeError,
    /// Reading the source or writing the output failed
    Io,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Lex => "Lex",
            ErrorType::Parse => "Parse",
            ErrorType::Eval => "Eval",
            ErrorType::TypeError => "TypeError",
            ErrorType::Io => "Io",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Location and help attached to an error.
#[derive(Debug, Default)]
pub struct ErrorContext {
    /// The source the span points into (attached late by the engine).
    pub source: Option<SourceArc>,
    /// Byte range of the offending text, if known.
    pub span: Option<Span>,
    /// An optional help message.
    pub help: Option<String>,
}

impl ErrorContext {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_span(span: Span) -> Self {
        Self {
            span: Some(span),
            ..Self::default()
        }
    }

    pub fn with_span_and_help(span: Span, help: String) -> Self {
        Self {
            span: Some(span),
            help: Some(help),
            ..Self::default()
        }
    }
}

/// Unified error type for every failure mode of the pipeline.
#[derive(Debug, Error)]
pub enum PretextError {
    #[error("Lex error: {message}")]
    Lex { message: String, ctx: ErrorContext },
    #[error("Parse error: {message}")]
    Parse { message: String, ctx: ErrorContext },
    #[error("Evaluation error: {message}")]
    Eval { message: String, ctx: ErrorContext },
    #[error("Type error: {message}")]
    TypeError { message: String, ctx: ErrorContext },
    #[error("Division by zero")]
    DivisionByZero { ctx: ErrorContext },
    #[error("I/O error: {message}")]
    Io {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: std::io::Error,
    },
}

impl PretextError {
    fn get_ctx(&self) -> &ErrorContext {
        match self {
            PretextError::Lex { ctx, .. } => ctx,
            PretextError::Parse { ctx, .. } => ctx,
            PretextError::Eval { ctx, .. } => ctx,
            PretextError::TypeError { ctx, .. } => ctx,
            PretextError::DivisionByZero { ctx } => ctx,
            PretextError::Io { ctx, .. } => ctx,
        }
    }

    fn get_ctx_mut(&mut self) -> &mut ErrorContext {
        match self {
            PretextError::Lex { ctx, .. } => ctx,
            PretextError::Parse { ctx, .. } => ctx,
            PretextError::Eval { ctx, .. } => ctx,
            PretextError::TypeError { ctx, .. } => ctx,
            PretextError::DivisionByZero { ctx } => ctx,
            PretextError::Io { ctx, .. } => ctx,
        }
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            PretextError::Lex { .. } => ErrorType::Lex,
            PretextError::Parse { .. } => ErrorType::Parse,
            PretextError::Eval { .. } => ErrorType::Eval,
            PretextError::TypeError { .. } => ErrorType::TypeError,
            PretextError::DivisionByZero { .. } => ErrorType::Eval,
            PretextError::Io { .. } => ErrorType::Io,
        }
    }

    pub fn span(&self) -> Option<Span> {
        self.get_ctx().span
    }

    /// Wraps an I/O failure with a short description of what was attempted.
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        PretextError::Io {
            message: message.into(),
            ctx: ErrorContext::none(),
            source,
        }
    }

    /// Attaches the named source text so the report can label the span.
    ///
    /// A span that does not lie on character boundaries of `content` is
    /// dropped; the message is still reported.
    pub fn with_source(mut self, name: &str, content: &str) -> Self {
        let ctx = self.get_ctx_mut();
        if let Some(span) = ctx.span {
            let fits = span.start <= span.end
                && span.end <= content.len()
                && content.is_char_boundary(span.start)
                && content.is_char_boundary(span.end);
            if !fits {
                ctx.span = None;
            }
        }
        ctx.source = Some(Arc::new(NamedSource::new(name, content.to_string())));
        self
    }
}

impl Diagnostic for PretextError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let code = match self.error_type() {
            ErrorType::Lex => "pretext::lex",
            ErrorType::Parse => "pretext::parse",
            ErrorType::Eval => "pretext::eval",
            ErrorType::TypeError => "pretext::type",
            ErrorType::Io => "pretext::io",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.get_ctx()
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.get_ctx()
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let ctx = self.get_ctx();
        // Without source text a label has nothing to point into.
        ctx.source.as_ref()?;
        let span = ctx.span?;
        let text = match self {
            PretextError::Lex { message, .. }
            | PretextError::Parse { message, .. }
            | PretextError::Eval { message, .. }
            | PretextError::TypeError { message, .. }
            | PretextError::Io { message, .. } => message.clone(),
            PretextError::DivisionByZero { .. } => "division by zero".to_string(),
        };
        let len = if span.end > span.start {
            span.end - span.start
        } else {
            1
        };
        let label = LabeledSpan::new(Some(text), span.start, len);
        Some(Box::new(std::iter::once(label)))
    }
}

/// Constructs a `PretextError` variant with a formatted message and no context.
#[macro_export]
macro_rules! err_msg {
    ($variant:ident, $msg:expr, $($arg:expr),+ $(,)?) => {
        $crate::PretextError::$variant {
            message: format!($msg, $($arg),+),
            ctx: $crate::diagnostics::ErrorContext::none(),
        }
    };
    ($variant:ident, $msg:expr) => {
        $crate::PretextError::$variant {
            message: format!("{}", $msg),
            ctx: $crate::diagnostics::ErrorContext::none(),
        }
    };
}

/// Constructs a `PretextError` variant with a message, a span, and optionally
/// a help line.
#[macro_export]
macro_rules! err_ctx {
    ($variant:ident, $msg:expr, $span:expr, $help:expr) => {
        $crate::PretextError::$variant {
            message: $msg.to_string(),
            ctx: $crate::diagnostics::ErrorContext::with_span_and_help(
                $span,
                format!("{}", $help),
            ),
        }
    };
    ($variant:ident, $msg:expr, $span:expr) => {
        $crate::PretextError::$variant {
            message: $msg.to_string(),
            ctx: $crate::diagnostics::ErrorContext::with_span($span),
        }
    };
}

#[cfg(test)]
mod diagnostics_tests {
    use miette::Report;

    use super::*;

    #[test]
    fn report_renders_label_and_help() {
        let err = err_ctx!(
            Eval,
            "Identifier y not bound.",
            Span { start: 4, end: 5 },
            "bind it with `=` or `:=` first"
        )
        .with_source("page.pre", "x = y + 1");
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("Identifier y not bound."));
        assert!(output.contains("bind it with"));
    }

    #[test]
    fn out_of_range_span_is_dropped() {
        let err = err_ctx!(Parse, "Unexpected token", Span { start: 40, end: 44 })
            .with_source("short.pre", "abc");
        assert_eq!(err.span(), None);
        assert_eq!(err.error_type(), ErrorType::Parse);
    }

    #[test]
    fn division_by_zero_is_an_eval_failure() {
        let err = PretextError::DivisionByZero {
            ctx: ErrorContext::none(),
        };
        assert_eq!(err.error_type(), ErrorType::Eval);
        assert_eq!(err.to_string(), "Division by zero");
    }
}
