//! Handles all user-facing output for the CLI.
//!
//! Colour goes through `termcolor` so it is dropped automatically when the
//! stream is not a terminal.

use std::io::Write;

use miette::Report;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::ast::AstNode;
use crate::diagnostics::PretextError;
use crate::syntax::token::Token;

/// Prints the success line of `pretext run`.
pub fn print_success(output: &str) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
    let _ = writeln!(stdout, "Interpretation was successful, wrote to {}!", output);
    let _ = stdout.reset();
}

/// Prints one statement per line in prefix form.
pub fn print_statements(statements: &[AstNode]) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    for (i, statement) in statements.iter().enumerate() {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
        let _ = write!(stdout, "{:>4} ", i);
        let _ = stdout.reset();
        let _ = writeln!(stdout, "{}", statement.value.pretty());
    }
}

/// Prints one token per line with its byte range.
pub fn print_tokens(tokens: &[Token]) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    for token in tokens {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        let _ = write!(stdout, "{:>5}..{:<5} ", token.span.start, token.span.end);
        let _ = stdout.reset();
        let _ = writeln!(stdout, "{}", token);
    }
}

/// Prints a PretextError with full miette diagnostics.
pub fn print_error(error: PretextError) {
    let report = Report::new(error);
    eprintln!("{report:?}");
}
