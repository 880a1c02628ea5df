//! Pretext: native text with embedded macros.
//!
//! A source file is mostly plain text copied to the output. `MACRO` blocks
//! define named macros, and escape expressions like `$(name(1, 2))` inside
//! the text are evaluated and spliced into it.
//!
//! ```rust
//! let out = pretext::engine::render_to_string("Result: $(1 + 2)$\n").unwrap();
//! assert_eq!(out, "Result: 3");
//! ```

pub use crate::diagnostics::{ErrorContext, ErrorType, PretextError};

pub mod ast;
pub mod atoms;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod runtime;
pub mod syntax;
