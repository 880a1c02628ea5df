//! Defines the command-line arguments and subcommands for the Pretext CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "pretext",
    version,
    about = "Expands Pretext templates: native text with embedded macros."
)]
pub struct PretextArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Raise log verbosity (`-v` debug, `-vv` trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// YAML file with engine settings.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Escape character introducing embedded expressions.
    #[arg(long, global = true)]
    pub escape: Option<char>,

    /// Give every macro call its own scope instead of reusing the captured one.
    #[arg(long, global = true)]
    pub per_call_frames: bool,

    /// Maximum nesting of macro calls.
    #[arg(long, global = true)]
    pub max_depth: Option<usize>,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interpret a template and write the expanded text.
    Run {
        /// The template to interpret.
        #[arg(required = true)]
        input: PathBuf,
        /// Where to write the result; `-` for standard output.
        #[arg(required = true)]
        output: PathBuf,
    },
    /// Print the parsed top-level statements.
    Ast {
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Print the token stream.
    Tokens {
        #[arg(required = true)]
        file: PathBuf,
    },
}
