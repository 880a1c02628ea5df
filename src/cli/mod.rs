//! The Pretext Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

use std::process;

use clap::Parser;
use log::LevelFilter;

use crate::cli::args::{Command, PretextArgs};
use crate::config::{EngineConfig, FramePolicy};
use crate::diagnostics::PretextError;
use crate::engine::{self, ExecutionPipeline};

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = PretextArgs::parse();
    init_logging(args.verbose);

    if let Err(e) = dispatch(&args) {
        output::print_error(e);
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Defaults, then the `--config` file, then individual flags.
pub fn build_config(args: &PretextArgs) -> Result<EngineConfig, PretextError> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(escape) = args.escape {
        config.escape = escape;
    }
    if args.per_call_frames {
        config.frames = FramePolicy::PerCall;
    }
    if let Some(depth) = args.max_depth {
        config.max_depth = depth;
    }
    config.validate()?;
    Ok(config)
}

fn dispatch(args: &PretextArgs) -> Result<(), PretextError> {
    let config = build_config(args)?;
    match &args.command {
        Command::Run {
            input,
            output: destination,
        } => {
            engine::interpret_file(input, destination, &config)?;
            if destination.as_os_str() != engine::STDOUT_PATH {
                output::print_success(&destination.display().to_string());
            }
        }
        Command::Ast { file } => {
            let source = ExecutionPipeline::read_file(file)?;
            let statements =
                ExecutionPipeline::new(config).parse(&source, &file.display().to_string())?;
            output::print_statements(&statements);
        }
        Command::Tokens { file } => {
            let source = ExecutionPipeline::read_file(file)?;
            let tokens =
                ExecutionPipeline::new(config).tokenize(&source, &file.display().to_string())?;
            output::print_tokens(&tokens);
        }
    }
    Ok(())
}
