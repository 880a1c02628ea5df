//! The interpretation pipeline: source text → tokens → statements →
//! evaluation into an output sink.
//!
//! Every error leaving this module carries the source text it points into,
//! so callers can render it with `miette` directly.

use std::fs;
use std::path::Path;

use log::info;

use crate::ast::AstNode;
use crate::atoms::{OutputBuffer, OutputSink, StdoutSink, WriterSink};
use crate::config::EngineConfig;
use crate::diagnostics::PretextError;
use crate::runtime::env::Env;
use crate::runtime::eval::Interpreter;
use crate::runtime::value::Value;
use crate::syntax::lexer::Lexer;
use crate::syntax::parser;
use crate::syntax::token::Token;

// ============================================================================
// EXECUTION PIPELINE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ExecutionPipeline {
    pub config: EngineConfig,
}

impl ExecutionPipeline {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Every token of `source`, ending with the end-of-input token.
    pub fn tokenize(&self, source: &str, name: &str) -> Result<Vec<Token>, PretextError> {
        Lexer::new(source, self.config.escape)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.with_source(name, source))
    }

    pub fn parse(&self, source: &str, name: &str) -> Result<Vec<AstNode>, PretextError> {
        parser::parse(source, self.config.escape).map_err(|e| e.with_source(name, source))
    }

    /// Parses and runs `source` in a fresh global scope, writing native
    /// output to `output`. Returns the value of the last statement.
    pub fn execute(
        &self,
        source: &str,
        name: &str,
        output: &mut dyn OutputSink,
    ) -> Result<Value, PretextError> {
        let statements = self.parse(source, name)?;
        let mut interp = Interpreter::new(self.config.clone(), output);
        interp
            .run(&statements, &Env::root())
            .map_err(|e| e.with_source(name, source))
    }

    /// Like [`execute`](Self::execute), with a caller-supplied sink for
    /// `debug(...)` lines.
    pub fn execute_with_diagnostics<'o>(
        &self,
        source: &str,
        name: &str,
        output: &'o mut dyn OutputSink,
        diagnostics: Box<dyn OutputSink + 'o>,
    ) -> Result<Value, PretextError> {
        let statements = self.parse(source, name)?;
        let mut interp =
            Interpreter::new(self.config.clone(), output).with_diagnostics(diagnostics);
        interp
            .run(&statements, &Env::root())
            .map_err(|e| e.with_source(name, source))
    }

    /// Runs `source` and returns everything it wrote.
    pub fn render(&self, source: &str, name: &str) -> Result<String, PretextError> {
        let mut buffer = OutputBuffer::new();
        self.execute(source, name, &mut buffer)?;
        Ok(buffer.buffer)
    }

    pub fn read_file(path: &Path) -> Result<String, PretextError> {
        fs::read_to_string(path)
            .map_err(|e| PretextError::io(format!("Failed to read {}", path.display()), e))
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Path that selects standard output instead of a file.
pub const STDOUT_PATH: &str = "-";

/// Interprets the file at `input` and writes the result to `output`, or to
/// standard output when `output` is [`STDOUT_PATH`].
///
/// The output file is created before evaluation starts. When a fatal error
/// occurs it keeps whatever was written up to that point.
pub fn interpret_file(
    input: &Path,
    output: &Path,
    config: &EngineConfig,
) -> Result<bool, PretextError> {
    let source = ExecutionPipeline::read_file(input)?;
    let pipeline = ExecutionPipeline::new(config.clone());
    let name = input.display().to_string();

    info!("interpreting {} into {}", input.display(), output.display());
    if output == Path::new(STDOUT_PATH) {
        pipeline.execute(&source, &name, &mut StdoutSink)?;
    } else {
        let mut sink = WriterSink::create(output)
            .map_err(|e| PretextError::io(format!("Failed to create {}", output.display()), e))?;
        pipeline.execute(&source, &name, &mut sink)?;
    }
    info!("finished {}", input.display());
    Ok(true)
}

/// Renders `source` with the default configuration.
pub fn render_to_string(source: &str) -> Result<String, PretextError> {
    ExecutionPipeline::default().render(source, "source")
}
