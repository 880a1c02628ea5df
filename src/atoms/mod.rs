//! Output sinks and the builtin macros.
//!
//! Everything the interpreter writes goes through an [`OutputSink`]: the
//! expanded native text to the output sink, and `debug(...)` lines to the
//! diagnostic sink. Swapping sinks is how tests capture output and how the
//! CLI targets a file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub mod builtins;

pub use builtins::Builtin;

// ============================================================================
// SINK TRAIT
// ============================================================================

/// Destination for emitted text. Text is written exactly as given; sinks
/// add no separators of their own.
pub trait OutputSink {
    fn emit(&mut self, text: &str) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: OutputSink + ?Sized> OutputSink for &mut T {
    fn emit(&mut self, text: &str) -> io::Result<()> {
        (**self).emit(text)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

// ============================================================================
// SINKS
// ============================================================================

/// Discards everything.
pub struct NullSink;

impl OutputSink for NullSink {
    fn emit(&mut self, _text: &str) -> io::Result<()> {
        Ok(())
    }
}

/// OutputBuffer: collects output into a String for testing or programmatic capture.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    pub buffer: String,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }
}

impl OutputSink for OutputBuffer {
    fn emit(&mut self, text: &str) -> io::Result<()> {
        self.buffer.push_str(text);
        Ok(())
    }
}

/// StdoutSink: writes output to stdout, for `pretext run <input> -`.
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn emit(&mut self, text: &str) -> io::Result<()> {
        io::stdout().write_all(text.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

/// StderrSink: the default destination of `debug(...)`.
pub struct StderrSink;

impl OutputSink for StderrSink {
    fn emit(&mut self, text: &str) -> io::Result<()> {
        io::stderr().write_all(text.as_bytes())
    }
}

/// Any writer, typically a buffered file.
pub struct WriterSink<W: Write>(pub W);

impl WriterSink<BufWriter<File>> {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(WriterSink(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> OutputSink for WriterSink<W> {
    fn emit(&mut self, text: &str) -> io::Result<()> {
        self.0.write_all(text.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}
