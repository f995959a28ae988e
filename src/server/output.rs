//! Diagnostic output.
//!
//! The engine reports its progress as plain text lines. A [`Console`] carries
//! the output streams and the process exit code from one loop iteration to the
//! next, and an [`Output`] policy decides whether a line is written at all.

use std::fmt;
use std::io::{self, Write};

/// A writable stream owned by the console.
pub type Stream = Box<dyn Write + Send>;

/// Output streams plus the exit code the process should end with.
///
/// Methods take and return the console by value: whoever holds it is the
/// only writer.
pub struct Console {
    out: Stream,
    err: Stream,
    exit_code: u8,
    failure: Option<io::Error>,
}

impl Console {
    pub fn new(out: Stream, err: Stream) -> Self {
        Self {
            out,
            err,
            exit_code: 0,
            failure: None,
        }
    }

    /// A console writing to the process stdout and stderr.
    pub fn stdio() -> Self {
        Self::new(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    /// Write `data` to the output stream.
    pub fn output(mut self, data: &str) -> Self {
        if self.failure.is_none() {
            if let Err(e) = write_all(&mut self.out, data) {
                self.failure = Some(e);
            }
        }
        self
    }

    /// Write `data` to the error stream.
    pub fn error(mut self, data: &str) -> Self {
        if self.failure.is_none() {
            if let Err(e) = write_all(&mut self.err, data) {
                self.failure = Some(e);
            }
        }
        self
    }

    /// Set the exit code.
    pub fn exit(mut self, code: u8) -> Self {
        self.exit_code = code;
        self
    }

    /// The exit code; a console whose streams failed always exits with 1.
    pub fn exit_code(&self) -> u8 {
        match self.failure {
            Some(_) => 1,
            None => self.exit_code,
        }
    }

    /// Whether writing to one of the streams failed.
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn failure(&self) -> Option<&io::Error> {
        self.failure.as_ref()
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console")
            .field("exit_code", &self.exit_code)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}

fn write_all(stream: &mut Stream, data: &str) -> io::Result<()> {
    stream.write_all(data.as_bytes())?;
    stream.flush()
}

/// Policy applied to every diagnostic line.
pub trait Output: Send + Sync {
    fn emit(&self, console: Console, line: &str) -> Console;
}

/// Writes every line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Everything;

impl Output for Everything {
    fn emit(&self, console: Console, line: &str) -> Console {
        console.output(line)
    }
}

/// Drops every line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nothing;

impl Output for Nothing {
    fn emit(&self, console: Console, _line: &str) -> Console {
        console
    }
}
