//! Terminal reporting for a publish run.
//!
//! Progress and results go to stdout and are silenced by `--quiet`; failures
//! go to stderr and are always shown.

use crate::error::PublishError;
use crate::play::CloseOutcome;
use std::io::{self, Write};
use termcolor::{Buffer, BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Reports the steps of one publish run
#[derive(Debug)]
pub struct OutputManager {
    stdout: BufferWriter,
    stderr: BufferWriter,
    verbose: bool,
    quiet: bool,
}

impl OutputManager {
    /// Create a reporter for the given verbosity
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            stdout: BufferWriter::stdout(ColorChoice::Auto),
            stderr: BufferWriter::stderr(ColorChoice::Auto),
            verbose,
            quiet,
        }
    }

    /// `label: value` line, verbose mode only
    pub fn detail(&self, label: &str, value: impl std::fmt::Display) {
        if self.verbose && !self.quiet {
            self.emit(&self.stdout, "→", Color::Blue, &format!("{label}: {value}"));
        }
    }

    /// A remote step is starting
    pub fn step(&self, message: &str) {
        if !self.quiet {
            self.emit(&self.stdout, "⋯", Color::Magenta, message);
        }
    }

    /// The bundle is attached to the edit
    pub fn bundle_uploaded(&self, version_code: i64, sha256: Option<&str>) {
        if self.quiet {
            return;
        }
        self.emit(
            &self.stdout,
            "✓",
            Color::Green,
            &format!("Bundle uploaded (version code {version_code})"),
        );
        if let Some(sha256) = sha256 {
            self.plain(&format!("    sha256: {sha256}"));
        }
    }

    /// The edit is committed
    pub fn edit_committed(&self, commit_id: &str) {
        if !self.quiet {
            self.emit(&self.stdout, "✓", Color::Green, &format!("Edit committed: {commit_id}"));
        }
    }

    /// How the close after a successful commit went.
    ///
    /// The commit already published the bundle, so a failed delete is only
    /// worth mentioning in verbose mode.
    pub fn edit_closed(&self, edit_id: &str, close: &CloseOutcome) {
        match close {
            CloseOutcome::Deleted => self.detail("Closed edit", edit_id),
            CloseOutcome::AlreadyClosed => self.detail("Edit closed by commit", edit_id),
            CloseOutcome::Failed(reason) => {
                self.detail("Edit left to expire", format!("{edit_id} ({reason})"))
            }
        }
    }

    /// Arguments were rejected before anything ran
    pub fn invalid_arguments(&self, error: &PublishError) {
        self.error(&error.to_string());
    }

    /// The run failed; print the error and what to try next
    pub fn failure(&self, error: &PublishError) {
        self.error(&format!("Publish failed: {error}"));

        if self.quiet {
            return;
        }
        let suggestions = error.recovery_suggestions();
        if !suggestions.is_empty() {
            self.plain("\n💡 Recovery suggestions:");
            for suggestion in suggestions {
                self.plain(&format!("    • {suggestion}"));
            }
        }
    }

    /// Print an error message to stderr (shown even in quiet mode)
    pub fn error(&self, message: &str) {
        if !self.emit(&self.stderr, "✗", Color::Red, message) {
            // stderr is gone; stdout is the last place left
            println!("[STDERR ERROR] ✗ {}", message);
        }
    }

    fn emit(&self, target: &BufferWriter, symbol: &str, color: Color, message: &str) -> bool {
        let mut buffer = target.buffer();
        write_marked(&mut buffer, symbol, color, message).is_ok() && target.print(&buffer).is_ok()
    }

    fn plain(&self, message: &str) {
        let mut buffer = self.stdout.buffer();
        if writeln!(&mut buffer, "{message}").is_ok() {
            let _ = self.stdout.print(&buffer);
        }
    }
}

fn write_marked(buffer: &mut Buffer, symbol: &str, color: Color, message: &str) -> io::Result<()> {
    buffer.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(buffer, "{symbol}")?;
    buffer.reset()?;
    writeln!(buffer, " {message}")
}
