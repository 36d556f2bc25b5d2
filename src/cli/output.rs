//! Colored terminal output for packaging runs.
//!
//! Status lines go to stdout and respect `--quiet`; errors always go to stderr.

use std::io::Write;
use termcolor::{Buffer, BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Writes symbol-prefixed status lines to the terminal.
#[derive(Debug)]
pub struct OutputManager {
    bufwtr: BufferWriter,
    verbose: bool,
    quiet: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self::new(self.verbose, self.quiet)
    }
}

impl OutputManager {
    /// Stdout writer with automatic color detection.
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            bufwtr: BufferWriter::stdout(ColorChoice::Auto),
            verbose,
            quiet,
        }
    }

    /// Bold green `✓` line.
    pub fn success(&self, message: &str) -> std::io::Result<()> {
        self.status(
            "✓",
            ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true),
            message,
        )
    }

    /// Bold yellow `⚠` line.
    pub fn warn(&self, message: &str) -> std::io::Result<()> {
        self.status(
            "⚠",
            ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true),
            message,
        )
    }

    /// Red `✗` line on stderr, printed even with `--quiet`.
    pub fn error(&self, message: &str) {
        let bufwtr = BufferWriter::stderr(ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();
        let written = write_status(
            &mut buffer,
            "✗",
            ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true),
            message,
        )
        .and_then(|()| bufwtr.print(&buffer));
        if written.is_err() {
            eprintln!("✗ {message}");
        }
    }

    /// Blue `→` line, printed only with `--verbose`.
    pub fn verbose(&self, message: &str) -> std::io::Result<()> {
        if !self.verbose {
            return Ok(());
        }
        self.status("→", ColorSpec::new().set_fg(Some(Color::Blue)), message)
    }

    /// Blank line followed by a bold heading.
    pub fn section(&self, title: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let mut buffer = self.bufwtr.buffer();
        writeln!(&mut buffer)?;
        buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        writeln!(&mut buffer, "== {title} ==")?;
        buffer.reset()?;
        self.bufwtr.print(&buffer)
    }

    /// Detail line under the previous status.
    pub fn indent(&self, message: &str) -> std::io::Result<()> {
        self.println(&format!("    {message}"))
    }

    /// Uncolored line.
    pub fn println(&self, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let mut buffer = self.bufwtr.buffer();
        writeln!(&mut buffer, "{message}")?;
        self.bufwtr.print(&buffer)
    }

    /// Whether `--quiet` was given.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    fn status(&self, symbol: &str, spec: &ColorSpec, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let mut buffer = self.bufwtr.buffer();
        write_status(&mut buffer, symbol, spec, message)?;
        self.bufwtr.print(&buffer)
    }
}

fn write_status(
    buffer: &mut Buffer,
    symbol: &str,
    spec: &ColorSpec,
    message: &str,
) -> std::io::Result<()> {
    buffer.set_color(spec)?;
    write!(buffer, "{}", symbol)?;
    buffer.reset()?;
    writeln!(buffer, " {}", message)
}
