//! Colored step narration for packaging runs
//!
//! Narration goes to stdout, errors to stderr. Write failures are ignored:
//! losing a progress line must never fail a packaging run.

use std::io::Write;
use termcolor::{Buffer, BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    bufwtr: BufferWriter,
    quiet: bool,
}

impl OutputManager {
    /// Create a new output manager
    pub fn new(quiet: bool) -> Self {
        Self {
            bufwtr: BufferWriter::stdout(ColorChoice::Auto),
            quiet,
        }
    }

    fn emit(&self, marker: &str, marker_spec: Option<&ColorSpec>, message: &str) {
        if self.quiet {
            return;
        }
        let mut buffer = self.bufwtr.buffer();
        write_marked(&mut buffer, marker, marker_spec, message);
        let _ = self.bufwtr.print(&buffer);
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.quiet {
            return;
        }
        let mut buffer = self.bufwtr.buffer();
        let _ = writeln!(&mut buffer);
        let _ = buffer.set_color(&color(Color::Cyan, true));
        let _ = writeln!(&mut buffer, "═══ {} ═══", title);
        let _ = buffer.reset();
        let _ = self.bufwtr.print(&buffer);
    }

    /// Print a step that is about to run
    pub fn progress(&self, message: &str) {
        self.emit("⋯", Some(&color(Color::Magenta, false)), message);
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        self.emit("✓", Some(&color(Color::Green, true)), message);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        self.emit("⚠", Some(&color(Color::Yellow, true)), message);
    }

    /// Print an error message to stderr (shown even when quiet)
    pub fn error(&self, message: &str) {
        let bufwtr = BufferWriter::stderr(ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();
        write_marked(&mut buffer, "✗", Some(&color(Color::Red, true)), message);
        if bufwtr.print(&buffer).is_err() {
            println!("✗ {}", message);
        }
    }

    /// Print indented text (for sub-items)
    pub fn indent(&self, message: &str) {
        self.emit("   ", None, message);
    }

    /// Print a plain message
    pub fn println(&self, message: &str) {
        if self.quiet {
            return;
        }
        let mut buffer = self.bufwtr.buffer();
        let _ = writeln!(&mut buffer, "{}", message);
        let _ = self.bufwtr.print(&buffer);
    }
}

fn write_marked(buffer: &mut Buffer, marker: &str, spec: Option<&ColorSpec>, message: &str) {
    if let Some(spec) = spec {
        let _ = buffer.set_color(spec);
    }
    let _ = write!(buffer, "{}", marker);
    let _ = buffer.reset();
    let _ = writeln!(buffer, " {}", message);
}

fn color(fg: Color, bold: bool) -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(fg)).set_bold(bold);
    spec
}
