use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use console::{Style as Paint, Term};
use indicatif::{ProgressBar, ProgressStyle};

/// Styled terminal output for commands.
///
/// Results go to `out`, error blocks to `err`. Colours and the spinner are
/// only used when the output is an interactive terminal, unless forced off.
pub struct Style {
    out: Mutex<Box<dyn Write + Send>>,
    err: Mutex<Box<dyn Write + Send>>,
    colors: bool,
    interactive: bool,
}

impl Style {
    /// Write to stdout/stderr.
    pub fn terminal(no_color: bool) -> Self {
        let interactive = Term::stdout().is_term();
        Self {
            out: Mutex::new(Box::new(io::stdout())),
            err: Mutex::new(Box::new(io::stderr())),
            colors: interactive && !no_color && console::colors_enabled(),
            interactive,
        }
    }

    /// Write everything, uncoloured, into a shared buffer.
    pub fn buffered() -> (Self, OutputBuffer) {
        let buffer = OutputBuffer::default();
        let style = Self {
            out: Mutex::new(Box::new(buffer.clone())),
            err: Mutex::new(Box::new(buffer.clone())),
            colors: false,
            interactive: false,
        };
        (style, buffer)
    }

    pub fn colors(&self) -> bool {
        self.colors
    }

    fn paint(&self, style: Paint) -> Paint {
        style.force_styling(self.colors)
    }

    fn out(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        self.out.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn err(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        self.err.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A plain line on stdout.
    pub fn line(&self, text: impl AsRef<str>) -> io::Result<()> {
        writeln!(self.out(), "{}", text.as_ref())
    }

    /// A bold, underlined heading.
    pub fn title(&self, text: impl AsRef<str>) -> io::Result<()> {
        let paint = self.paint(Paint::new().yellow().bold());
        let text = text.as_ref();
        writeln!(self.out(), "{}", paint.apply_to(text))?;
        writeln!(self.out(), "{}", paint.apply_to("=".repeat(text.chars().count())))
    }

    pub fn success(&self, text: impl AsRef<str>) -> io::Result<()> {
        let paint = self.paint(Paint::new().green());
        writeln!(self.out(), "{}", paint.apply_to(format!("[OK] {}", text.as_ref())))
    }

    pub fn note(&self, text: impl AsRef<str>) -> io::Result<()> {
        let paint = self.paint(Paint::new().yellow());
        writeln!(self.out(), "{}", paint.apply_to(format!("! [NOTE] {}", text.as_ref())))
    }

    /// An error block on stderr.
    pub fn error(&self, text: impl AsRef<str>) -> io::Result<()> {
        let paint = self.paint(Paint::new().white().on_red().bold());
        writeln!(self.err(), "{}", paint.apply_to(format!("[ERROR] {}", text.as_ref())))
    }

    /// `label: value` pairs, aligned.
    pub fn definitions(&self, rows: &[(&str, String)]) -> io::Result<()> {
        let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        let paint = self.paint(Paint::new().cyan());
        for (label, value) in rows {
            let padded = format!("{label:<width$}");
            writeln!(self.out(), "{} {value}", paint.apply_to(padded))?;
        }
        Ok(())
    }

    /// Spinner shown while a remote call is in flight; hidden when not on a terminal.
    pub fn spinner(&self, message: impl Into<String>) -> ProgressBar {
        if !self.interactive {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        pb.set_style(style);
        pb.set_message(message.into());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }
}

/// Cloneable in-memory sink that [`Style::buffered`] writes into.
#[derive(Clone, Default)]
pub struct OutputBuffer(Arc<Mutex<Vec<u8>>>);

impl OutputBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_output_is_plain() {
        let (style, buffer) = Style::buffered();
        style.success("Opened issue: https://github.com/gushphp/gush/issues/1").unwrap();
        style.error("Issue #7 was already closed.").unwrap();
        assert_eq!(
            buffer.contents(),
            "[OK] Opened issue: https://github.com/gushphp/gush/issues/1\n\
             [ERROR] Issue #7 was already closed.\n"
        );
    }

    #[test]
    fn test_definitions_are_aligned() {
        let (style, buffer) = Style::buffered();
        style
            .definitions(&[("State", "open".into()), ("Milestone", "v1.0".into())])
            .unwrap();
        assert_eq!(buffer.contents(), "State     open\nMilestone v1.0\n");
    }
}
