//! Terminal output and prompts.

use std::io::{self, BufRead, BufReader, Write};
use std::sync::Mutex;

/// What commands and trace sinks need from the terminal.
pub trait Ui: Send + Sync {
    /// Print a line of text.
    fn display_text(&self, text: &str);

    /// Print `OK`.
    fn display_ok(&self);

    /// Print a warning to the error stream.
    fn display_warning(&self, text: &str);

    /// Print an error to the error stream.
    fn display_error(&self, text: &str);

    /// Ask a yes/no question. An empty answer selects `default`.
    fn display_boolean_prompt(&self, default: bool, prompt: &str) -> io::Result<bool>;

    /// Write a block of request trace output.
    fn write_trace(&self, text: &str) -> io::Result<()>;
}

type Writer = Mutex<Box<dyn Write + Send>>;

/// [`Ui`] over a pair of writers and a reader, normally the process's stdio.
pub struct TerminalUi {
    out: Writer,
    err: Writer,
    input: Mutex<Box<dyn BufRead + Send>>,
}

impl TerminalUi {
    pub fn new(
        out: impl Write + Send + 'static,
        err: impl Write + Send + 'static,
        input: impl BufRead + Send + 'static,
    ) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
            err: Mutex::new(Box::new(err)),
            input: Mutex::new(Box::new(input)),
        }
    }

    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr(), BufReader::new(io::stdin()))
    }

    fn write_line(writer: &Writer, text: &str) -> io::Result<()> {
        let mut writer = writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(writer, "{}", text)?;
        writer.flush()
    }

    fn print(writer: &Writer, text: &str) {
        if let Err(e) = Self::write_line(writer, text) {
            tracing::debug!(error = %e, "failed to write to terminal");
        }
    }
}

impl std::fmt::Debug for TerminalUi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalUi").finish_non_exhaustive()
    }
}

impl Ui for TerminalUi {
    fn display_text(&self, text: &str) {
        Self::print(&self.out, text);
    }

    fn display_ok(&self) {
        Self::print(&self.out, "OK");
    }

    fn display_warning(&self, text: &str) {
        Self::print(&self.err, text);
    }

    fn display_error(&self, text: &str) {
        Self::print(&self.out, "FAILED");
        Self::print(&self.err, text);
    }

    fn display_boolean_prompt(&self, default: bool, prompt: &str) -> io::Result<bool> {
        let hint = if default { "[Yn]" } else { "[yN]" };
        {
            let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            write!(out, "{} {}> ", prompt, hint)?;
            out.flush()?;
        }

        let mut answer = String::new();
        self.input
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .read_line(&mut answer)?;

        Ok(match answer.trim().to_ascii_lowercase().as_str() {
            "" => default,
            "y" | "yes" => true,
            _ => false,
        })
    }

    fn write_trace(&self, text: &str) -> io::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        out.write_all(text.as_bytes())?;
        writeln!(out)?;
        out.flush()
    }
}
