//! Terminal rendering of the narration channel.
//!
//! Model text is buffered and flushed when either the flush interval has
//! elapsed or the buffer grows past the size threshold. Status lines and
//! tool output flush the buffer first, so nothing is ever reordered.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use quill_agent::{Narration, NarrationSink};
use quill_config::UiConfig;
use tracing::warn;

const RESET: &str = "\x1b[0m";
const CYAN: &str = "\x1b[36m";
const RED: &str = "\x1b[31m";
const BOLD_RED: &str = "\x1b[1;31m";
const BOLD_CYAN: &str = "\x1b[1;36m";
const DIM: &str = "\x1b[2m";

pub struct Display<W: Write> {
    out: W,
    buffer: String,
    last_flush: Instant,
    interval: Duration,
    threshold: usize,
    /// Whether the last byte written was a newline (or nothing was written yet)
    at_line_start: bool,
}

impl Display<io::Stdout> {
    pub fn stdout(ui: &UiConfig) -> Self {
        Self::new(
            io::stdout(),
            Duration::from_millis(ui.flush_interval_ms),
            ui.flush_threshold_chars,
        )
    }
}

impl<W: Write> Display<W> {
    pub fn new(out: W, interval: Duration, threshold: usize) -> Self {
        Self {
            out,
            buffer: String::new(),
            last_flush: Instant::now(),
            interval,
            threshold,
            at_line_start: true,
        }
    }

    /// Queue a model text delta.
    pub fn text(&mut self, delta: &str) -> io::Result<()> {
        self.buffer.push_str(delta);
        if self.last_flush.elapsed() > self.interval || self.buffer.chars().count() > self.threshold {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            self.out.write_all(self.buffer.as_bytes())?;
            self.at_line_start = self.buffer.ends_with('\n');
            self.buffer.clear();
        }
        self.last_flush = Instant::now();
        self.out.flush()
    }

    /// Write a complete line, starting a fresh one first if needed.
    fn line(&mut self, content: &str, color: Option<&str>) -> io::Result<()> {
        self.flush()?;
        if !self.at_line_start {
            self.out.write_all(b"\n")?;
        }
        let body = content.strip_suffix('\n').unwrap_or(content);
        match color {
            Some(color) => writeln!(self.out, "{color}{body}{RESET}")?,
            None => writeln!(self.out, "{body}")?,
        }
        self.at_line_start = true;
        self.out.flush()
    }

    pub fn narrate(&mut self, event: &Narration) -> io::Result<()> {
        match event {
            Narration::Text { content } => self.text(content),
            Narration::ToolRunning { .. } | Narration::ToolCompleted { .. } => {
                self.line(&event.render(), None)
            }
            Narration::ToolStdout { content } => self.line(content, Some(CYAN)),
            Narration::ToolStderr { content } => self.line(content, Some(RED)),
        }
    }

    /// End of a successful utterance: flush and make sure the prompt starts
    /// on its own line.
    pub fn finish(&mut self) -> io::Result<()> {
        self.flush()?;
        if !self.at_line_start {
            self.out.write_all(b"\n")?;
            self.at_line_start = true;
        }
        self.out.flush()
    }

    /// A failed utterance, in bold red.
    pub fn error(&mut self, message: &str) -> io::Result<()> {
        self.line(&format!("Error: {message}"), Some(BOLD_RED))
    }

    pub fn hint(&mut self, message: &str) -> io::Result<()> {
        self.line(message, Some(DIM))
    }

    pub fn banner(&mut self, provider: &str, model: &str, tools: usize) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "  {BOLD_CYAN}Quill{RESET}")?;
        writeln!(self.out, "  {DIM}A terminal coding assistant{RESET}")?;
        writeln!(self.out)?;
        writeln!(self.out, "  Provider:  {provider}")?;
        writeln!(self.out, "  Model:     {model}")?;
        writeln!(self.out, "  Tools:     {tools} built-in")?;
        writeln!(self.out)?;
        writeln!(self.out, "  {DIM}Type your message and press Enter.{RESET}")?;
        writeln!(self.out, "  {DIM}Type 'exit' or press Ctrl+C twice to quit.{RESET}")?;
        writeln!(self.out)?;
        self.at_line_start = true;
        self.out.flush()
    }

    #[cfg(test)]
    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write> NarrationSink for Display<W> {
    fn emit(&mut self, event: Narration) {
        if let Err(e) = self.narrate(&event) {
            warn!(error = %e, "Failed to write to terminal");
        }
    }
}
