//! Line editing with persistent, recallable history.
//!
//! `rustyline` blocks, so the editor lives on a blocking thread. The session
//! asks for a line, the thread shows the prompt and answers over a channel.
//! The prompt is only shown on request, never while a step is streaming.

use std::path::Path;
use std::sync::mpsc as std_mpsc;

use quill_config::UiConfig;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// One answer from the line editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    /// Ctrl+C at the prompt
    Interrupted,
    /// Ctrl+D, closed stdin, or an unusable terminal
    Eof,
}

/// Anything the chat session can read utterances from.
pub trait LineSource {
    async fn read_line(&mut self) -> Input;
}

pub struct Prompter {
    requests: Option<std_mpsc::Sender<()>>,
    lines: mpsc::Receiver<Input>,
    worker: Option<JoinHandle<()>>,
}

impl Prompter {
    /// Start the editor thread, loading history from `ui.history_path()`
    /// and capping it at `ui.max_history` entries.
    pub fn spawn(ui: &UiConfig, prompt: &str) -> Self {
        let path = ui.history_path();
        let max = ui.max_history;
        let prompt = prompt.to_string();
        let (request_tx, request_rx) = std_mpsc::channel();
        let (line_tx, line_rx) = mpsc::channel(1);

        let worker = tokio::task::spawn_blocking(move || {
            edit_loop(&path, max, &prompt, &request_rx, &line_tx);
        });

        Self {
            requests: Some(request_tx),
            lines: line_rx,
            worker: Some(worker),
        }
    }

    /// Stop the editor thread and wait until history is written.
    pub async fn close(mut self) {
        self.requests.take();
        if let Some(worker) = self.worker.take()
            && let Err(e) = worker.await
        {
            warn!(error = %e, "Line editor thread failed");
        }
    }
}

impl LineSource for Prompter {
    async fn read_line(&mut self) -> Input {
        let Some(requests) = &self.requests else {
            return Input::Eof;
        };
        if requests.send(()).is_err() {
            return Input::Eof;
        }
        self.lines.recv().await.unwrap_or(Input::Eof)
    }
}

fn build_editor(max_history: usize) -> rustyline::Result<DefaultEditor> {
    let config = Config::builder().max_history_size(max_history)?.build();
    DefaultEditor::with_config(config)
}

fn edit_loop(
    path: &Path,
    max_history: usize,
    prompt: &str,
    requests: &std_mpsc::Receiver<()>,
    lines: &mpsc::Sender<Input>,
) {
    let mut editor = match build_editor(max_history) {
        Ok(editor) => editor,
        Err(e) => {
            warn!(error = %e, "Failed to initialise line editor");
            let _ = lines.blocking_send(Input::Eof);
            return;
        }
    };
    if let Err(e) = editor.load_history(path) {
        debug!(path = %path.display(), error = %e, "No input history loaded");
    }

    while requests.recv().is_ok() {
        let input = match editor.readline(prompt) {
            Ok(line) => {
                let entry = line.trim();
                if !entry.is_empty()
                    && let Err(e) = editor.add_history_entry(entry)
                {
                    debug!(error = %e, "Failed to record history entry");
                }
                Input::Line(line)
            }
            Err(ReadlineError::Interrupted) => Input::Interrupted,
            Err(ReadlineError::Eof) => Input::Eof,
            Err(e) => {
                warn!(error = %e, "Failed to read input");
                Input::Eof
            }
        };
        let done = input == Input::Eof;
        if lines.blocking_send(input).is_err() || done {
            break;
        }
    }

    if let Err(e) = save_history(&mut editor, path) {
        warn!(path = %path.display(), error = %e, "Failed to save input history");
    }
}

fn save_history(editor: &mut DefaultEditor, path: &Path) -> rustyline::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    editor.save_history(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustyline::history::History;

    #[test]
    fn history_round_trips_and_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("input_history");

        let mut editor = build_editor(3).unwrap();
        for i in 0..5 {
            editor.add_history_entry(format!("line {i}")).unwrap();
        }
        save_history(&mut editor, &path).unwrap();

        let mut reloaded = build_editor(3).unwrap();
        reloaded.load_history(&path).unwrap();
        let entries: Vec<String> = reloaded.history().iter().cloned().collect();
        assert_eq!(entries, ["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn missing_history_file_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = build_editor(10).unwrap();
        assert!(editor.load_history(&dir.path().join("nope")).is_err());
        assert_eq!(editor.history().len(), 0);
    }

    #[tokio::test]
    async fn closed_prompter_reads_eof() {
        let (_tx, rx) = mpsc::channel(1);
        let mut prompter = Prompter {
            requests: None,
            lines: rx,
            worker: None,
        };
        assert_eq!(prompter.read_line().await, Input::Eof);
    }
}
