//! `quill chat`: interactive or single-message mode.

use std::io::{self, Write};
use std::path::Path;

use quill_agent::Agent;
use quill_config::AppConfig;
use quill_core::error::ProviderError;
use quill_core::message::{Conversation, Role};
use tracing::{debug, warn};

use crate::display::Display;
use crate::input::{Input, LineSource, Prompter};

const EXIT_COMMANDS: [&str; 5] = ["exit", "quit", "/exit", "/quit", ":q"];
const PROMPT: &str = "\x1b[1;36m>\x1b[0m ";

pub async fn run(
    explicit_config: Option<&Path>,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(explicit_config).map_err(|e| format!("Failed to load config: {e}"))?;

    let provider = match quill_providers::build_from_config(&config) {
        Ok(provider) => provider,
        Err(ProviderError::NotConfigured(reason)) => {
            print_setup_help(&reason);
            return Err("Provider not configured. See above for setup instructions.".into());
        }
        Err(e) => return Err(e.into()),
    };

    let cwd = std::env::current_dir()?;
    let agent = Agent::from_config(provider, &config, &cwd);
    let mut display = Display::stdout(&config.ui);

    match message {
        Some(message) => one_shot(&agent, &message, &mut display).await,
        None => interactive(&agent, &config, &mut display).await,
    }
}

async fn one_shot<W: Write>(
    agent: &Agent,
    message: &str,
    display: &mut Display<W>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut conversation = Conversation::new();
    match agent.respond(&mut conversation, message, display).await {
        Ok(_) => {
            display.finish()?;
            Ok(())
        }
        Err(e) => {
            display.error(&e.to_string())?;
            Err(e.into())
        }
    }
}

async fn interactive<W: Write>(
    agent: &Agent,
    config: &AppConfig,
    display: &mut Display<W>,
) -> Result<(), Box<dyn std::error::Error>> {
    display.banner(agent.provider_name(), agent.model(), agent.registry().len())?;

    let mut prompter = Prompter::spawn(&config.ui, PROMPT);
    let mut conversation = Conversation::new();
    let result = session(agent, &mut conversation, display, &mut prompter, ctrl_c).await;
    prompter.close().await;
    result?;

    display.hint("\nGoodbye!")?;
    Ok(())
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// Read utterances until EOF, an exit command, or two interrupts in a row at
/// the prompt. Each step races a fresh `interrupt()` future; if the
/// interrupt wins, the step is dropped and an `Error` message recorded.
async fn session<W, L, C, F>(
    agent: &Agent,
    conversation: &mut Conversation,
    display: &mut Display<W>,
    input: &mut L,
    mut interrupt: C,
) -> io::Result<()>
where
    W: Write,
    L: LineSource,
    C: FnMut() -> F,
    F: Future<Output = ()>,
{
    let mut exit_armed = false;

    loop {
        display.finish()?;
        let line = match input.read_line().await {
            Input::Line(line) => line,
            Input::Interrupted => {
                if exit_armed {
                    break;
                }
                exit_armed = true;
                display.hint("\nInterrupted. Press Ctrl+C again to exit.")?;
                continue;
            }
            Input::Eof => break,
        };
        exit_armed = false;

        let utterance = line.trim();
        if utterance.is_empty() {
            continue;
        }
        if EXIT_COMMANDS.contains(&utterance) {
            break;
        }

        let outcome = tokio::select! {
            outcome = agent.respond(conversation, utterance, display) => Some(outcome),
            _ = interrupt() => None,
        };

        match outcome {
            Some(Ok(_)) => display.finish()?,
            Some(Err(e)) => display.error(&e.to_string())?,
            None => {
                debug!(conversation_id = %conversation.id, "Utterance cancelled by user");
                conversation.append(Role::Error, "Interrupted");
                display.error("Interrupted")?;
            }
        }
    }

    display.finish()
}

fn print_setup_help(reason: &str) {
    eprintln!();
    eprintln!("  ERROR: {reason}");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    GEMINI_API_KEY=...      (default provider)");
    eprintln!("    OPENAI_API_KEY=...      (with QUILL_PROVIDER=openai)");
    eprintln!("    QUILL_API_KEY=...       (any provider)");
    eprintln!("    USE_MOCK_MODEL=true     (offline mock, no key needed)");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
}
