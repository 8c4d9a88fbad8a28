//! Terminal front end for the loan voice assistant.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Build the [`ConversationOrchestrator`] with the default microphone,
//!    speaker and the configured HTTP services.
//! 4. Start the conversation in the language given on the command line (or
//!    the configured one) and speak the greeting.
//! 5. Read stdin line by line until `/quit` or end of input.
//!
//! Each line is a typed user turn, except for these commands:
//!
//! | Command      | Effect                                   |
//! |--------------|------------------------------------------|
//! | `/mic`       | listen for one spoken turn               |
//! | `/stage`     | show the current loan stage              |
//! | `/history`   | print the conversation so far            |
//! | `/languages` | list supported language codes            |
//! | `/quit`      | exit                                     |

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use loan_voice::config::AppConfig;
use loan_voice::conversation::{
    ConversationOrchestrator, Language, Sender, StatusSnapshot, TurnError, TurnOutcome, TurnPhase,
};

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

fn print_bot(text: &str) {
    println!("bot> {text}");
}

fn print_turn(result: Result<TurnOutcome, TurnError>) {
    match result {
        Ok(TurnOutcome::Completed { reply }) => print_bot(&reply),
        Ok(TurnOutcome::NoSpeech) => println!("(no speech heard)"),
        Ok(TurnOutcome::EmptyTranscript) => println!("(nothing to send)"),
        Err(e) => eprintln!("error: {e}"),
    }
}

fn print_stage(orchestrator: &ConversationOrchestrator) {
    let stage = orchestrator.state().stage();
    println!(
        "stage {}/3: {} - {} ({:.0}%)",
        stage.index() + 1,
        stage.title(),
        stage.description(),
        stage.progress() * 100.0
    );
}

fn print_history(orchestrator: &ConversationOrchestrator) {
    for message in orchestrator.messages() {
        let who = match message.sender {
            Sender::User => "you",
            Sender::Bot => "bot",
        };
        println!("{who}> {}", message.text);
    }
}

/// Log phase changes as they happen.
async fn watch_status(mut rx: tokio::sync::mpsc::UnboundedReceiver<StatusSnapshot>) {
    let mut last_phase = TurnPhase::Idle;
    while let Some(snapshot) = rx.recv().await {
        if snapshot.phase != last_phase {
            log::info!("[{}]", snapshot.phase.label());
            last_phase = snapshot.phase;
        }
        if snapshot.is_recording {
            log::debug!("recording (window {} ms)", snapshot.recording_duration_ms);
        }
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("loan-voice starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Orchestrator
    let mut orchestrator = ConversationOrchestrator::from_config(&config)?;
    log::info!("session id: {}", orchestrator.session_id());
    tokio::spawn(watch_status(orchestrator.subscribe()));

    // 4. Language + greeting
    let language = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.conversation.language.clone());
    match orchestrator.start(&language).await {
        Ok(()) => {}
        Err(TurnError::UnsupportedLanguage(code)) => {
            let codes: Vec<_> = Language::all().iter().map(|l| l.code).collect();
            anyhow::bail!("unsupported language {code:?}; choose one of {}", codes.join(", "));
        }
        Err(e) => eprintln!("error: {e}"),
    }
    if let Some(greeting) = orchestrator.messages().first() {
        print_bot(&greeting.text);
    }

    // 5. Input loop
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" => break,
            "/mic" => {
                println!("(listening...)");
                print_turn(orchestrator.listen().await);
            }
            "/stage" => print_stage(&orchestrator),
            "/history" => print_history(&orchestrator),
            "/languages" => {
                for lang in Language::all() {
                    println!("{lang}");
                }
            }
            text => print_turn(orchestrator.send_text(text).await),
        }
    }

    orchestrator.cancel();
    log::info!("loan-voice shutting down");
    Ok(())
}
