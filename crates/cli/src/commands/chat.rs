//! `stepwise chat`: multi-turn chat over stdin.
//!
//! History lives only in memory and is discarded on exit.

use std::io::Write;
use std::path::Path;
use stepwise_core::{AgentStatus, Message};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{CtrlC, build_agent, load_config, report_error};

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let agent = build_agent(&config)?;

    eprintln!();
    eprintln!("  stepwise chat");
    eprintln!("  Provider:  {}", config.provider.kind);
    eprintln!("  Model:     {}", config.provider.model);
    eprintln!("  Max steps: {}", config.agent.max_steps);
    eprintln!("  Type 'exit' to quit, Ctrl-C to cancel a turn.");
    eprintln!();

    let mut history: Vec<Message> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        eprint!("you > ");
        std::io::stderr().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit") {
            break;
        }

        let ctrl_c = CtrlC::arm();
        match agent.run_with_cancel(query, &history, ctrl_c.token()).await {
            Ok(run) if run.status == AgentStatus::Cancelled => eprintln!("  (cancelled)"),
            Ok(run) => {
                let answer = run.final_response.unwrap_or_default();
                println!("{answer}");
                println!();
                record_turn(&mut history, query, answer);
            }
            Err(e) => report_error(&e),
        }
    }

    eprintln!("Goodbye!");
    Ok(())
}

/// Append a finished turn to the history. A turn with an empty answer is
/// dropped entirely.
fn record_turn(history: &mut Vec<Message>, query: &str, answer: String) {
    if answer.trim().is_empty() {
        return;
    }
    history.push(Message::user(query));
    history.push(Message::assistant(answer));
}
