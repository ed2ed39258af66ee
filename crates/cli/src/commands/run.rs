//! `stepwise run`: answer one query and exit.

use std::path::Path;
use stepwise_core::AgentStatus;

use super::{CtrlC, build_agent, load_config, report_error};

pub async fn run(
    config_path: Option<&Path>,
    query: &str,
    trace: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let agent = build_agent(&config)?;

    let ctrl_c = CtrlC::arm();
    let run = match agent.run_with_cancel(query, &[], ctrl_c.token()).await {
        Ok(run) => run,
        Err(e) => {
            report_error(&e);
            return Err(format!("agent run failed ({})", e.code).into());
        }
    };

    if trace {
        println!("{}", serde_json::to_string_pretty(&run)?);
    }

    match run.status {
        AgentStatus::Cancelled => eprintln!("Cancelled."),
        status if status.is_terminal() => {
            if status == AgentStatus::MaxStepsReached {
                eprintln!("  (step limit reached; best-effort answer)");
            }
            println!("{}", run.final_response.unwrap_or_default());
        }
        status => {
            return Err(format!("agent run stopped in non-terminal status {status:?}").into());
        }
    }

    Ok(())
}
