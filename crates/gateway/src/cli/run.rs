//! `crewagent run`: one-shot execution command.
//!
//! Sends a single message through the pipeline, prints the reply, and
//! exits. Useful for scripting and quick checks.

use std::sync::Arc;

use ca_domain::config::Config;
use ca_domain::types::TurnRequest;

use crate::bootstrap;

/// Execute a single turn and print the response.
pub async fn run(
    config: Arc<Config>,
    message: String,
    session: String,
    json_output: bool,
) -> anyhow::Result<()> {
    let state = bootstrap::build_app_state(config).await?;

    let request = TurnRequest::new(message).in_session(session);
    match state.pipeline.handle_turn(request).await {
        Ok(reply) => {
            if json_output {
                println!("{}", serde_json::to_string_pretty(&reply)?);
            } else {
                println!("{}", reply.reply);
                if let Some(id) = reply.pending_proposal_id {
                    eprintln!(
                        "(pending change {id}: run again with \"confirm\" in the same session to apply)"
                    );
                }
            }
            Ok(())
        }
        Err(e) => {
            if e.is_upstream() {
                eprintln!("The assistant is temporarily unavailable. Please try again shortly.");
                eprintln!("({e})");
            } else {
                eprintln!("error: {e}");
            }
            std::process::exit(1);
        }
    }
}
