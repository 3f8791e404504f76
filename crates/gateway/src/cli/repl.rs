//! `crewagent repl`: interactive chat command.
//!
//! A readline loop that runs each line as a pipeline turn and prints
//! the reply. Slash commands cover session management and a directory
//! listing; everything else is conversation.

use std::sync::Arc;

use ca_domain::config::Config;
use ca_domain::error::Result;
use ca_domain::types::TurnRequest;

use crate::bootstrap;
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run the interactive REPL.
///
/// Boots the full runtime (including the background sweeps, since a
/// REPL is long-lived), then loops on readline input.
pub async fn repl(config: Arc<Config>, mut session_id: String) -> anyhow::Result<()> {
    let state = bootstrap::build_app_state(config).await?;
    bootstrap::spawn_background_tasks(&state);

    // Persistent readline history under the home directory.
    let history_path = dirs::home_dir()
        .unwrap_or_default()
        .join(".crewagent")
        .join("repl_history.txt");
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let mut rl = rustyline::DefaultEditor::new()?;
    let _ = rl.load_history(&history_path);

    // Welcome goes to stderr so stdout stays clean for replies.
    eprintln!("CrewAgent interactive chat");
    eprintln!("Session: {session_id}  |  Type /help for commands, Ctrl+D to exit");
    eprintln!();

    loop {
        let readline = rl.readline("you> ");

        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                rl.add_history_entry(&line).ok();

                // ── Slash commands ────────────────────────────────
                if trimmed.starts_with('/') {
                    if handle_slash_command(&state, trimmed, &mut session_id).await {
                        break;
                    }
                    continue;
                }

                // ── User message → pipeline turn ─────────────────
                if let Err(e) = send_message(&state, &session_id, trimmed).await {
                    if e.is_upstream() {
                        eprintln!(
                            "\x1B[31mThe assistant is temporarily unavailable. Please try again shortly.\x1B[0m"
                        );
                        eprintln!("\x1B[2m({e})\x1B[0m");
                    } else {
                        eprintln!("\x1B[31merror: {e}\x1B[0m");
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                eprintln!("(Use Ctrl+D or /exit to quit)");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                break;
            }
            Err(e) => {
                eprintln!("\x1B[31mreadline error: {e}\x1B[0m");
                break;
            }
        }
    }

    rl.save_history(&history_path).ok();
    eprintln!("Goodbye!");
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Slash command handling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process a slash command. Returns `true` if the REPL should exit.
async fn handle_slash_command(
    state: &AppState,
    input: &str,
    session_id: &mut String,
) -> bool {
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0];
    let arg = parts.get(1).map(|s| s.trim());

    match cmd {
        "/exit" | "/quit" => return true,

        "/session" => {
            if let Some(name) = arg.filter(|s| !s.is_empty()) {
                *session_id = name.to_string();
                eprintln!("Session switched to: {session_id}");
            } else {
                eprintln!("Current session: {session_id}");
                eprintln!("Usage: /session <name>");
            }
        }

        "/employees" => match state.store.list_all().await {
            Ok(employees) if employees.is_empty() => {
                eprintln!("The directory is empty. Load records with `crewagent seed <file>`.");
            }
            Ok(employees) => {
                for employee in &employees {
                    eprintln!("  {}", employee.summary_line());
                }
                eprintln!("{} employee(s)", employees.len());
            }
            Err(e) => eprintln!("\x1B[31merror: {e}\x1B[0m"),
        },

        "/clear" => {
            // ANSI escape: clear screen and move cursor to top-left.
            eprint!("\x1B[2J\x1B[1;1H");
        }

        "/reset" => {
            // Evict the old session so its history and pointers are gone,
            // not just abandoned.
            state.sessions.evict(session_id).await;
            let ts = chrono::Utc::now().timestamp();
            *session_id = format!("{session_id}:{ts}");
            eprintln!("Session reset. New session id: {session_id}");
        }

        "/help" => {
            eprintln!("Commands:");
            eprintln!("  /session <name>  Switch to a named session");
            eprintln!("  /employees       List the employee directory");
            eprintln!("  /clear           Clear the screen");
            eprintln!("  /reset           Start a fresh session (new id)");
            eprintln!("  /exit, /quit     Exit the chat");
            eprintln!("  /help            Show this help");
        }

        other => {
            eprintln!("Unknown command: {other}  (type /help for a list)");
        }
    }

    false
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message sending
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run one turn and print the reply to stdout.
async fn send_message(state: &AppState, session_id: &str, user_message: &str) -> Result<()> {
    let request = TurnRequest::new(user_message).in_session(session_id);
    let reply = state.pipeline.handle_turn(request).await?;

    println!("{}", reply.reply);
    println!();

    if reply.pending_proposal_id.is_some() {
        eprintln!("\x1B[2m(pending change: type \"confirm\" to apply or \"cancel\" to discard)\x1B[0m");
    }

    Ok(())
}
