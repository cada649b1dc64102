//! CLI interface for lookout.
//!
//! Each subcommand opens the stored session, does one thing, and exits.
//! Transport events come in through `ingest`; the user's side of the
//! conversation goes out through `select` and `say`.

mod format;

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::feed::{self, TransportEvent};
use crate::options;
use crate::session::Session;
use crate::storage::Storage;

use format::{format_handled, format_task, format_view};

/// Lookout: build a monitoring task by talking it through.
#[derive(Debug, Parser)]
#[command(name = "lookout", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow:
  1. lookout say "I want to monitor AI startups"
  2. lookout ingest turn.jsonl
     → reconciles the assistant's messages and tool calls
  3. lookout show
     → the conversation, with the question and options of the last turn
  4. lookout select 2 --fill Company=Acme
  5. lookout task

Start over:
  lookout reset --yes"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconcile transport events (JSON lines) into the session.
    ///
    /// Reads from FILE, or stdin when omitted.
    /// Each line is a `messages`, `toolCall`, or `abort` event.
    Ingest {
        /// Event file to read.
        file: Option<PathBuf>,
    },

    /// Print the monitoring task.
    Task {
        /// Print JSON instead of the preview.
        #[arg(long)]
        json: bool,
    },

    /// Print the conversation.
    Show {
        /// Print the stored messages as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Pick one of the options offered by the last assistant message.
    ///
    /// Options are numbered from 1, as `show` lists them. Placeholders in
    /// the option's value (e.g. `[Company]`) must be filled with `--fill`.
    Select {
        /// Option number.
        index: usize,

        /// Placeholder value, as `NAME=VALUE`. Repeat for each placeholder.
        #[arg(long = "fill", value_parser = parse_fill)]
        fills: Vec<(String, String)>,
    },

    /// Send a free-text message.
    Say {
        /// Message text.
        text: String,
    },

    /// Clear the conversation, tool calls, and monitoring task.
    Reset {
        /// Confirm the reset.
        #[arg(long)]
        yes: bool,
    },
}

/// Run the CLI, returning an error message on failure.
pub fn run(storage: &Storage) -> Result<(), String> {
    let cli = Cli::parse();
    let mut session = Session::open(storage).map_err(|e| format!("failed to load session: {e}"))?;

    match cli.command {
        Command::Ingest { file } => cmd_ingest(&mut session, file),
        Command::Task { json } => cmd_task(&session, json),
        Command::Show { json } => cmd_show(&session, json),
        Command::Select { index, fills } => cmd_select(&mut session, index, fills),
        Command::Say { text } => cmd_say(&mut session, &text),
        Command::Reset { yes } => cmd_reset(&mut session, yes),
    }
}

fn parse_fill(arg: &str) -> Result<(String, String), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{arg}'"))?;
    let name = name.trim().trim_start_matches('[').trim_end_matches(']');
    if name.is_empty() {
        return Err(format!("missing placeholder name in '{arg}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

fn cmd_ingest(session: &mut Session<'_>, file: Option<PathBuf>) -> Result<(), String> {
    let events = match &file {
        Some(path) => {
            let file =
                File::open(path).map_err(|e| format!("failed to open {}: {e}", path.display()))?;
            feed::read_events(BufReader::new(file))
        }
        None => feed::read_events(io::stdin().lock()),
    }
    .map_err(|e| format!("failed to read events: {e}"))?;

    for line in apply_events(session, events)? {
        eprintln!("{line}");
    }
    Ok(())
}

/// Feed events to the session in order, returning the lines to report.
///
/// A `messages` event closes the step opened by the previous one.
fn apply_events(
    session: &mut Session<'_>,
    events: Vec<TransportEvent>,
) -> Result<Vec<String>, String> {
    let mut lines = Vec::new();
    let mut recorded = 0;
    let mut step = Vec::new();

    for event in events {
        match event {
            TransportEvent::Messages { messages } => {
                session.end_step(&step);
                step.clear();
                session
                    .observe_messages(messages)
                    .map_err(|e| format!("failed to save messages: {e}"))?;
            }
            TransportEvent::ToolCall { tool_call } => {
                let handled = session
                    .handle_tool_call(tool_call)
                    .map_err(|e| format!("failed to record tool call: {e}"))?;
                if handled.reconciled.recorded {
                    recorded += 1;
                    lines.extend(format_handled(&handled));
                }
                step.extend(handled.call);
            }
            TransportEvent::Abort { reason } => {
                step.clear();
                lines.push(session.abort_turn(reason.as_deref()).to_string());
            }
        }
    }
    session.end_step(&step);

    lines.push(format!(
        "{recorded} new tool call(s), {} recorded in total; task has {} source(s)",
        session.reconciler().invocations().len(),
        session.task().sources.len()
    ));
    Ok(lines)
}

fn cmd_task(session: &Session<'_>, json: bool) -> Result<(), String> {
    if json {
        let json = serde_json::to_string_pretty(session.task())
            .map_err(|e| format!("failed to serialize task: {e}"))?;
        println!("{json}");
    } else {
        println!("{}", format_task(session.task()));
    }
    Ok(())
}

fn cmd_show(session: &Session<'_>, json: bool) -> Result<(), String> {
    if json {
        let json = serde_json::to_string_pretty(session.transcript())
            .map_err(|e| format!("failed to serialize messages: {e}"))?;
        println!("{json}");
    } else {
        println!("{}", format_view(&session.view()));
    }
    Ok(())
}

fn cmd_select(
    session: &mut Session<'_>,
    index: usize,
    fills: Vec<(String, String)>,
) -> Result<(), String> {
    let mut set = session
        .pending_options()
        .ok_or("the last message offers no options")?;
    if index == 0 {
        return Err("options are numbered from 1".to_string());
    }

    let fills: HashMap<String, String> = fills.into_iter().collect();
    if set.needs_input(index - 1) && fills.is_empty() {
        let wanted = options::placeholders(&set.options()[index - 1].value)
            .iter()
            .map(|name| format!("--fill '{name}=...'"))
            .collect::<Vec<_>>()
            .join(" ");
        return Err(format!("option {index} needs values: {wanted}"));
    }
    let text = set
        .select(index - 1, &fills)
        .map_err(|e| e.to_string())?;

    let message = session
        .push_user_message(text)
        .map_err(|e| format!("failed to save message: {e}"))?;
    println!("{}", message.text_content());
    Ok(())
}

fn cmd_say(session: &mut Session<'_>, text: &str) -> Result<(), String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("message is empty".to_string());
    }
    session
        .push_user_message(text)
        .map_err(|e| format!("failed to save message: {e}"))?;
    Ok(())
}

fn cmd_reset(session: &mut Session<'_>, yes: bool) -> Result<(), String> {
    if !yes {
        return Err(
            "this clears the conversation and the monitoring task; pass --yes to confirm"
                .to_string(),
        );
    }
    session
        .reset()
        .map_err(|e| format!("failed to reset: {e}"))?;
    eprintln!("Conversation cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;
    use tempfile::TempDir;

    use crate::session::FAILURE_NOTICE;
    use crate::storage::{TASK_KEY, TOOL_CALLS_KEY};

    fn events(jsonl: &str) -> Vec<TransportEvent> {
        feed::read_events(jsonl.as_bytes()).unwrap()
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn abort_after_messages_records_nothing() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path().join("state.sqlite")).unwrap();
        let mut session = Session::open(&storage).unwrap();

        let lines = apply_events(
            &mut session,
            events(concat!(
                r#"{"event":"messages","messages":[{"id":"u1","role":"user","parts":[{"type":"text","text":"Track AI news"}]},{"id":"a1","role":"assistant","parts":[]}]}"#,
                "\n",
                r#"{"event":"abort","reason":"stream closed"}"#,
                "\n",
            )),
        )
        .unwrap();

        assert_eq!(lines[0], FAILURE_NOTICE);
        assert!(lines[1].starts_with("0 new tool call(s), 0 recorded in total"));
        assert!(session.reconciler().invocations().is_empty());
        assert!(session.task().sources.is_empty());
        assert!(!storage.contains(TOOL_CALLS_KEY).unwrap());
        assert!(!storage.contains(TASK_KEY).unwrap());
    }

    #[test]
    fn replayed_update_is_reported_once() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path().join("state.sqlite")).unwrap();
        let mut session = Session::open(&storage).unwrap();

        let lines = apply_events(
            &mut session,
            events(concat!(
                r#"{"event":"messages","messages":[{"id":"a1","role":"assistant","parts":[]}]}"#,
                "\n",
                r#"{"event":"toolCall","toolCall":{"toolCallId":"c1","toolName":"updateMonitoringTask","input":{"sources":[{"type":"news_outlet","name":"TechCrunch"}]}}}"#,
                "\n",
                r#"{"event":"toolCall","toolCall":{"toolCallId":"c1","toolName":"updateMonitoringTask","input":{"sources":[{"type":"news_outlet","name":"TechCrunch"}]}}}"#,
                "\n",
            )),
        )
        .unwrap();

        assert_eq!(lines[0], "Added 1 source(s)");
        assert!(lines[1].contains("TechCrunch"));
        assert_eq!(
            lines[2],
            "1 new tool call(s), 2 recorded in total; task has 1 source(s)"
        );
    }

    #[test]
    fn parse_fill_splits_on_first_equals() {
        assert_eq!(
            parse_fill("Query=a=b").unwrap(),
            ("Query".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_fill("[City]=Berlin").unwrap(),
            ("City".to_string(), "Berlin".to_string())
        );
        assert!(parse_fill("City").is_err());
        assert!(parse_fill("=Berlin").is_err());
    }

    #[test]
    fn select_parses_repeated_fills() {
        let cli = Cli::try_parse_from([
            "lookout", "select", "2", "--fill", "Company=Acme", "--fill", "City=Berlin",
        ])
        .unwrap();

        let Command::Select { index, fills } = cli.command else {
            panic!("expected select");
        };
        assert_eq!(index, 2);
        assert_eq!(fills.len(), 2);
    }
}
