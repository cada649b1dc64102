//! Output formatting for CLI display.

use std::fmt::Write;

use crate::model::{MonitoringTask, Role};
use crate::session::{ConversationView, Handled};

/// Shown in place of the conversation before anything has been said.
pub(super) const EMPTY_STATE: &str = "Let's create your monitoring task\n\
    Start by telling me what you would like to monitor. For example: \
    \"I want to monitor AI startups\" or \"Track news about climate tech\"";

/// Shown for a report that carries no message of its own.
const FOUND_FALLBACK: &str = "✓ Successfully found relevant sources for your monitoring task!";
const NOT_FOUND_FALLBACK: &str = "⚠ No results found. Let's try a different approach.";

/// Format the monitoring task preview.
pub(super) fn format_task(task: &MonitoringTask) -> String {
    let mut out = String::from("Monitoring Scope\n");
    match &task.scope {
        Some(scope) => {
            let _ = writeln!(out, "  {scope}");
        }
        None => out.push_str("  Not defined yet\n"),
    }

    let _ = writeln!(out, "\nSources ({})", task.sources.len());
    if task.sources.is_empty() {
        out.push_str("  No sources added yet\n");
    }
    for source in &task.sources {
        let _ = writeln!(out, "  {} [{}]", source.name, source.kind);
        if let Some(url) = &source.url {
            let _ = writeln!(out, "    {url}");
        }
        if let Some(description) = &source.description {
            let _ = writeln!(out, "    {description}");
        }
    }

    out.trim_end().to_string()
}

/// Format the conversation, one block per message.
pub(super) fn format_view(view: &ConversationView) -> String {
    if view.is_empty() {
        return EMPTY_STATE.to_string();
    }

    let mut blocks = Vec::with_capacity(view.turns.len());
    for turn in &view.turns {
        let who = match turn.role {
            Role::User => "You",
            Role::Assistant => "Assistant",
        };
        let mut block = format!("{who}:");
        if !turn.text.is_empty() {
            for line in turn.text.lines() {
                let _ = write!(block, "\n  {line}");
            }
        }
        if let Some(report) = &turn.report {
            let (mark, fallback) = if report.found {
                ("found", FOUND_FALLBACK)
            } else {
                ("not found", NOT_FOUND_FALLBACK)
            };
            let message = if report.message.is_empty() {
                fallback
            } else {
                report.message.as_str()
            };
            let _ = write!(block, "\n  [{mark}] {message}");
        }
        if let Some(question) = &turn.question {
            let _ = write!(block, "\n  ? {question}");
        }
        if let Some(options) = &turn.options {
            for (i, option) in options.iter().enumerate() {
                let _ = write!(block, "\n    {}. {}", i + 1, option.label);
            }
        }
        blocks.push(block);
    }
    blocks.join("\n\n")
}

/// Human-readable lines describing a newly recorded tool call.
pub(super) fn format_handled(handled: &Handled) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(output) = &handled.output {
        lines.push(output.message.clone());
        if let Some(report) = &output.auto_report_results
            && handled.reconciled.synthesized.is_some()
        {
            lines.push(report.message.clone());
        }
    }
    lines
}
