//! Tool contracts: what each tool answers and what a well-formed call looks like.
//!
//! The model is told to call `reportResults` right after every
//! `updateMonitoringTask` that adds sources, but it doesn't always do so.
//! [`success_report`] builds the report that stands in for the missing call.

use serde::Serialize;

use crate::model::{ResultReport, Source, TaskUpdate, ToolCall};

/// Bounds on the number of options in one `presentOptions` call.
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 5;

/// How many source names a success message lists.
const NAMED_SOURCES: usize = 3;

/// Result of executing `updateMonitoringTask`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateOutput {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_report_results: Option<ResultReport>,
}

/// A tool call that breaks its contract.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ContractError {
    #[error("presentOptions needs {MIN_OPTIONS}-{MAX_OPTIONS} options, got {0}")]
    OptionCount(usize),

    #[error("presentOptions has an empty question")]
    EmptyQuestion,

    #[error("reportResults has an empty message")]
    EmptyReport,
}

/// The announcement for a batch of newly found sources.
pub fn success_message(sources: &[Source]) -> String {
    let count = sources.len();
    let plural = if count > 1 { "s" } else { "" };
    let names = sources
        .iter()
        .take(NAMED_SOURCES)
        .map(|s| s.name.as_str())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    let mut message =
        format!("✓ Success! I found {count} relevant source{plural} for your monitoring task");
    if !names.is_empty() {
        message.push_str(" including ");
        message.push_str(&names);
    }
    message.push('.');
    message
}

/// The report announcing an update's sources, if it has any.
pub fn success_report(update: &TaskUpdate) -> Option<ResultReport> {
    update.new_sources().map(|sources| ResultReport {
        found: true,
        message: success_message(sources),
    })
}

/// The report a finished model step should have carried.
///
/// A step that updated the task with sources but made no `reportResults`
/// call gets the report for its first such update. Any other step needs
/// nothing.
pub fn step_backstop(calls: &[ToolCall]) -> Option<ResultReport> {
    if calls
        .iter()
        .any(|call| matches!(call, ToolCall::ReportResults(_)))
    {
        return None;
    }
    calls.iter().find_map(|call| match call {
        ToolCall::UpdateMonitoringTask(update) => success_report(update),
        _ => None,
    })
}

/// Execute `updateMonitoringTask` the way the chat route answers it.
pub fn execute_update(update: &TaskUpdate) -> TaskUpdateOutput {
    let message = match update.new_scope() {
        Some(scope) => format!("Updated monitoring scope: {scope}"),
        None => format!(
            "Added {} source(s)",
            update.new_sources().map_or(0, <[Source]>::len)
        ),
    };
    TaskUpdateOutput {
        success: true,
        message,
        auto_report_results: success_report(update),
    }
}

/// Check a call against its tool's input contract.
pub fn validate(call: &ToolCall) -> Result<(), ContractError> {
    match call {
        ToolCall::PresentOptions(prompt) => {
            if prompt.question.trim().is_empty() {
                return Err(ContractError::EmptyQuestion);
            }
            let count = prompt.options.len();
            if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&count) {
                return Err(ContractError::OptionCount(count));
            }
            Ok(())
        }
        ToolCall::ReportResults(report) => {
            if report.message.trim().is_empty() {
                return Err(ContractError::EmptyReport);
            }
            Ok(())
        }
        ToolCall::UpdateMonitoringTask(_) => Ok(()),
    }
}
