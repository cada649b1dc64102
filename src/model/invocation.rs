//! Tool invocations: structured calls the assistant makes during a turn.

use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::task::TaskUpdate;

/// The tools the assistant can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolName {
    PresentOptions,
    ReportResults,
    UpdateMonitoringTask,
}

impl ToolName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PresentOptions => "presentOptions",
            Self::ReportResults => "reportResults",
            Self::UpdateMonitoringTask => "updateMonitoringTask",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "presentOptions" => Some(Self::PresentOptions),
            "reportResults" => Some(Self::ReportResults),
            "updateMonitoringTask" => Some(Self::UpdateMonitoringTask),
            _ => None,
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One clickable choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatOption {
    /// Text shown on the button.
    pub label: String,

    /// Text sent as the user's reply. May contain `[Placeholder]` segments.
    pub value: String,
}

/// Arguments of a `presentOptions` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsPrompt {
    #[serde(default)]
    pub question: String,

    #[serde(default)]
    pub options: Vec<ChatOption>,
}

/// Arguments of a `reportResults` call: the outcome of a source search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultReport {
    #[serde(default)]
    pub found: bool,

    #[serde(default)]
    pub message: String,
}

/// A tool call with its typed arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "toolName", content = "input", rename_all = "camelCase")]
pub enum ToolCall {
    PresentOptions(OptionsPrompt),
    ReportResults(ResultReport),
    UpdateMonitoringTask(TaskUpdate),
}

impl ToolCall {
    pub fn name(&self) -> ToolName {
        match self {
            Self::PresentOptions(_) => ToolName::PresentOptions,
            Self::ReportResults(_) => ToolName::ReportResults,
            Self::UpdateMonitoringTask(_) => ToolName::UpdateMonitoringTask,
        }
    }

    /// Build a call from a tool name and loosely shaped arguments.
    ///
    /// Arguments that don't fit the tool's shape are read as empty.
    pub fn from_parts(name: ToolName, args: &Value) -> Self {
        match name {
            ToolName::PresentOptions => Self::PresentOptions(lenient_options(args)),
            ToolName::ReportResults => Self::ReportResults(lenient_report(args)),
            ToolName::UpdateMonitoringTask => {
                Self::UpdateMonitoringTask(TaskUpdate::from_value(args))
            }
        }
    }
}

/// A recorded tool call, attributed to the assistant turn that produced it.
///
/// Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    /// Unique per invocation; the deduplication key.
    pub id: String,

    pub call: ToolCall,

    /// The assistant message this call belongs to. Unset for calls that
    /// arrived before any assistant message was seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    pub recorded_at: Timestamp,
}

/// A tool call as the chat transport delivers it.
///
/// Transports disagree on where the arguments live, so every known
/// location is accepted here and resolved once by [`RawToolCall::into_call`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawToolCall {
    pub tool_call_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default)]
    pub args: Option<Value>,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
}

impl RawToolCall {
    /// Resolve into a canonical call. Returns `None` for tools this crate
    /// doesn't know.
    pub fn into_call(self) -> Option<(String, ToolCall)> {
        let name = ToolName::parse(&self.tool_name)?;
        let args = [self.input, self.args, self.output, self.result]
            .into_iter()
            .flatten()
            .find(Value::is_object)
            .unwrap_or(Value::Null);
        Some((self.tool_call_id, ToolCall::from_parts(name, &args)))
    }
}

fn lenient_options(args: &Value) -> OptionsPrompt {
    let question = args
        .get("question")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let options = args
        .get("options")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default();
    OptionsPrompt { question, options }
}

fn lenient_report(args: &Value) -> ResultReport {
    ResultReport {
        found: args.get("found").and_then(Value::as_bool).unwrap_or(false),
        message: args
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}
