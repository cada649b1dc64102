//! Conversation messages as the chat transport delivers them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::invocation::{OptionsPrompt, ToolCall, ToolName};

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

/// A piece of message content.
///
/// On the wire, tool parts are typed `tool-<toolName>`; that naming is
/// folded into [`MessagePart::Tool`] here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WirePart", into = "WirePart")]
pub enum MessagePart {
    Text(String),
    Reasoning(String),
    Tool {
        tool_name: String,
        tool_call_id: Option<String>,
        input: Option<Value>,
    },
    /// A part kind this crate doesn't read (step markers, files, ...).
    Other(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input: Option<Value>,
}

impl From<WirePart> for MessagePart {
    fn from(part: WirePart) -> Self {
        match part.kind.as_str() {
            "text" => Self::Text(part.text.unwrap_or_default()),
            "reasoning" => Self::Reasoning(part.text.unwrap_or_default()),
            kind => match kind.strip_prefix("tool-") {
                Some(tool_name) => Self::Tool {
                    tool_name: tool_name.to_string(),
                    tool_call_id: part.tool_call_id,
                    input: part.input,
                },
                None => Self::Other(part.kind),
            },
        }
    }
}

impl From<MessagePart> for WirePart {
    fn from(part: MessagePart) -> Self {
        let empty = |kind: String| WirePart {
            kind,
            text: None,
            tool_call_id: None,
            input: None,
        };
        match part {
            MessagePart::Text(text) => WirePart {
                text: Some(text),
                ..empty("text".into())
            },
            MessagePart::Reasoning(text) => WirePart {
                text: Some(text),
                ..empty("reasoning".into())
            },
            MessagePart::Tool {
                tool_name,
                tool_call_id,
                input,
            } => WirePart {
                tool_call_id,
                input,
                ..empty(format!("tool-{tool_name}"))
            },
            MessagePart::Other(kind) => empty(kind),
        }
    }
}

impl ConversationMessage {
    /// A user message holding a single text part.
    pub fn user(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
            parts: vec![MessagePart::Text(text.into())],
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// Visible text: text and reasoning parts, separated by blank lines.
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                MessagePart::Text(text) | MessagePart::Reasoning(text) => Some(text.as_str()),
                _ => None,
            })
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// The options prompt carried inline by this message, if any.
    ///
    /// Only parts whose arguments name a question or options count.
    pub fn inline_options(&self) -> Option<OptionsPrompt> {
        self.parts.iter().find_map(|part| match part {
            MessagePart::Tool {
                tool_name,
                input: Some(input),
                ..
            } if ToolName::parse(tool_name) == Some(ToolName::PresentOptions) => {
                match ToolCall::from_parts(ToolName::PresentOptions, input) {
                    ToolCall::PresentOptions(prompt)
                        if !prompt.question.is_empty() || !prompt.options.is_empty() =>
                    {
                        Some(prompt)
                    }
                    _ => None,
                }
            }
            _ => None,
        })
    }
}
