//! Core data model for lookout.
//!
//! These types represent the conversation and the document it builds:
//! sources, the monitoring task, tool invocations, and transcript messages.

mod invocation;
mod message;
mod source;
mod task;

pub use invocation::{
    ChatOption, OptionsPrompt, RawToolCall, ResultReport, ToolCall, ToolInvocation, ToolName,
};
pub use message::{ConversationMessage, MessagePart, Role};
pub use source::{Source, SourceType};
pub use task::{MonitoringTask, TaskUpdate};
