//! Tool-call reconciliation.
//!
//! The transport may deliver the same tool call more than once, and it
//! delivers calls separately from the messages they belong to. The
//! [`Reconciler`] records each call exactly once, attributes it to the
//! assistant message current at the time, and folds task updates into
//! the [`MonitoringTask`].
//!
//! Ordering matters: [`Reconciler::observe_messages`] must see an
//! assistant message before any of that message's calls are recorded,
//! or the calls are attributed to the previous turn.

use std::collections::HashSet;

use jiff::Timestamp;
use tracing::{debug, info};

use crate::model::{
    ConversationMessage, MonitoringTask, OptionsPrompt, ResultReport, ToolCall, ToolInvocation,
    ToolName,
};
use crate::tools;

/// Prefix of ids given to reports synthesized for `updateMonitoringTask` calls.
pub const SYNTHETIC_REPORT_PREFIX: &str = "synthetic-report-";

/// What recording one call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// The call was new and is now in the table.
    pub recorded: bool,

    /// The monitoring task changed.
    pub task_changed: bool,

    /// Id of the report synthesized alongside the call, if any.
    pub synthesized: Option<String>,
}

/// The invocation table plus the current-turn pointer.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    /// In recording order.
    invocations: Vec<ToolInvocation>,
    seen: HashSet<String>,
    current_message_id: Option<String>,
}

impl Reconciler {
    /// Rebuild from a previously saved table.
    ///
    /// Later entries with an id already seen are dropped.
    pub fn from_invocations(invocations: Vec<ToolInvocation>) -> Self {
        let mut reconciler = Self::default();
        for invocation in invocations {
            if reconciler.seen.insert(invocation.id.clone()) {
                reconciler.invocations.push(invocation);
            }
        }
        reconciler
    }

    pub fn invocations(&self) -> &[ToolInvocation] {
        &self.invocations
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn current_message_id(&self) -> Option<&str> {
        self.current_message_id.as_deref()
    }

    /// Track the newest assistant message.
    ///
    /// Only the last message counts; a list ending in a user message
    /// leaves the pointer where it was.
    pub fn observe_messages(&mut self, messages: &[ConversationMessage]) {
        if let Some(last) = messages.last().filter(|m| m.is_assistant())
            && self.current_message_id.as_deref() != Some(last.id.as_str())
        {
            debug!(message_id = %last.id, "new assistant turn");
            self.current_message_id = Some(last.id.clone());
        }
    }

    /// Record a tool call exactly once.
    ///
    /// A repeated id is a no-op. An `updateMonitoringTask` call is applied
    /// to `task`; when it adds sources, a `reportResults` announcing them
    /// is recorded too, under [`SYNTHETIC_REPORT_PREFIX`] + the call's id.
    pub fn record(
        &mut self,
        id: impl Into<String>,
        call: ToolCall,
        task: &mut MonitoringTask,
    ) -> Reconciled {
        let id = id.into();
        if self.contains(&id) {
            debug!(%id, "duplicate tool call ignored");
            return Reconciled::default();
        }

        let mut outcome = Reconciled {
            recorded: true,
            ..Reconciled::default()
        };

        let report = match &call {
            ToolCall::UpdateMonitoringTask(update) => {
                outcome.task_changed = update.is_effective();
                task.apply_update(update);
                if outcome.task_changed {
                    info!(
                        scope = task.scope.as_deref().unwrap_or(""),
                        sources = task.sources.len(),
                        "monitoring task updated"
                    );
                }
                tools::success_report(update)
            }
            _ => None,
        };

        debug!(%id, tool = %call.name(), "tool call recorded");
        let synthetic_id = format!("{SYNTHETIC_REPORT_PREFIX}{id}");
        self.insert(id, call);

        if let Some(report) = report
            && self.insert(synthetic_id.clone(), ToolCall::ReportResults(report))
        {
            debug!(id = %synthetic_id, "report synthesized");
            outcome.synthesized = Some(synthetic_id);
        }

        outcome
    }

    /// Find the call of `tool` attributed to `message_id`.
    ///
    /// Reports with no attribution match every message. When several calls
    /// match, the most recently recorded one wins.
    pub fn lookup_for_message(&self, message_id: &str, tool: ToolName) -> Option<&ToolCall> {
        self.invocations
            .iter()
            .rev()
            .filter(|inv| inv.call.name() == tool)
            .find(|inv| match inv.message_id.as_deref() {
                Some(id) => id == message_id,
                None => tool == ToolName::ReportResults,
            })
            .map(|inv| &inv.call)
    }

    pub fn options_for(&self, message_id: &str) -> Option<&OptionsPrompt> {
        match self.lookup_for_message(message_id, ToolName::PresentOptions)? {
            ToolCall::PresentOptions(prompt) => Some(prompt),
            _ => None,
        }
    }

    pub fn report_for(&self, message_id: &str) -> Option<&ResultReport> {
        match self.lookup_for_message(message_id, ToolName::ReportResults)? {
            ToolCall::ReportResults(report) => Some(report),
            _ => None,
        }
    }

    /// Forget every call and the current turn.
    pub fn clear(&mut self) {
        self.invocations.clear();
        self.seen.clear();
        self.current_message_id = None;
    }

    /// Insert a call attributed to the current turn, unless its id is known.
    fn insert(&mut self, id: String, call: ToolCall) -> bool {
        if !self.seen.insert(id.clone()) {
            return false;
        }
        self.invocations.push(ToolInvocation {
            id,
            call,
            message_id: self.current_message_id.clone(),
            recorded_at: Timestamp::now(),
        });
        true
    }
}
