//! The session: one conversation's documents and the storage behind them.
//!
//! A [`Session`] owns the monitoring task, the invocation table, and the
//! transcript. Every mutation is written through to [`Storage`] before the
//! call returns; opening a session reads everything back.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::model::{
    ChatOption, ConversationMessage, MonitoringTask, OptionsPrompt, RawToolCall, ResultReport,
    Role, ToolCall,
};
use crate::options::OptionSet;
use crate::reconcile::{Reconciled, Reconciler};
use crate::storage::{Result, Storage};
use crate::tools::{self, TaskUpdateOutput};

/// Shown to the user when the transport fails mid-turn.
pub const FAILURE_NOTICE: &str = "Sorry, something went wrong. Please try again.";

/// What handling one tool call produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Handled {
    pub reconciled: Reconciled,

    /// The call as recorded, when it was new.
    pub call: Option<ToolCall>,

    /// The tool's answer, for `updateMonitoringTask` calls that were new.
    pub output: Option<TaskUpdateOutput>,
}

/// A renderable snapshot of the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationView {
    pub turns: Vec<TurnView>,
}

/// One message as it should be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnView {
    pub id: String,
    pub role: Role,
    pub text: String,
    pub question: Option<String>,

    /// Only set on the last message.
    pub options: Option<Vec<ChatOption>>,

    pub report: Option<ResultReport>,
}

impl ConversationView {
    /// Nothing has been said yet: show the getting-started prompt.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

pub struct Session<'a> {
    storage: &'a Storage,
    task: MonitoringTask,
    reconciler: Reconciler,
    transcript: Vec<ConversationMessage>,
}

impl<'a> Session<'a> {
    /// Load the session from storage.
    ///
    /// The current turn is taken from the last stored message.
    pub fn open(storage: &'a Storage) -> Result<Self> {
        let task = storage.load_task()?;
        let transcript = storage.load_transcript()?;
        let mut reconciler = Reconciler::from_invocations(storage.load_invocations()?);
        reconciler.observe_messages(&transcript);

        Ok(Self {
            storage,
            task,
            reconciler,
            transcript,
        })
    }

    pub fn task(&self) -> &MonitoringTask {
        &self.task
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn transcript(&self) -> &[ConversationMessage] {
        &self.transcript
    }

    /// Take a new message list from the transport.
    ///
    /// Must run before the tool calls of any new assistant message.
    pub fn observe_messages(&mut self, messages: Vec<ConversationMessage>) -> Result<()> {
        self.reconciler.observe_messages(&messages);
        self.transcript = messages;
        if !self.transcript.is_empty() {
            self.storage.save_transcript(&self.transcript)?;
        }
        Ok(())
    }

    /// Reconcile one tool call from the transport.
    ///
    /// Unknown tools and repeated ids leave everything untouched.
    pub fn handle_tool_call(&mut self, raw: RawToolCall) -> Result<Handled> {
        let tool_name = raw.tool_name.clone();
        let Some((id, call)) = raw.into_call() else {
            warn!(tool = %tool_name, "ignoring call to unknown tool");
            return Ok(Handled::default());
        };
        if let Err(e) = tools::validate(&call) {
            warn!(%id, error = %e, "tool call breaks its contract");
        }
        if self.reconciler.current_message_id().is_none() {
            debug!(%id, "no assistant turn seen yet; call stays unattributed");
        }

        let output = match &call {
            ToolCall::UpdateMonitoringTask(update) => Some(tools::execute_update(update)),
            _ => None,
        };

        let before = (self.reconciler.clone(), self.task.clone());
        let reconciled = self.reconciler.record(id, call.clone(), &mut self.task);
        if !reconciled.recorded {
            return Ok(Handled::default());
        }

        let task = reconciled.task_changed.then_some(&self.task);
        if let Err(e) = self
            .storage
            .save_reconciled(self.reconciler.invocations(), task)
        {
            // Unsaved calls must stay replayable.
            (self.reconciler, self.task) = before;
            return Err(e);
        }

        Ok(Handled {
            reconciled,
            call: Some(call),
            output,
        })
    }

    /// Close one model step.
    ///
    /// Returns the report the step left out, if it updated the task with
    /// sources and never called `reportResults`.
    pub fn end_step(&self, calls: &[ToolCall]) -> Option<ResultReport> {
        let report = tools::step_backstop(calls)?;
        warn!(
            calls = calls.len(),
            "step added sources without reporting results"
        );
        Some(report)
    }

    /// The transport gave up on the current turn.
    ///
    /// Nothing from the turn is recorded; the returned notice is for the user.
    pub fn abort_turn(&self, reason: Option<&str>) -> &'static str {
        warn!(reason = reason.unwrap_or("unknown"), "turn aborted");
        FAILURE_NOTICE
    }

    /// Append a message the user typed or picked.
    pub fn push_user_message(&mut self, text: impl Into<String>) -> Result<&ConversationMessage> {
        let message = ConversationMessage::user(Uuid::new_v4().to_string(), text);
        self.transcript.push(message);
        self.storage.save_transcript(&self.transcript)?;
        Ok(&self.transcript[self.transcript.len() - 1])
    }

    /// The options offered by the last message, ready for a selection.
    pub fn pending_options(&self) -> Option<OptionSet> {
        let last = self.transcript.last().filter(|m| m.is_assistant())?;
        self.question_for(last).map(OptionSet::new)
    }

    /// Clear the task, the invocation table, and the transcript, in
    /// storage first and then in memory.
    pub fn reset(&mut self) -> Result<()> {
        self.storage.reset()?;
        self.task.reset();
        self.reconciler.clear();
        self.transcript.clear();
        info!("conversation reset");
        Ok(())
    }

    pub fn view(&self) -> ConversationView {
        let last = self.transcript.len().saturating_sub(1);
        let turns = self
            .transcript
            .iter()
            .enumerate()
            .map(|(i, message)| {
                let prompt = message
                    .is_assistant()
                    .then(|| self.question_for(message))
                    .flatten();
                TurnView {
                    id: message.id.clone(),
                    role: message.role,
                    text: message.text_content(),
                    question: prompt
                        .as_ref()
                        .map(|p| p.question.clone())
                        .filter(|q| !q.is_empty()),
                    options: prompt
                        .filter(|p| i == last && !p.options.is_empty())
                        .map(|p| p.options),
                    report: message
                        .is_assistant()
                        .then(|| self.reconciler.report_for(&message.id).cloned())
                        .flatten(),
                }
            })
            .collect();
        ConversationView { turns }
    }

    /// Inline options win over recorded ones.
    fn question_for(&self, message: &ConversationMessage) -> Option<OptionsPrompt> {
        message
            .inline_options()
            .or_else(|| self.reconciler.options_for(&message.id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use serde_json::{Value, json};
    use tempfile::TempDir;

    use crate::model::MessagePart;
    use crate::storage::{MESSAGES_KEY, TASK_KEY, TOOL_CALLS_KEY};

    fn test_storage() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path().join("state.sqlite")).unwrap();
        (dir, storage)
    }

    fn assistant(id: &str, text: &str) -> ConversationMessage {
        ConversationMessage {
            id: id.into(),
            role: Role::Assistant,
            parts: vec![MessagePart::Text(text.into())],
        }
    }

    fn tool_call(id: &str, name: &str, input: Value) -> RawToolCall {
        serde_json::from_value(json!({ "toolCallId": id, "toolName": name, "input": input }))
            .unwrap()
    }

    fn techcrunch_update(id: &str) -> RawToolCall {
        tool_call(
            id,
            "updateMonitoringTask",
            json!({ "sources": [{ "type": "news_outlet", "name": "TechCrunch" }] }),
        )
    }

    #[test]
    fn first_update_end_to_end() {
        let (_dir, storage) = test_storage();
        let mut session = Session::open(&storage).unwrap();
        assert!(session.view().is_empty());

        session
            .observe_messages(vec![
                ConversationMessage::user("u1", "Track AI startup news"),
                assistant("a1", "Let me find some outlets."),
            ])
            .unwrap();
        let handled = session.handle_tool_call(techcrunch_update("c1")).unwrap();

        assert!(handled.reconciled.recorded);
        assert_eq!(session.task().sources.len(), 1);
        assert_eq!(session.task().scope, None);
        assert_eq!(handled.output.unwrap().message, "Added 1 source(s)");

        let view = session.view();
        let report = view.turns[1].report.as_ref().unwrap();
        assert!(report.found);
        assert!(report.message.contains("TechCrunch"));
        assert!(view.turns[0].report.is_none());
    }

    #[test]
    fn duplicate_delivery_is_ignored() {
        let (_dir, storage) = test_storage();
        let mut session = Session::open(&storage).unwrap();
        session.observe_messages(vec![assistant("a1", "")]).unwrap();

        session.handle_tool_call(techcrunch_update("c1")).unwrap();
        let again = session.handle_tool_call(techcrunch_update("c1")).unwrap();

        assert_eq!(again, Handled::default());
        assert_eq!(session.task().sources.len(), 1);
        assert_eq!(session.reconciler().invocations().len(), 2);
    }

    #[test]
    fn unknown_tool_is_ignored() {
        let (_dir, storage) = test_storage();
        let mut session = Session::open(&storage).unwrap();

        let handled = session
            .handle_tool_call(tool_call("x1", "searchWeb", json!({ "q": "AI" })))
            .unwrap();

        assert!(!handled.reconciled.recorded);
        assert!(!storage.contains(TOOL_CALLS_KEY).unwrap());
    }

    #[test]
    fn state_survives_reopen() {
        let (_dir, storage) = test_storage();
        {
            let mut session = Session::open(&storage).unwrap();
            session.observe_messages(vec![assistant("a1", "Found some.")]).unwrap();
            session
                .handle_tool_call(tool_call(
                    "c0",
                    "updateMonitoringTask",
                    json!({ "scope": "AI startups" }),
                ))
                .unwrap();
            session.handle_tool_call(techcrunch_update("c1")).unwrap();
        }

        let mut session = Session::open(&storage).unwrap();

        assert_eq!(session.task().scope.as_deref(), Some("AI startups"));
        assert_eq!(session.task().sources.len(), 1);
        assert_eq!(session.reconciler().current_message_id(), Some("a1"));
        // Replays after a reload are still recognized.
        session.handle_tool_call(techcrunch_update("c1")).unwrap();
        assert_eq!(session.task().sources.len(), 1);
    }

    #[test]
    fn reset_clears_memory_and_storage() {
        let (_dir, storage) = test_storage();
        let mut session = Session::open(&storage).unwrap();
        session.observe_messages(vec![assistant("a1", "Hi")]).unwrap();
        session.handle_tool_call(techcrunch_update("c1")).unwrap();

        session.reset().unwrap();

        assert_eq!(session.task(), &MonitoringTask::default());
        assert!(session.reconciler().invocations().is_empty());
        assert!(session.transcript().is_empty());
        for key in [TOOL_CALLS_KEY, TASK_KEY, MESSAGES_KEY] {
            assert!(!storage.contains(key).unwrap(), "{key} erased");
        }
        assert!(session.view().is_empty());
    }

    #[test]
    fn aborted_turn_records_nothing() {
        let (_dir, storage) = test_storage();
        let mut session = Session::open(&storage).unwrap();
        session
            .observe_messages(vec![
                ConversationMessage::user("u1", "Track AI startup news"),
                assistant("a1", "Let me look"),
            ])
            .unwrap();

        let notice = session.abort_turn(Some("stream closed"));

        assert_eq!(notice, FAILURE_NOTICE);
        assert_eq!(session.reconciler().current_message_id(), Some("a1"));
        assert!(session.reconciler().invocations().is_empty());
        assert_eq!(session.task(), &MonitoringTask::default());
        assert!(!storage.contains(TOOL_CALLS_KEY).unwrap());
        assert!(!storage.contains(TASK_KEY).unwrap());
        assert_eq!(storage.load_transcript().unwrap().len(), 2);
    }

    #[test]
    fn failed_save_keeps_call_replayable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.sqlite");
        let storage = Storage::open(&path).unwrap();
        let mut session = Session::open(&storage).unwrap();
        session.observe_messages(vec![assistant("a1", "")]).unwrap();
        storage.block_writes(TASK_KEY);

        assert!(session.handle_tool_call(techcrunch_update("c1")).is_err());

        assert!(!session.reconciler().contains("c1"));
        assert!(session.task().sources.is_empty());
        assert!(!storage.contains(TOOL_CALLS_KEY).unwrap());

        storage.unblock_writes();
        drop(session);
        let storage = Storage::open(&path).unwrap();
        let mut session = Session::open(&storage).unwrap();
        let handled = session.handle_tool_call(techcrunch_update("c1")).unwrap();

        assert!(handled.reconciled.recorded);
        assert_eq!(session.task().sources.len(), 1);
        assert_eq!(storage.load_task().unwrap().sources.len(), 1);
    }

    #[test]
    fn end_step_reports_only_unreported_sources() {
        let (_dir, storage) = test_storage();
        let mut session = Session::open(&storage).unwrap();
        session.observe_messages(vec![assistant("a1", "")]).unwrap();

        let handled = session.handle_tool_call(techcrunch_update("c1")).unwrap();
        let step = vec![handled.call.unwrap()];
        let report = session.end_step(&step).unwrap();
        assert!(report.message.contains("TechCrunch"));

        let reported = session
            .handle_tool_call(tool_call(
                "r1",
                "reportResults",
                json!({ "found": true, "message": "Found TechCrunch." }),
            ))
            .unwrap();
        let mut step = step;
        step.extend(reported.call);
        assert!(session.end_step(&step).is_none());
    }

    #[test]
    fn options_shown_only_on_last_message() {
        let (_dir, storage) = test_storage();
        let mut session = Session::open(&storage).unwrap();
        let options = json!({
            "question": "What would you like to do next?",
            "options": [
                { "label": "Add more", "value": "Add more sources" },
                { "label": "Start over", "value": "Start over" }
            ]
        });

        session.observe_messages(vec![assistant("a1", "Done.")]).unwrap();
        session
            .handle_tool_call(tool_call("o1", "presentOptions", options))
            .unwrap();
        assert_eq!(session.view().turns[0].options.as_ref().unwrap().len(), 2);

        session.push_user_message("Add more sources").unwrap();
        let view = session.view();

        assert!(view.turns[0].options.is_none());
        assert_eq!(
            view.turns[0].question.as_deref(),
            Some("What would you like to do next?")
        );
        assert!(session.pending_options().is_none());
    }

    #[test]
    fn pending_options_select_and_send() {
        let (_dir, storage) = test_storage();
        let mut session = Session::open(&storage).unwrap();
        session
            .observe_messages(vec![assistant("a1", "What should I watch?")])
            .unwrap();
        session
            .handle_tool_call(tool_call(
                "o1",
                "presentOptions",
                json!({
                    "question": "Pick one",
                    "options": [
                        { "label": "Funding", "value": "Monitor [Company] funding" },
                        { "label": "Hiring", "value": "Monitor [Company] hiring" }
                    ]
                }),
            ))
            .unwrap();

        let mut set = session.pending_options().unwrap();
        let fills = HashMap::from([("Company".to_string(), "Acme".to_string())]);
        let text = set.select(0, &fills).unwrap();
        session.push_user_message(text).unwrap();

        let last = session.transcript().last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.text_content(), "Monitor Acme funding");
        assert_eq!(storage.load_transcript().unwrap().len(), 2);
    }

    #[test]
    fn empty_message_list_is_not_persisted() {
        let (_dir, storage) = test_storage();
        let mut session = Session::open(&storage).unwrap();
        session.observe_messages(vec![assistant("a1", "Hi")]).unwrap();

        session.observe_messages(vec![]).unwrap();

        assert_eq!(storage.load_transcript().unwrap().len(), 1);
    }
}
