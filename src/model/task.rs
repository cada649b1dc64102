//! Monitoring task: the document a conversation builds up.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::source::Source;

/// The accumulated target state: what to monitor and where to look.
///
/// Scope is replaced wholesale; sources only ever grow. Nothing is
/// removed except by [`MonitoringTask::reset`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default)]
    pub sources: Vec<Source>,
}

/// Arguments of an `updateMonitoringTask` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
}

impl MonitoringTask {
    /// Merge an update into the task and return the new state.
    ///
    /// An empty scope leaves the current one in place. Sources are appended
    /// in the order given, without deduplication.
    pub fn apply_update(&mut self, update: &TaskUpdate) -> &Self {
        if let Some(scope) = update.new_scope() {
            self.scope = Some(scope.to_string());
        }
        if let Some(sources) = update.new_sources() {
            self.sources.extend_from_slice(sources);
        }
        self
    }

    /// Clear scope and sources.
    pub fn reset(&mut self) {
        self.scope = None;
        self.sources.clear();
    }
}

impl TaskUpdate {
    /// Leniently read an update from model-supplied arguments.
    ///
    /// Fields of the wrong shape are treated as absent. Sources without a
    /// usable name are dropped; the rest keep their order.
    pub fn from_value(value: &Value) -> Self {
        let scope = value.get("scope").and_then(Value::as_str).map(String::from);
        let sources = value
            .get("sources")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Source::from_value).collect());
        Self { scope, sources }
    }

    /// The scope to install, if this update carries a non-empty one.
    pub fn new_scope(&self) -> Option<&str> {
        self.scope.as_deref().filter(|s| !s.is_empty())
    }

    /// The sources to append, if this update carries any.
    pub fn new_sources(&self) -> Option<&[Source]> {
        self.sources.as_deref().filter(|s| !s.is_empty())
    }

    /// Whether applying this update changes a task at all.
    pub fn is_effective(&self) -> bool {
        self.new_scope().is_some() || self.new_sources().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::model::SourceType;

    fn scope(text: &str) -> TaskUpdate {
        TaskUpdate {
            scope: Some(text.into()),
            sources: None,
        }
    }

    fn sources(names: &[&str]) -> TaskUpdate {
        TaskUpdate {
            scope: None,
            sources: Some(
                names
                    .iter()
                    .map(|n| Source::new(SourceType::Website, *n))
                    .collect(),
            ),
        }
    }

    #[test]
    fn later_scope_overwrites_earlier() {
        let mut task = MonitoringTask::default();
        task.apply_update(&scope("A"));
        task.apply_update(&scope("B"));

        assert_eq!(task.scope.as_deref(), Some("B"));
    }

    #[test]
    fn empty_update_leaves_task_unchanged() {
        let mut task = MonitoringTask::default();
        task.apply_update(&scope("A"));
        task.apply_update(&sources(&["Acme"]));
        let before = task.clone();

        task.apply_update(&TaskUpdate::default());
        task.apply_update(&scope(""));
        task.apply_update(&sources(&[]));

        assert_eq!(task, before);
    }

    #[test]
    fn source_count_is_sum_of_appends() {
        let mut task = MonitoringTask::default();
        task.apply_update(&sources(&["A", "B"]));
        task.apply_update(&sources(&["C"]));
        task.apply_update(&sources(&["D", "E", "F"]));

        assert_eq!(task.sources.len(), 6);
        let names: Vec<&str> = task.sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C", "D", "E", "F"]);
    }

    #[test]
    fn repeated_sources_are_kept() {
        let mut task = MonitoringTask::default();
        task.apply_update(&sources(&["TechCrunch"]));
        task.apply_update(&sources(&["TechCrunch"]));

        assert_eq!(task.sources.len(), 2);
        assert_eq!(task.sources[0], task.sources[1]);
    }

    #[test]
    fn sources_do_not_touch_scope() {
        let mut task = MonitoringTask::default();
        task.apply_update(&scope("AI startups"));
        task.apply_update(&sources(&["TechCrunch"]));

        assert_eq!(task.scope.as_deref(), Some("AI startups"));
    }

    #[test]
    fn reset_clears_everything() {
        let mut task = MonitoringTask::default();
        task.apply_update(&scope("A"));
        task.apply_update(&sources(&["X"]));

        task.reset();

        assert_eq!(task, MonitoringTask::default());
    }

    #[test]
    fn from_value_treats_malformed_fields_as_absent() {
        let update = TaskUpdate::from_value(&json!({ "scope": 42, "sources": "nope" }));
        assert_eq!(update, TaskUpdate::default());
        assert!(!update.is_effective());

        let update = TaskUpdate::from_value(&json!(null));
        assert_eq!(update, TaskUpdate::default());
    }

    #[test]
    fn from_value_drops_unnamed_sources() {
        let update = TaskUpdate::from_value(&json!({
            "sources": [
                { "type": "website", "name": "First" },
                { "type": "website" },
                { "type": "company", "name": "Second" }
            ]
        }));

        let names: Vec<&str> = update
            .new_sources()
            .unwrap()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, ["First", "Second"]);
    }
}
