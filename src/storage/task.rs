//! Monitoring task storage.

use crate::model::MonitoringTask;

use super::{Result, Storage, TASK_KEY};

impl Storage {
    /// Saves the monitoring task, replacing the stored one.
    pub fn save_task(&self, task: &MonitoringTask) -> Result<()> {
        self.write(TASK_KEY, task)
    }

    /// Loads the monitoring task.
    ///
    /// Returns an empty task if none is stored or the stored one is malformed.
    pub fn load_task(&self) -> Result<MonitoringTask> {
        self.load_or_default(TASK_KEY)
    }
}
