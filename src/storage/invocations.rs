//! Invocation table storage.

use crate::model::ToolInvocation;

use super::{Result, Storage, TOOL_CALLS_KEY};

impl Storage {
    /// Saves the whole invocation table, in recording order.
    pub fn save_invocations(&self, invocations: &[ToolInvocation]) -> Result<()> {
        self.write(TOOL_CALLS_KEY, invocations)
    }

    /// Loads the invocation table.
    ///
    /// Returns an empty table if none is stored or the stored one is malformed.
    pub fn load_invocations(&self) -> Result<Vec<ToolInvocation>> {
        self.load_or_default(TOOL_CALLS_KEY)
    }
}
