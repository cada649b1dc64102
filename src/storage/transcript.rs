//! Transcript storage: the conversation as last delivered by the transport.

use crate::model::ConversationMessage;

use super::{MESSAGES_KEY, Result, Storage};

impl Storage {
    /// Saves the transcript, replacing the stored one.
    pub fn save_transcript(&self, messages: &[ConversationMessage]) -> Result<()> {
        self.write(MESSAGES_KEY, messages)
    }

    /// Loads the transcript.
    ///
    /// Returns an empty transcript if none is stored or the stored one is malformed.
    pub fn load_transcript(&self) -> Result<Vec<ConversationMessage>> {
        self.load_or_default(MESSAGES_KEY)
    }
}
