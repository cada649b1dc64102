//! Transport feed: chat transport events as JSON lines.
//!
//! ```text
//! {"event":"messages","messages":[...]}
//! {"event":"toolCall","toolCall":{"toolCallId":"...","toolName":"...","input":{...}}}
//! {"event":"abort","reason":"..."}
//! ```

use std::io::{self, BufRead};

use serde::Deserialize;
use tracing::warn;

use crate::model::{ConversationMessage, RawToolCall};

/// One event delivered by the chat transport.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum TransportEvent {
    /// The full message list, as of now.
    Messages { messages: Vec<ConversationMessage> },

    /// A tool call made during the current turn.
    ToolCall {
        #[serde(rename = "toolCall")]
        tool_call: RawToolCall,
    },

    /// The turn failed and was abandoned.
    Abort {
        #[serde(default)]
        reason: Option<String>,
    },
}

/// Read every event from `reader`.
///
/// Blank lines are skipped; lines that aren't a valid event are skipped
/// with a warning.
pub fn read_events(reader: impl BufRead) -> io::Result<Vec<TransportEvent>> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(event) => events.push(event),
            Err(e) => warn!(line = index + 1, error = %e, "skipping invalid event"),
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_each_event_kind() {
        let input = r#"
{"event":"messages","messages":[{"id":"a1","role":"assistant","parts":[{"type":"text","text":"Hi"}]}]}
{"event":"toolCall","toolCall":{"toolCallId":"c1","toolName":"reportResults","input":{"found":false,"message":"None"}}}
{"event":"abort"}
"#;

        let events = read_events(input.as_bytes()).unwrap();

        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], TransportEvent::Messages { messages } if messages.len() == 1));
        assert!(matches!(
            &events[1],
            TransportEvent::ToolCall { tool_call } if tool_call.tool_call_id == "c1"
        ));
        assert!(matches!(&events[2], TransportEvent::Abort { reason: None }));
    }

    #[test]
    fn skips_invalid_lines() {
        let input = concat!(
            "not json\n",
            "{\"event\":\"teleport\"}\n",
            "{\"event\":\"abort\",\"reason\":\"timeout\"}\n",
        );

        let events = read_events(input.as_bytes()).unwrap();

        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            TransportEvent::Abort { reason: Some(r) } if r == "timeout"
        ));
    }
}
