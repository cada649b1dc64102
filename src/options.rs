//! Option selection: turning a clicked option into the user's next message.
//!
//! Option values may contain bracketed placeholders such as `[City]`.
//! Every distinct placeholder must be filled in before the value is sent.

use std::collections::HashMap;

use crate::model::{ChatOption, OptionsPrompt};

/// Why a selection could not be turned into a message.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("option {index} does not exist ({len} available)")]
    NoSuchOption { index: usize, len: usize },

    #[error("an option has already been selected")]
    AlreadySelected,

    #[error("no value given for [{0}]")]
    MissingPlaceholder(String),
}

/// Distinct placeholder names in `text`, in order of first appearance.
pub fn placeholders(text: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        let after = &rest[open + 1..];
        let Some(close) = after.find(']') else {
            break;
        };
        let name = &after[..close];
        if name.is_empty() {
            rest = after;
            continue;
        }
        if !names.contains(&name) {
            names.push(name);
        }
        rest = &after[close + 1..];
    }
    names
}

/// Replace every placeholder in `value` with its trimmed fill.
///
/// One left-to-right pass over `value`: fill text is copied in as is and
/// never scanned for placeholders itself. Fails on the first placeholder
/// without a non-blank fill.
pub fn substitute(value: &str, fills: &HashMap<String, String>) -> Result<String, SelectionError> {
    let mut filled = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(open) = rest.find('[') {
        let after = &rest[open + 1..];
        let Some(close) = after.find(']') else {
            break;
        };
        let name = &after[..close];
        if name.is_empty() {
            filled.push_str(&rest[..=open]);
            rest = after;
            continue;
        }
        let fill = fills
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SelectionError::MissingPlaceholder(name.to_string()))?;
        filled.push_str(&rest[..open]);
        filled.push_str(fill);
        rest = &after[close + 1..];
    }
    filled.push_str(rest);
    Ok(filled)
}

/// A rendered set of options. At most one can ever be chosen.
#[derive(Debug, Clone)]
pub struct OptionSet {
    prompt: OptionsPrompt,
    selected: Option<usize>,
}

impl OptionSet {
    pub fn new(prompt: OptionsPrompt) -> Self {
        Self {
            prompt,
            selected: None,
        }
    }

    pub fn options(&self) -> &[ChatOption] {
        &self.prompt.options
    }

    /// Whether choosing option `index` still needs fills.
    pub fn needs_input(&self, index: usize) -> bool {
        self.prompt
            .options
            .get(index)
            .is_some_and(|o| !placeholders(&o.value).is_empty())
    }

    /// Choose option `index` (zero-based) and build the outgoing message.
    ///
    /// A failed substitution leaves the set open for another attempt;
    /// a successful one locks it.
    pub fn select(
        &mut self,
        index: usize,
        fills: &HashMap<String, String>,
    ) -> Result<String, SelectionError> {
        if self.selected.is_some() {
            return Err(SelectionError::AlreadySelected);
        }
        let option = self
            .prompt
            .options
            .get(index)
            .ok_or(SelectionError::NoSuchOption {
                index,
                len: self.prompt.options.len(),
            })?;
        let message = substitute(&option.value, fills)?;
        self.selected = Some(index);
        Ok(message)
    }
}
