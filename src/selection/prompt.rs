//! Interactive chooser backed by a terminal menu.

use dialoguer::Select;

use super::{Chooser, SelectionError};

/// Asks the user on the terminal; the first option is preselected.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalChooser;

impl Chooser for TerminalChooser {
    fn choose(&self, prompt: &str, options: &[String]) -> Result<String, SelectionError> {
        let index = Select::new()
            .with_prompt(prompt)
            .items(options)
            .default(0)
            .interact()
            .map_err(|e| SelectionError::Prompt(e.to_string()))?;

        options
            .get(index)
            .cloned()
            .ok_or_else(|| SelectionError::Prompt(format!("selection {} out of range", index)))
    }
}
