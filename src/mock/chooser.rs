use std::cell::RefCell;

use crate::selection::{Chooser, SelectionError};

/// Always answers with the same index (clamped to the option count).
#[derive(Debug, Default)]
pub struct ScriptedChooser {
    index: usize,
    prompts: RefCell<Vec<(String, Vec<String>)>>,
}

impl ScriptedChooser {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// Every (prompt, options) pair asked so far.
    pub fn prompts(&self) -> Vec<(String, Vec<String>)> {
        self.prompts.borrow().clone()
    }
}

impl Chooser for ScriptedChooser {
    fn choose(&self, prompt: &str, options: &[String]) -> Result<String, SelectionError> {
        self.prompts
            .borrow_mut()
            .push((prompt.to_string(), options.to_vec()));

        let index = self.index.min(options.len().saturating_sub(1));
        options
            .get(index)
            .cloned()
            .ok_or_else(|| SelectionError::Prompt("no options offered".to_string()))
    }
}
