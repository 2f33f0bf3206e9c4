use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::WorkflowError;

/// Prompts asked after a suspicious first pass.
pub const FOLLOW_UP_PROMPTS: [&str; 3] = [
    "Please confirm your full name as per ID:",
    "Please provide your last 3 employment locations:",
    "Do you recognize these recent transactions on your account? (yes/no)",
];

/// Fixed prompts plus free-text answers keyed by prompt index.
///
/// Answers may be partial or empty; submission does not require them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpQuestionnaire {
    prompts: Vec<String>,
    answers: BTreeMap<usize, String>,
}

impl Default for FollowUpQuestionnaire {
    fn default() -> Self {
        Self::standard()
    }
}

impl FollowUpQuestionnaire {
    pub fn standard() -> Self {
        Self::with_prompts(FOLLOW_UP_PROMPTS.iter().map(|p| p.to_string()).collect())
    }

    pub fn with_prompts(prompts: Vec<String>) -> Self {
        Self {
            prompts,
            answers: BTreeMap::new(),
        }
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn answers(&self) -> &BTreeMap<usize, String> {
        &self.answers
    }

    pub fn answer(&self, index: usize) -> Option<&str> {
        self.answers.get(&index).map(String::as_str)
    }

    /// Store or overwrite the answer to prompt `index`.
    pub fn record_answer(
        &mut self,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        if index >= self.prompts.len() {
            return Err(WorkflowError::QuestionOutOfRange {
                index,
                len: self.prompts.len(),
            });
        }
        self.answers.insert(index, text.into());
        Ok(())
    }

    /// Prompts paired with their answers, in prompt order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<&str>)> + '_ {
        self.prompts
            .iter()
            .enumerate()
            .map(|(i, prompt)| (prompt.as_str(), self.answer(i)))
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}
