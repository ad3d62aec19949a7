use serde::{Deserialize, Serialize};

/// A sentence unit the learner must pronounce, scored word by word.
///
/// Field names serialize in camelCase so progress documents written by the
/// mobile client (`isContinue`, `userPoints`, `userWords`) load unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phrase {
    #[serde(default)]
    pub id: usize,
    pub text: String,
    #[serde(default)]
    pub is_continue: bool,
    #[serde(default)]
    pub user_points: u32,
    #[serde(default)]
    pub user_words: u32,
}

impl Phrase {
    pub fn new(id: usize, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            is_continue: false,
            user_points: 0,
            user_words: 0,
        }
    }

    /// Words of the phrase, split on any run of whitespace.
    pub fn words(&self) -> Vec<&str> {
        self.text.split_whitespace().collect()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn word(&self, idx: usize) -> Option<&str> {
        self.text.split_whitespace().nth(idx)
    }

    /// Forget any persisted progress (used by "replay from scratch").
    pub fn clear_progress(&mut self) {
        self.is_continue = false;
        self.user_points = 0;
        self.user_words = 0;
    }
}
