use crate::phrase::Phrase;
use thiserror::Error;

pub const DEFAULT_TIME_BUDGET_SECS: u32 = 20;
pub const DEFAULT_BASE_POINTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Seconds the learner gets per phrase.
    pub time_budget_secs: u32,
    /// Points awarded per correctly pronounced word.
    pub base_points: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            time_budget_secs: DEFAULT_TIME_BUDGET_SECS,
            base_points: DEFAULT_BASE_POINTS,
        }
    }
}

/// Authoritative state of one practice session.
///
/// Only [`crate::store::SessionStore`] mutates this; everything else gets a
/// shared reference.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub current_phrase_index: usize,
    /// Remaining whole seconds for the active phrase. Not clamped at zero.
    pub timer: i32,
    pub is_active: bool,
    pub paused: bool,
    pub is_exiting: bool,
    pub phrase_completed: bool,
    pub show_popup: bool,
    pub is_speaking: bool,
    /// One slot per word of the current phrase: `None` until a verdict lands.
    pub word_results: Vec<Option<bool>>,
    pub phrases: Vec<Phrase>,
    pub is_game_completed: bool,
    /// Bumped on every phrase reset; verdicts carry it to detect staleness.
    pub attempt: u64,
}

impl GameState {
    pub fn current_phrase(&self) -> Option<&Phrase> {
        self.phrases.get(self.current_phrase_index)
    }

    /// Index of the first word still waiting for a verdict.
    pub fn next_pending_word(&self) -> Option<usize> {
        self.word_results.iter().position(Option::is_none)
    }

    /// True once every word slot holds a verdict. Vacuously true for a phrase
    /// with no words, which makes it immediately completable.
    pub fn all_words_attempted(&self) -> bool {
        self.word_results.iter().all(Option::is_some)
    }

    pub fn correct_word_count(&self) -> usize {
        self.word_results
            .iter()
            .filter(|v| matches!(v, Some(true)))
            .count()
    }
}

/// Reasons the store refuses a transition. A rejected transition never
/// changes state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("phrase index {index} is out of range for a set of {len} phrases")]
    PhraseOutOfRange { index: usize, len: usize },

    #[error("word index {index} is out of range for a phrase of {len} words")]
    WordOutOfRange { index: usize, len: usize },

    #[error("verdict for phrase {phrase_index} (attempt {attempt}) arrived after the phrase moved on")]
    StaleVerdict { phrase_index: usize, attempt: u64 },

    #[error("phrase {0} has already been scored in this attempt")]
    AlreadyScored(usize),

    #[error("session is exiting")]
    Exiting,

    #[error("session is paused")]
    Paused,

    #[error("phrase is not active")]
    NotActive,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_results(results: Vec<Option<bool>>) -> GameState {
        GameState {
            current_phrase_index: 0,
            timer: 20,
            is_active: false,
            paused: false,
            is_exiting: false,
            phrase_completed: false,
            show_popup: false,
            is_speaking: false,
            word_results: results,
            phrases: vec![Phrase::new(0, "isa dalawa tatlo")],
            is_game_completed: false,
            attempt: 0,
        }
    }

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();

        assert_eq!(config.time_budget_secs, 20);
        assert_eq!(config.base_points, 5);
    }

    #[test]
    fn test_next_pending_word() {
        let state = state_with_results(vec![Some(true), None, None]);
        assert_eq!(state.next_pending_word(), Some(1));

        let state = state_with_results(vec![Some(true), Some(false), Some(true)]);
        assert_eq!(state.next_pending_word(), None);
    }

    #[test]
    fn test_all_words_attempted() {
        assert!(!state_with_results(vec![Some(true), None]).all_words_attempted());
        assert!(state_with_results(vec![Some(true), Some(false)]).all_words_attempted());
        assert!(state_with_results(vec![]).all_words_attempted());
    }

    #[test]
    fn test_correct_word_count_ignores_pending_and_wrong() {
        let state = state_with_results(vec![Some(true), Some(false), None, Some(true)]);
        assert_eq!(state.correct_word_count(), 2);
    }

    #[test]
    fn test_error_messages() {
        let err = SessionError::PhraseOutOfRange { index: 7, len: 3 };
        assert_eq!(
            err.to_string(),
            "phrase index 7 is out of range for a set of 3 phrases"
        );
        assert_eq!(SessionError::Exiting.to_string(), "session is exiting");
    }
}
