//! The session store: sole owner of [`GameState`].
//!
//! Every mutation is an [`Action`] applied by [`SessionStore::dispatch`].
//! Asynchronous producers (the tick driver, recognizer callbacks) never hold
//! on to state; they send actions, and the reducer checks them against the
//! state as it is when the action is applied.

use tracing::{debug, info};

use crate::lifecycle;
use crate::phrase::Phrase;
use crate::score::ScoreSummary;
use crate::session::{GameState, SessionConfig, SessionError};

/// Identifies the phrase attempt a recognizer request was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerdictTag {
    pub phrase_index: usize,
    pub attempt: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, strum_macros::Display)]
pub enum Action {
    /// Start capture for the current phrase.
    Start,
    /// One second elapsed on the host clock.
    Tick,
    Pause,
    Resume,
    /// Terminal: the learner left the session.
    Exit,
    /// A word was handed to the recognizer.
    BeginWord { word_index: usize },
    /// The recognizer answered. `None` means it failed to produce a verdict.
    WordVerdict {
        tag: VerdictTag,
        word_index: usize,
        verdict: Option<bool>,
    },
    PhraseScored { phrase_index: usize, correct_words: u32 },
    AdvancePhrase { phrase_index: usize },
    DismissPopup,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    state: GameState,
    config: SessionConfig,
    version: u64,
}

impl SessionStore {
    /// Build a session over `phrases`. With `reset_progress` every phrase
    /// starts unscored; otherwise persisted progress is kept and the cursor
    /// resumes at the first incomplete phrase.
    pub fn new(mut phrases: Vec<Phrase>, config: SessionConfig, reset_progress: bool) -> Self {
        if reset_progress {
            phrases.iter_mut().for_each(Phrase::clear_progress);
        }

        let current_phrase_index = lifecycle::first_incomplete(&phrases);
        let is_game_completed = !phrases.is_empty() && lifecycle::is_game_completed(&phrases);

        debug!(
            phrases = phrases.len(),
            current_phrase_index, reset_progress, "session created"
        );

        Self {
            state: GameState {
                current_phrase_index,
                timer: lifecycle::budget_timer(config.time_budget_secs),
                is_active: false,
                paused: false,
                is_exiting: false,
                phrase_completed: false,
                show_popup: false,
                is_speaking: false,
                word_results: Vec::new(),
                phrases,
                is_game_completed,
                attempt: 0,
            },
            config,
            version: 0,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Incremented on every applied action; hosts redraw when it changes.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn phrases(&self) -> &[Phrase] {
        &self.state.phrases
    }

    pub fn summary(&self) -> ScoreSummary {
        ScoreSummary::from_phrases(&self.state.phrases, self.config.base_points)
    }

    /// Tag for requests issued against the current attempt.
    pub fn verdict_tag(&self) -> VerdictTag {
        VerdictTag {
            phrase_index: self.state.current_phrase_index,
            attempt: self.state.attempt,
        }
    }

    /// Whether the host clock should be delivering ticks right now.
    pub fn should_tick(&self) -> bool {
        let s = &self.state;
        s.is_active && !s.paused && !s.is_exiting && !s.phrase_completed
    }

    pub fn timer_expired(&self) -> bool {
        self.state.timer <= 0
    }

    pub fn dispatch(&mut self, action: Action) -> Result<(), SessionError> {
        match self.apply(&action) {
            Ok(()) => {
                self.version += 1;
                debug!(%action, version = self.version, "applied");
                Ok(())
            }
            Err(err) => {
                debug!(%action, %err, "rejected");
                Err(err)
            }
        }
    }

    fn apply(&mut self, action: &Action) -> Result<(), SessionError> {
        if self.state.is_exiting {
            return Err(SessionError::Exiting);
        }

        match *action {
            Action::Start => {
                self.ensure_open()?;
                self.ensure_attempt()?;
                self.state.is_active = true;
            }
            Action::Tick => {
                if self.state.paused {
                    return Err(SessionError::Paused);
                }
                if !self.state.is_active || self.state.phrase_completed {
                    return Err(SessionError::NotActive);
                }
                self.state.timer -= 1;
            }
            Action::Pause => {
                self.state.paused = true;
            }
            Action::Resume => {
                self.state.paused = false;
            }
            Action::Exit => {
                self.state.is_exiting = true;
                self.state.is_active = false;
                self.state.is_speaking = false;
                info!(
                    phrase = self.state.current_phrase_index,
                    "session exit requested"
                );
            }
            Action::BeginWord { word_index } => {
                self.ensure_open()?;
                self.check_word(word_index, self.word_slots())?;
                self.ensure_attempt()?;
                self.state.is_active = true;
                self.state.is_speaking = true;
            }
            Action::WordVerdict {
                tag,
                word_index,
                verdict,
            } => {
                if tag.phrase_index != self.state.current_phrase_index
                    || tag.attempt != self.state.attempt
                    || self.state.phrase_completed
                {
                    return Err(SessionError::StaleVerdict {
                        phrase_index: tag.phrase_index,
                        attempt: tag.attempt,
                    });
                }
                self.check_word(word_index, self.state.word_results.len())?;
                self.state.word_results[word_index] = verdict;
                self.state.is_speaking = false;
            }
            Action::PhraseScored {
                phrase_index,
                correct_words,
            } => {
                if phrase_index == self.state.current_phrase_index && self.state.phrase_completed
                {
                    return Err(SessionError::AlreadyScored(phrase_index));
                }
                let points = lifecycle::update_phrase_score(
                    &mut self.state,
                    phrase_index,
                    correct_words,
                    self.config.base_points,
                )?;
                info!(phrase_index, correct_words, points, "phrase scored");
                if self.state.is_game_completed {
                    info!(
                        total_points = self.summary().total_points,
                        "practice set completed"
                    );
                }
            }
            Action::AdvancePhrase { phrase_index } => {
                lifecycle::reset_for_new_phrase(
                    &mut self.state,
                    phrase_index,
                    self.config.time_budget_secs,
                )?;
            }
            Action::DismissPopup => {
                self.state.show_popup = false;
            }
        }
        Ok(())
    }

    // The first capture on a fresh session sizes the word slots.
    fn ensure_attempt(&mut self) -> Result<(), SessionError> {
        if self.state.attempt == 0 {
            let index = self.state.current_phrase_index;
            lifecycle::reset_for_new_phrase(&mut self.state, index, self.config.time_budget_secs)?;
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.state.paused {
            return Err(SessionError::Paused);
        }
        if self.state.phrase_completed {
            return Err(SessionError::AlreadyScored(self.state.current_phrase_index));
        }
        Ok(())
    }

    // Slots the current attempt has, or will have once the first capture
    // sizes them.
    fn word_slots(&self) -> usize {
        if self.state.attempt == 0 {
            self.state.current_phrase().map_or(0, Phrase::word_count)
        } else {
            self.state.word_results.len()
        }
    }

    fn check_word(&self, word_index: usize, len: usize) -> Result<(), SessionError> {
        if word_index < len {
            Ok(())
        } else {
            Err(SessionError::WordOutOfRange {
                index: word_index,
                len,
            })
        }
    }

    pub fn decrement_timer(&mut self) -> Result<(), SessionError> {
        self.dispatch(Action::Tick)
    }

    pub fn reset_for_new_phrase(&mut self, phrase_index: usize) -> Result<(), SessionError> {
        self.dispatch(Action::AdvancePhrase { phrase_index })
    }

    pub fn update_phrase_score(
        &mut self,
        phrase_index: usize,
        correct_words: u32,
    ) -> Result<(), SessionError> {
        self.dispatch(Action::PhraseScored {
            phrase_index,
            correct_words,
        })
    }

    /// Score the current attempt from the collected verdicts, counting words
    /// without a verdict as incorrect. Returns the points earned.
    pub fn score_current_phrase(&mut self) -> Result<u32, SessionError> {
        let index = self.state.current_phrase_index;
        let correct = lifecycle::normalized_verdicts(&self.state.word_results)
            .into_iter()
            .filter(|&v| v)
            .count() as u32;
        self.update_phrase_score(index, correct)?;
        Ok(correct.saturating_mul(self.config.base_points))
    }

    /// Mark `word_index` as in flight and return the tag its verdict must carry.
    pub fn begin_word(&mut self, word_index: usize) -> Result<VerdictTag, SessionError> {
        self.dispatch(Action::BeginWord { word_index })?;
        Ok(self.verdict_tag())
    }
}
