//! The practice host: owns the session store, the countdown clock and the
//! recognizer, and turns host events into store actions.
//!
//! Everything here runs on one thread. Recognizer replies come back through
//! the same event queue as key presses, so the store only ever has one writer.

use std::sync::mpsc::Sender;
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, info, warn};

use crate::lifecycle;
use crate::phrase_set::PhraseSet;
use crate::progress::{ProgressDb, RunRecord};
use crate::recognizer::{SpeechRecognizer, VerifyRequest};
use crate::runtime::SessionEvent;
use crate::session::{GameState, SessionConfig};
use crate::store::{Action, SessionStore};
use crate::timer::TimerDriver;

/// Past runs listed on the results screen.
const RECENT_RUNS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Practice,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Practice {
    pub set_name: String,
    pub title: String,
    pub screen: Screen,
    /// Text typed for the word currently being attempted.
    pub input: String,
    /// Points earned by the most recently scored phrase.
    pub last_points: Option<u32>,
    pub best_points: Option<u32>,
    /// Latest completed runs of this set, newest first.
    pub recent_runs: Vec<RunRecord>,
    store: SessionStore,
    recognizer: Box<dyn SpeechRecognizer>,
    progress: Option<ProgressDb>,
    timer: TimerDriver,
    reply: Sender<SessionEvent>,
}

impl Practice {
    pub fn new(
        set: PhraseSet,
        config: SessionConfig,
        reset_progress: bool,
        recognizer: Box<dyn SpeechRecognizer>,
        progress: Option<ProgressDb>,
        reply: Sender<SessionEvent>,
    ) -> Self {
        let PhraseSet {
            name,
            title,
            mut phrases,
        } = set;

        if let Some(db) = &progress {
            let restored = if reset_progress {
                db.clear_progress(&name).map(|_| 0)
            } else {
                db.apply_progress(&name, &mut phrases)
            };
            match restored {
                Ok(count) => debug!(set = %name, count, "stored progress applied"),
                Err(err) => warn!(set = %name, %err, "could not read stored progress"),
            }
        }

        let store = SessionStore::new(phrases, config, reset_progress);
        info!(
            set = %name,
            resume_at = store.state().current_phrase_index,
            completed = store.state().is_game_completed,
            "practice loaded"
        );

        let mut practice = Self {
            set_name: name,
            title,
            screen: Screen::Practice,
            input: String::new(),
            last_points: None,
            best_points: None,
            recent_runs: Vec::new(),
            store,
            recognizer,
            progress,
            timer: TimerDriver::default(),
            reply,
        };

        practice.load_history();
        if practice.store.state().is_game_completed {
            practice.screen = Screen::Results;
        } else {
            practice.advance_to(practice.store.state().current_phrase_index);
        }
        practice
    }

    pub fn state(&self) -> &GameState {
        self.store.state()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Replace the countdown clock, e.g. with a faster period in tests.
    pub fn with_timer(mut self, timer: TimerDriver) -> Self {
        self.timer = timer;
        self
    }

    pub fn handle_event(&mut self, event: SessionEvent, now: Instant) -> Flow {
        let flow = match event {
            SessionEvent::Tick | SessionEvent::Resize => Flow::Continue,
            SessionEvent::Verdict(verdict) => {
                match self.store.dispatch(verdict.into()) {
                    Ok(()) => self.finish_if_all_attempted(),
                    Err(err) => debug!(%err, "verdict ignored"),
                }
                Flow::Continue
            }
            SessionEvent::Key(key) => self.handle_key(key),
        };

        if flow == Flow::Continue {
            self.on_clock(now);
        }
        flow
    }

    fn on_clock(&mut self, now: Instant) {
        let due = self.timer.poll(self.store.should_tick(), now);
        for _ in 0..due {
            if self.store.timer_expired() || self.store.decrement_timer().is_err() {
                break;
            }
        }
        if self.store.should_tick() && self.store.timer_expired() {
            debug!(phrase = self.state().current_phrase_index, "time is up");
            self.finish_phrase();
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Flow {
        let ctrl_c =
            key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');
        if key.code == KeyCode::Esc || ctrl_c {
            self.exit();
            return Flow::Quit;
        }

        match self.screen {
            Screen::Results => match key.code {
                KeyCode::Char('r') => self.replay(),
                KeyCode::Char('q') => {
                    self.exit();
                    return Flow::Quit;
                }
                _ => {}
            },
            Screen::Practice if self.state().show_popup => self.continue_after_popup(),
            Screen::Practice => match key.code {
                KeyCode::Tab => self.toggle_pause(),
                KeyCode::Left => {
                    let current = self.state().current_phrase_index;
                    if current > 0 {
                        self.advance_to(current - 1);
                    }
                }
                KeyCode::Right => {
                    let next = self.state().current_phrase_index + 1;
                    if next < self.state().phrases.len() {
                        self.advance_to(next);
                    }
                }
                KeyCode::Enter => self.submit_attempt(),
                KeyCode::Backspace => {
                    self.input.pop();
                }
                KeyCode::Char(c) => {
                    if !self.state().paused {
                        if !self.state().is_active {
                            let _ = self.store.dispatch(Action::Start);
                        }
                        self.input.push(c);
                    }
                }
                _ => {}
            },
        }
        Flow::Continue
    }

    fn toggle_pause(&mut self) {
        let action = if self.state().paused {
            Action::Resume
        } else {
            Action::Pause
        };
        if let Err(err) = self.store.dispatch(action) {
            debug!(%err, "pause toggle rejected");
        }
    }

    /// Hand the typed attempt for the next pending word to the recognizer.
    fn submit_attempt(&mut self) {
        let state = self.store.state();
        if state.paused || state.is_speaking || state.phrase_completed {
            return;
        }
        if !state.is_active && self.input.trim().is_empty() {
            let _ = self.store.dispatch(Action::Start);
            return;
        }
        let Some(word_index) = state.next_pending_word() else {
            return;
        };
        let Some(expected) = state
            .current_phrase()
            .and_then(|p| p.word(word_index))
            .map(str::to_string)
        else {
            return;
        };

        match self.store.begin_word(word_index) {
            Ok(tag) => {
                let heard = std::mem::take(&mut self.input);
                self.recognizer.verify(
                    VerifyRequest {
                        tag,
                        word_index,
                        expected,
                        heard,
                    },
                    self.reply.clone(),
                );
            }
            Err(err) => debug!(%err, "attempt rejected"),
        }
    }

    fn finish_if_all_attempted(&mut self) {
        let state = self.store.state();
        if state.is_active && !state.phrase_completed && state.all_words_attempted() {
            self.finish_phrase();
        }
    }

    fn finish_phrase(&mut self) {
        match self.store.score_current_phrase() {
            Ok(points) => {
                self.last_points = Some(points);
                self.input.clear();
                self.persist();
            }
            Err(err) => debug!(%err, "scoring rejected"),
        }
    }

    fn continue_after_popup(&mut self) {
        if self.store.dispatch(Action::DismissPopup).is_err() {
            return;
        }
        if self.state().is_game_completed {
            self.complete_set();
            return;
        }
        let current = self.state().current_phrase_index;
        if let Some(next) = lifecycle::next_incomplete_after(&self.state().phrases, current) {
            self.advance_to(next);
        }
    }

    fn advance_to(&mut self, index: usize) {
        if let Err(err) = self.store.reset_for_new_phrase(index) {
            warn!(%err, "cannot move to phrase");
            return;
        }
        self.input.clear();

        // A phrase without words has nothing to attempt; score it right away.
        if self.state().word_results.is_empty() {
            let _ = self.store.dispatch(Action::Start);
            self.finish_phrase();
        }
    }

    fn complete_set(&mut self) {
        let summary = self.store.summary();
        info!(
            set = %self.set_name,
            points = summary.total_points,
            max = summary.max_points,
            "set completed"
        );
        if let Some(db) = &self.progress {
            if let Err(err) = db.record_run(&RunRecord::from_summary(&self.set_name, &summary)) {
                warn!(%err, "could not record run");
            }
        }
        self.load_history();
        self.screen = Screen::Results;
    }

    fn load_history(&mut self) {
        let Some(db) = &self.progress else {
            return;
        };
        match db.best_points(&self.set_name) {
            Ok(best) => self.best_points = best,
            Err(err) => warn!(%err, "could not read best score"),
        }
        match db.recent_runs(&self.set_name, RECENT_RUNS) {
            Ok(runs) => self.recent_runs = runs,
            Err(err) => warn!(%err, "could not read run history"),
        }
    }

    fn replay(&mut self) {
        let phrases = self.store.phrases().to_vec();
        let config = *self.store.config();
        self.store = SessionStore::new(phrases, config, true);
        self.last_points = None;
        self.screen = Screen::Practice;
        if let Some(db) = &self.progress {
            if let Err(err) = db.clear_progress(&self.set_name) {
                warn!(%err, "could not clear stored progress");
            }
        }
        self.advance_to(0);
    }

    fn exit(&mut self) {
        if self.store.dispatch(Action::Exit).is_ok() {
            self.persist();
        }
    }

    fn persist(&mut self) {
        if let Some(db) = &mut self.progress {
            if let Err(err) = db.save_progress(&self.set_name, self.store.phrases()) {
                warn!(%err, "could not save progress");
            }
        }
    }
}
