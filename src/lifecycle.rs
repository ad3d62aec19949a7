//! Phrase transitions: where a session resumes, how a phrase is reset before
//! an attempt, and how a finished attempt is scored.
//!
//! These functions know nothing about navigation. Which phrase comes next is
//! the host's decision; this module only guarantees that state is consistent
//! once a phrase becomes current or gets scored.

use crate::phrase::Phrase;
use crate::session::{GameState, SessionError};

/// Resume cursor: first phrase not yet continued, or 0 when all are.
pub fn first_incomplete(phrases: &[Phrase]) -> usize {
    phrases.iter().position(|p| !p.is_continue).unwrap_or(0)
}

/// Next phrase after `index` that still needs scoring, wrapping around to the
/// start of the set. `None` once every phrase is continued.
pub fn next_incomplete_after(phrases: &[Phrase], index: usize) -> Option<usize> {
    let len = phrases.len();
    (1..=len)
        .map(|offset| (index + offset) % len)
        .find(|&i| !phrases[i].is_continue)
}

pub fn is_game_completed(phrases: &[Phrase]) -> bool {
    phrases.iter().all(|p| p.is_continue)
}

/// Missing verdicts at scoring time count as incorrect.
pub fn normalized_verdicts(word_results: &[Option<bool>]) -> Vec<bool> {
    word_results.iter().map(|v| v.unwrap_or(false)).collect()
}

/// Countdown start for a budget; budgets past `i32::MAX` seconds saturate.
pub fn budget_timer(time_budget_secs: u32) -> i32 {
    i32::try_from(time_budget_secs).unwrap_or(i32::MAX)
}

fn check_index(phrases: &[Phrase], index: usize) -> Result<(), SessionError> {
    if index < phrases.len() {
        Ok(())
    } else {
        Err(SessionError::PhraseOutOfRange {
            index,
            len: phrases.len(),
        })
    }
}

/// Make `index` the current phrase and clear every per-attempt field.
pub fn reset_for_new_phrase(
    state: &mut GameState,
    index: usize,
    time_budget_secs: u32,
) -> Result<(), SessionError> {
    check_index(&state.phrases, index)?;

    let word_count = state.phrases[index].word_count();
    state.current_phrase_index = index;
    state.word_results = vec![None; word_count];
    state.timer = budget_timer(time_budget_secs);
    state.is_active = false;
    state.is_speaking = false;
    state.phrase_completed = false;
    state.show_popup = false;
    state.attempt += 1;
    Ok(())
}

/// Record `correct_words` for phrase `index` and recompute completion.
///
/// Points are always `correct_words * base_points`; a second call for the same
/// phrase overwrites the first. No other phrase is touched.
pub fn update_phrase_score(
    state: &mut GameState,
    index: usize,
    correct_words: u32,
    base_points: u32,
) -> Result<u32, SessionError> {
    check_index(&state.phrases, index)?;

    let points_earned = correct_words.saturating_mul(base_points);
    let phrase = &mut state.phrases[index];
    phrase.user_points = points_earned;
    phrase.user_words = correct_words;
    phrase.is_continue = true;

    state.is_game_completed = is_game_completed(&state.phrases);

    if index == state.current_phrase_index {
        state.phrase_completed = true;
        state.show_popup = true;
        state.is_active = false;
        state.is_speaking = false;
    }
    Ok(points_earned)
}
