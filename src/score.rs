//! Derived totals over a phrase list. Nothing here is cached; callers
//! recompute after every change to the phrases.

use crate::phrase::Phrase;

// Loaded progress is not trusted to be small, so sums saturate.
fn saturating_sum(values: impl Iterator<Item = u32>) -> u32 {
    values.fold(0, u32::saturating_add)
}

pub fn total_points(phrases: &[Phrase]) -> u32 {
    saturating_sum(phrases.iter().map(|p| p.user_points))
}

pub fn total_words(phrases: &[Phrase]) -> u32 {
    saturating_sum(phrases.iter().map(|p| p.user_words))
}

pub fn completed_count(phrases: &[Phrase]) -> usize {
    phrases.iter().filter(|p| p.is_continue).count()
}

/// Share of continued phrases, 0-100. An empty set is 0% complete.
pub fn completion_percentage(phrases: &[Phrase]) -> f64 {
    if phrases.is_empty() {
        return 0.0;
    }
    (completed_count(phrases) as f64 / phrases.len() as f64) * 100.0
}

/// Best possible score for the set: every word correct.
pub fn max_points(phrases: &[Phrase], base_points: u32) -> u32 {
    let words = saturating_sum(
        phrases
            .iter()
            .map(|p| u32::try_from(p.word_count()).unwrap_or(u32::MAX)),
    );
    words.saturating_mul(base_points)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSummary {
    pub total_points: u32,
    pub total_words: u32,
    pub completion_percentage: f64,
    pub completed: usize,
    pub total: usize,
    pub max_points: u32,
}

impl ScoreSummary {
    pub fn from_phrases(phrases: &[Phrase], base_points: u32) -> Self {
        Self {
            total_points: total_points(phrases),
            total_words: total_words(phrases),
            completion_percentage: completion_percentage(phrases),
            completed: completed_count(phrases),
            total: phrases.len(),
            max_points: max_points(phrases, base_points),
        }
    }

    /// True when every phrase is done and every word was right.
    pub fn is_perfect(&self) -> bool {
        self.total > 0 && self.completed == self.total && self.total_points == self.max_points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(text: &str, points: u32, words: u32, is_continue: bool) -> Phrase {
        Phrase {
            user_points: points,
            user_words: words,
            is_continue,
            ..Phrase::new(0, text)
        }
    }

    #[test]
    fn test_aggregation() {
        let phrases = vec![
            scored("isa dalawa", 10, 2, true),
            scored("tatlo apat", 0, 0, false),
        ];

        assert_eq!(total_points(&phrases), 10);
        assert_eq!(total_words(&phrases), 2);
        assert_eq!(completion_percentage(&phrases), 50.0);
    }

    #[test]
    fn test_empty_set() {
        assert_eq!(total_points(&[]), 0);
        assert_eq!(total_words(&[]), 0);
        assert_eq!(completion_percentage(&[]), 0.0);
        assert_eq!(max_points(&[], 5), 0);
    }

    #[test]
    fn test_max_points() {
        let phrases = vec![scored("a b c", 0, 0, false), scored("d", 0, 0, false)];
        assert_eq!(max_points(&phrases, 5), 20);
    }

    #[test]
    fn test_totals_saturate() {
        let phrases = vec![
            scored("a b", u32::MAX, u32::MAX, true),
            scored("c", 5, 1, true),
        ];

        assert_eq!(total_points(&phrases), u32::MAX);
        assert_eq!(total_words(&phrases), u32::MAX);
        assert_eq!(max_points(&phrases, u32::MAX), u32::MAX);
    }

    #[test]
    fn test_summary() {
        let phrases = vec![
            scored("a b", 10, 2, true),
            scored("c", 5, 1, true),
            scored("d e", 5, 1, true),
        ];
        let summary = ScoreSummary::from_phrases(&phrases, 5);

        assert_eq!(summary.total_points, 20);
        assert_eq!(summary.total_words, 4);
        assert_eq!(summary.completion_percentage, 100.0);
        assert_eq!(summary.completed, 3);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.max_points, 25);
        assert!(!summary.is_perfect());
    }

    #[test]
    fn test_perfect_summary() {
        let phrases = vec![scored("a b", 10, 2, true)];
        assert!(ScoreSummary::from_phrases(&phrases, 5).is_perfect());
        assert!(!ScoreSummary::from_phrases(&[], 5).is_perfect());
    }
}
