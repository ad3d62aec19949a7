//! Speech-recognizer seam.
//!
//! A recognizer is handed one word at a time and answers asynchronously by
//! posting a [`SessionEvent::Verdict`] on the host's event queue. Replies carry
//! the [`VerdictTag`] of the attempt they were issued for; the store discards
//! any that arrive after the attempt ended.

use std::collections::VecDeque;
use std::sync::mpsc::Sender;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::runtime::SessionEvent;
use crate::store::{Action, VerdictTag};

/// A recognizer's answer for one word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub tag: VerdictTag,
    pub word_index: usize,
    /// `None` when the recognizer could not decide (no speech, failure).
    pub verdict: Option<bool>,
}

impl From<Verdict> for Action {
    fn from(v: Verdict) -> Self {
        Action::WordVerdict {
            tag: v.tag,
            word_index: v.word_index,
            verdict: v.verdict,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyRequest {
    pub tag: VerdictTag,
    pub word_index: usize,
    pub expected: String,
    /// What the learner produced. For the typed stand-in this is the typed
    /// text; an audio recognizer would ignore it.
    pub heard: String,
}

pub trait SpeechRecognizer {
    /// Judge one word and post the verdict on `reply`. Must not block the
    /// caller for the duration of recognition.
    fn verify(&self, request: VerifyRequest, reply: Sender<SessionEvent>);
}

/// Case-folded word with punctuation removed, so "Salamat," matches "salamat".
pub fn normalize_word(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Compare a heard attempt with the expected word. Empty input is no verdict.
pub fn judge(expected: &str, heard: &str) -> Option<bool> {
    let heard = normalize_word(heard);
    if heard.is_empty() {
        return None;
    }
    Some(heard == normalize_word(expected))
}

fn send_verdict(reply: &Sender<SessionEvent>, verdict: Verdict) {
    if reply.send(SessionEvent::Verdict(verdict)).is_err() {
        warn!("verdict dropped: event queue closed");
    }
}

/// Stand-in recognizer for terminals: judges the typed attempt on a worker
/// thread after a simulated recognition latency.
#[derive(Debug, Clone, Copy)]
pub struct TypedRecognizer {
    latency: Duration,
}

impl TypedRecognizer {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl SpeechRecognizer for TypedRecognizer {
    fn verify(&self, request: VerifyRequest, reply: Sender<SessionEvent>) {
        let latency = self.latency;
        thread::spawn(move || {
            if !latency.is_zero() {
                thread::sleep(latency);
            }
            let verdict = judge(&request.expected, &request.heard);
            debug!(
                phrase = request.tag.phrase_index,
                word = request.word_index,
                ?verdict,
                "typed attempt judged"
            );
            send_verdict(
                &reply,
                Verdict {
                    tag: request.tag,
                    word_index: request.word_index,
                    verdict,
                },
            );
        });
    }
}

/// Replies immediately with a scripted sequence of verdicts. Once the script
/// runs out every reply is `None`.
#[derive(Debug, Default)]
pub struct ScriptedRecognizer {
    script: Mutex<VecDeque<Option<bool>>>,
}

impl ScriptedRecognizer {
    pub fn new<I: IntoIterator<Item = Option<bool>>>(script: I) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn verify(&self, request: VerifyRequest, reply: Sender<SessionEvent>) {
        let verdict = match self.script.lock() {
            Ok(mut script) => script.pop_front().flatten(),
            Err(_) => None,
        };
        send_verdict(
            &reply,
            Verdict {
                tag: request.tag,
                word_index: request.word_index,
                verdict,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn request(expected: &str, heard: &str) -> VerifyRequest {
        VerifyRequest {
            tag: VerdictTag {
                phrase_index: 1,
                attempt: 3,
            },
            word_index: 2,
            expected: expected.to_string(),
            heard: heard.to_string(),
        }
    }

    fn recv_verdict(rx: &mpsc::Receiver<SessionEvent>) -> Verdict {
        match rx.recv_timeout(Duration::from_secs(2)).unwrap() {
            SessionEvent::Verdict(v) => v,
            other => panic!("expected verdict, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize_word() {
        assert_eq!(normalize_word("Salamat,"), "salamat");
        assert_eq!(normalize_word("PO!"), "po");
        assert_eq!(normalize_word("Niño"), "niño");
        assert_eq!(normalize_word("ubos-ubos"), "ubosubos");
    }

    #[test]
    fn test_judge() {
        assert_eq!(judge("Magandang", "magandang"), Some(true));
        assert_eq!(judge("umaga", "umaga."), Some(true));
        assert_eq!(judge("umaga", "gabi"), Some(false));
        assert_eq!(judge("umaga", "   "), None);
        assert_eq!(judge("umaga", "?!"), None);
    }

    #[test]
    fn test_typed_recognizer_replies_with_tag() {
        let (tx, rx) = mpsc::channel();
        let recognizer = TypedRecognizer::new(Duration::ZERO);

        recognizer.verify(request("bata", "Bata"), tx);
        let verdict = recv_verdict(&rx);

        assert_eq!(verdict.tag.phrase_index, 1);
        assert_eq!(verdict.tag.attempt, 3);
        assert_eq!(verdict.word_index, 2);
        assert_eq!(verdict.verdict, Some(true));
    }

    #[test]
    fn test_typed_recognizer_latency() {
        let (tx, rx) = mpsc::channel();
        let recognizer = TypedRecognizer::new(Duration::from_millis(50));

        recognizer.verify(request("bata", "bota"), tx);

        assert!(rx.recv_timeout(Duration::from_millis(5)).is_err());
        assert_eq!(recv_verdict(&rx).verdict, Some(false));
    }

    #[test]
    fn test_scripted_recognizer() {
        let (tx, rx) = mpsc::channel();
        let recognizer = ScriptedRecognizer::new([Some(true), Some(false)]);

        recognizer.verify(request("a", ""), tx.clone());
        recognizer.verify(request("a", ""), tx.clone());
        recognizer.verify(request("a", ""), tx);

        assert_eq!(recv_verdict(&rx).verdict, Some(true));
        assert_eq!(recv_verdict(&rx).verdict, Some(false));
        assert_eq!(recv_verdict(&rx).verdict, None);
    }

    #[test]
    fn test_verdict_into_action() {
        let tag = VerdictTag {
            phrase_index: 0,
            attempt: 1,
        };
        let action: Action = Verdict {
            tag,
            word_index: 3,
            verdict: Some(false),
        }
        .into();

        assert_eq!(
            action,
            Action::WordVerdict {
                tag,
                word_index: 3,
                verdict: Some(false)
            }
        );
    }
}
