// Progress survives a restart: a second Practice opened on the same
// database resumes at the first phrase that is not yet continued.

use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::time::Instant;

use bigkas::phrase_set::PhraseSet;
use bigkas::practice::{Practice, Screen};
use bigkas::progress::ProgressDb;
use bigkas::recognizer::TypedRecognizer;
use bigkas::runtime::SessionEvent;
use bigkas::SessionConfig;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tempfile::TempDir;

fn key(code: KeyCode) -> SessionEvent {
    SessionEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn open(path: &Path, reset: bool) -> (Practice, Receiver<SessionEvent>) {
    let (tx, rx) = mpsc::channel();
    let set = PhraseSet::from_json(
        r#"{ "name": "tahanan", "title": "Tahanan", "phrases": [
            { "text": "nasa bahay ako" },
            { "text": "kumain ka na" },
            { "text": "salamat po" }
        ] }"#,
    )
    .unwrap();
    let practice = Practice::new(
        set,
        SessionConfig::default(),
        reset,
        Box::new(TypedRecognizer::new(std::time::Duration::ZERO)),
        Some(ProgressDb::open(path).unwrap()),
        tx,
    );
    (practice, rx)
}

fn say(p: &mut Practice, rx: &Receiver<SessionEvent>, word: &str) {
    for c in word.chars() {
        p.handle_event(key(KeyCode::Char(c)), Instant::now());
    }
    p.handle_event(key(KeyCode::Enter), Instant::now());
    let reply = rx
        .recv_timeout(std::time::Duration::from_secs(1))
        .unwrap();
    p.handle_event(reply, Instant::now());
}

#[test]
fn resume_after_restart_skips_completed_phrases() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("progress.db");

    {
        let (mut p, rx) = open(&db, false);
        for word in ["nasa", "bahay", "ako"] {
            say(&mut p, &rx, word);
        }
        assert!(p.state().phrases[0].is_continue);
        p.handle_event(key(KeyCode::Esc), Instant::now());
    }

    let (p, _rx) = open(&db, false);
    assert_eq!(p.state().current_phrase_index, 1);
    assert!(p.state().phrases[0].is_continue);
    assert_eq!(p.state().phrases[0].user_points, 15);
    assert_eq!(p.store().summary().completed, 1);
}

#[test]
fn reset_flag_discards_stored_progress() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("progress.db");

    {
        let (mut p, rx) = open(&db, false);
        for word in ["nasa", "bahay", "ako"] {
            say(&mut p, &rx, word);
        }
    }

    let (p, _rx) = open(&db, true);
    assert_eq!(p.state().current_phrase_index, 0);
    assert_eq!(p.store().summary().total_points, 0);

    // The reset is persisted too
    drop(p);
    let (p, _rx) = open(&db, false);
    assert_eq!(p.state().current_phrase_index, 0);
}

#[test]
fn finished_set_reopens_on_results() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("progress.db");

    {
        let (mut p, rx) = open(&db, false);
        let spoken: [&[&str]; 3] = [&["nasa", "bahay", "ako"], &["kumain", "ka", "na"], &["salamat", "po"]];
        for words in spoken {
            for word in words.iter().copied() {
                say(&mut p, &rx, word);
            }
            p.handle_event(key(KeyCode::Enter), Instant::now());
        }
        assert_eq!(p.screen, Screen::Results);
        assert_eq!(p.best_points, Some(40));
    }

    let (p, _rx) = open(&db, false);
    assert!(p.state().is_game_completed);
    assert_eq!(p.screen, Screen::Results);
    assert_eq!(p.best_points, Some(40));
}
