use include_dir::{include_dir, Dir};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::phrase::Phrase;

static PHRASE_SET_DIR: Dir = include_dir!("src/phrase_sets");

#[derive(Error, Debug)]
pub enum PhraseSetError {
    #[error("no built-in phrase set named '{0}'")]
    UnknownSet(String),

    #[error("phrase set '{0}' has no phrases")]
    Empty(String),

    #[error("phrase set file is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// An ordered practice set, as supplied by the phrase-set provider.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct PhraseSet {
    pub name: String,
    #[serde(default)]
    pub title: String,
    pub phrases: Vec<Phrase>,
}

impl PhraseSet {
    /// Load one of the sets compiled into the binary.
    pub fn builtin(name: &str) -> Result<Self, PhraseSetError> {
        let file = PHRASE_SET_DIR
            .get_file(format!("{name}.json"))
            .ok_or_else(|| PhraseSetError::UnknownSet(name.to_string()))?;
        let contents = file
            .contents_utf8()
            .ok_or_else(|| PhraseSetError::Encoding(name.to_string()))?;
        Self::from_json(contents)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PhraseSetError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse a set and renumber phrase ids by position, so ids always match
    /// the ordering the session uses.
    pub fn from_json(contents: &str) -> Result<Self, PhraseSetError> {
        let mut set: PhraseSet = serde_json::from_str(contents)?;
        if set.phrases.is_empty() {
            return Err(PhraseSetError::Empty(set.name));
        }
        if set.title.is_empty() {
            set.title = set.name.clone();
        }
        for (idx, phrase) in set.phrases.iter_mut().enumerate() {
            phrase.id = idx;
        }
        Ok(set)
    }

    /// Names of the built-in sets, sorted.
    pub fn builtin_names() -> Vec<String> {
        let mut names: Vec<String> = PHRASE_SET_DIR
            .files()
            .filter_map(|f| {
                let path = f.path();
                match path.extension().and_then(|e| e.to_str()) {
                    Some("json") => path.file_stem()?.to_str().map(str::to_string),
                    _ => None,
                }
            })
            .collect();
        names.sort();
        names
    }

    pub fn word_count(&self) -> usize {
        self.phrases.iter().map(Phrase::word_count).sum()
    }
}
