// Library surface for the practice engine, its collaborators, and the host
// pieces the binary wires together. Integration tests drive it headlessly.
pub mod app_dirs;
pub mod config;
pub mod lifecycle;
pub mod phrase;
pub mod phrase_set;
pub mod practice;
pub mod progress;
pub mod recognizer;
pub mod runtime;
pub mod score;
pub mod session;
pub mod store;
pub mod timer;
pub mod ui;

pub use phrase::Phrase;
pub use session::{GameState, SessionConfig, SessionError};
pub use store::{Action, SessionStore, VerdictTag};
