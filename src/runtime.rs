use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

use crate::recognizer::Verdict;

/// Unified event type consumed by the session host
#[derive(Clone, Debug)]
pub enum SessionEvent {
    Key(KeyEvent),
    Resize,
    Tick,
    /// A recognizer finished judging one word.
    Verdict(Verdict),
}

/// Source of host events (keyboard, resize, recognizer replies)
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, RecvTimeoutError>;

    /// Handle through which asynchronous producers post events into this source.
    fn sender(&self) -> Sender<SessionEvent>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<SessionEvent>,
    rx: Receiver<SessionEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let key_tx = tx.clone();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    if key_tx.send(SessionEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if key_tx.send(SessionEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        });

        Self { tx, rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<SessionEvent> {
        self.tx.clone()
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit and headless integration tests
pub struct TestEventSource {
    tx: Sender<SessionEvent>,
    rx: Receiver<SessionEvent>,
}

impl TestEventSource {
    /// Returns the source and a sender for scripting events into it.
    pub fn new() -> (Self, Sender<SessionEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx: tx.clone(), rx }, tx)
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<SessionEvent> {
        self.tx.clone()
    }
}

/// Runner that advances the host one event/tick at a time
pub struct Runner<E: EventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: EventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> SessionEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                SessionEvent::Tick
            }
        }
    }

    pub fn sender(&self) -> Sender<SessionEvent> {
        self.event_source.sender()
    }
}
