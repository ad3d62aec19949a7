use bigkas::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    phrase_set::PhraseSet,
    practice::{Flow, Practice},
    progress::ProgressDb,
    recognizer::TypedRecognizer,
    runtime::{CrosstermEventSource, FixedTicker, Runner},
    SessionConfig,
};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use itertools::Itertools;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TICK_RATE_MS: u64 = 100;

/// resumable filipino pronunciation practice in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Practice pronouncing Filipino phrases word by word against a per-phrase timer. Progress is saved after every phrase and resumes at the first unfinished phrase."
)]
pub struct Cli {
    /// built-in phrase set to practice
    #[clap(short = 's', long = "set")]
    phrase_set: Option<String>,

    /// load the phrase set from a JSON file instead
    #[clap(long, conflicts_with = "phrase_set")]
    file: Option<PathBuf>,

    /// seconds allowed per phrase
    #[clap(short = 't', long)]
    time_budget_secs: Option<u32>,

    /// points per correctly pronounced word
    #[clap(short = 'b', long)]
    base_points: Option<u32>,

    /// simulated recognizer latency in milliseconds
    #[clap(long)]
    latency_ms: Option<u64>,

    /// discard saved progress and start the set from the first phrase
    #[clap(long)]
    reset: bool,

    /// list the built-in phrase sets and exit
    #[clap(long)]
    list: bool,
}

impl Cli {
    /// Overlay command line flags on the stored config
    fn apply_to(&self, cfg: &mut Config) {
        if let Some(set) = &self.phrase_set {
            cfg.phrase_set = set.clone();
        }
        if let Some(secs) = self.time_budget_secs {
            cfg.time_budget_secs = secs;
        }
        if let Some(points) = self.base_points {
            cfg.base_points = points;
        }
        if let Some(ms) = self.latency_ms {
            cfg.recognizer_latency_ms = ms;
        }
    }

    fn load_set(&self, cfg: &Config) -> Result<PhraseSet, Box<dyn Error>> {
        let set = match &self.file {
            Some(path) => PhraseSet::from_file(path)?,
            None => PhraseSet::builtin(&cfg.phrase_set)?,
        };
        Ok(set)
    }
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bigkas=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.list {
        println!("{}", PhraseSet::builtin_names().iter().join("\n"));
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging();

    let config_store = FileConfigStore::new();
    let mut cfg = config_store.load();
    info!(path = %config_store.path().display(), "config loaded");
    cli.apply_to(&mut cfg);
    let set = cli.load_set(&cfg)?;
    if cli.file.is_none() {
        if let Err(err) = config_store.save(&cfg) {
            warn!(%err, "could not save config");
        }
    }

    let progress = match ProgressDb::new() {
        Ok(db) => Some(db),
        Err(err) => {
            warn!(%err, "progress will not be saved");
            None
        }
    };

    info!(set = %set.name, "bigkas v{} starting", env!("CARGO_PKG_VERSION"));

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let mut practice = Practice::new(
        set,
        SessionConfig::from(&cfg),
        cli.reset,
        Box::new(TypedRecognizer::new(Duration::from_millis(
            cfg.recognizer_latency_ms,
        ))),
        progress,
        runner.sender(),
    );

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &runner, &mut practice);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run<B: Backend>(
    terminal: &mut Terminal<B>,
    runner: &Runner<CrosstermEventSource, FixedTicker>,
    practice: &mut Practice,
) -> Result<(), Box<dyn Error>> {
    let mut drawn_version = None;
    terminal.draw(|f| f.render_widget(&*practice, f.area()))?;

    loop {
        let event = runner.step();
        let redraw = !matches!(event, bigkas::runtime::SessionEvent::Tick);

        if practice.handle_event(event, Instant::now()) == Flow::Quit {
            break;
        }

        let version = practice.store().version();
        if redraw || drawn_version != Some(version) {
            terminal.draw(|f| f.render_widget(&*practice, f.area()))?;
            drawn_version = Some(version);
        }
    }

    Ok(())
}
