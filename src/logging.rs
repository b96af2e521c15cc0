//! Console and file logging.
//!
//! Console verbosity follows `RUST_LOG` (default `info`). Buzzer connection
//! events and score changes are additionally appended to their own files, see
//! [`BUZZER_LOG`] and [`SCORE_LOG`].

use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::Level;
use tracing_subscriber::{
    filter::Targets, fmt, fmt::writer::BoxMakeWriter, prelude::*, EnvFilter,
};

/// Target for buzzer connect, disconnect, mute and slow-message events
pub const BUZZER_LOG: &str = "buzzers";

/// Target for scoreboard changes
pub const SCORE_LOG: &str = "scores";

const DEFAULT_BUZZER_LOG_PATH: &str = "buzzers.log";
const DEFAULT_SCORE_LOG_PATH: &str = "scores.log";

#[derive(Debug, Clone)]
pub struct LogFiles {
    pub buzzers: PathBuf,
    pub scores: PathBuf,
}

impl LogFiles {
    /// Reads the log file locations from `BUZZER_TRACE_LOG` and `BUZZER_SCORE_LOG`
    pub fn from_env() -> Self {
        let path = |var: &str, default: &str| {
            std::env::var_os(var)
                .map(PathBuf::from)
                .unwrap_or_else(|| default.into())
        };

        Self {
            buzzers: path("BUZZER_TRACE_LOG", DEFAULT_BUZZER_LOG_PATH),
            scores: path("BUZZER_SCORE_LOG", DEFAULT_SCORE_LOG_PATH),
        }
    }
}

/// Installs the global subscriber
pub fn init(files: &LogFiles) {
    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (buzzer_writer, buzzer_err) = append_or_stdout(&files.buzzers);
    let (score_writer, score_err) = append_or_stdout(&files.scores);

    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(console_filter))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(buzzer_writer)
                .with_filter(Targets::new().with_target(BUZZER_LOG, Level::INFO)),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(score_writer)
                .with_filter(Targets::new().with_target(SCORE_LOG, Level::INFO)),
        )
        .init();

    // only report now that there is somewhere to report to
    for (path, err) in [(&files.buzzers, buzzer_err), (&files.scores, score_err)] {
        if let Some(err) = err {
            tracing::warn!("failed to open {}, logging to stdout instead: {}", path.display(), err);
        }
    }
}

fn append_or_stdout(path: &Path) -> (BoxMakeWriter, Option<std::io::Error>) {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => (BoxMakeWriter::new(Mutex::new(file)), None),
        Err(err) => (BoxMakeWriter::new(std::io::stdout), Some(err)),
    }
}
