use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::ValueEnum;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

/// Log file used when `--log-file` is not given.
pub const DEFAULT_LOG_FILE: &str = "/tmp/axbridge.log";

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> tracing::level_filters::LevelFilter {
        match self {
            LogLevel::Error => tracing::level_filters::LevelFilter::ERROR,
            LogLevel::Warn => tracing::level_filters::LevelFilter::WARN,
            LogLevel::Info => tracing::level_filters::LevelFilter::INFO,
            LogLevel::Debug => tracing::level_filters::LevelFilter::DEBUG,
            LogLevel::Trace => tracing::level_filters::LevelFilter::TRACE,
        }
    }
}

/// Install the global subscriber.
///
/// Logs go to stderr and, when `log_file` is set, are appended to that file
/// as well. Stdout is left alone: it carries protocol traffic. Returns the
/// file actually in use; an unopenable file is reported and skipped.
pub fn init_logging(
    format: LogFormat,
    level: LogLevel,
    log_file: Option<&Path>,
) -> Option<PathBuf> {
    let (writer, in_use, open_failure) = match log_file.map(|path| (path, open_append(path))) {
        Some((path, Ok(file))) => (
            BoxMakeWriter::new(io::stderr.and(Arc::new(file))),
            Some(path.to_path_buf()),
            None,
        ),
        Some((path, Err(err))) => (BoxMakeWriter::new(io::stderr), None, Some((path, err))),
        None => (BoxMakeWriter::new(io::stderr), None, None),
    };

    let builder = tracing_subscriber::fmt()
        .with_writer(writer)
        .with_max_level(level.as_filter())
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }

    if let Some((path, err)) = open_failure {
        tracing::warn!(path = %path.display(), error = %err, "log file unavailable, logging to stderr only");
    }
    in_use
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
