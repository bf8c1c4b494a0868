/// Error types for keycount runs.
///
/// Every variant is terminal for the run that produced it: nothing is retried and no
/// partial report is produced. File errors are raised before any thread is started,
/// and the keyword file is always checked before the input file:
/// ```rust,ignore
/// match keycount::run(&config) {
///     Ok(report) => // Print the report,
///     Err(CountError::KeywordFile { path, .. }) => // Keyword list unreadable,
///     Err(CountError::InputFile { path, .. }) => // Input text unreadable,
///     Err(e) => // Configuration, read or cancellation failure
/// }
/// ```
use std::path::PathBuf;
use thiserror::Error;

/// Result type for counting operations
pub type CountResult<T> = Result<T, CountError>;

/// Errors that can occur while counting keywords
#[derive(Error, Debug)]
pub enum CountError {
    #[error("error opening the file with keywords {path}: {source}")]
    KeywordFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("error opening the file with text {path}: {source}")]
    InputFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] ::config::ConfigError),
    #[error("Read error after line {line}: {source}")]
    Read {
        line: u64,
        source: std::io::Error,
    },
    #[error("Invalid UTF-8 in input line {line}")]
    Encoding { line: u64 },
    #[error("Run canceled before the input was exhausted")]
    Canceled,
    #[error("Worker {0} panicked")]
    WorkerPanicked(usize),
    #[error("Line reader panicked")]
    SourcePanicked,
    #[error("Failed to start thread: {0}")]
    Spawn(std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CountError {
    pub fn keyword_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::KeywordFile {
            path: path.into(),
            source,
        }
    }

    pub fn input_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::InputFile {
            path: path.into(),
            source,
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn read_error(line: u64, source: std::io::Error) -> Self {
        Self::Read { line, source }
    }

    /// Whether the error was caused by user-supplied configuration rather than I/O
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::ConfigFile(_))
    }
}
