use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::{CountError, CountResult};

/// Label printed in front of the grand total when none is configured
pub const DEFAULT_TOTAL_LABEL: &str = "всего";

/// How invalid UTF-8 in an input line is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// Stop the run with an encoding error
    FailFast,
    /// Replace invalid sequences with U+FFFD and keep counting
    #[default]
    Lossy,
}

impl FromStr for EncodingMode {
    type Err = CountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "failfast" => Ok(Self::FailFast),
            "lossy" => Ok(Self::Lossy),
            other => Err(CountError::config_error(format!(
                "unknown encoding mode {other:?} (expected failfast or lossy)"
            ))),
        }
    }
}

/// Configuration for a counting run.
///
/// # Configuration Locations
///
/// Values are layered from these sources, later ones winning:
/// 1. Global `$HOME/.config/keycount/config.yaml`
/// 2. Local `.keycount.yaml` in the current directory
/// 3. A file passed with `--config`
///
/// Command-line values are applied last through [`CountConfig::merge_with_cli`].
///
/// # Configuration Format
///
/// ```yaml
/// # Number of worker threads (default: CPU cores)
/// workers: 4
///
/// # Handoff channel capacity, 0 means every line is handed over directly
/// channel_capacity: 0
///
/// # Invalid UTF-8 handling (lossy, failfast)
/// encoding: lossy
///
/// # Keyword list normalization
/// trim_keywords: false
/// skip_blank_keywords: false
///
/// # Label of the final line of the report
/// total_label: "всего"
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "warn"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountConfig {
    /// Text file whose lines are scanned
    #[serde(default)]
    pub input_path: PathBuf,

    /// File holding one keyword per line
    #[serde(default)]
    pub keywords_path: PathBuf,

    /// Number of worker threads consuming lines
    #[serde(default = "default_workers")]
    pub workers: NonZeroUsize,

    /// Capacity of the handoff channel between the reader and the workers
    #[serde(default)]
    pub channel_capacity: usize,

    #[serde(default)]
    pub encoding: EncodingMode,

    /// Trim surrounding whitespace from each keyword
    #[serde(default)]
    pub trim_keywords: bool,

    /// Drop blank lines from the keyword list instead of counting empty keywords
    #[serde(default)]
    pub skip_blank_keywords: bool,

    #[serde(default = "default_total_label")]
    pub total_label: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_workers() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_total_label() -> String {
    DEFAULT_TOTAL_LABEL.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for CountConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::new(),
            keywords_path: PathBuf::new(),
            workers: default_workers(),
            channel_capacity: 0,
            encoding: EncodingMode::default(),
            trim_keywords: false,
            skip_blank_keywords: false,
            total_label: default_total_label(),
            log_level: default_log_level(),
        }
    }
}

/// Values given on the command line; `None` keeps the configured value
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub input_path: PathBuf,
    pub keywords_path: PathBuf,
    pub workers: Option<NonZeroUsize>,
    pub channel_capacity: Option<usize>,
    pub encoding: Option<EncodingMode>,
    pub trim_keywords: bool,
    pub skip_blank_keywords: bool,
    pub total_label: Option<String>,
    pub log_level: Option<String>,
}

impl CountConfig {
    /// Creates a configuration for the given files with default settings
    pub fn new(
        input_path: impl Into<PathBuf>,
        keywords_path: impl Into<PathBuf>,
        workers: NonZeroUsize,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            keywords_path: keywords_path.into(),
            workers,
            ..Self::default()
        }
    }

    /// Loads configuration from the default locations
    pub fn load() -> CountResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration, adding `config_path` as the highest-precedence file
    pub fn load_from(config_path: Option<&Path>) -> CountResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let default_files = [
            dirs::config_dir().map(|p| p.join("keycount/config.yaml")),
            Some(PathBuf::from(".keycount.yaml")),
        ];
        for path in default_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Applies command-line values on top of the loaded configuration
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        self.input_path = cli.input_path;
        self.keywords_path = cli.keywords_path;
        if let Some(workers) = cli.workers {
            self.workers = workers;
        }
        if let Some(capacity) = cli.channel_capacity {
            self.channel_capacity = capacity;
        }
        if let Some(encoding) = cli.encoding {
            self.encoding = encoding;
        }
        if cli.trim_keywords {
            self.trim_keywords = true;
        }
        if cli.skip_blank_keywords {
            self.skip_blank_keywords = true;
        }
        if let Some(label) = cli.total_label {
            self.total_label = label;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        self
    }
}

/// Parses the worker count argument, rejecting anything but a positive integer.
pub fn parse_worker_count(raw: &str) -> CountResult<NonZeroUsize> {
    let value: i64 = raw.trim().parse().map_err(|_| {
        CountError::config_error(format!("worker count must be an integer, got {raw:?}"))
    })?;

    usize::try_from(value)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| {
            CountError::config_error(format!(
                "worker count must be a positive integer, got {value}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        fs::write(
            &config_path,
            r#"
            workers: 6
            channel_capacity: 16
            encoding: failfast
            trim_keywords: true
            skip_blank_keywords: true
            total_label: "total"
            log_level: "debug"
        "#,
        )
        .unwrap();

        let config = CountConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.workers, NonZeroUsize::new(6).unwrap());
        assert_eq!(config.channel_capacity, 16);
        assert_eq!(config.encoding, EncodingMode::FailFast);
        assert!(config.trim_keywords);
        assert!(config.skip_blank_keywords);
        assert_eq!(config.total_label, "total");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_default_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        fs::write(&config_path, "log_level: \"info\"\n").unwrap();

        let config = CountConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.channel_capacity, 0);
        assert_eq!(config.encoding, EncodingMode::Lossy);
        assert!(!config.trim_keywords);
        assert!(!config.skip_blank_keywords);
        assert_eq!(config.total_label, DEFAULT_TOTAL_LABEL);
        assert_eq!(config.workers, NonZeroUsize::new(num_cpus::get()).unwrap());
    }

    #[test]
    fn test_merge_with_cli() {
        let file_config = CountConfig {
            channel_capacity: 8,
            total_label: "sum".to_string(),
            ..CountConfig::default()
        };

        let merged = file_config.merge_with_cli(CliOverrides {
            input_path: PathBuf::from("text.txt"),
            keywords_path: PathBuf::from("words.txt"),
            workers: NonZeroUsize::new(3),
            encoding: Some(EncodingMode::FailFast),
            skip_blank_keywords: true,
            ..CliOverrides::default()
        });

        assert_eq!(merged.input_path, PathBuf::from("text.txt"));
        assert_eq!(merged.keywords_path, PathBuf::from("words.txt"));
        assert_eq!(merged.workers, NonZeroUsize::new(3).unwrap());
        assert_eq!(merged.channel_capacity, 8); // File value (CLI None)
        assert_eq!(merged.total_label, "sum"); // File value (CLI None)
        assert_eq!(merged.encoding, EncodingMode::FailFast);
        assert!(merged.skip_blank_keywords);
        assert!(!merged.trim_keywords);
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        fs::write(&config_path, "workers: \"many\"\nencoding: utf16\n").unwrap();

        let result = CountConfig::load_from(Some(&config_path));
        assert!(matches!(result, Err(CountError::ConfigFile(_))));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = CountConfig::load_from(Some(Path::new("nonexistent.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_worker_count() {
        assert_eq!(parse_worker_count("3").unwrap().get(), 3);
        assert_eq!(parse_worker_count(" 8 ").unwrap().get(), 8);

        for raw in ["0", "-2", "abc", "", "2.5"] {
            let err = parse_worker_count(raw).unwrap_err();
            assert!(err.is_config(), "{raw:?} should be a configuration error");
        }
    }

    #[test]
    fn test_encoding_mode_from_str() {
        assert_eq!("lossy".parse::<EncodingMode>().unwrap(), EncodingMode::Lossy);
        assert_eq!("FailFast".parse::<EncodingMode>().unwrap(), EncodingMode::FailFast);
        assert!("latin1".parse::<EncodingMode>().is_err());
    }
}
