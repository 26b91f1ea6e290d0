use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How invalid UTF-8 inside a scanned file is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// The file counts as unreadable: one diagnostic, zero matches
    #[default]
    FailFast,
    /// Invalid sequences are replaced and scanning continues
    Lossy,
}

/// Which worker pool(s) a search runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyChoice {
    Threads,
    Processes,
    /// Run both pools on the same input and compare them
    #[default]
    Both,
}

impl StrategyChoice {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "threads" | "thread" | "threading" => Some(Self::Threads),
            "processes" | "process" | "multiprocessing" => Some(Self::Processes),
            "both" | "all" => Some(Self::Both),
            _ => None,
        }
    }
}

/// Configuration for a search run.
///
/// # Configuration Locations
///
/// Files are layered in order of increasing precedence:
/// 1. Global `$CONFIG_DIR/kwscout/config.yaml`
/// 2. Local `.kwscout.yaml` in the current directory
/// 3. Custom config file given via `--config`
///
/// Command-line values are applied last through [`SearchConfig::merge_with_cli`].
///
/// # Configuration Format
///
/// ```yaml
/// keywords: ["python", "data", "algorithm"]
/// root_path: "test_search_files"
/// worker_count: 8
/// strategy: both            # threads | processes | both
/// message_timeout_secs: 300
/// encoding_mode: failfast   # failfast | lossy
/// log_level: "warn"
/// log_file: "kwscout.log"
/// generate_files: 1000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Keywords to search for (case-insensitive)
    pub keywords: Vec<String>,

    /// Root of the tree whose files are searched
    pub root_path: PathBuf,

    /// Number of workers per pool.
    /// Defaults to the number of CPU cores.
    pub worker_count: NonZeroUsize,

    /// Pool(s) to run
    pub strategy: StrategyChoice,

    /// How long the process pool waits for each worker message
    pub message_timeout_secs: u64,

    pub encoding_mode: EncodingMode,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Optional file that receives debug-level logs
    pub log_file: Option<PathBuf>,

    /// Files to generate when the root holds none
    pub generate_files: usize,
}

pub fn default_worker_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_keywords() -> Vec<String> {
    ["python", "data", "algorithm"]
        .iter()
        .map(|k| k.to_string())
        .collect()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            root_path: PathBuf::from("test_search_files"),
            worker_count: default_worker_count(),
            strategy: StrategyChoice::default(),
            message_timeout_secs: 300,
            encoding_mode: EncodingMode::default(),
            log_level: "warn".to_string(),
            log_file: None,
            generate_files: 1000,
        }
    }
}

/// Values given on the command line; `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub keywords: Vec<String>,
    pub root_path: Option<PathBuf>,
    pub worker_count: Option<NonZeroUsize>,
    pub strategy: Option<StrategyChoice>,
    pub message_timeout_secs: Option<u64>,
    pub encoding_mode: Option<EncodingMode>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    pub generate_files: Option<usize>,
}

impl SearchConfig {
    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration, layering a specific file over the defaults
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("kwscout/config.yaml")),
            Some(PathBuf::from(".kwscout.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit file must exist.
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if !cli.keywords.is_empty() {
            self.keywords = cli.keywords;
        }
        if let Some(root) = cli.root_path {
            self.root_path = root;
        }
        if let Some(workers) = cli.worker_count {
            self.worker_count = workers;
        }
        if let Some(strategy) = cli.strategy {
            self.strategy = strategy;
        }
        if let Some(timeout) = cli.message_timeout_secs {
            self.message_timeout_secs = timeout;
        }
        if let Some(mode) = cli.encoding_mode {
            self.encoding_mode = mode;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        if cli.log_file.is_some() {
            self.log_file = cli.log_file;
        }
        if let Some(count) = cli.generate_files {
            self.generate_files = count;
        }
        self
    }

    pub fn message_timeout(&self) -> Duration {
        Duration::from_secs(self.message_timeout_secs)
    }
}
