pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod generator;
pub mod results;
pub mod search;

pub use config::{CliOverrides, EncodingMode, SearchConfig, StrategyChoice};
pub use diagnostics::{Diagnostic, Reporter, Severity, TracingReporter};
pub use errors::{SearchError, SearchResult};
pub use generator::{create_test_files, find_all_files, GeneratorConfig};
pub use results::{KeywordMatches, PartialResult, ScanStats, SearchOutcome};
pub use search::{
    search, KeywordScanner, ProcessPoolSearch, SearchRequest, SearchStrategy, StrategyRun,
    ThreadPoolSearch, WorkerCommand,
};
