//! Parallel keyword search over a list of files.
//!
//! Both pools follow the same fan-out/fan-in shape:
//!
//! 1. **Partition**: [`partition`] splits the file list into one round-robin
//!    shard per worker, once, up front. Shards are never rebalanced.
//! 2. **Scan**: each worker runs [`KeywordScanner`] over its shard in order,
//!    accumulating a worker-local [`PartialResult`](crate::results::PartialResult).
//! 3. **Fold**: partial results are merged into one
//!    [`SearchOutcome`](crate::results::SearchOutcome).
//!
//! They differ in how step 3 happens:
//!
//! - [`ThreadPoolSearch`] runs workers on a rayon pool in this process; each
//!   worker folds into a mutex-guarded outcome when its shard is done.
//! - [`ProcessPoolSearch`] runs each worker as a child process; each child
//!   sends its partial result back as one message over a channel, and the
//!   coordinator folds messages as they arrive, then reaps the children.
//!
//! Per-file failures never abort a search; they become
//! [`Diagnostic`](crate::diagnostics::Diagnostic)s on the outcome.

pub mod engine;
pub mod partition;
pub mod process;
pub mod protocol;
pub mod request;
pub mod scanner;
pub mod threads;
pub mod worker;

pub use engine::{runs_agree, search, search_with_worker, StrategyRun};
pub use partition::partition;
pub use process::{ProcessPoolSearch, WorkerCommand, WORKER_FLAG};
pub use request::{scan_shard, SearchRequest, SearchStrategy};
pub use scanner::{FileScan, KeywordScanner};
pub use threads::ThreadPoolSearch;
pub use worker::run_worker_main;
