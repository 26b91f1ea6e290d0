use std::path::PathBuf;
use tracing::{info, warn};

use super::process::{ProcessPoolSearch, WorkerCommand};
use super::request::{SearchRequest, SearchStrategy};
use super::threads::ThreadPoolSearch;
use crate::config::{SearchConfig, StrategyChoice};
use crate::diagnostics::Reporter;
use crate::errors::SearchResult;
use crate::results::SearchOutcome;

/// The outcome of one pool on one request
#[derive(Debug, Clone)]
pub struct StrategyRun {
    pub strategy: &'static str,
    pub outcome: SearchOutcome,
}

/// Runs the configured pool(s) over `files`, spawning worker processes from
/// the current executable when needed.
pub fn search(
    config: &SearchConfig,
    files: Vec<PathBuf>,
    reporter: &dyn Reporter,
) -> SearchResult<Vec<StrategyRun>> {
    search_with_worker(config, files, None, reporter)
}

/// Like [`search`], with an explicit worker command for the process pool.
pub fn search_with_worker(
    config: &SearchConfig,
    files: Vec<PathBuf>,
    worker: Option<WorkerCommand>,
    reporter: &dyn Reporter,
) -> SearchResult<Vec<StrategyRun>> {
    let request = SearchRequest::from_config(config, files);
    let strategies = strategies(config, worker)?;

    let mut runs = Vec::with_capacity(strategies.len());
    for strategy in &strategies {
        let outcome = strategy.search(&request, reporter)?;
        if !outcome.is_complete() {
            warn!(
                "{} search incomplete: {} of {} workers reported",
                strategy.name(),
                outcome.workers_reported,
                outcome.workers_launched
            );
        }
        runs.push(StrategyRun {
            strategy: strategy.name(),
            outcome,
        });
    }

    if runs.len() > 1 {
        info!("Strategies agree on results: {}", runs_agree(&runs));
    }
    Ok(runs)
}

fn strategies(
    config: &SearchConfig,
    worker: Option<WorkerCommand>,
) -> SearchResult<Vec<Box<dyn SearchStrategy>>> {
    let processes = |worker: Option<WorkerCommand>| -> SearchResult<Box<dyn SearchStrategy>> {
        let command = match worker {
            Some(command) => command,
            None => WorkerCommand::current_exe()?,
        };
        Ok(Box::new(
            ProcessPoolSearch::new(command).with_message_timeout(config.message_timeout()),
        ))
    };

    let threads = || -> Box<dyn SearchStrategy> { Box::new(ThreadPoolSearch::new()) };
    let selected: Vec<Box<dyn SearchStrategy>> = match config.strategy {
        StrategyChoice::Threads => vec![threads()],
        StrategyChoice::Processes => vec![processes(worker)?],
        StrategyChoice::Both => vec![threads(), processes(worker)?],
    };
    Ok(selected)
}

/// Whether every run found the same multiset of locations per keyword
pub fn runs_agree(runs: &[StrategyRun]) -> bool {
    runs.windows(2)
        .all(|pair| pair[0].outcome.matches.equivalent_to(&pair[1].outcome.matches))
}
