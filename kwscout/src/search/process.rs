use crossbeam_channel::{RecvTimeoutError, Sender};
use std::collections::HashSet;
use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::partition::partition;
use super::protocol::{WorkRequest, WorkResponse};
use super::request::{SearchRequest, SearchStrategy};
use crate::diagnostics::{Diagnostic, Reporter};
use crate::errors::{SearchError, SearchResult};
use crate::results::{PartialResult, SearchOutcome};

/// Flag that switches the kwscout executable into worker mode
pub const WORKER_FLAG: &str = "--internal-worker";

const DEFAULT_MESSAGE_TIMEOUT: Duration = Duration::from_secs(300);

/// How to start one worker process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl WorkerCommand {
    /// Runs `program` with no arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Runs `program` in worker mode
    pub fn internal_worker(program: impl Into<PathBuf>) -> Self {
        Self::new(program).arg(WORKER_FLAG)
    }

    /// Re-runs the current executable in worker mode
    pub fn current_exe() -> SearchResult<Self> {
        let exe = std::env::current_exe().map_err(|e| {
            SearchError::worker_launch(format!("cannot locate current executable: {}", e))
        })?;
        Ok(Self::internal_worker(exe))
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn spawn(&self) -> io::Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
    }
}

/// Isolated-memory worker pool.
///
/// Every non-empty shard is handed to its own child process. Children share
/// nothing with the coordinator or each other: each receives its shard as one
/// request and returns its whole partial result as one message. Per child, a
/// collector thread pumps that message into a multi-producer channel, which
/// the coordinator drains as the sole writer of the final result.
#[derive(Debug, Clone)]
pub struct ProcessPoolSearch {
    command: WorkerCommand,
    message_timeout: Duration,
}

/// What a collector thread hands to the coordinator
struct WorkerMessage {
    worker: usize,
    result: Result<PartialResult, String>,
}

struct LaunchedWorker {
    worker: usize,
    child: Child,
    collector: JoinHandle<()>,
}

impl ProcessPoolSearch {
    pub fn new(command: WorkerCommand) -> Self {
        Self {
            command,
            message_timeout: DEFAULT_MESSAGE_TIMEOUT,
        }
    }

    /// Pool whose workers are the current executable in worker mode
    pub fn current_exe() -> SearchResult<Self> {
        Ok(Self::new(WorkerCommand::current_exe()?))
    }

    /// Bounds the wait for each worker message
    pub fn with_message_timeout(mut self, timeout: Duration) -> Self {
        self.message_timeout = timeout;
        self
    }

    pub fn message_timeout(&self) -> Duration {
        self.message_timeout
    }

    fn launch(
        &self,
        request: &WorkRequest,
        sender: Sender<WorkerMessage>,
    ) -> SearchResult<LaunchedWorker> {
        let line = request.to_line()?;
        let mut child = self.command.spawn().map_err(|e| {
            SearchError::worker_launch(format!("{}: {}", self.command.program().display(), e))
        })?;

        let pipes = child.stdin.take().zip(child.stdout.take());
        let Some((stdin, stdout)) = pipes else {
            reap(&mut child);
            return Err(SearchError::worker_launch("worker pipes were not captured"));
        };

        let worker = request.worker;
        let collector = thread::Builder::new()
            .name(format!("kwscout-collector-{}", worker))
            .spawn(move || {
                let result = exchange(stdin, stdout, &line);
                if sender.send(WorkerMessage { worker, result }).is_err() {
                    debug!("Coordinator stopped listening before worker {} answered", worker);
                }
            });

        match collector {
            Ok(collector) => Ok(LaunchedWorker {
                worker,
                child,
                collector,
            }),
            Err(e) => {
                reap(&mut child);
                Err(SearchError::worker_launch(format!(
                    "cannot start collector thread: {}",
                    e
                )))
            }
        }
    }
}

impl SearchStrategy for ProcessPoolSearch {
    fn name(&self) -> &'static str {
        "processes"
    }

    fn search(
        &self,
        request: &SearchRequest,
        reporter: &dyn Reporter,
    ) -> SearchResult<SearchOutcome> {
        let started = Instant::now();
        request.validate()?;
        info!(
            "Starting process search over {} files for {:?}",
            request.files.len(),
            request.keywords
        );

        if request.is_trivial() {
            debug!("Nothing to search, returning empty result");
            return Ok(SearchOutcome::new());
        }

        let shards = partition(&request.files, request.workers.get());
        let (sender, receiver) = crossbeam_channel::unbounded();
        let mut outcome = SearchOutcome::new();
        let mut launched = Vec::new();
        let mut attempted = 0;

        for (worker, shard) in shards.iter().enumerate() {
            if shard.is_empty() {
                continue;
            }
            attempted += 1;
            let work = WorkRequest {
                worker,
                files: shard.iter().map(|path| path.to_path_buf()).collect(),
                keywords: request.keywords.clone(),
                encoding_mode: request.encoding_mode,
            };
            match self.launch(&work, sender.clone()) {
                Ok(handle) => launched.push(handle),
                Err(e) => {
                    let diagnostic = Diagnostic::error(format!(
                        "{}; {} files in this shard were not searched",
                        e,
                        shard.len()
                    ))
                    .for_worker(worker);
                    reporter.report(&diagnostic);
                    outcome.note(diagnostic);
                }
            }
        }
        drop(sender);

        if launched.is_empty() {
            return Err(SearchError::worker_launch(format!(
                "none of {} worker processes could be started",
                attempted
            )));
        }
        outcome.workers_launched = launched.len();
        debug!("Launched {} of {} worker processes", launched.len(), attempted);

        // Drain one message per launched worker, in completion order.
        let mut answered = HashSet::new();
        for _ in 0..launched.len() {
            match receiver.recv_timeout(self.message_timeout) {
                Ok(WorkerMessage {
                    worker,
                    result: Ok(partial),
                }) => {
                    answered.insert(worker);
                    for diagnostic in &partial.diagnostics {
                        reporter.report(diagnostic);
                    }
                    debug!(
                        "Folding result of worker {} ({} keywords)",
                        worker,
                        partial.matches.len()
                    );
                    outcome.fold(partial);
                }
                Ok(WorkerMessage {
                    worker,
                    result: Err(message),
                }) => {
                    answered.insert(worker);
                    let diagnostic =
                        Diagnostic::error(format!("worker failed: {}", message)).for_worker(worker);
                    reporter.report(&diagnostic);
                    outcome.note(diagnostic);
                }
                Err(RecvTimeoutError::Timeout) => {
                    let diagnostic = Diagnostic::warning(format!(
                        "timed out after {:?} waiting for {} of {} workers; returning partial results",
                        self.message_timeout,
                        launched.len() - answered.len(),
                        launched.len()
                    ));
                    reporter.report(&diagnostic);
                    outcome.note(diagnostic);
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("All collectors finished before every worker answered");
                    break;
                }
            }
        }

        // Reap every child only after draining.
        for mut handle in launched {
            if !answered.contains(&handle.worker) {
                if let Err(e) = handle.child.kill() {
                    debug!("Failed to kill worker {}: {}", handle.worker, e);
                }
            }
            match handle.child.wait() {
                Ok(status) if !status.success() && answered.contains(&handle.worker) => {
                    warn!("Worker {} exited with {}", handle.worker, status);
                }
                Ok(_) => {}
                Err(e) => {
                    let diagnostic =
                        Diagnostic::warning(format!("failed to wait for worker: {}", e))
                            .for_worker(handle.worker);
                    reporter.report(&diagnostic);
                    outcome.note(diagnostic);
                }
            }
            if handle.collector.join().is_err() {
                warn!("Collector thread for worker {} panicked", handle.worker);
            }
        }

        outcome.elapsed = started.elapsed();
        info!(
            "Process search complete. Found {} matches for {} keywords in {:?} ({}/{} workers reported)",
            outcome.matches.total_matches(),
            outcome.matches.len(),
            outcome.elapsed,
            outcome.workers_reported,
            outcome.workers_launched
        );
        Ok(outcome)
    }
}

/// Sends the request line, closes stdin, then reads the single response.
fn exchange(
    mut stdin: ChildStdin,
    stdout: ChildStdout,
    request_line: &str,
) -> Result<PartialResult, String> {
    stdin
        .write_all(request_line.as_bytes())
        .and_then(|_| stdin.flush())
        .map_err(|e| format!("cannot send work request: {}", e))?;
    drop(stdin);

    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .map_err(|e| format!("cannot read worker response: {}", e))?;
    if read == 0 {
        return Err("worker exited without sending a result".to_string());
    }

    match WorkResponse::from_line(&line) {
        Ok(WorkResponse::Result { partial }) => Ok(partial),
        Ok(WorkResponse::Error { message }) => Err(message),
        Err(e) => Err(e.to_string()),
    }
}

fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!("Failed to kill worker process: {}", e);
    }
    if let Err(e) = child.wait() {
        debug!("Failed to wait for worker process: {}", e);
    }
}
