use crossbeam_channel::bounded;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::num::NonZeroUsize;
use std::thread;
use std::time::Instant;
use tracing::{debug, info};

use super::source::produce;
use super::worker::{consume, WorkerStats};
use crate::cancel::CancelToken;
use crate::config::{CountConfig, EncodingMode};
use crate::errors::{CountError, CountResult};
use crate::keywords::{KeywordOptions, KeywordSet};
use crate::metrics::RunMetrics;
use crate::report::TallyReport;
use crate::tally::{KeywordTally, TallySnapshot};

const BUFFER_CAPACITY: usize = 65536;

/// Upper bound on worker threads started for one run
pub const MAX_WORKERS: usize = 4096;

/// Lifecycle of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    KeywordsLoaded,
    InputOpened,
    Running,
    Draining,
    Reported,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

fn advance(state: &mut RunState, next: RunState) {
    debug!("Run state {} -> {}", state, next);
    *state = next;
}

fn fail(state: RunState, err: CountError) -> CountError {
    debug!("Run state {} -> {}: {}", state, RunState::Failed, err);
    err
}

/// Settings for the concurrent part of a run
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub workers: NonZeroUsize,
    pub channel_capacity: usize,
    pub encoding: EncodingMode,
}

impl PipelineOptions {
    pub fn new(workers: NonZeroUsize) -> Self {
        Self {
            workers,
            channel_capacity: 0,
            encoding: EncodingMode::default(),
        }
    }
}

/// Output of [`count_reader`]
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub snapshot: TallySnapshot,
    pub lines: u64,
    pub workers: Vec<WorkerStats>,
}

/// Runs one line source and `options.workers` workers over `reader`.
///
/// Blocks until every worker has joined. A raised cancel token turns a run that
/// would otherwise succeed into [`CountError::Canceled`]; a source failure takes
/// precedence over cancellation.
pub fn count_reader<R>(
    reader: R,
    keywords: &KeywordSet,
    options: PipelineOptions,
    cancel: &CancelToken,
    metrics: &RunMetrics,
) -> CountResult<PipelineOutput>
where
    R: BufRead + Send,
{
    let tally = KeywordTally::new(keywords.slot_count());
    let worker_count = options.workers.get();
    if worker_count > MAX_WORKERS {
        return Err(CountError::Spawn(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{worker_count} workers requested, at most {MAX_WORKERS} can be started"),
        )));
    }

    let (source_result, worker_results) = thread::scope(|scope| -> CountResult<_> {
        let (sender, receiver) = bounded::<String>(options.channel_capacity);

        let source = thread::Builder::new()
            .name("keycount-source".to_string())
            .spawn_scoped(scope, move || {
                produce(reader, sender, cancel, options.encoding, metrics)
            })
            .map_err(CountError::Spawn)?;

        let tally = &tally;
        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let receiver = receiver.clone();
            let spawned = thread::Builder::new()
                .name(format!("keycount-worker-{worker_id}"))
                .spawn_scoped(scope, move || {
                    consume(worker_id, receiver, tally, keywords, metrics)
                });
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Stop the source; already running workers drain what is left
                    cancel.cancel();
                    return Err(CountError::Spawn(e));
                }
            }
        }
        drop(receiver);
        debug!("Started {} workers, waiting for them to drain", worker_count);

        let worker_results: Vec<CountResult<WorkerStats>> = workers
            .into_iter()
            .enumerate()
            .map(|(id, handle)| handle.join().map_err(|_| CountError::WorkerPanicked(id)))
            .collect();
        let source_result = source.join().map_err(|_| CountError::SourcePanicked);

        Ok((source_result, worker_results))
    })?;

    let workers = worker_results.into_iter().collect::<CountResult<Vec<_>>>()?;
    let lines = source_result??;

    if cancel.is_canceled() {
        debug!("Run canceled after {} lines", lines);
        return Err(CountError::Canceled);
    }

    Ok(PipelineOutput {
        snapshot: tally.snapshot(),
        lines,
        workers,
    })
}

/// Owns the lifecycle of a run: loads the keyword list, opens the input, runs the
/// pipeline and builds the report.
#[derive(Debug)]
pub struct Coordinator {
    config: CountConfig,
    metrics: RunMetrics,
}

impl Coordinator {
    pub fn new(config: CountConfig) -> Self {
        Self {
            config,
            metrics: RunMetrics::new(),
        }
    }

    /// Runs to completion. Keyword file errors are always reported before input
    /// file errors, and both before any thread is started.
    pub fn run(&self, cancel: &CancelToken) -> CountResult<TallyReport> {
        let config = &self.config;
        let started = Instant::now();
        let mut state = RunState::Init;
        info!(
            "Starting keyword count of {} with keywords from {} on {} workers",
            config.input_path.display(),
            config.keywords_path.display(),
            config.workers
        );

        let keyword_options = KeywordOptions {
            trim: config.trim_keywords,
            skip_blank: config.skip_blank_keywords,
        };
        let keywords = KeywordSet::load(&config.keywords_path, keyword_options)
            .map_err(|e| fail(state, e))?;
        advance(&mut state, RunState::KeywordsLoaded);

        let input = File::open(&config.input_path)
            .map_err(|e| fail(state, CountError::input_file(&config.input_path, e)))?;
        let reader = BufReader::with_capacity(BUFFER_CAPACITY, input);
        advance(&mut state, RunState::InputOpened);

        let options = PipelineOptions {
            workers: config.workers,
            channel_capacity: config.channel_capacity,
            encoding: config.encoding,
        };
        advance(&mut state, RunState::Running);
        let output = count_reader(reader, &keywords, options, cancel, &self.metrics)
            .map_err(|e| fail(state, e))?;
        advance(&mut state, RunState::Draining);

        let mut report =
            TallyReport::from_snapshot(&keywords, &output.snapshot, &config.total_label);
        report.workers = output.workers;
        report.stats = self.metrics.get_stats();
        report.elapsed = started.elapsed();
        advance(&mut state, RunState::Reported);

        self.metrics.log_stats();
        info!(
            "Count complete. {} occurrences in {} lines in {:.2?}",
            report.total, output.lines, report.elapsed
        );
        advance(&mut state, RunState::Done);
        Ok(report)
    }
}
