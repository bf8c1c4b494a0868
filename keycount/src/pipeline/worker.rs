use crossbeam_channel::Receiver;
use tracing::{debug, trace};

use crate::keywords::KeywordSet;
use crate::metrics::RunMetrics;
use crate::tally::KeywordTally;

/// What a worker reports back when it joins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub worker_id: usize,
    pub lines: u64,
}

/// Worker loop: counts keywords in every received line and merges the partial
/// tally into the shared one.
///
/// Returns once the channel is closed and drained. Workers never look at the
/// cancel token; a canceled run ends for them when the source closes the channel.
pub fn consume(
    worker_id: usize,
    receiver: Receiver<String>,
    tally: &KeywordTally,
    keywords: &KeywordSet,
    metrics: &RunMetrics,
) -> WorkerStats {
    let mut lines = 0u64;

    for line in receiver.iter() {
        let partial = keywords.count_line(&line);
        trace!(worker_id, matches = partial.total(), "Counted line");
        tally.merge(&partial);

        metrics.record_line_processed(line.len());
        metrics.record_merge();
        lines += 1;
    }

    debug!("Worker {} finished after {} lines", worker_id, lines);
    WorkerStats { worker_id, lines }
}
