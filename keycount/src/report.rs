use serde::Serialize;
use std::fmt::Write as _;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{CountError, CountResult};
use crate::keywords::KeywordSet;
use crate::metrics::RunStats;
use crate::pipeline::WorkerStats;
use crate::tally::TallySnapshot;

/// Output format of the final report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `<keyword>: <count>` lines followed by the total line
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = CountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(CountError::config_error(format!(
                "unknown output format {other:?} (expected text or json)"
            ))),
        }
    }
}

/// Count for one entry of the keyword list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: u64,
}

/// Result of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct TallyReport {
    /// One entry per keyword list line, in list order
    pub keywords: Vec<KeywordCount>,
    pub total: u64,
    #[serde(skip)]
    pub total_label: String,
    #[serde(skip)]
    pub workers: Vec<WorkerStats>,
    #[serde(skip)]
    pub stats: RunStats,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl TallyReport {
    /// Lays out the snapshot counts in keyword list order
    pub fn from_snapshot(
        keywords: &KeywordSet,
        snapshot: &TallySnapshot,
        total_label: impl Into<String>,
    ) -> Self {
        let keywords = keywords
            .entries()
            .map(|(keyword, slot)| KeywordCount {
                keyword: keyword.to_string(),
                count: snapshot.counts.get(slot).copied().unwrap_or(0),
            })
            .collect();

        Self {
            keywords,
            total: snapshot.total,
            total_label: total_label.into(),
            workers: Vec::new(),
            stats: RunStats::default(),
            elapsed: Duration::ZERO,
        }
    }

    /// Count of the first list entry equal to `keyword`
    pub fn count_of(&self, keyword: &str) -> Option<u64> {
        self.keywords
            .iter()
            .find(|k| k.keyword == keyword)
            .map(|k| k.count)
    }

    pub fn render(&self, format: OutputFormat) -> CountResult<String> {
        match format {
            OutputFormat::Text => Ok(self.to_text()),
            OutputFormat::Json => {
                let mut json = serde_json::to_string_pretty(self)?;
                json.push('\n');
                Ok(json)
            }
        }
    }

    fn to_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.keywords {
            let _ = writeln!(out, "{}: {}", entry.keyword, entry.count);
        }
        let _ = writeln!(out, "{}: {}", self.total_label, self.total);
        out
    }

    /// Human-readable run statistics, one line per worker
    pub fn stats_summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Processed {} lines ({} bytes) with {} workers in {:.2?}",
            self.stats.lines_processed,
            self.stats.bytes_scanned,
            self.workers.len(),
            self.elapsed
        );
        for worker in &self.workers {
            let _ = writeln!(out, "  worker {}: {} lines", worker.worker_id, worker.lines);
        }
        out
    }
}
