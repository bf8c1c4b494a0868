pub mod cancel;
pub mod config;
pub mod errors;
pub mod keywords;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod tally;

pub use crate::cancel::CancelToken;
pub use crate::config::{parse_worker_count, CountConfig, EncodingMode};
pub use crate::errors::{CountError, CountResult};
pub use crate::keywords::{KeywordOptions, KeywordSet};
pub use crate::pipeline::Coordinator;
pub use crate::report::{OutputFormat, TallyReport};

/// Counts the keywords of `config.keywords_path` in `config.input_path`
pub fn run(config: &CountConfig) -> CountResult<TallyReport> {
    Coordinator::new(config.clone()).run(&CancelToken::new())
}
