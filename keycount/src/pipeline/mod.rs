//! The concurrent counting pipeline.
//!
//! One line source feeds a fixed pool of workers through a single handoff channel:
//!
//! ```text
//! file -> source -> channel -> worker 0..N -> PartialTally -> KeywordTally::merge
//! ```
//!
//! The channel is created with `crossbeam_channel::bounded(capacity)`. With the
//! default capacity of 0 every send waits for a worker to receive, so at most one
//! line is in flight between the source and the pool. All threads are scoped to
//! [`count_reader`], which returns only after every worker has joined.
//!
//! Merges commute, so neither the assignment of lines to workers nor the order of
//! merges affects the final counts.
pub mod coordinator;
pub mod source;
pub mod worker;

pub use coordinator::{count_reader, Coordinator, PipelineOptions, PipelineOutput, RunState};
pub use source::produce;
pub use worker::{consume, WorkerStats};
