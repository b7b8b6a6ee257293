//! Log tailing for servertail
//!
//! This crate provides line classification, noise filtering, incremental
//! reads with rotation detection, bounded retention, and the poll and push
//! schedulers that tie them together.

mod buffer;
mod capture;
mod classifier;
mod cursor;
mod error;
mod filter;
mod push;
mod reader;
mod scheduler;
mod service;
mod stream;

pub use buffer::{
    DEFAULT_INITIAL_LINES, DEFAULT_INTERNAL_RETENTION, DEFAULT_RETENTION, RetentionBuffer,
    SeverityCounts,
};
pub use capture::{CaptureLayer, capture_layer};
pub use classifier::{LineClassifier, classify};
pub use cursor::{LogSource, TailCursor};
pub use error::{Result, TailError};
pub use filter::{DEFAULT_NOISE_PATTERNS, FilterView, NoiseFilter};
pub use push::{INTERNAL_SOURCE_ID, PushScheduler};
pub use reader::{DEFAULT_INITIAL_MAX_BYTES, IncrementalReader, InitialLoad, ReadOutcome};
pub use scheduler::{DEFAULT_POLL_INTERVAL, TailOptions, TailScheduler};
pub use service::{LogService, SourceRegistry};
pub use stream::{StreamControl, StreamStatus};

// Re-export types used in our public API
pub use servertail_types::{
    ClassifiedRecord, DeltaResponse, PushRecord, SchedulerState, Severity, SnapshotResponse,
    SourceInfo, StreamState,
};
