//! # Triage Engine
//!
//! Concurrent classification of customer-support dialogs into problem types.
//!
//! ## Pipeline
//!
//! ```text
//! Input root
//!     │
//!     ├──> ClassificationOrchestrator (one task per dialog folder, bounded)
//!     │      └─> DialogScanner: client messages × problem types
//!     │
//!     ├──> bounded channel (completion order)
//!     │
//!     └──> ResultAggregator (single consumer)
//!            └─> AggregateState: counts, dialogs by type, trigger frequency
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use triage_engine::{ClassificationOrchestrator, ResultAggregator, RunOptions, ScanOptions};
//! use triage_triggers::TriggerSet;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let triggers = Arc::new(TriggerSet::builtin()?);
//!     let orchestrator =
//!         ClassificationOrchestrator::new(triggers, ScanOptions::default(), RunOptions::default());
//!     let stream = orchestrator.run(Path::new("./output/conversations")).await?;
//!     let state = ResultAggregator::new().consume(stream).await?;
//!
//!     for ranked in state.ranked_types() {
//!         println!("{}: {}", ranked.key, ranked.count);
//!     }
//!     Ok(())
//! }
//! ```

mod aggregate;
mod dialog;
mod error;
mod limits;
mod orchestrator;
mod scanner;
mod transcript;

pub use aggregate::{AggregateState, ResultAggregator, TriggerCount, TypeCount, TOP_TRIGGERS};
pub use dialog::{extract_dialog_id, push_unique_trigger, MatchedMessage, ProblematicDialog};
pub use error::{Result, TriageError};
pub use limits::{
    clamp_queue_capacity, clamp_workers, default_worker_count, parse_worker_count,
    worker_count_from_env, MAX_QUEUE_CAPACITY, MAX_WORKERS, WORKERS_ENV,
};
pub use orchestrator::{
    discover_folders, ClassificationOrchestrator, DialogStream, DispatchReport, RunOptions,
    DEFAULT_QUEUE_CAPACITY,
};
pub use scanner::{DialogScanner, ScanOptions, DEFAULT_CLIENT_PREFIX, DEFAULT_TRANSCRIPT_MARKER};
pub use transcript::{Message, Transcript};
