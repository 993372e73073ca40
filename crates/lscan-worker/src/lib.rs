//! Video analysis worker: configuration, sink wiring, and failure
//! containment around the analysis core.

pub mod config;
pub mod error;
pub mod sink;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use sink::FirestoreResultSink;
