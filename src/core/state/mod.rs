//! Job checkpoints
//!
//! Progress of every job is persisted after each step so an interrupted
//! export can be resumed, and finished jobs can be inspected with
//! `quarry status`.

pub mod checkpoint;
pub mod manager;
pub mod storage;

pub use checkpoint::{JobCheckpoint, JobStatus};
pub use manager::StateManager;
pub use storage::{CheckpointStorage, FileCheckpointStorage};
