// src/output/mod.rs
pub mod backup;
pub mod sink;

pub use sink::{DedupSink, PendingRow, Rejection, SinkError};
