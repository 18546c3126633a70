//! Error kinds per spec.md §7. `ConfigInvalid` is the only variant that
//! aborts the process; every other variant is recovered locally by the
//! worker that produced it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("failed to parse top-level JSON payload")]
    ParseFailure,

    #[error("base64 decode failure: {0}")]
    DecodeFailure(String),

    #[error("enqueue failed: queue is closed")]
    EnqueueClosed,

    #[error("database connection failure: {0}")]
    DbConnectFailure(String),

    #[error("database write failure: {0}")]
    DbWriteFailure(String),

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
}
