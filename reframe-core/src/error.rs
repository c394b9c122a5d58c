// ============================================================================
// reframe-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Error types for the reframe-core library
//
// Every fallible operation in the core returns `CoreResult<T>`. Conditions that
// only affect a single track or sample description (an unsupported codec, a
// summary the writer rejects, an unreachable data reference) are not errors:
// they are logged with `warn!` and the affected track or summary is excluded.

use thiserror::Error;

/// Custom error type for reframe-core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Bad track option, bad CLI value or inconsistent settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An input could not be opened, parsed or enumerated.
    #[error("Failed to read source: {0}")]
    SourceRead(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Malformed or non-monotonic timecode description.
    #[error("Timecode format error: {0}")]
    TimecodeFormat(String),

    /// A timescale, timebase or rate numerator left the 32-bit range.
    #[error("Timescale reconciliation overflow: {0}")]
    ReconciliationOverflow(String),

    /// A sample fetch failed in the middle of a run.
    #[error("Scheduling failure: {0}")]
    Scheduling(String),

    /// The container engine rejected a parameter set, sample, fragment or segment.
    #[error("Container write error: {0}")]
    ContainerWrite(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for reframe-core operations
pub type CoreResult<T> = Result<T, CoreError>;
