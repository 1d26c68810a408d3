//! Error taxonomy for ring validation and task/session lifecycle.
//!
//! `RingError` covers everything that can go wrong opening or creating a
//! ring file; `StreamError` wraps it and adds the failures that only show
//! up once an external process is involved. `process_exited_clean` is
//! deliberately not a variant here — per the boundary contract it is a
//! non-fatal notice, so it travels on the warnings channel instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RingError {
    #[error("ring file not found: {0}")]
    Absent(std::path::PathBuf),

    #[error("ring file too small: need at least {needed} bytes, found {found}")]
    TooSmall { needed: usize, found: usize },

    #[error("ring header malformed: {reason}")]
    Malformed { reason: &'static str },

    #[error("ring channel count mismatch: requested {requested}, observed {observed}")]
    ChannelMismatch { requested: u16, observed: u16 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RingError {
    /// True for the two conditions the supervisor's open-poll loop retries
    /// on; everything else aborts the poll immediately.
    pub fn is_retryable_during_open(&self) -> bool {
        matches!(self, RingError::TooSmall { .. } | RingError::Malformed { .. })
    }
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    Ring(#[from] RingError),

    #[error("timed out waiting for ring to become ready")]
    OpenTimeout,

    #[error("external process exited before the ring was usable:\n{log_tail}")]
    ProcessFailedToStart { log_tail: String },

    #[error("external process exited during streaming with status {code:?}")]
    ProcessExitedEarly { code: Option<i32> },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
