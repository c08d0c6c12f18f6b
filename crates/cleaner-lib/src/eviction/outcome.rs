//! Classified result of a single image removal

use crate::runtime::RuntimeError;
use std::time::Duration;

/// What happened when an image removal was attempted
#[derive(Debug)]
pub enum DeleteOutcome {
    /// The image was removed
    Removed,
    /// The runtime refused, usually because the image is in use. Skipped for
    /// the rest of the pass; the next pass lists it again.
    Conflict(String),
    /// Another actor already removed the image
    NotFound,
    /// The runtime did not answer in time and is likely overloaded
    Timeout,
    /// Anything else, which stops the agent
    Fatal(RuntimeError),
}

impl DeleteOutcome {
    /// Pause to apply before the next candidate, if any.
    ///
    /// Removals pace at `delay`. Timeouts back off for at least `timeout_floor`.
    pub fn pause(&self, delay: Duration, timeout_floor: Duration) -> Option<Duration> {
        match self {
            DeleteOutcome::Removed => Some(delay),
            DeleteOutcome::Timeout => Some(delay.max(timeout_floor)),
            DeleteOutcome::Conflict(_) | DeleteOutcome::NotFound | DeleteOutcome::Fatal(_) => None,
        }
    }
}

impl From<Result<(), RuntimeError>> for DeleteOutcome {
    fn from(result: Result<(), RuntimeError>) -> Self {
        match result {
            Ok(()) => DeleteOutcome::Removed,
            Err(RuntimeError::Conflict(details)) => DeleteOutcome::Conflict(details),
            Err(RuntimeError::NotFound(_)) => DeleteOutcome::NotFound,
            Err(RuntimeError::Timeout) => DeleteOutcome::Timeout,
            Err(other @ RuntimeError::Other(_)) => DeleteOutcome::Fatal(other),
        }
    }
}
