//! Disk-pressure driven image eviction
//!
//! The engine alternates between two states:
//! - idle: usage is sampled once per poll interval and nothing happens while
//!   it stays below the high threshold
//! - evicting: a snapshot of the image inventory is taken, the node is
//!   cordoned, and images are removed one at a time until usage drops below
//!   the low threshold or the snapshot is exhausted; the node is then
//!   uncordoned unconditionally
//!
//! The gap between the two thresholds keeps a pass from re-triggering on noise
//! right after it finishes.

mod engine;
mod outcome;


pub use engine::{EngineConfig, EvictionEngine, EvictionEngineBuilder, Tick};
pub use outcome::DeleteOutcome;

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// Waits between samples and deletions
///
/// Abstracted so tests can record requested delays instead of sleeping.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Pacer backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Latched view of the shutdown broadcast
///
/// A message, a lagged receiver or a closed channel all count as shutdown.
/// Once observed the signal stays set, so both the pass and the outer loop
/// see it.
pub struct ShutdownSignal {
    rx: broadcast::Receiver<()>,
    triggered: bool,
}

impl ShutdownSignal {
    pub fn new(rx: broadcast::Receiver<()>) -> Self {
        Self {
            rx,
            triggered: false,
        }
    }

    /// Non-blocking check
    pub fn is_triggered(&mut self) -> bool {
        if !self.triggered {
            self.triggered = !matches!(self.rx.try_recv(), Err(TryRecvError::Empty));
        }
        self.triggered
    }

    /// Resolves once shutdown has been requested
    pub async fn triggered(&mut self) {
        if !self.triggered {
            let _ = self.rx.recv().await;
            self.triggered = true;
        }
    }
}
