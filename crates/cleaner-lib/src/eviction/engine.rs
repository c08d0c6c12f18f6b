//! Eviction control loop

use super::{DeleteOutcome, Pacer, ShutdownSignal, TokioPacer};
use crate::inventory::ImageInventory;
use crate::models::{ImageRecord, PassSummary};
use crate::node::SchedulingGate;
use crate::observability::StructuredLogger;
use crate::runtime::{ImageDeleter, ImageLister};
use crate::usage::UsageSampler;
use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{error, info};

/// Configuration for the eviction loop
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Usage percentage at or above which a pass starts (default: 80)
    pub gc_high: f64,
    /// Usage percentage below which a pass stops (default: 60)
    pub gc_low: f64,
    /// Pause after each successful removal (default: 1 second)
    pub delete_delay: Duration,
    /// Pause between idle samples (default: 60 seconds)
    pub poll_interval: Duration,
    /// Minimum pause after a timed-out removal (default: 30 seconds)
    pub timeout_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gc_high: 80.0,
            gc_low: 60.0,
            delete_delay: Duration::from_secs(1),
            poll_interval: Duration::from_secs(60),
            timeout_backoff: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Check the thresholds form a valid hysteresis band
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("low", self.gc_low), ("high", self.gc_high)] {
            if !(0.0..=100.0).contains(&value) {
                anyhow::bail!("{} threshold {} must be between 0 and 100", name, value);
            }
        }
        if self.gc_low >= self.gc_high {
            anyhow::bail!(
                "low threshold {} must be below high threshold {}",
                self.gc_low,
                self.gc_high
            );
        }
        Ok(())
    }
}

/// Result of one iteration of the control loop
#[derive(Debug)]
pub enum Tick {
    /// Usage was below the high threshold
    Idle { percent_used: f64 },
    /// A pass ran to completion
    Evicted(PassSummary),
}

/// Drives sampling, image selection, deletion and node cordoning
pub struct EvictionEngine {
    sampler: Arc<dyn UsageSampler>,
    inventory: ImageInventory,
    deleter: Arc<dyn ImageDeleter>,
    gate: SchedulingGate,
    pacer: Arc<dyn Pacer>,
    logger: StructuredLogger,
    config: EngineConfig,
}

impl EvictionEngine {
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run until shutdown is signalled or a fatal error occurs
    pub async fn run(&self, shutdown: broadcast::Receiver<()>) -> Result<()> {
        let mut shutdown = ShutdownSignal::new(shutdown);

        info!(
            gc_high = self.config.gc_high,
            gc_low = self.config.gc_low,
            delete_delay_secs = self.config.delete_delay.as_secs_f64(),
            poll_interval_secs = self.config.poll_interval.as_secs(),
            cordon = self.gate.is_enabled(),
            "Starting eviction loop"
        );

        loop {
            self.tick(&mut shutdown).await?;

            if !self.pause(self.config.poll_interval, &mut shutdown).await {
                info!("Shutting down eviction loop");
                return Ok(());
            }
        }
    }

    /// Sample usage once and run a pass if the high threshold is reached
    pub async fn tick(&self, shutdown: &mut ShutdownSignal) -> Result<Tick> {
        let percent_used = self.sample().await?;
        self.logger.log_usage(percent_used);

        if percent_used < self.config.gc_high {
            return Ok(Tick::Idle { percent_used });
        }

        let summary = self.run_pass(percent_used, shutdown).await?;
        Ok(Tick::Evicted(summary))
    }

    /// One high-to-low pass, starting from the sample that triggered it
    pub async fn run_pass(
        &self,
        percent_used: f64,
        shutdown: &mut ShutdownSignal,
    ) -> Result<PassSummary> {
        let start = Instant::now();
        let mut candidates = self
            .inventory
            .snapshot()
            .await
            .context("Failed to list images for eviction")?;
        let mut summary = PassSummary::started(candidates.len(), percent_used);
        self.logger.log_pass_started(candidates.len(), percent_used);

        if candidates.is_empty() {
            summary.duration = start.elapsed();
            self.logger.log_pass_summary(&summary);
            return Ok(summary);
        }

        if self.gate.is_enabled() {
            self.logger.log_cordon(true);
            if let Err(e) = self.gate.cordon().await {
                // The patch may have landed even though the call failed
                self.logger.log_cordon(false);
                if let Err(uncordon_err) = self.gate.uncordon().await {
                    error!(error = %format!("{:#}", uncordon_err), "Failed to uncordon node");
                }
                return Err(e);
            }
        }

        let evicted = self.evict(&mut candidates, &mut summary, shutdown).await;

        let uncordoned = if self.gate.is_enabled() {
            self.logger.log_cordon(false);
            self.gate.uncordon().await
        } else {
            Ok(())
        };

        summary.duration = start.elapsed();
        self.logger.log_pass_summary(&summary);

        match (evicted, uncordoned) {
            (Err(e), Err(uncordon_err)) => {
                error!(error = %format!("{:#}", uncordon_err), "Failed to uncordon node");
                Err(e)
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => Ok(summary),
        }
    }

    /// Remove candidates front to back while usage stays above the low threshold
    async fn evict(
        &self,
        candidates: &mut VecDeque<ImageRecord>,
        summary: &mut PassSummary,
        shutdown: &mut ShutdownSignal,
    ) -> Result<()> {
        while !candidates.is_empty() && summary.final_usage > self.config.gc_low {
            if shutdown.is_triggered() {
                info!(
                    remaining = candidates.len(),
                    "Shutdown requested, ending pass early"
                );
                return Ok(());
            }

            // Something else may have uncordoned the node since the last removal
            if self.gate.is_enabled() {
                self.logger.log_cordon(true);
                if let Err(e) = self.gate.cordon().await {
                    self.logger.log_cordon_failed(&e);
                }
            }

            let Some(image) = candidates.pop_front() else {
                break;
            };

            self.logger.log_removing(&image);
            let outcome = DeleteOutcome::from(self.deleter.remove_image(&image.id).await);
            let pause = outcome.pause(self.config.delete_delay, self.config.timeout_backoff);

            match outcome {
                DeleteOutcome::Removed => {
                    summary.images_deleted += 1;
                    self.logger.log_removed(&image);
                }
                DeleteOutcome::Conflict(details) => {
                    summary.images_skipped += 1;
                    self.logger.log_conflict(&image, &details);
                }
                DeleteOutcome::NotFound => {
                    summary.images_missing += 1;
                    self.logger.log_not_found(&image);
                }
                DeleteOutcome::Timeout => {
                    summary.timeouts += 1;
                    self.logger
                        .log_timeout(&image, pause.unwrap_or(self.config.timeout_backoff));
                }
                DeleteOutcome::Fatal(err) => {
                    return Err(anyhow::Error::new(err)
                        .context(format!("Failed to remove {}", image.display_name())));
                }
            }

            let interrupted = match pause {
                Some(pause) => !self.pause(pause, shutdown).await,
                None => false,
            };

            summary.final_usage = self.sample().await?;

            if interrupted {
                info!(
                    remaining = candidates.len(),
                    "Shutdown requested, ending pass early"
                );
                return Ok(());
            }
        }

        Ok(())
    }

    async fn sample(&self) -> Result<f64> {
        let sample = self
            .sampler
            .sample()
            .await
            .context("Failed to sample disk usage")?;
        Ok(sample.percent_used)
    }

    /// Wait for `duration`, returning false if shutdown arrived first
    async fn pause(&self, duration: Duration, shutdown: &mut ShutdownSignal) -> bool {
        if shutdown.is_triggered() {
            return false;
        }

        tokio::select! {
            _ = self.pacer.pause(duration) => true,
            _ = shutdown.triggered() => false,
        }
    }
}

/// Builder for the eviction engine
pub struct EvictionEngineBuilder {
    sampler: Option<Arc<dyn UsageSampler>>,
    lister: Option<Arc<dyn ImageLister>>,
    deleter: Option<Arc<dyn ImageDeleter>>,
    gate: SchedulingGate,
    pacer: Arc<dyn Pacer>,
    logger: Option<StructuredLogger>,
    config: EngineConfig,
}

impl EvictionEngineBuilder {
    /// Create a new builder with default configuration and no node gate
    pub fn new() -> Self {
        Self {
            sampler: None,
            lister: None,
            deleter: None,
            gate: SchedulingGate::disabled(),
            pacer: Arc::new(TokioPacer),
            logger: None,
            config: EngineConfig::default(),
        }
    }

    /// Set the usage sampler
    pub fn sampler(mut self, sampler: Arc<dyn UsageSampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Set the image lister
    pub fn lister(mut self, lister: Arc<dyn ImageLister>) -> Self {
        self.lister = Some(lister);
        self
    }

    /// Set the image deleter
    pub fn deleter(mut self, deleter: Arc<dyn ImageDeleter>) -> Self {
        self.deleter = Some(deleter);
        self
    }

    /// Set the node scheduling gate
    pub fn gate(mut self, gate: SchedulingGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Replace the whole engine configuration
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set both thresholds
    pub fn thresholds(mut self, gc_low: f64, gc_high: f64) -> Self {
        self.config.gc_low = gc_low;
        self.config.gc_high = gc_high;
        self
    }

    /// Set the pause after each successful removal
    pub fn delete_delay(mut self, delay: Duration) -> Self {
        self.config.delete_delay = delay;
        self
    }

    /// Set the idle poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set the minimum pause after a timed-out removal
    pub fn timeout_backoff(mut self, backoff: Duration) -> Self {
        self.config.timeout_backoff = backoff;
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<EvictionEngine> {
        let sampler = self
            .sampler
            .ok_or_else(|| anyhow::anyhow!("Usage sampler is required"))?;
        let lister = self
            .lister
            .ok_or_else(|| anyhow::anyhow!("Image lister is required"))?;
        let deleter = self
            .deleter
            .ok_or_else(|| anyhow::anyhow!("Image deleter is required"))?;
        self.config.validate()?;

        let logger = self
            .logger
            .unwrap_or_else(|| StructuredLogger::new(self.gate.node_name()));

        Ok(EvictionEngine {
            sampler,
            inventory: ImageInventory::new(lister),
            deleter,
            gate: self.gate,
            pacer: self.pacer,
            logger,
            config: self.config,
        })
    }
}

impl Default for EvictionEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
