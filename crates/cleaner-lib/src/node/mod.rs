//! Node scheduling gate
//!
//! Cordons the local node while images are being evicted so the scheduler
//! does not place new pods that would need the images being removed. Every
//! call sets the flag outright, so repeating a cordon is harmless.

mod kubernetes;

pub use kubernetes::KubeNodeCordoner;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Orchestrator operations on a single node
#[async_trait]
pub trait NodeCordoner: Send + Sync {
    /// Set the node's `unschedulable` flag
    async fn set_unschedulable(&self, node: &str, unschedulable: bool) -> Result<()>;

    /// Verify the node exists and the API is reachable
    async fn check_node(&self, node: &str) -> Result<()>;
}

/// Cordon/uncordon around eviction passes, or nothing when no node is configured
#[derive(Clone)]
pub struct SchedulingGate {
    target: Option<GateTarget>,
}

#[derive(Clone)]
struct GateTarget {
    node: String,
    cordoner: Arc<dyn NodeCordoner>,
}

impl SchedulingGate {
    /// Gate for running outside an orchestrated environment
    pub fn disabled() -> Self {
        Self { target: None }
    }

    pub fn for_node(node: impl Into<String>, cordoner: Arc<dyn NodeCordoner>) -> Self {
        Self {
            target: Some(GateTarget {
                node: node.into(),
                cordoner,
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    pub fn node_name(&self) -> Option<&str> {
        self.target.as_ref().map(|t| t.node.as_str())
    }

    /// Startup check that the configured node can be read
    pub async fn verify(&self) -> Result<()> {
        let Some(target) = &self.target else {
            return Ok(());
        };

        target
            .cordoner
            .check_node(&target.node)
            .await
            .with_context(|| format!("Node {} is not reachable", target.node))?;

        info!(node = %target.node, "Verified node is reachable");
        Ok(())
    }

    /// Mark the node unschedulable
    pub async fn cordon(&self) -> Result<()> {
        self.set(true).await
    }

    /// Mark the node schedulable again
    pub async fn uncordon(&self) -> Result<()> {
        self.set(false).await
    }

    async fn set(&self, unschedulable: bool) -> Result<()> {
        let Some(target) = &self.target else {
            return Ok(());
        };

        target
            .cordoner
            .set_unschedulable(&target.node, unschedulable)
            .await
            .with_context(|| {
                format!(
                    "Failed to set unschedulable={} on node {}",
                    unschedulable, target.node
                )
            })
    }
}
