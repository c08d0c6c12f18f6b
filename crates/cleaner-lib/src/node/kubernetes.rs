//! Kubernetes node API access

use super::NodeCordoner;
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use serde_json::{json, Value};

/// Cordons nodes with a JSON merge patch on `spec.unschedulable`
pub struct KubeNodeCordoner {
    nodes: Api<Node>,
}

impl KubeNodeCordoner {
    pub fn new(client: Client) -> Self {
        Self {
            nodes: Api::all(client),
        }
    }

    /// Build a client from the in-cluster environment, falling back to kubeconfig
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default()
            .await
            .context("Failed to create Kubernetes client")?;
        Ok(Self::new(client))
    }
}

/// Merge patch body setting the node's schedulability flag
pub(crate) fn unschedulable_patch(unschedulable: bool) -> Value {
    json!({
        "spec": {
            "unschedulable": unschedulable,
        },
    })
}

#[async_trait]
impl NodeCordoner for KubeNodeCordoner {
    async fn set_unschedulable(&self, node: &str, unschedulable: bool) -> Result<()> {
        self.nodes
            .patch(
                node,
                &PatchParams::default(),
                &Patch::Merge(unschedulable_patch(unschedulable)),
            )
            .await?;
        Ok(())
    }

    async fn check_node(&self, node: &str) -> Result<()> {
        self.nodes.get(node).await?;
        Ok(())
    }
}
