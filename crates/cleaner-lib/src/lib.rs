//! Image cleaner library
//!
//! This crate provides the core functionality for:
//! - Disk usage sampling by blocks and inodes
//! - Container image inventory and deletion ordering
//! - Cordoning the local Kubernetes node during eviction
//! - The disk-pressure driven eviction loop
//! - Structured event logging

pub mod eviction;
pub mod inventory;
pub mod models;
pub mod node;
pub mod observability;
pub mod runtime;
pub mod usage;

pub use eviction::{EngineConfig, EvictionEngine, EvictionEngineBuilder, Tick};
pub use models::*;
pub use node::{KubeNodeCordoner, NodeCordoner, SchedulingGate};
pub use observability::StructuredLogger;
pub use runtime::{DockerRuntime, ImageDeleter, ImageLister, RuntimeError};
pub use usage::{StatvfsSampler, UsageSampler};
