//! Hashirama core types: the `MadaraChain` custom resource and its read model.

#![forbid(unsafe_code)]

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const GROUP: &str = "batch.starknet.l3";
pub const VERSION: &str = "v1alpha1";
pub const KIND: &str = "MadaraChain";
pub const PLURAL: &str = "madarachains";

/// RPC port every chain exposes. Not caller-settable.
pub const DEFAULT_PORT: i32 = 9944;
pub const DEFAULT_REPLICAS: i32 = 1;

/// Longest name the orchestrator accepts for a namespaced resource label.
pub const MAX_NAME_LEN: usize = 63;

fn default_replicas() -> i32 { DEFAULT_REPLICAS }

fn default_port() -> i32 { DEFAULT_PORT }

/// Desired state of a Madara sequencer chain.
#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "batch.starknet.l3",
    version = "v1alpha1",
    kind = "MadaraChain",
    plural = "madarachains",
    namespaced,
    status = "MadaraChainStatus",
    shortname = "mc",
    derive = "PartialEq",
    printcolumn = r#"{"name":"ChainID","type":"string","jsonPath":".spec.chainID"}"#,
    printcolumn = r#"{"name":"Replicas","type":"integer","jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Running","type":"integer","jsonPath":".status.nodesRunning"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
pub struct MadaraChainSpec {
    /// Opaque chain identifier handed to the sequencer.
    #[serde(rename = "chainID", default)]
    pub chain_id: String,

    #[serde(default = "default_replicas")]
    pub replicas: i32,

    #[serde(default = "default_port")]
    pub port: i32,

    /// Sequencer image; defaulted server-side by the CRD schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Starknet network (mainnet, sepolia, devnet); defaulted server-side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

/// Observed state, written only by the reconciliation loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MadaraChainStatus {
    #[serde(rename = "nodesRunning", default, skip_serializing_if = "Option::is_none")]
    pub nodes_running: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

impl MadaraChainSpec {
    /// Spec as written on create: defaults applied, port pinned.
    pub fn with_defaults(chain_id: impl Into<String>, replicas: Option<i32>) -> Self {
        let replicas = match replicas {
            Some(n) if n > 0 => n,
            _ => DEFAULT_REPLICAS,
        };
        Self { chain_id: chain_id.into(), replicas, port: DEFAULT_PORT, image: None, network: None }
    }
}

/// Create payload as sent by callers. `port` is accepted but never honoured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRequest {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "chainID", default)]
    pub chain_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
}

/// Coarse health derived from spec vs. status on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainHealth {
    /// No `status.nodesRunning` yet: the control loop has not reported.
    NotReconciled,
    Healthy,
    Degraded,
}

impl ChainHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainHealth::NotReconciled => "NotReconciled",
            ChainHealth::Healthy => "Healthy",
            ChainHealth::Degraded => "Degraded",
        }
    }
}

impl std::fmt::Display for ChainHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.pad(self.as_str()) }
}

/// Read model handed to callers: the resource as reported plus derived health.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainRecord {
    #[serde(flatten)]
    pub chain: MadaraChain,
    pub health: ChainHealth,
}

impl ChainRecord {
    pub fn name(&self) -> &str { self.chain.metadata.name.as_deref().unwrap_or("") }

    /// `None` means not yet reconciled, distinct from `Some(0)`.
    pub fn nodes_running(&self) -> Option<i32> { self.chain.status.as_ref().and_then(|s| s.nodes_running) }
}

pub mod prelude {
    pub use super::{ChainHealth, ChainRecord, ChainRequest, MadaraChain, MadaraChainSpec, MadaraChainStatus};
}
