//! Hashirama chain lifecycle gateway.
//!
//! Translates list/get/create/delete intents into custom-resource calls on a
//! [`ResourceClient`], merges observed status into the read model and maps raw
//! orchestrator failures onto a fixed set of caller-facing error kinds.
//! Stateless: every call re-derives everything from the orchestrator.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use hashirama_core::{ChainRecord, ChainRequest, MadaraChain};
use hashirama_kubehub::{ResourceClient, TransportError};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::{info, warn};

pub mod status;
pub mod validate;

pub use hashirama_core::ChainHealth;

/// Process-wide gateway settings, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Namespace every chain lives in for this deployment.
    pub namespace: String,
}

impl Default for GatewayConfig {
    fn default() -> Self { Self { namespace: "default".into() } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidInput,
    AlreadyExists,
    NotFound,
    LookupFailed,
    CreateFailed,
    DeleteFailed,
}

/// Caller-facing failures. Orchestrator messages are carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("lookup failed: {0}")]
    LookupFailed(String),
    #[error("create failed: {0}")]
    CreateFailed(String),
    #[error("delete failed: {0}")]
    DeleteFailed(String),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::InvalidInput(_) => ErrorKind::InvalidInput,
            GatewayError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            GatewayError::NotFound(_) => ErrorKind::NotFound,
            GatewayError::LookupFailed(_) => ErrorKind::LookupFailed,
            GatewayError::CreateFailed(_) => ErrorKind::CreateFailed,
            GatewayError::DeleteFailed(_) => ErrorKind::DeleteFailed,
        }
    }

    /// The underlying message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            GatewayError::InvalidInput(m)
            | GatewayError::AlreadyExists(m)
            | GatewayError::NotFound(m)
            | GatewayError::LookupFailed(m)
            | GatewayError::CreateFailed(m)
            | GatewayError::DeleteFailed(m) => m,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

fn is_already_exists(e: &TransportError) -> bool {
    e.reason == "AlreadyExists" || (e.code == Some(409) && e.message.contains("already exists"))
}

fn is_not_found(e: &TransportError) -> bool {
    e.code == Some(404) || e.reason == "NotFound"
}

fn classify_create(e: TransportError) -> GatewayError {
    if is_already_exists(&e) { GatewayError::AlreadyExists(e.message) } else { GatewayError::CreateFailed(e.message) }
}

fn classify_delete(e: TransportError) -> GatewayError {
    if is_not_found(&e) { GatewayError::NotFound(e.message) } else { GatewayError::DeleteFailed(e.message) }
}

/// Build the full resource for a validated, defaulted create. Deterministic.
pub fn build_resource(namespace: &str, name: &str, spec: hashirama_core::MadaraChainSpec) -> MadaraChain {
    let mut chain = MadaraChain::new(name, spec);
    chain.metadata.namespace = Some(namespace.to_string());
    chain
}

/// The lifecycle gateway. Cheap to clone; holds only the adapter and config.
#[derive(Clone)]
pub struct ChainGateway {
    client: Arc<dyn ResourceClient>,
    config: GatewayConfig,
}

impl ChainGateway {
    pub fn new(client: Arc<dyn ResourceClient>, config: GatewayConfig) -> Self { Self { client, config } }

    pub fn namespace(&self) -> &str { &self.config.namespace }

    fn finish<T>(op: &'static str, t0: Instant, res: &GatewayResult<T>) {
        histogram!("gateway_latency_ms", t0.elapsed().as_secs_f64() * 1000.0, "op" => op);
        match res {
            Ok(_) => {
                counter!("gateway_ok", 1u64, "op" => op);
                info!(op, took_ms = %t0.elapsed().as_millis(), "api: {} ok", op);
            }
            Err(e) => {
                counter!("gateway_err", 1u64, "op" => op);
                warn!(op, kind = ?e.kind(), error = %e, took_ms = %t0.elapsed().as_millis(), "api: {} failed", op);
            }
        }
    }

    async fn list_records(&self) -> GatewayResult<Vec<ChainRecord>> {
        let raw = self.client.list(self.namespace()).await.map_err(|e| GatewayError::LookupFailed(e.message))?;
        raw.into_iter()
            .map(|r| status::decode(r).map(status::merge))
            .collect::<Result<Vec<_>, _>>()
            .map_err(GatewayError::LookupFailed)
    }

    /// All chains in orchestrator order, each with derived health.
    pub async fn list(&self) -> GatewayResult<Vec<ChainRecord>> {
        let t0 = Instant::now();
        info!(ns = %self.namespace(), "api: list start");
        let res = self.list_records().await;
        if let Ok(records) = &res {
            info!(count = records.len(), "api: list items");
        }
        Self::finish("list", t0, &res);
        res
    }

    /// Single chain by name, read through `list`.
    pub async fn get(&self, name: &str) -> GatewayResult<ChainRecord> {
        let t0 = Instant::now();
        info!(ns = %self.namespace(), name = %name, "api: get start");
        let res: GatewayResult<ChainRecord> = async {
            validate::validate_name(name)?;
            self.list_records()
                .await?
                .into_iter()
                .find(|r| r.name() == name)
                .ok_or_else(|| GatewayError::NotFound(format!("{} {:?} not found in namespace {}", hashirama_core::KIND, name, self.namespace())))
        }
        .await;
        Self::finish("get", t0, &res);
        res
    }

    /// Validate, default and create. Returns the resource as the orchestrator reported it.
    pub async fn create(&self, req: ChainRequest) -> GatewayResult<MadaraChain> {
        let t0 = Instant::now();
        info!(ns = %self.namespace(), name = %req.name, chain_id = %req.chain_id, replicas = ?req.replicas, "api: create start");
        let res: GatewayResult<MadaraChain> = async {
            let (name, spec) = validate::validate_request(&req)?;
            let chain = build_resource(self.namespace(), &name, spec);
            let raw = serde_json::to_value(&chain).map_err(|e| GatewayError::CreateFailed(format!("encoding {}: {}", name, e)))?;
            let created = self.client.create(self.namespace(), raw).await.map_err(classify_create)?;
            // the resource exists at this point; a retry would only collide
            status::decode(created)
                .map_err(|e| GatewayError::CreateFailed(format!("{} {:?} was created but the reply could not be read: {}", hashirama_core::KIND, name, e)))
        }
        .await;
        Self::finish("create", t0, &res);
        res
    }

    /// Request deletion. Returns the orchestrator's acknowledgement; teardown is asynchronous.
    pub async fn delete(&self, name: &str) -> GatewayResult<Json> {
        let t0 = Instant::now();
        info!(ns = %self.namespace(), name = %name, "api: delete start");
        let res: GatewayResult<Json> = async {
            validate::validate_name(name)?;
            self.client.delete(self.namespace(), name).await.map_err(classify_delete)
        }
        .await;
        Self::finish("delete", t0, &res);
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_collisions_are_recognised_by_reason_or_message() {
        let by_reason = TransportError::api(409, "AlreadyExists", "x exists");
        assert_eq!(classify_create(by_reason).kind(), ErrorKind::AlreadyExists);
        let by_message = TransportError::api(409, "", "madarachains \"a\" already exists");
        assert_eq!(classify_create(by_message).kind(), ErrorKind::AlreadyExists);
        let conflict = TransportError::api(409, "Conflict", "the object has been modified");
        assert_eq!(classify_create(conflict).kind(), ErrorKind::CreateFailed);
        let down = TransportError::transport("connection refused");
        assert_eq!(classify_create(down), GatewayError::CreateFailed("connection refused".into()));
    }

    #[test]
    fn delete_misses_are_not_found() {
        assert_eq!(classify_delete(TransportError::api(404, "NotFound", "gone")).kind(), ErrorKind::NotFound);
        assert_eq!(classify_delete(TransportError::api(500, "InternalError", "boom")).kind(), ErrorKind::DeleteFailed);
        assert_eq!(classify_delete(TransportError::api(403, "Forbidden", "no")).message(), "no");
    }

    #[test]
    fn built_resource_is_deterministic() {
        let spec = hashirama_core::MadaraChainSpec::with_defaults("SN_L3_1", None);
        let a = serde_json::to_value(build_resource("default", "alpha", spec.clone())).unwrap();
        let b = serde_json::to_value(build_resource("default", "alpha", spec)).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a,
            serde_json::json!({
                "apiVersion": "batch.starknet.l3/v1alpha1",
                "kind": "MadaraChain",
                "metadata": { "name": "alpha", "namespace": "default" },
                "spec": { "chainID": "SN_L3_1", "replicas": 1, "port": 9944 }
            })
        );
    }
}
