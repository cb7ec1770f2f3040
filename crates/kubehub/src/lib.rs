//! Hashirama kubehub – typed binding to the MadaraChain custom-resource API.
//!
//! Three calls (list/create/delete), one round-trip each, no retries and no
//! interpretation of failures. Every response is normalized to a plain raw
//! record before it leaves this crate.

#![forbid(unsafe_code)]

use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use kube::{
    api::{Api, DeleteParams, ListParams, PostParams},
    config::KubeConfigOptions,
    core::{ApiResource, DynamicObject, GroupVersionKind},
    Client,
};
use metrics::{counter, histogram};
use serde_json::Value as Json;
use tracing::{debug, info, warn};

mod envelope;
pub mod mock;

pub use envelope::{normalize_list, normalize_record};
pub use mock::{CallCounts, MockOp, MockResourceClient};

/// Failure reported by the orchestrator or the transport underneath it.
///
/// `code` is the orchestrator's HTTP status when it answered at all; connection
/// failures, decode failures and timeouts carry `None`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub code: Option<u16>,
    /// Machine-readable reason (`AlreadyExists`, `NotFound`, ...); empty when unknown.
    pub reason: String,
    pub message: String,
}

impl TransportError {
    pub fn api(code: u16, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: Some(code), reason: reason.into(), message: message.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self { code: None, reason: String::new(), message: message.into() }
    }

    pub fn decode(e: impl std::fmt::Display) -> Self {
        Self::transport(format!("decoding orchestrator response: {}", e))
    }

    pub fn timeout(op: &str, after: Duration) -> Self {
        Self { code: None, reason: "Timeout".into(), message: format!("{} timed out after {}ms", op, after.as_millis()) }
    }
}

impl From<kube::Error> for TransportError {
    fn from(e: kube::Error) -> Self {
        match e {
            kube::Error::Api(ae) => Self::api(ae.code, ae.reason, ae.message),
            other => Self::transport(other.to_string()),
        }
    }
}

/// Raw custom-resource operations against the orchestrator.
#[async_trait::async_trait]
pub trait ResourceClient: Send + Sync {
    async fn list(&self, namespace: &str) -> Result<Vec<Json>, TransportError>;

    async fn create(&self, namespace: &str, resource: Json) -> Result<Json, TransportError>;

    /// Returns the orchestrator's acknowledgement (the object being deleted or a Status).
    async fn delete(&self, namespace: &str, name: &str) -> Result<Json, TransportError>;
}

/// ApiResource for `batch.starknet.l3/v1alpha1/MadaraChain` without discovery.
pub fn api_resource() -> ApiResource {
    let gvk = GroupVersionKind::gvk(hashirama_core::GROUP, hashirama_core::VERSION, hashirama_core::KIND);
    ApiResource::from_gvk_with_plural(&gvk, hashirama_core::PLURAL)
}

/// Build a kube client from the current kubeconfig context, or a named one.
pub async fn get_kube_client(context: Option<&str>) -> Result<Client> {
    match context {
        None => Client::try_default().await.context("loading default kube config"),
        Some(ctx) => {
            let opts = KubeConfigOptions { context: Some(ctx.to_string()), ..Default::default() };
            let cfg = kube::Config::from_kubeconfig(&opts)
                .await
                .with_context(|| format!("loading kubeconfig context {}", ctx))?;
            Client::try_from(cfg).context("building kube client")
        }
    }
}

/// Await `fut` for at most `timeout`; an elapsed deadline becomes a transport error.
pub async fn call_with_timeout<T, E, F>(timeout: Duration, op: &str, fut: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<TransportError>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(res) => res.map_err(Into::into),
        Err(_) => {
            counter!("kubehub_timeouts", 1u64);
            Err(TransportError::timeout(op, timeout))
        }
    }
}

/// kube-rs backed client. Holds no state beyond the configured client.
#[derive(Clone)]
pub struct KubeResourceClient {
    client: Client,
    ar: ApiResource,
    timeout: Duration,
}

impl KubeResourceClient {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, ar: api_resource(), timeout }
    }

    pub async fn connect(context: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = get_kube_client(context).await?;
        info!(context = %context.unwrap_or("(current)"), timeout_ms = %timeout.as_millis(), "kubehub: client ready");
        Ok(Self::new(client, timeout))
    }

    fn api(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &self.ar)
    }

    fn observe<T>(op: &'static str, t0: Instant, res: &Result<T, TransportError>) {
        histogram!("kubehub_call_ms", t0.elapsed().as_secs_f64() * 1000.0, "op" => op);
        match res {
            Ok(_) => counter!("kubehub_call_ok", 1u64, "op" => op),
            Err(e) => {
                counter!("kubehub_call_err", 1u64, "op" => op);
                warn!(op, code = ?e.code, reason = %e.reason, error = %e.message, "kubehub: call failed");
            }
        }
    }
}

#[async_trait::async_trait]
impl ResourceClient for KubeResourceClient {
    async fn list(&self, namespace: &str) -> Result<Vec<Json>, TransportError> {
        let t0 = Instant::now();
        let api = self.api(namespace);
        let lp = ListParams::default();
        let res: Result<Vec<Json>, TransportError> = async {
            let list = call_with_timeout(self.timeout, "list", api.list(&lp)).await?;
            let raw = serde_json::to_value(&list).map_err(TransportError::decode)?;
            normalize_list(raw)
        }
        .await;
        Self::observe("list", t0, &res);
        if let Ok(items) = &res {
            debug!(ns = %namespace, count = items.len(), took_ms = %t0.elapsed().as_millis(), "kubehub: list ok");
        }
        res
    }

    async fn create(&self, namespace: &str, resource: Json) -> Result<Json, TransportError> {
        let t0 = Instant::now();
        let api = self.api(namespace);
        let pp = PostParams::default();
        let res: Result<Json, TransportError> = async {
            let obj: DynamicObject = serde_json::from_value(resource).map_err(TransportError::decode)?;
            let created = call_with_timeout(self.timeout, "create", api.create(&pp, &obj)).await?;
            let raw = serde_json::to_value(&created).map_err(TransportError::decode)?;
            Ok(normalize_record(raw))
        }
        .await;
        Self::observe("create", t0, &res);
        if res.is_ok() {
            debug!(ns = %namespace, took_ms = %t0.elapsed().as_millis(), "kubehub: create ok");
        }
        res
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<Json, TransportError> {
        let t0 = Instant::now();
        let api = self.api(namespace);
        let dp = DeleteParams::default();
        let res: Result<Json, TransportError> = async {
            let ack = call_with_timeout(self.timeout, "delete", api.delete(name, &dp)).await?;
            let raw = ack
                .either(|obj| serde_json::to_value(obj), |status| serde_json::to_value(status))
                .map_err(TransportError::decode)?;
            Ok(normalize_record(raw))
        }
        .await;
        Self::observe("delete", t0, &res);
        if res.is_ok() {
            debug!(ns = %namespace, name = %name, took_ms = %t0.elapsed().as_millis(), "kubehub: delete ok");
        }
        res
    }
}
