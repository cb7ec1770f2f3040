//! Status merge: desired spec + observed status -> `ChainRecord`.
//!
//! Recomputed on every read; nothing here is cached.

use hashirama_core::{ChainHealth, ChainRecord, MadaraChain, MadaraChainSpec, MadaraChainStatus};
use serde_json::Value as Json;

/// `Healthy` iff the reported ready count equals the desired replicas.
pub fn health_of(spec: &MadaraChainSpec, status: Option<&MadaraChainStatus>) -> ChainHealth {
    match status.and_then(|s| s.nodes_running) {
        None => ChainHealth::NotReconciled,
        Some(n) if n == spec.replicas => ChainHealth::Healthy,
        Some(_) => ChainHealth::Degraded,
    }
}

/// Decode a raw orchestrator record. List items may omit apiVersion/kind.
pub fn decode(mut raw: Json) -> Result<MadaraChain, String> {
    if let Some(obj) = raw.as_object_mut() {
        obj.entry("apiVersion")
            .or_insert_with(|| Json::String(format!("{}/{}", hashirama_core::GROUP, hashirama_core::VERSION)));
        obj.entry("kind").or_insert_with(|| Json::String(hashirama_core::KIND.to_string()));
    }
    let name = raw
        .get("metadata")
        .and_then(|m| m.get("name"))
        .and_then(|v| v.as_str())
        .unwrap_or("<unnamed>")
        .to_string();
    serde_json::from_value(raw).map_err(|e| format!("malformed {} record {:?}: {}", hashirama_core::KIND, name, e))
}

/// Attach derived health; a status without `nodesRunning` is treated as absent.
pub fn merge(mut chain: MadaraChain) -> ChainRecord {
    if chain.status.as_ref().is_some_and(|s| s.nodes_running.is_none()) {
        chain.status = None;
    }
    let health = health_of(&chain.spec, chain.status.as_ref());
    ChainRecord { chain, health }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(replicas: i32, status: Option<Json>) -> Json {
        let mut v = json!({
            "metadata": { "name": "beta", "creationTimestamp": "2025-01-01T00:00:00Z" },
            "spec": { "chainID": "SN", "replicas": replicas, "port": 9944 }
        });
        if let Some(s) = status {
            v["status"] = s;
        }
        v
    }

    #[test]
    fn matching_counts_are_healthy() {
        let rec = merge(decode(raw(3, Some(json!({ "nodesRunning": 3 })))).unwrap());
        assert_eq!(rec.health, ChainHealth::Healthy);
        assert_eq!(rec.nodes_running(), Some(3));
    }

    #[test]
    fn under_and_over_provisioned_are_degraded() {
        assert_eq!(merge(decode(raw(3, Some(json!({ "nodesRunning": 1 })))).unwrap()).health, ChainHealth::Degraded);
        assert_eq!(merge(decode(raw(1, Some(json!({ "nodesRunning": 2 })))).unwrap()).health, ChainHealth::Degraded);
    }

    #[test]
    fn absent_status_differs_from_zero_running() {
        let absent = merge(decode(raw(1, None)).unwrap());
        assert_eq!(absent.health, ChainHealth::NotReconciled);
        assert!(absent.chain.status.is_none());

        let empty = merge(decode(raw(1, Some(json!({})))).unwrap());
        assert_eq!(empty.health, ChainHealth::NotReconciled);
        assert!(empty.chain.status.is_none());

        let zero = merge(decode(raw(1, Some(json!({ "nodesRunning": 0 })))).unwrap());
        assert_eq!(zero.health, ChainHealth::Degraded);
        assert_eq!(zero.nodes_running(), Some(0));
    }

    #[test]
    fn decode_fills_type_meta_and_keeps_extra_fields() {
        let mut v = raw(1, None);
        v["spec"]["image"] = json!("ghcr.io/madara-alliance/madara:latest");
        let chain = decode(v).unwrap();
        assert_eq!(chain.spec.image.as_deref(), Some("ghcr.io/madara-alliance/madara:latest"));
        assert_eq!(chain.metadata.name.as_deref(), Some("beta"));
        assert!(chain.metadata.creation_timestamp.is_some());
    }

    #[test]
    fn decode_rejects_records_without_spec() {
        let err = decode(json!({ "metadata": { "name": "broken" } })).unwrap_err();
        assert!(err.contains("broken"), "err={}", err);
    }

    #[test]
    fn serialized_record_carries_health_beside_resource() {
        let rec = merge(decode(raw(3, Some(json!({ "nodesRunning": 3 })))).unwrap());
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["health"], "Healthy");
        assert_eq!(v["kind"], "MadaraChain");
        assert_eq!(v["spec"]["chainID"], "SN");
        assert_eq!(v["status"]["nodesRunning"], 3);
    }
}
