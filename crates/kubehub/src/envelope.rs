//! Response envelope normalization.
//!
//! Client layers above the orchestrator hand back either the payload itself or
//! the payload wrapped in a `{ "body": ... }` envelope. Both collapse to the
//! same raw record shape here so nothing above this crate sniffs shapes.

use serde_json::Value as Json;

use crate::TransportError;

fn is_wrapper(map: &serde_json::Map<String, Json>) -> bool {
    let body_is_payload = matches!(map.get("body"), Some(Json::Object(_)) | Some(Json::Array(_)));
    // A real resource or list always carries one of these at the top level
    body_is_payload && !["apiVersion", "kind", "metadata", "items"].iter().any(|k| map.contains_key(*k))
}

fn unwrap_body(raw: Json) -> Json {
    match raw {
        Json::Object(mut map) if is_wrapper(&map) => map.remove("body").unwrap_or(Json::Null),
        other => other,
    }
}

/// Normalize a single-record response (create / delete acknowledgement).
pub fn normalize_record(raw: Json) -> Json {
    unwrap_body(raw)
}

/// Normalize a list response into its items, preserving orchestrator order.
/// A missing or null `items` is an empty list.
pub fn normalize_list(raw: Json) -> Result<Vec<Json>, TransportError> {
    match unwrap_body(raw) {
        Json::Array(items) => Ok(items),
        Json::Object(mut map) => match map.remove("items") {
            Some(Json::Array(items)) => Ok(items),
            Some(Json::Null) | None => Ok(Vec::new()),
            Some(other) => Err(TransportError::decode(format!("list items is not an array: {}", other))),
        },
        Json::Null => Ok(Vec::new()),
        other => Err(TransportError::decode(format!("unexpected list payload: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chain(name: &str) -> Json {
        json!({
            "apiVersion": "batch.starknet.l3/v1alpha1",
            "kind": "MadaraChain",
            "metadata": { "name": name },
            "spec": { "chainID": "SN", "replicas": 1, "port": 9944 }
        })
    }

    #[test]
    fn direct_and_wrapped_lists_normalize_alike() {
        let direct = json!({ "apiVersion": "v1", "kind": "List", "items": [chain("a"), chain("b")] });
        let wrapped = json!({ "body": { "items": [chain("a"), chain("b")] }, "response": { "statusCode": 200 } });
        let a = normalize_list(direct).unwrap();
        let b = normalize_list(wrapped).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0]["metadata"]["name"], "a");
        assert_eq!(a[1]["metadata"]["name"], "b");
    }

    #[test]
    fn missing_items_is_empty_not_error() {
        assert!(normalize_list(json!({ "metadata": {} })).unwrap().is_empty());
        assert!(normalize_list(json!({ "items": null })).unwrap().is_empty());
        assert!(normalize_list(json!({ "body": { "items": [] } })).unwrap().is_empty());
    }

    #[test]
    fn non_array_items_fail_to_decode() {
        let err = normalize_list(json!({ "items": "nope" })).unwrap_err();
        assert!(err.message.contains("not an array"), "msg={}", err.message);
        assert!(normalize_list(json!(42)).is_err());
    }

    #[test]
    fn wrapped_record_is_unwrapped_direct_passes_through() {
        assert_eq!(normalize_record(json!({ "body": chain("x") })), chain("x"));
        assert_eq!(normalize_record(chain("x")), chain("x"));
    }

    #[test]
    fn resource_with_body_field_is_not_mistaken_for_wrapper() {
        // A Status ack may legitimately carry unrelated keys; only bare wrappers unwrap
        let status = json!({ "kind": "Status", "status": "Success", "body": {} });
        assert_eq!(normalize_record(status.clone()), status);
    }
}
