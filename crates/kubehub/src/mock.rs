//! In-memory `ResourceClient` for tests: a tiny fake orchestrator.
//!
//! Enforces name uniqueness per namespace, answers misses with 404, assigns
//! `creationTimestamp`, counts calls per operation and replays scripted failures.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde_json::{json, Value as Json};

use crate::{normalize_list, normalize_record, ResourceClient, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOp {
    List,
    Create,
    Delete,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list: usize,
    pub create: usize,
    pub delete: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize { self.list + self.create + self.delete }
}

#[derive(Default)]
pub struct MockResourceClient {
    objects: Mutex<Vec<(String, Json)>>,
    failures: Mutex<VecDeque<(MockOp, TransportError)>>,
    /// Answer in `{ "body": ... }` envelopes, like some client layers do.
    wrap: bool,
    created: AtomicUsize,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn name_of(raw: &Json) -> &str {
    raw.get("metadata").and_then(|m| m.get("name")).and_then(|v| v.as_str()).unwrap_or("")
}

fn qualified() -> String {
    format!("{}.{}", hashirama_core::PLURAL, hashirama_core::GROUP)
}

impl MockResourceClient {
    pub fn new() -> Self { Self::default() }

    pub fn wrapped() -> Self { Self { wrap: true, ..Self::default() } }

    /// Seed raw records verbatim, as if the orchestrator already held them.
    pub fn with_objects(self, namespace: &str, items: impl IntoIterator<Item = Json>) -> Self {
        {
            let mut objs = lock(&self.objects);
            objs.extend(items.into_iter().map(|raw| (namespace.to_string(), raw)));
        }
        self
    }

    /// Queue a failure for the next call of `op`.
    pub fn fail_next(&self, op: MockOp, err: TransportError) {
        lock(&self.failures).push_back((op, err));
    }

    /// Play the reconciliation loop: write (or clear) `status.nodesRunning`.
    pub fn set_nodes_running(&self, namespace: &str, name: &str, nodes: Option<i32>) -> bool {
        let mut objs = lock(&self.objects);
        let Some((_, raw)) = objs.iter_mut().find(|(ns, raw)| ns == namespace && name_of(raw) == name) else {
            return false;
        };
        match (nodes, raw.as_object_mut()) {
            (Some(n), Some(obj)) => {
                obj.insert("status".into(), json!({ "nodesRunning": n }));
            }
            (None, Some(obj)) => {
                obj.remove("status");
            }
            _ => return false,
        }
        true
    }

    pub fn objects(&self, namespace: &str) -> Vec<Json> {
        lock(&self.objects).iter().filter(|(ns, _)| ns == namespace).map(|(_, raw)| raw.clone()).collect()
    }

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            list: self.list_calls.load(Ordering::SeqCst),
            create: self.create_calls.load(Ordering::SeqCst),
            delete: self.delete_calls.load(Ordering::SeqCst),
        }
    }

    fn take_failure(&self, op: MockOp) -> Option<TransportError> {
        let mut q = lock(&self.failures);
        let pos = q.iter().position(|(o, _)| *o == op)?;
        q.remove(pos).map(|(_, e)| e)
    }

    fn envelope(&self, payload: Json) -> Json {
        if self.wrap { json!({ "body": payload, "response": { "statusCode": 200 } }) } else { payload }
    }
}

#[async_trait::async_trait]
impl ResourceClient for MockResourceClient {
    async fn list(&self, namespace: &str) -> Result<Vec<Json>, TransportError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.take_failure(MockOp::List) {
            return Err(e);
        }
        let list = json!({
            "apiVersion": format!("{}/{}", hashirama_core::GROUP, hashirama_core::VERSION),
            "kind": format!("{}List", hashirama_core::KIND),
            "metadata": { "resourceVersion": "1" },
            "items": self.objects(namespace),
        });
        normalize_list(self.envelope(list))
    }

    async fn create(&self, namespace: &str, resource: Json) -> Result<Json, TransportError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.take_failure(MockOp::Create) {
            return Err(e);
        }
        let name = name_of(&resource).to_string();
        if name.is_empty() {
            return Err(TransportError::api(422, "Invalid", format!("{} is invalid: metadata.name: Required value", qualified())));
        }
        let mut stored = resource;
        {
            let mut objs = lock(&self.objects);
            if objs.iter().any(|(ns, raw)| ns == namespace && name_of(raw) == name) {
                return Err(TransportError::api(409, "AlreadyExists", format!("{} \"{}\" already exists", qualified(), name)));
            }
            let n = self.created.fetch_add(1, Ordering::SeqCst);
            if let Some(meta) = stored.get_mut("metadata").and_then(|m| m.as_object_mut()) {
                meta.insert("namespace".into(), Json::String(namespace.to_string()));
                meta.insert("creationTimestamp".into(), Json::String(format!("2025-01-01T00:{:02}:{:02}Z", (n / 60) % 60, n % 60)));
                meta.insert("uid".into(), Json::String(format!("00000000-0000-0000-0000-{:012}", n + 1)));
            }
            objs.push((namespace.to_string(), stored.clone()));
        }
        Ok(normalize_record(self.envelope(stored)))
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<Json, TransportError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.take_failure(MockOp::Delete) {
            return Err(e);
        }
        let removed = {
            let mut objs = lock(&self.objects);
            let pos = objs.iter().position(|(ns, raw)| ns == namespace && name_of(raw) == name);
            pos.map(|i| objs.remove(i).1)
        };
        match removed {
            Some(raw) => Ok(normalize_record(self.envelope(raw))),
            None => Err(TransportError::api(404, "NotFound", format!("{} \"{}\" not found", qualified(), name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(name: &str) -> Json {
        json!({ "apiVersion": "batch.starknet.l3/v1alpha1", "kind": "MadaraChain", "metadata": { "name": name }, "spec": { "chainID": "SN" } })
    }

    #[tokio::test]
    async fn create_collides_on_same_name_only_within_namespace() {
        let m = MockResourceClient::new();
        m.create("default", chain("a")).await.unwrap();
        let e = m.create("default", chain("a")).await.unwrap_err();
        assert_eq!(e.code, Some(409));
        assert_eq!(e.reason, "AlreadyExists");
        m.create("other", chain("a")).await.unwrap();
        assert_eq!(m.calls().create, 3);
    }

    #[tokio::test]
    async fn delete_missing_is_404_and_list_keeps_insertion_order() {
        let m = MockResourceClient::wrapped().with_objects("default", vec![chain("z"), chain("a")]);
        let names: Vec<String> = m.list("default").await.unwrap().iter().map(|r| name_of(r).to_string()).collect();
        assert_eq!(names, vec!["z", "a"]);
        m.delete("default", "z").await.unwrap();
        let e = m.delete("default", "z").await.unwrap_err();
        assert_eq!(e.code, Some(404));
    }

    #[tokio::test]
    async fn scripted_failure_fires_once_for_its_op() {
        let m = MockResourceClient::new();
        m.fail_next(MockOp::List, TransportError::transport("connection refused"));
        assert!(m.delete("default", "x").await.is_err()); // 404, not the scripted failure
        assert_eq!(m.list("default").await.unwrap_err().message, "connection refused");
        assert!(m.list("default").await.unwrap().is_empty());
    }
}
