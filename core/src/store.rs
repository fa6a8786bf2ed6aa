//! Realtime document store
//!
//! Chat messages and user profiles live in an external realtime database
//! addressed by slash-separated paths. [`RealtimeStore`] is the seam; the
//! in-memory implementation backs offline mode and tests, the Firebase one
//! talks to the Realtime Database REST API.

use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use url::Url;

/// Callback invoked with the current value of a query, then on every change.
pub type Listener = Arc<dyn Fn(Result<Snapshot>) + Send + Sync>;

// ============================================================================
// Queries and snapshots
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub path: String,
    pub limit_to_last: Option<usize>,
}

impl Query {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            limit_to_last: None,
        }
    }

    pub fn limit_to_last(mut self, limit: usize) -> Self {
        self.limit_to_last = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    path: String,
    value: Option<Value>,
}

impl Snapshot {
    pub fn new(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            value: if value.is_null() { None } else { Some(value) },
        }
    }

    pub fn empty(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Child entries ordered by key.
    pub fn children(&self) -> Vec<(&str, &Value)> {
        let mut children: Vec<(&str, &Value)> = match &self.value {
            Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.as_str(), v)).collect(),
            _ => Vec::new(),
        };
        children.sort_by(|a, b| a.0.cmp(b.0));
        children
    }

    fn limited(path: &str, value: Value, limit: Option<usize>) -> Self {
        match (value, limit) {
            (Value::Object(map), Some(limit)) => {
                let mut entries: Vec<(String, Value)> = map.into_iter().collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                let skip = entries.len().saturating_sub(limit);
                let kept: Map<String, Value> = entries.into_iter().skip(skip).collect();
                Snapshot::new(path, Value::Object(kept))
            }
            (value, _) => Snapshot::new(path, value),
        }
    }
}

// ============================================================================
// Server values
// ============================================================================

/// Placeholder the store replaces with its own clock on write.
pub fn server_timestamp() -> Value {
    json!({ ".sv": "timestamp" })
}

fn is_server_timestamp(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.len() == 1 && map.get(".sv") == Some(&Value::from("timestamp")))
}

/// Replace every server timestamp placeholder inside `value` with `now_ms`.
pub fn resolve_server_values(value: &mut Value, now_ms: i64) {
    if is_server_timestamp(value) {
        *value = Value::from(now_ms);
        return;
    }
    match value {
        Value::Object(map) => map
            .values_mut()
            .for_each(|v| resolve_server_values(v, now_ms)),
        Value::Array(items) => items
            .iter_mut()
            .for_each(|v| resolve_server_values(v, now_ms)),
        _ => {}
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

/// Handle to a live listener. Call [`Subscription::unsubscribe`] on teardown;
/// dropping the handle has the same effect.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

// ============================================================================
// Store trait
// ============================================================================

#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Append `value` under `path` with a fresh chronological key.
    async fn push(&self, path: &str, value: Value) -> Result<String>;

    /// Overwrite the value at `path`. `null` deletes it.
    async fn set(&self, path: &str, value: Value) -> Result<()>;

    async fn get(&self, query: &Query) -> Result<Snapshot>;

    fn subscribe(&self, query: Query, listener: Listener) -> Subscription;

    /// Credentials for subsequent requests; `None` after sign-out.
    fn authorize(&self, _id_token: Option<String>) {}
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Whether a write at one path can change the value observed at the other.
fn paths_overlap(a: &str, b: &str) -> bool {
    let a = segments(a);
    let b = segments(b);
    a.iter().zip(b.iter()).all(|(x, y)| x == y)
}

// ============================================================================
// Push keys
// ============================================================================

const PUSH_CHARS: &[u8] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Generates keys that sort in creation order, even within one millisecond.
#[derive(Default)]
pub(crate) struct PushKeys {
    last: Mutex<(u64, u64)>,
}

impl PushKeys {
    pub(crate) fn next(&self, now_ms: i64) -> String {
        let mut last = self.last.lock();
        let ms = (now_ms.max(0) as u64).max(last.0);
        let seq = if ms == last.0 { last.1 + 1 } else { 0 };
        *last = (ms, seq);

        let mut key = encode_push_chars(ms, 8);
        key.push_str(&encode_push_chars(seq, 12));
        key
    }
}

fn encode_push_chars(mut n: u64, width: usize) -> String {
    let mut out = vec![b'-'; width];
    for slot in out.iter_mut().rev() {
        *slot = PUSH_CHARS[(n % 64) as usize];
        n /= 64;
    }
    String::from_utf8(out).unwrap_or_default()
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ============================================================================
// In-memory store
// ============================================================================

struct Registered {
    id: u64,
    query: Query,
    listener: Listener,
}

struct MemoryInner {
    root: Mutex<Value>,
    listeners: Mutex<Vec<Registered>>,
    next_listener: AtomicU64,
    keys: PushKeys,
}

/// Process-local store with the same observable behavior as the remote one.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                root: Mutex::new(Value::Object(Map::new())),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(1),
                keys: PushKeys::default(),
            }),
        }
    }

    #[cfg(test)]
    fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    fn read(&self, query: &Query) -> Snapshot {
        let root = self.inner.root.lock();
        let mut node = &*root;
        for segment in segments(&query.path) {
            match node.get(segment) {
                Some(child) => node = child,
                None => return Snapshot::empty(&query.path),
            }
        }
        Snapshot::limited(&query.path, node.clone(), query.limit_to_last)
    }

    fn write(&self, path: &str, value: Value) {
        {
            let mut root = self.inner.root.lock();
            write_at(&mut root, &segments(path), value);
        }
        self.notify(path);
    }

    fn notify(&self, path: &str) {
        let affected: Vec<(Query, Listener)> = self
            .inner
            .listeners
            .lock()
            .iter()
            .filter(|r| paths_overlap(&r.query.path, path))
            .map(|r| (r.query.clone(), r.listener.clone()))
            .collect();

        for (query, listener) in affected {
            listener(Ok(self.read(&query)));
        }
    }
}

fn write_at(node: &mut Value, parts: &[&str], value: Value) {
    let Some((head, rest)) = parts.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        if rest.is_empty() && value.is_null() {
            map.remove(*head);
            return;
        }
        let child = map.entry(head.to_string()).or_insert(Value::Null);
        write_at(child, rest, value);
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    async fn push(&self, path: &str, mut value: Value) -> Result<String> {
        let now = now_ms();
        let key = self.inner.keys.next(now);
        resolve_server_values(&mut value, now);
        self.write(&format!("{}/{}", path.trim_end_matches('/'), key), value);
        Ok(key)
    }

    async fn set(&self, path: &str, mut value: Value) -> Result<()> {
        resolve_server_values(&mut value, now_ms());
        self.write(path, value);
        Ok(())
    }

    async fn get(&self, query: &Query) -> Result<Snapshot> {
        Ok(self.read(query))
    }

    fn subscribe(&self, query: Query, listener: Listener) -> Subscription {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().push(Registered {
            id,
            query: query.clone(),
            listener: listener.clone(),
        });

        listener(Ok(self.read(&query)));

        let inner = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.listeners.lock().retain(|r| r.id != id);
            }
        })
    }
}

// ============================================================================
// Firebase Realtime Database (REST)
// ============================================================================

struct FirebaseInner {
    http: Client,
    database_url: String,
    id_token: RwLock<Option<String>>,
}

impl FirebaseInner {
    fn url(&self, path: &str) -> Result<Url> {
        let raw = format!(
            "{}/{}.json",
            self.database_url.trim_end_matches('/'),
            path.trim_matches('/')
        );
        let mut url = Url::parse(&raw).map_err(|e| Error::Config(format!("{}: {}", raw, e)))?;
        if let Some(token) = self.id_token.read().as_ref() {
            url.query_pairs_mut().append_pair("auth", token);
        }
        Ok(url)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        Err(Error::Store(format!("{} - {}", status, text)))
    }

    async fn get(&self, query: &Query) -> Result<Snapshot> {
        let mut url = self.url(&query.path)?;
        if let Some(limit) = query.limit_to_last {
            url.query_pairs_mut()
                .append_pair("orderBy", "\"$key\"")
                .append_pair("limitToLast", &limit.to_string());
        }

        let resp = Self::check(self.http.get(url).send().await?).await?;
        let value: Value = resp.json().await?;
        Ok(Snapshot::limited(&query.path, value, query.limit_to_last))
    }
}

/// Realtime Database over REST. Subscriptions poll at `poll_interval` and
/// only fire when the observed value changes.
#[derive(Clone)]
pub struct FirebaseStore {
    inner: Arc<FirebaseInner>,
    poll_interval: Duration,
    runtime: Handle,
}

impl FirebaseStore {
    pub fn new(database_url: &str, poll_interval: Duration, runtime: Handle) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(FirebaseInner {
                http,
                database_url: database_url.to_string(),
                id_token: RwLock::new(None),
            }),
            poll_interval,
            runtime,
        })
    }
}

#[async_trait]
impl RealtimeStore for FirebaseStore {
    async fn push(&self, path: &str, value: Value) -> Result<String> {
        let url = self.inner.url(path)?;
        let resp = FirebaseInner::check(self.inner.http.post(url).json(&value).send().await?).await?;
        let data: Value = resp.json().await?;

        data["name"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::Store(format!("push to {} returned no key", path)))
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        let url = self.inner.url(path)?;
        FirebaseInner::check(self.inner.http.put(url).json(&value).send().await?).await?;
        Ok(())
    }

    async fn get(&self, query: &Query) -> Result<Snapshot> {
        self.inner.get(query).await
    }

    fn subscribe(&self, query: Query, listener: Listener) -> Subscription {
        let inner = self.inner.clone();
        let interval = self.poll_interval;

        let task = self.runtime.spawn(async move {
            let mut last: Option<Snapshot> = None;
            loop {
                match inner.get(&query).await {
                    Ok(snapshot) => {
                        if last.as_ref() != Some(&snapshot) {
                            listener(Ok(snapshot.clone()));
                            last = Some(snapshot);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(path = %query.path, error = %e, "Store poll failed");
                        last = None;
                        listener(Err(e));
                    }
                }
                tokio::time::sleep(interval).await;
            }
        });

        Subscription::new(move || task.abort())
    }

    fn authorize(&self, id_token: Option<String>) {
        *self.inner.id_token.write() = id_token;
    }
}
