//! In-process document store
//!
//! Stand-in for the hosted document database the deployed game talks to.
//! Implements the full collaborator contract: point reads/writes, shallow
//! field merges, deterministic collection queries, snapshot-isolated
//! optimistic transactions with automatic retry, and push subscriptions
//! that deliver the current snapshot immediately and every committed
//! change afterwards.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::store::{DocPath, Document, StoreError};

/// Attempts before a conflicting transaction surfaces `Unavailable`.
/// Every conflict implies some other transaction committed, so a loser
/// under contention from N peers needs at most N attempts.
const MAX_TXN_RETRIES: usize = 64;

#[derive(Debug, Clone)]
struct StoredDoc {
    data: Value,
    /// Bumped on every committed write; the unit of conflict detection.
    version: u64,
    /// Commit sequence at creation; orders collection queries.
    created: u64,
}

type QueryPredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

enum Watcher {
    Doc {
        path: DocPath,
        tx: mpsc::UnboundedSender<Option<Value>>,
    },
    Query {
        collection: String,
        predicate: QueryPredicate,
        tx: mpsc::UnboundedSender<Vec<Document>>,
    },
}

#[derive(Default)]
struct State {
    docs: HashMap<DocPath, StoredDoc>,
    /// Per-collection version, bumped whenever any member document changes.
    /// Guards collection scans against phantom writes.
    collections: HashMap<String, u64>,
    seq: u64,
    watchers: HashMap<u64, Watcher>,
    next_watch: u64,
}

impl State {
    fn query_docs(&self, collection: &str, predicate: &dyn Fn(&Value) -> bool) -> Vec<Document> {
        let mut matches: Vec<(&DocPath, &StoredDoc)> = self
            .docs
            .iter()
            .filter(|(path, doc)| path.collection == collection && predicate(&doc.data))
            .collect();
        matches.sort_by_key(|(_, doc)| doc.created);
        matches
            .into_iter()
            .map(|(path, doc)| Document {
                id: path.id.clone(),
                data: doc.data.clone(),
            })
            .collect()
    }

    /// Apply staged writes and collect the notifications they trigger.
    /// Returns sender/payload pairs so delivery can happen off-lock.
    fn apply(&mut self, writes: &[(DocPath, Option<Value>)]) -> Vec<Notification> {
        let mut changed_collections: Vec<String> = Vec::new();
        let mut changed_paths: Vec<DocPath> = Vec::new();

        for (path, value) in writes {
            match value {
                Some(data) => {
                    self.seq += 1;
                    let seq = self.seq;
                    self.docs
                        .entry(path.clone())
                        .and_modify(|doc| {
                            doc.data = data.clone();
                            doc.version = seq;
                        })
                        .or_insert_with(|| StoredDoc {
                            data: data.clone(),
                            version: seq,
                            created: seq,
                        });
                }
                None => {
                    if self.docs.remove(path).is_none() {
                        continue; // deleting an absent doc is a no-op
                    }
                    self.seq += 1;
                }
            }
            self.collections.insert(path.collection.clone(), self.seq);
            if !changed_collections.contains(&path.collection) {
                changed_collections.push(path.collection.clone());
            }
            changed_paths.push(path.clone());
        }

        let mut notifications = Vec::new();
        for watcher in self.watchers.values() {
            match watcher {
                Watcher::Doc { path, tx } => {
                    if changed_paths.contains(path) {
                        let snapshot = self.docs.get(path).map(|doc| doc.data.clone());
                        notifications.push(Notification::Doc(tx.clone(), snapshot));
                    }
                }
                Watcher::Query {
                    collection,
                    predicate,
                    tx,
                } => {
                    if changed_collections.contains(collection) {
                        let results = self.query_docs(collection, predicate.as_ref());
                        notifications.push(Notification::Query(tx.clone(), results));
                    }
                }
            }
        }
        notifications
    }
}

enum Notification {
    Doc(mpsc::UnboundedSender<Option<Value>>, Option<Value>),
    Query(mpsc::UnboundedSender<Vec<Document>>, Vec<Document>),
}

fn deliver(notifications: Vec<Notification>) {
    for notification in notifications {
        // A failed send means the watch was dropped mid-commit; ignore.
        match notification {
            Notification::Doc(tx, snapshot) => {
                let _ = tx.send(snapshot);
            }
            Notification::Query(tx, results) => {
                let _ = tx.send(results);
            }
        }
    }
}

/// Shared handle to the in-process document store. Cheap to clone.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one document.
    pub async fn get(&self, path: &DocPath) -> Result<Option<Value>, StoreError> {
        let state = self.state.lock();
        Ok(state.docs.get(path).map(|doc| doc.data.clone()))
    }

    /// Read one document into a typed value.
    pub async fn get_as<T: DeserializeOwned>(&self, path: &DocPath) -> Result<Option<T>, StoreError> {
        match self.get(path).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Create or replace one document.
    pub async fn set<T: Serialize>(&self, path: &DocPath, doc: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(doc)?;
        let notifications = {
            let mut state = self.state.lock();
            state.apply(&[(path.clone(), Some(value))])
        };
        deliver(notifications);
        Ok(())
    }

    /// Shallow-merge fields into an existing document.
    pub async fn update(&self, path: &DocPath, fields: Value) -> Result<(), StoreError> {
        let notifications = {
            let mut state = self.state.lock();
            let current = state
                .docs
                .get(path)
                .map(|doc| doc.data.clone())
                .ok_or_else(|| StoreError::Missing(path.clone()))?;
            let merged = merge_fields(current, fields);
            state.apply(&[(path.clone(), Some(merged))])
        };
        deliver(notifications);
        Ok(())
    }

    /// Delete one document. Deleting an absent document is not an error.
    pub async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        let notifications = {
            let mut state = self.state.lock();
            state.apply(&[(path.clone(), None)])
        };
        deliver(notifications);
        Ok(())
    }

    /// All documents in a collection matching the predicate, in creation order.
    pub async fn query(
        &self,
        collection: &str,
        predicate: impl Fn(&Value) -> bool,
    ) -> Result<Vec<Document>, StoreError> {
        let state = self.state.lock();
        Ok(state.query_docs(collection, &predicate))
    }

    /// Run a snapshot-isolated read-modify-write transaction.
    ///
    /// The closure reads through the transaction handle and stages writes;
    /// nothing is visible to other actors until commit. Commit validates
    /// every document and collection the closure read against the live
    /// store and re-runs the closure on a fresh snapshot when a concurrent
    /// commit raced it. An `Err` from the closure aborts with no mutation.
    pub async fn transaction<T, E, F>(&self, mut f: F) -> Result<T, E>
    where
        F: FnMut(&mut Txn) -> Result<T, E>,
        E: From<StoreError>,
    {
        for attempt in 0..MAX_TXN_RETRIES {
            let mut txn = self.begin();
            let out = f(&mut txn)?;
            match self.commit(txn) {
                Some(notifications) => {
                    deliver(notifications);
                    return Ok(out);
                }
                None => {
                    debug!("transaction conflict on attempt {}, retrying", attempt + 1);
                    tokio::task::yield_now().await;
                }
            }
        }
        Err(E::from(StoreError::Unavailable))
    }

    /// Subscribe to one document. The current snapshot is delivered
    /// immediately, then every committed change until the watch is dropped.
    pub fn watch_doc(&self, path: &DocPath) -> DocWatch {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        let initial = state.docs.get(path).map(|doc| doc.data.clone());
        let _ = tx.send(initial);
        let id = state.next_watch;
        state.next_watch += 1;
        state.watchers.insert(
            id,
            Watcher::Doc {
                path: path.clone(),
                tx,
            },
        );
        DocWatch {
            rx,
            _guard: WatchGuard {
                state: self.state.clone(),
                id,
            },
        }
    }

    /// Subscribe to a collection query. Each delivery is the full matching
    /// result set in creation order.
    pub fn watch_query(
        &self,
        collection: &str,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> QueryWatch {
        let predicate: QueryPredicate = Arc::new(predicate);
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        let initial = state.query_docs(collection, predicate.as_ref());
        let _ = tx.send(initial);
        let id = state.next_watch;
        state.next_watch += 1;
        state.watchers.insert(
            id,
            Watcher::Query {
                collection: collection.to_string(),
                predicate,
                tx,
            },
        );
        QueryWatch {
            rx,
            _guard: WatchGuard {
                state: self.state.clone(),
                id,
            },
        }
    }

    fn begin(&self) -> Txn {
        let state = self.state.lock();
        Txn {
            snapshot: state.docs.clone(),
            snapshot_collections: state.collections.clone(),
            reads: HashMap::new(),
            collection_reads: HashMap::new(),
            staged: HashMap::new(),
            staged_order: Vec::new(),
        }
    }

    /// Validate the transaction's read set and apply its writes.
    /// Returns `None` on conflict.
    fn commit(&self, txn: Txn) -> Option<Vec<Notification>> {
        let mut state = self.state.lock();

        for (path, read_version) in &txn.reads {
            let live = state.docs.get(path).map(|doc| doc.version);
            if live != *read_version {
                return None;
            }
        }
        for (collection, read_version) in &txn.collection_reads {
            let live = state.collections.get(collection).copied().unwrap_or(0);
            if live != *read_version {
                return None;
            }
        }

        let writes: Vec<(DocPath, Option<Value>)> = txn
            .staged_order
            .iter()
            .map(|path| (path.clone(), txn.staged[path].clone()))
            .collect();
        Some(state.apply(&writes))
    }

    #[cfg(test)]
    fn watcher_count(&self) -> usize {
        self.state.lock().watchers.len()
    }
}

fn merge_fields(current: Value, fields: Value) -> Value {
    match (current, fields) {
        (Value::Object(mut base), Value::Object(patch)) => {
            for (key, value) in patch {
                base.insert(key, value);
            }
            Value::Object(base)
        }
        // Non-object on either side degenerates to replacement.
        (_, fields) => fields,
    }
}

/// Handle the transaction closure reads and writes through.
pub struct Txn {
    snapshot: HashMap<DocPath, StoredDoc>,
    snapshot_collections: HashMap<String, u64>,
    /// Document versions observed by this transaction (None = absent).
    reads: HashMap<DocPath, Option<u64>>,
    /// Collection versions observed by whole-collection scans.
    collection_reads: HashMap<String, u64>,
    /// Staged writes, read back by later operations in the same closure.
    staged: HashMap<DocPath, Option<Value>>,
    staged_order: Vec<DocPath>,
}

impl Txn {
    /// Read one document from the transaction snapshot.
    pub fn get(&mut self, path: &DocPath) -> Option<Value> {
        if let Some(staged) = self.staged.get(path) {
            return staged.clone();
        }
        let doc = self.snapshot.get(path);
        self.reads
            .insert(path.clone(), doc.map(|stored| stored.version));
        doc.map(|stored| stored.data.clone())
    }

    /// Read one document from the snapshot into a typed value.
    pub fn get_as<T: DeserializeOwned>(&mut self, path: &DocPath) -> Result<Option<T>, StoreError> {
        match self.get(path) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Scan a collection in creation order, staged writes included.
    /// Records a collection read: any concurrent membership change
    /// conflicts this transaction.
    pub fn query(&mut self, collection: &str) -> Vec<Document> {
        let version = self
            .snapshot_collections
            .get(collection)
            .copied()
            .unwrap_or(0);
        self.collection_reads.insert(collection.to_string(), version);

        let mut committed: Vec<(&DocPath, &StoredDoc)> = self
            .snapshot
            .iter()
            .filter(|(path, _)| path.collection == collection)
            .collect();
        committed.sort_by_key(|(_, doc)| doc.created);

        let mut results = Vec::new();
        for (path, doc) in committed {
            match self.staged.get(path) {
                Some(Some(staged)) => results.push(Document {
                    id: path.id.clone(),
                    data: staged.clone(),
                }),
                Some(None) => {} // staged delete
                None => results.push(Document {
                    id: path.id.clone(),
                    data: doc.data.clone(),
                }),
            }
        }
        for path in &self.staged_order {
            if path.collection == collection && !self.snapshot.contains_key(path) {
                if let Some(Some(staged)) = self.staged.get(path) {
                    results.push(Document {
                        id: path.id.clone(),
                        data: staged.clone(),
                    });
                }
            }
        }
        results
    }

    /// Stage a create-or-replace write.
    pub fn set<T: Serialize>(&mut self, path: &DocPath, doc: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(doc)?;
        self.stage(path, Some(value));
        Ok(())
    }

    /// Stage a shallow field merge into an existing document.
    pub fn update(&mut self, path: &DocPath, fields: Value) -> Result<(), StoreError> {
        let current = self
            .get(path)
            .ok_or_else(|| StoreError::Missing(path.clone()))?;
        let merged = merge_fields(current, fields);
        self.stage(path, Some(merged));
        Ok(())
    }

    /// Stage a delete.
    pub fn delete(&mut self, path: &DocPath) {
        self.stage(path, None);
    }

    fn stage(&mut self, path: &DocPath, value: Option<Value>) {
        if !self.staged.contains_key(path) {
            self.staged_order.push(path.clone());
        }
        self.staged.insert(path.clone(), value);
    }
}

/// Watch guard; dropping it releases the subscription.
struct WatchGuard {
    state: Arc<Mutex<State>>,
    id: u64,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.state.lock().watchers.remove(&self.id);
    }
}

/// Push subscription to a single document.
pub struct DocWatch {
    rx: mpsc::UnboundedReceiver<Option<Value>>,
    _guard: WatchGuard,
}

impl DocWatch {
    /// Next observed snapshot (`None` inner value = document absent).
    /// Returns `None` when the store itself is gone.
    pub async fn next(&mut self) -> Option<Option<Value>> {
        self.rx.recv().await
    }
}

/// Push subscription to a collection query.
pub struct QueryWatch {
    rx: mpsc::UnboundedReceiver<Vec<Document>>,
    _guard: WatchGuard,
}

impl QueryWatch {
    /// Next full result set, in creation order.
    pub async fn next(&mut self) -> Option<Vec<Document>> {
        self.rx.recv().await
    }
}
