use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::{GraphStore, GraphUpdate, Provenance, Statement, StoredStatement};
use crate::errors::{LinkSyncError, LinkSyncResult};
use crate::inputs::{RepoParams, RevisionId, StoreId};
use crate::UPDATE_CHANNEL_CAPACITY;

/// One recorded `apply_changes` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedChanges {
    pub store: StoreId,
    pub additions: Vec<StoredStatement>,
    pub removals: Vec<StoredStatement>,
}

/// In-memory graph store. Writes through `apply_changes` are echoed on the
/// update channel for subscribed repos, like the real store does.
#[derive(Debug)]
pub struct MockGraphStore {
    private_store: String,
    repos: Mutex<BTreeMap<StoreId, IndexMap<Statement, Provenance>>>,
    subscribed: Mutex<BTreeSet<StoreId>>,
    applied: Mutex<Vec<AppliedChanges>>,
    sender: broadcast::Sender<GraphUpdate>,
    revision_counter: AtomicU64,
    fail_create: AtomicBool,
    fail_list: AtomicBool,
    fail_apply: AtomicBool,
}

impl MockGraphStore {
    pub fn new(private_store: &str) -> MockGraphStore {
        let (sender, _) = broadcast::channel(*UPDATE_CHANNEL_CAPACITY);
        MockGraphStore {
            private_store: String::from(private_store),
            repos: Mutex::new(BTreeMap::new()),
            subscribed: Mutex::new(BTreeSet::new()),
            applied: Mutex::new(Vec::new()),
            sender,
            revision_counter: AtomicU64::new(0),
            fail_create: AtomicBool::new(false),
            fail_list: AtomicBool::new(false),
            fail_apply: AtomicBool::new(false),
        }
    }

    pub fn store_id(&self) -> StoreId {
        StoreId::from_private_store(&self.private_store)
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_apply(&self, fail: bool) {
        self.fail_apply.store(fail, Ordering::SeqCst);
    }

    /// Puts statements into a repo without notifying anyone, as if another
    /// agent had written them while we were not subscribed.
    pub fn seed(&self, store: &StoreId, statements: Vec<StoredStatement>) {
        let mut repos = self.repos.lock();
        let repo = repos.entry(store.clone()).or_default();
        for stored in statements {
            repo.insert(stored.statement, stored.provenance);
        }
    }

    /// Removes a statement without notifying anyone.
    pub fn unseed(&self, store: &StoreId, statement: &Statement) {
        if let Some(repo) = self.repos.lock().get_mut(store) {
            repo.shift_remove(statement);
        }
    }

    /// Delivers an update on the channel as if the store had pushed it.
    pub fn push(&self, update: GraphUpdate) -> usize {
        self.sender.send(update).unwrap_or(0)
    }

    pub fn statements(&self, store: &StoreId) -> Vec<StoredStatement> {
        self.repos
            .lock()
            .get(store)
            .map(|repo| {
                repo.iter()
                    .map(|(statement, provenance)| StoredStatement {
                        statement: statement.clone(),
                        provenance: provenance.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn applied(&self) -> Vec<AppliedChanges> {
        self.applied.lock().clone()
    }

    pub fn is_subscribed(&self, store: &StoreId) -> bool {
        self.subscribed.lock().contains(store)
    }
}

#[async_trait]
impl GraphStore for MockGraphStore {
    async fn create_repo(&self, params: &RepoParams) -> LinkSyncResult<StoreId> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(LinkSyncError::Store(String::from("Connection failed")));
        }
        let store = match &params.caps {
            Some(caps) => StoreId::from_private_store(&caps.repo_id),
            None => self.store_id(),
        };
        self.repos.lock().entry(store.clone()).or_default();
        Ok(store)
    }

    async fn subscribe(&self, store: &StoreId) -> LinkSyncResult<()> {
        self.subscribed.lock().insert(store.clone());
        Ok(())
    }

    fn updates(&self) -> broadcast::Receiver<GraphUpdate> {
        self.sender.subscribe()
    }

    async fn list_statements(&self, store: &StoreId) -> LinkSyncResult<Vec<StoredStatement>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(LinkSyncError::Store(String::from("Query failed")));
        }
        Ok(self.statements(store))
    }

    async fn apply_changes(
        &self,
        store: &StoreId,
        additions: Vec<StoredStatement>,
        removals: Vec<StoredStatement>,
    ) -> LinkSyncResult<RevisionId> {
        if self.fail_apply.load(Ordering::SeqCst) {
            return Err(LinkSyncError::Store(String::from("Update failed")));
        }
        {
            let mut repos = self.repos.lock();
            let repo = repos.entry(store.clone()).or_default();
            for removal in removals.iter() {
                repo.shift_remove(&removal.statement);
            }
            for addition in additions.iter() {
                repo.insert(addition.statement.clone(), addition.provenance.clone());
            }
        }
        self.applied.lock().push(AppliedChanges {
            store: store.clone(),
            additions: additions.clone(),
            removals: removals.clone(),
        });

        let revision = RevisionId::new(format!(
            "rev-{}",
            self.revision_counter.fetch_add(1, Ordering::SeqCst) + 1
        ));
        if self.is_subscribed(store) {
            self.push(GraphUpdate {
                store_id: store.clone(),
                additions,
                removals,
                revision: Some(revision.clone()),
            });
        }
        Ok(revision)
    }
}
