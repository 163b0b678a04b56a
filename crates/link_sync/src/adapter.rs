use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::agent::AgentService;
use crate::cache::CacheState;
use crate::config::LinkSyncConfig;
use crate::errors::{LinkSyncError, LinkSyncResult};
use crate::inputs::{Did, RevisionId, StoreId};
use crate::observers::{ObserverList, SubscriptionHandle};
use crate::proof::ProofAttacher;
use crate::revisions::{RevisionReference, Revisions};
use crate::store::{GraphStore, GraphUpdate};
use crate::sync_state::{SyncState, SyncStateMachine};
use crate::{commit, pull, render, signal};
use link_sync_integrity::{LinkExpression, Perspective, PerspectiveDiff};

/// Collaborators handed to an adapter. Each adapter gets its own, so several
/// adapters (and stores) can live in one process.
#[derive(Clone)]
pub struct LanguageContext {
    pub store: Arc<dyn GraphStore>,
    pub agent: Arc<dyn AgentService>,
    pub config: LinkSyncConfig,
}

impl LanguageContext {
    pub fn new(store: Arc<dyn GraphStore>, agent: Arc<dyn AgentService>, config: LinkSyncConfig) -> Self {
        LanguageContext {
            store,
            agent,
            config,
        }
    }
}

pub(crate) struct Shared {
    pub(crate) context: LanguageContext,
    pub(crate) proofs: ProofAttacher,
    pub(crate) cache: Mutex<CacheState>,
    pub(crate) store_id: Mutex<Option<StoreId>>,
    pub(crate) revisions: Revisions,
    pub(crate) diff_observers: ObserverList<PerspectiveDiff>,
    pub(crate) sync_state: SyncStateMachine,
    local_agents: Mutex<Vec<Did>>,
    subscribed: AtomicBool,
    listener: Mutex<Option<JoinHandle<()>>>,
    init_lock: tokio::sync::Mutex<()>,
}

impl Shared {
    pub(crate) fn bound_store(&self) -> Option<StoreId> {
        self.store_id.lock().clone()
    }

    /// Whether the store echoes our own writes back on the update channel.
    pub(crate) fn expects_echoes(&self) -> bool {
        self.subscribed.load(Ordering::SeqCst)
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }
    }
}

/// Keeps the links of one repo in sync with the graph store.
///
/// Lifecycle is `new` → `init` → ready → `dispose`. Until `init` has
/// provisioned the repo the adapter reports [`SyncState::NotSynced`];
/// initialization failures are logged and retried by the next `sync`.
#[derive(Clone)]
pub struct LinkSyncAdapter {
    shared: Arc<Shared>,
}

impl LinkSyncAdapter {
    pub fn new(context: LanguageContext) -> LinkSyncAdapter {
        let proofs = ProofAttacher::new(context.agent.clone());
        let local_agents = vec![String::from(context.agent.did())];
        LinkSyncAdapter {
            shared: Arc::new(Shared {
                context,
                proofs,
                cache: Mutex::new(CacheState::default()),
                store_id: Mutex::new(None),
                revisions: Revisions::new(),
                diff_observers: ObserverList::new("LinkSyncAdapter.diff_observers"),
                sync_state: SyncStateMachine::new(),
                local_agents: Mutex::new(local_agents),
                subscribed: AtomicBool::new(false),
                listener: Mutex::new(None),
                init_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Provisions the repo, starts listening for pushed updates and moves to
    /// [`SyncState::Synced`]. Returns whether the adapter is bound to a repo
    /// afterwards. Never fails; errors are logged.
    pub async fn init(&self) -> bool {
        let shared = &self.shared;
        let _guard = shared.init_lock.lock().await;
        if shared.bound_store().is_some() {
            return true;
        }

        let params = match shared.context.config.repo_params() {
            Ok(params) => params,
            Err(err) => {
                error!("LinkSyncAdapter.init(): invalid repo configuration: {}", err);
                return false;
            }
        };
        let store_id = match shared.context.store.create_repo(&params).await {
            Ok(store_id) => store_id,
            Err(err) => {
                error!("LinkSyncAdapter.init(): failed to initialize repo: {}", err);
                return false;
            }
        };
        info!("LinkSyncAdapter.init(): repo ready: {}", store_id);
        *shared.store_id.lock() = Some(store_id.clone());

        // receiver first, so nothing published between subscribe and spawn is lost
        let receiver = shared.context.store.updates();
        let listener = tokio::spawn(listen(Arc::downgrade(shared), receiver));
        if let Some(previous) = shared.listener.lock().replace(listener) {
            previous.abort();
        }
        match shared.context.store.subscribe(&store_id).await {
            Ok(()) => shared.subscribed.store(true, Ordering::SeqCst),
            Err(err) => {
                warn!("LinkSyncAdapter.init(): subscribe to {} failed, only sync() will see remote changes: {}", store_id, err);
            }
        }

        shared.sync_state.mark_synced();
        true
    }

    /// Stops the push listener, drops all observers and cached links and
    /// unbinds the repo. The adapter is back in [`SyncState::NotSynced`];
    /// a later `init` (or `sync`) binds it again.
    pub fn dispose(&self) {
        let shared = &self.shared;
        shared.store_id.lock().take();
        shared.subscribed.store(false, Ordering::SeqCst);
        if let Some(listener) = shared.listener.lock().take() {
            listener.abort();
        }
        shared.diff_observers.clear();
        shared.sync_state.clear_observers();
        shared.sync_state.reset();
        {
            let mut cache = shared.cache.lock();
            cache.links.clear();
            cache.journal.clear();
            cache.echoes.clear();
        }
        debug!("LinkSyncAdapter.dispose(): disposed");
    }

    /// Reconciles the cache with the full statement set of the repo and
    /// returns what changed since the last call. The diff goes to the caller
    /// only; diff observers see pushed changes. A host needs both: observers
    /// for live changes and the return value of `sync` for everything the
    /// push path missed (before `init`, after a lagged listener, while
    /// unsubscribed).
    pub async fn sync(&self) -> PerspectiveDiff {
        let store_id = match self.shared.bound_store() {
            Some(store_id) => store_id,
            None => {
                if !self.init().await {
                    warn!("LinkSyncAdapter.sync(): not bound to a repo, nothing to sync");
                    return PerspectiveDiff::new();
                }
                match self.shared.bound_store() {
                    Some(store_id) => store_id,
                    None => return PerspectiveDiff::new(),
                }
            }
        };
        debug!(
            "LinkSyncAdapter.sync(): syncing {} for {} local agent(s)",
            store_id,
            self.shared.local_agents.lock().len()
        );
        pull::pull(&self.shared, &store_id).await
    }

    pub async fn render(&self) -> LinkSyncResult<Perspective> {
        let store_id = self.shared.bound_store().ok_or(LinkSyncError::NotBound)?;
        render::render(&self.shared, &store_id).await
    }

    pub async fn commit(&self, diff: PerspectiveDiff) -> LinkSyncResult<RevisionId> {
        let store_id = self.shared.bound_store().ok_or(LinkSyncError::NotBound)?;
        commit::commit(&self.shared, &store_id, diff).await
    }

    /// Folds a pushed store update into the cache and notifies diff
    /// observers. Updates for other repos are ignored. Returns the diff that
    /// was emitted, empty if none was.
    pub async fn on_graph_update(&self, update: GraphUpdate) -> PerspectiveDiff {
        signal::handle_update(&self.shared, update).await
    }

    pub fn current_revision(&self) -> Option<RevisionId> {
        self.shared.revisions.current_revision()
    }

    /// The current revision together with when this adapter last moved to it.
    pub fn current_revision_reference(&self) -> Option<RevisionReference> {
        self.shared.revisions.current_reference()
    }

    pub fn add_callback<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&PerspectiveDiff) + Send + Sync + 'static,
    {
        self.shared.diff_observers.add(Arc::new(callback))
    }

    pub fn remove_callback(&self, handle: SubscriptionHandle) -> bool {
        self.shared.diff_observers.remove(handle)
    }

    /// The callback is invoked right away with the current state.
    pub fn add_sync_state_change_callback<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&SyncState) + Send + Sync + 'static,
    {
        self.shared.sync_state.add_observer(Arc::new(callback))
    }

    pub fn remove_sync_state_change_callback(&self, handle: SubscriptionHandle) -> bool {
        self.shared.sync_state.remove_observer(handle)
    }

    pub fn sync_state(&self) -> SyncState {
        self.shared.sync_state.current()
    }

    /// Informational only, does not change what gets synced.
    pub fn set_local_agents(&self, agents: Vec<Did>) {
        debug!("LinkSyncAdapter.set_local_agents(): {:?}", agents);
        *self.shared.local_agents.lock() = agents;
    }

    pub fn local_agents(&self) -> Vec<Did> {
        self.shared.local_agents.lock().clone()
    }

    pub fn others(&self) -> Vec<Did> {
        Vec::new()
    }

    pub fn writable(&self) -> bool {
        true
    }

    pub fn public(&self) -> bool {
        false
    }

    pub fn store_id(&self) -> Option<StoreId> {
        self.shared.bound_store()
    }

    /// Copies of the cached links, in cache order.
    pub fn cached_links(&self) -> Vec<LinkExpression> {
        self.shared
            .cache
            .lock()
            .links
            .snapshot()
            .into_iter()
            .map(|(_, link)| link)
            .collect()
    }
}

async fn listen(shared: Weak<Shared>, mut receiver: Receiver<GraphUpdate>) {
    loop {
        match receiver.recv().await {
            Ok(update) => {
                let shared = match shared.upgrade() {
                    Some(shared) => shared,
                    None => break,
                };
                signal::handle_update(&shared, update).await;
            }
            Err(RecvError::Lagged(skipped)) => {
                // skipped updates may include echoes we are waiting for
                if let Some(shared) = shared.upgrade() {
                    shared.cache.lock().echoes.clear();
                }
                warn!(
                    "LinkSyncAdapter.listen(): lagged behind, skipped {} update(s); they reach the host through the next sync() result, not observers",
                    skipped
                );
            }
            Err(RecvError::Closed) => {
                debug!("LinkSyncAdapter.listen(): update channel closed");
                break;
            }
        }
    }
}
