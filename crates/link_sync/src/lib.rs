//! Link synchronization for graph-backed link languages.
//!
//! A [`LinkSyncAdapter`] keeps a cache of the last known [`LinkExpression`]s
//! of one repo in a [`GraphStore`] and reconciles it two ways: by polling the
//! full statement set with [`LinkSyncAdapter::sync`], and by folding the
//! store's push notifications into the cache and forwarding them as
//! [`PerspectiveDiff`]s to registered observers.

#[macro_use]
extern crate lazy_static;

#[cfg(test)]
#[macro_use]
extern crate maplit;

use chrono::{DateTime, TimeZone, Utc};

pub mod adapter;
pub mod agent;
pub mod cache;
pub mod config;
pub mod errors;
pub mod inputs;
pub mod observers;
pub mod proof;
pub mod store;
pub mod sync_state;

mod commit;
mod pull;
mod render;
mod revisions;
mod signal;
mod utils;

pub use adapter::{LanguageContext, LinkSyncAdapter};
pub use agent::AgentService;
pub use cache::{CacheKey, LinkCache};
pub use config::{LinkSyncConfig, RepoCaps};
pub use errors::{LinkSyncError, LinkSyncResult};
pub use inputs::{Did, RepoParams, RevisionId, StoreId};
pub use observers::SubscriptionHandle;
pub use proof::ProofAttacher;
pub use revisions::RevisionReference;
pub use store::{GraphStore, GraphUpdate, Provenance, Statement, StoredStatement};
pub use sync_state::{SyncState, SyncStateMachine};
pub use utils::content_hash;

pub use link_sync_integrity::{ExpressionProof, LinkExpression, Perspective, PerspectiveDiff, Triple};

/// Author reported for statements the store holds no author metadata for.
pub const UNKNOWN_AUTHOR: &str = "did:ng:unknown";
pub const CACHE_KEY_DELIMITER: &str = "::";
pub const REPO_DID_PREFIX: &str = "did:ng:repo:";

lazy_static! {
    /// Timestamp reported for statements without (parseable) timestamp metadata.
    pub static ref UNKNOWN_TIMESTAMP: DateTime<Utc> = Utc.timestamp_opt(0, 0).unwrap();
    pub static ref UPDATE_CHANNEL_CAPACITY: usize = 1024;
}
