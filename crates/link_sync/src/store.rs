use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::errors::LinkSyncResult;
use crate::inputs::{RepoParams, RevisionId, StoreId};
use link_sync_integrity::{LinkExpression, Triple};

#[cfg(any(test, feature = "test"))]
pub mod mock;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Statement {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Statement {
    pub fn new(subject: &str, predicate: &str, object: &str) -> Self {
        Statement {
            subject: String::from(subject),
            predicate: String::from(predicate),
            object: String::from(object),
        }
    }
}

impl From<&Triple> for Statement {
    fn from(triple: &Triple) -> Self {
        Statement {
            subject: triple.source.clone(),
            predicate: triple.predicate.clone(),
            object: triple.target.clone(),
        }
    }
}

impl From<&Statement> for Triple {
    fn from(statement: &Statement) -> Self {
        Triple {
            source: statement.subject.clone(),
            predicate: statement.predicate.clone(),
            target: statement.object.clone(),
        }
    }
}

/// Metadata the store keeps next to a statement. Every field is optional on
/// the wire.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Provenance {
    pub author: Option<String>,
    pub timestamp: Option<String>,
    pub signature: Option<String>,
    pub key: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StoredStatement {
    #[serde(flatten)]
    pub statement: Statement,
    #[serde(flatten)]
    pub provenance: Provenance,
}

impl StoredStatement {
    pub fn bare(statement: Statement) -> Self {
        StoredStatement {
            statement,
            provenance: Provenance::default(),
        }
    }
}

impl From<&LinkExpression> for StoredStatement {
    fn from(link: &LinkExpression) -> Self {
        let non_empty = |value: &str| {
            if value.is_empty() {
                None
            } else {
                Some(String::from(value))
            }
        };
        StoredStatement {
            statement: Statement::from(&link.data),
            provenance: Provenance {
                author: non_empty(&link.author),
                timestamp: Some(link.timestamp.to_rfc3339()),
                signature: non_empty(&link.proof.signature),
                key: non_empty(&link.proof.key),
            },
        }
    }
}

/// Change notification pushed by the store. Carries the id of the repo it
/// belongs to since one store serves every repo in the process.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GraphUpdate {
    pub store_id: StoreId,
    pub additions: Vec<StoredStatement>,
    pub removals: Vec<StoredStatement>,
    pub revision: Option<RevisionId>,
}

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Creates the repo, or loads it when `params.caps` names an existing one.
    async fn create_repo(&self, params: &RepoParams) -> LinkSyncResult<StoreId>;
    /// Starts push delivery for `store` on the [`GraphStore::updates`] channel.
    async fn subscribe(&self, store: &StoreId) -> LinkSyncResult<()>;
    fn updates(&self) -> broadcast::Receiver<GraphUpdate>;
    async fn list_statements(&self, store: &StoreId) -> LinkSyncResult<Vec<StoredStatement>>;
    async fn apply_changes(
        &self,
        store: &StoreId,
        additions: Vec<StoredStatement>,
        removals: Vec<StoredStatement>,
    ) -> LinkSyncResult<RevisionId>;
}
