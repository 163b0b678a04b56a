use async_trait::async_trait;

use crate::errors::LinkSyncResult;
use link_sync_integrity::{ExpressionProof, Triple};

#[cfg(any(test, feature = "test"))]
pub mod mock;

/// Signing capability of the local agent.
#[async_trait]
pub trait AgentService: Send + Sync {
    fn did(&self) -> &str;
    async fn sign(&self, data: &Triple) -> LinkSyncResult<ExpressionProof>;
    /// May fail for malformed signatures; callers treat a failure as an
    /// invalid signature.
    async fn verify(&self, signature: &str, data: &Triple) -> LinkSyncResult<bool>;
}
