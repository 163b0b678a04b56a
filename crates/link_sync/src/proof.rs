use std::sync::Arc;

use tracing::{debug, warn};

use crate::agent::AgentService;
use crate::store::StoredStatement;
use crate::utils::parse_timestamp;
use crate::UNKNOWN_AUTHOR;
use link_sync_integrity::{ExpressionProof, LinkExpression, Triple};

/// Turns stored statements into link expressions, verifying signatures
/// against the statement data on the way.
#[derive(Clone)]
pub struct ProofAttacher {
    agent: Arc<dyn AgentService>,
}

impl ProofAttacher {
    pub fn new(agent: Arc<dyn AgentService>) -> ProofAttacher {
        ProofAttacher { agent }
    }

    pub async fn attach(&self, stored: StoredStatement) -> LinkExpression {
        let StoredStatement {
            statement,
            provenance,
        } = stored;
        let data = Triple::from(&statement);

        let signature = provenance.signature.filter(|signature| !signature.is_empty());
        let valid = match &signature {
            Some(signature) => self.verify(signature, &data).await,
            None => false,
        };

        LinkExpression {
            author: provenance
                .author
                .filter(|author| !author.is_empty())
                .unwrap_or_else(|| String::from(UNKNOWN_AUTHOR)),
            timestamp: parse_timestamp(provenance.timestamp.as_deref()),
            data,
            proof: ExpressionProof {
                signature: signature.unwrap_or_default(),
                key: provenance.key.unwrap_or_default(),
                valid,
            },
        }
    }

    pub async fn attach_all(&self, stored: Vec<StoredStatement>) -> Vec<LinkExpression> {
        let mut links = Vec::with_capacity(stored.len());
        for statement in stored {
            links.push(self.attach(statement).await);
        }
        links
    }

    async fn verify(&self, signature: &str, data: &Triple) -> bool {
        match self.agent.verify(signature, data).await {
            Ok(valid) => {
                if !valid {
                    debug!("ProofAttacher.verify(): signature did not verify for {}", data);
                }
                valid
            }
            Err(error) => {
                warn!("ProofAttacher.verify(): failed to verify signature for {}: {}", data, error);
                false
            }
        }
    }
}
