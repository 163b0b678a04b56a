use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::AgentService;
use crate::errors::{LinkSyncError, LinkSyncResult};
use link_sync_integrity::{ExpressionProof, Triple};

pub const VALID_SIGNATURE: &str = "sig-valid";

/// Accepts exactly one signature literal, [`VALID_SIGNATURE`].
#[derive(Debug)]
pub struct MockAgent {
    did: String,
    fail_verify: AtomicBool,
    fail_sign: AtomicBool,
    verify_calls: AtomicUsize,
}

impl MockAgent {
    pub fn new(did: &str) -> MockAgent {
        MockAgent {
            did: String::from(did),
            fail_verify: AtomicBool::new(false),
            fail_sign: AtomicBool::new(false),
            verify_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_fail_verify(&self, fail: bool) {
        self.fail_verify.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_sign(&self, fail: bool) {
        self.fail_sign.store(fail, Ordering::SeqCst);
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentService for MockAgent {
    fn did(&self) -> &str {
        &self.did
    }

    async fn sign(&self, _data: &Triple) -> LinkSyncResult<ExpressionProof> {
        if self.fail_sign.load(Ordering::SeqCst) {
            return Err(LinkSyncError::Signing(String::from("Key unavailable")));
        }
        Ok(ExpressionProof {
            signature: String::from(VALID_SIGNATURE),
            key: format!("{}#key", self.did),
            valid: true,
        })
    }

    async fn verify(&self, signature: &str, _data: &Triple) -> LinkSyncResult<bool> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_verify.load(Ordering::SeqCst) {
            return Err(LinkSyncError::Verification(String::from("Malformed signature")));
        }
        Ok(signature == VALID_SIGNATURE)
    }
}
