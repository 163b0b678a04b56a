use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::debug;

use crate::inputs::RevisionId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevisionReference {
    pub revision: RevisionId,
    pub timestamp: DateTime<Utc>,
}

/// Last revision token seen from the store, either returned by our own commit
/// or carried on a pushed update.
#[derive(Debug, Default)]
pub struct Revisions {
    current: Mutex<Option<RevisionReference>>,
}

impl Revisions {
    pub fn new() -> Revisions {
        Revisions {
            current: Mutex::new(None),
        }
    }

    pub fn update_current_revision(&self, revision: RevisionId, timestamp: DateTime<Utc>) {
        debug!("Revisions.update_current_revision(): {}", revision);
        *self.current.lock() = Some(RevisionReference {
            revision,
            timestamp,
        });
    }

    pub fn current_revision(&self) -> Option<RevisionId> {
        self.current.lock().as_ref().map(|val| val.revision.clone())
    }

    pub fn current_reference(&self) -> Option<RevisionReference> {
        self.current.lock().clone()
    }
}
