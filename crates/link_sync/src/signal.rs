use std::collections::HashSet;

use tracing::debug;

use crate::adapter::Shared;
use crate::cache::{CacheKey, CacheState};
use crate::store::GraphUpdate;
use crate::utils::get_now;
use link_sync_integrity::{LinkExpression, PerspectiveDiff};

pub(crate) async fn handle_update(shared: &Shared, update: GraphUpdate) -> PerspectiveDiff {
    let GraphUpdate {
        store_id,
        additions,
        removals,
        revision,
    } = update;

    if shared.bound_store().as_ref() != Some(&store_id) {
        debug!("handle_update(): ignoring update for foreign repo {}", store_id);
        return PerspectiveDiff::new();
    }

    let additions = shared.proofs.attach_all(additions).await;
    let removals = shared.proofs.attach_all(removals).await;
    let diff = {
        let mut cache = shared.cache.lock();
        fold_update(&mut cache, additions, removals)
    };

    if let Some(revision) = revision {
        shared.revisions.update_current_revision(revision, get_now());
    }
    if diff.is_empty() {
        debug!("handle_update(): update for {} changed nothing", store_id);
    } else {
        debug!(
            "handle_update(): {} addition(s), {} removal(s) for {}",
            diff.additions.len(),
            diff.removals.len(),
            store_id
        );
        shared.diff_observers.notify(&diff);
    }
    diff
}

/// Applies pushed changes to the cache. Additions are reported only when
/// their key was not cached yet. Removals are always reported, once per key,
/// since the cache may not have seen the statement before it went away.
/// Echoes of our own commits change the cache but are not reported.
pub(crate) fn fold_update(
    cache: &mut CacheState,
    additions: Vec<LinkExpression>,
    removals: Vec<LinkExpression>,
) -> PerspectiveDiff {
    let mut diff = PerspectiveDiff::new();

    for addition in additions {
        let key = CacheKey::from(&addition);
        cache.journal.record(&key);
        let echoed = cache.echoes.take(&key);
        if cache.links.upsert(addition.clone()).is_none() && !echoed {
            diff.additions.push(addition);
        }
    }

    let mut removed = HashSet::new();
    for removal in removals {
        let key = CacheKey::from(&removal);
        cache.journal.record(&key);
        let echoed = cache.echoes.take(&key);
        cache.links.remove(&key);
        if !echoed && removed.insert(key) {
            diff.removals.push(removal);
        }
    }

    diff
}
