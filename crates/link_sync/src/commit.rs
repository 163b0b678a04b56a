use tracing::{debug, error, warn};

use crate::adapter::Shared;
use crate::cache::CacheKey;
use crate::errors::LinkSyncResult;
use crate::inputs::{RevisionId, StoreId};
use crate::store::StoredStatement;
use crate::utils::{dedup_links, get_now};
use link_sync_integrity::{LinkExpression, PerspectiveDiff};

/// Writes `diff` to the store and applies it to the cache without waiting
/// for the store to echo it back.
pub(crate) async fn commit(shared: &Shared, store_id: &StoreId, diff: PerspectiveDiff) -> LinkSyncResult<RevisionId> {
    let PerspectiveDiff {
        additions,
        removals,
    } = diff;

    let mut signed_additions = Vec::with_capacity(additions.len());
    for addition in dedup_links(additions) {
        signed_additions.push(sign_if_needed(shared, addition).await);
    }
    let additions = signed_additions
        .iter()
        .map(StoredStatement::from)
        .collect::<Vec<StoredStatement>>();
    let removals = dedup_links(removals)
        .iter()
        .map(StoredStatement::from)
        .collect::<Vec<StoredStatement>>();
    debug!(
        "commit(): writing {} addition(s), {} removal(s) to {}",
        additions.len(),
        removals.len(),
        store_id
    );

    // the echo can be folded in before apply_changes returns
    let echo_keys = if shared.expects_echoes() {
        additions
            .iter()
            .chain(removals.iter())
            .map(|stored| CacheKey::of_statement(&stored.statement))
            .collect::<Vec<CacheKey>>()
    } else {
        Vec::new()
    };
    {
        let mut cache = shared.cache.lock();
        for key in echo_keys.iter() {
            cache.echoes.expect(key);
        }
    }

    let revision = match shared
        .context
        .store
        .apply_changes(store_id, additions.clone(), removals.clone())
        .await
    {
        Ok(revision) => revision,
        Err(err) => {
            error!("commit(): failed to apply changes to {}: {}", store_id, err);
            let mut cache = shared.cache.lock();
            for key in echo_keys.iter() {
                cache.echoes.take(key);
            }
            return Err(err);
        }
    };

    // what the store now holds, with proofs as the next sync would see them
    let added = shared.proofs.attach_all(additions).await;
    {
        let mut cache = shared.cache.lock();
        for removal in removals.iter() {
            let key = CacheKey::of_statement(&removal.statement);
            cache.journal.record(&key);
            cache.links.remove(&key);
        }
        for link in added {
            cache.journal.record(&CacheKey::from(&link));
            cache.links.upsert(link);
        }
    }

    shared.revisions.update_current_revision(revision.clone(), get_now());
    Ok(revision)
}

async fn sign_if_needed(shared: &Shared, mut link: LinkExpression) -> LinkExpression {
    if link.author.is_empty() {
        link.author = String::from(shared.context.agent.did());
    }
    if link.proof.is_signed() {
        return link;
    }
    match shared.context.agent.sign(&link.data).await {
        Ok(proof) => link.proof = proof,
        Err(err) => {
            warn!("commit(): could not sign {}, writing it unsigned: {}", link.data, err);
        }
    }
    link
}
