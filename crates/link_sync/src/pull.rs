use std::collections::HashSet;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::adapter::Shared;
use crate::cache::{CacheKey, CacheState};
use crate::inputs::StoreId;
use link_sync_integrity::{LinkExpression, PerspectiveDiff};

/// Fetches the full statement set and reconciles the cache against it. A
/// failed fetch leaves the cache alone and yields an empty diff.
pub(crate) async fn pull(shared: &Shared, store_id: &StoreId) -> PerspectiveDiff {
    let fetch = FetchGuard::begin(&shared.cache);

    let fetched = match shared.context.store.list_statements(store_id).await {
        Ok(fetched) => fetched,
        Err(err) => {
            warn!("pull(): failed to list statements of {}: {}", store_id, err);
            return PerspectiveDiff::new();
        }
    };
    debug!("pull(): fetched {} statement(s) from {}", fetched.len(), store_id);
    let links = shared.proofs.attach_all(fetched).await;

    let mut cache = shared.cache.lock();
    if shared.bound_store().as_ref() != Some(store_id) {
        debug!("pull(): {} was unbound during the fetch, dropping it", store_id);
        fetch.finish(&mut cache);
        return PerspectiveDiff::new();
    }
    let diff = reconcile(&mut cache, links, fetch.mark());
    fetch.finish(&mut cache);
    debug!(
        "pull(): {} addition(s), {} removal(s), {} cached",
        diff.additions.len(),
        diff.removals.len(),
        cache.links.len()
    );
    diff
}

/// Marks a fetch as in flight in the push journal until it is finished or
/// dropped, so an abandoned `sync()` future does not keep the journal
/// recording forever.
pub(crate) struct FetchGuard<'a> {
    cache: &'a Mutex<CacheState>,
    mark: u64,
    finished: bool,
}

impl<'a> FetchGuard<'a> {
    pub(crate) fn begin(cache: &'a Mutex<CacheState>) -> FetchGuard<'a> {
        let mark = cache.lock().journal.begin_fetch();
        FetchGuard {
            cache,
            mark,
            finished: false,
        }
    }

    pub(crate) fn mark(&self) -> u64 {
        self.mark
    }

    /// Ends the fetch under a lock the caller already holds.
    pub(crate) fn finish(mut self, cache: &mut CacheState) {
        cache.journal.end_fetch(self.mark);
        self.finished = true;
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.cache.lock().journal.end_fetch(self.mark);
        }
    }
}

/// Makes `fetched` the new baseline of the cache and returns the difference
/// to the old one. Keys the push path touched after `mark` are newer than the
/// fetch and are skipped.
pub(crate) fn reconcile(cache: &mut CacheState, fetched: Vec<LinkExpression>, mark: u64) -> PerspectiveDiff {
    let mut diff = PerspectiveDiff::new();
    let mut fresh = HashSet::new();

    for link in fetched {
        let key = CacheKey::from(&link);
        if !fresh.insert(key.clone()) {
            continue;
        }
        if cache.journal.touched_after(&key, mark) {
            continue;
        }
        if !cache.links.contains(&key) {
            diff.additions.push(link.clone());
        }
        cache.links.upsert(link);
    }

    for (key, link) in cache.links.snapshot() {
        if fresh.contains(&key) || cache.journal.touched_after(&key, mark) {
            continue;
        }
        cache.links.remove(&key);
        diff.removals.push(link);
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::create_link_expression;
    use link_sync_integrity::Triple;

    fn keys(links: &[LinkExpression]) -> Vec<String> {
        links.iter().map(|link| CacheKey::from(link).to_string()).collect()
    }

    #[test]
    fn diff_against_cache() {
        let mut cache = CacheState::default();
        cache.links.upsert(create_link_expression("a", "a"));
        cache.links.upsert(create_link_expression("b", "b"));

        let mark = cache.journal.begin_fetch();
        let diff = reconcile(
            &mut cache,
            vec![create_link_expression("b", "b"), create_link_expression("c", "c")],
            mark,
        );
        cache.journal.end_fetch(mark);

        assert_eq!(keys(&diff.additions), vec!["c::p::c"]);
        assert_eq!(keys(&diff.removals), vec!["a::p::a"]);
        let cached = cache
            .links
            .snapshot()
            .into_iter()
            .map(|(key, _)| key.to_string())
            .collect::<HashSet<String>>();
        assert_eq!(cached, hashset! {String::from("b::p::b"), String::from("c::p::c")});
    }

    #[test]
    fn second_reconcile_is_empty() {
        let mut cache = CacheState::default();
        let fetched = vec![create_link_expression("a", "b"), create_link_expression("b", "c")];

        let diff = reconcile(&mut cache, fetched.clone(), 0);
        assert_eq!(diff.additions.len(), 2);
        let diff = reconcile(&mut cache, fetched, 0);
        assert!(diff.is_empty());
    }

    #[test]
    fn duplicate_rows_count_once() {
        let mut cache = CacheState::default();
        let mut duplicate = create_link_expression("a", "b");
        duplicate.author = String::from("did:key:other");

        let diff = reconcile(&mut cache, vec![create_link_expression("a", "b"), duplicate], 0);
        assert_eq!(diff.additions.len(), 1);
        assert_eq!(diff.additions[0].author, "Test author");
        assert_eq!(cache.links.len(), 1);
    }

    #[test]
    fn empty_fetch_removes_everything() {
        let mut cache = CacheState::default();
        cache.links.upsert(create_link_expression("a", "b"));
        let diff = reconcile(&mut cache, vec![], 0);
        assert_eq!(keys(&diff.removals), vec!["a::p::b"]);
        assert!(cache.links.is_empty());
    }

    #[test]
    fn dropped_fetch_is_no_longer_in_flight() {
        let cache = Mutex::new(CacheState::default());
        let fetch = FetchGuard::begin(&cache);
        assert_eq!(cache.lock().journal.in_flight_fetches(), 1);
        drop(fetch);
        assert_eq!(cache.lock().journal.in_flight_fetches(), 0);

        // nothing is recorded once no fetch is in flight
        let key = CacheKey::of(&Triple::new("a", "p", "b"));
        cache.lock().journal.record(&key);
        assert!(!cache.lock().journal.touched_after(&key, 0));
    }

    #[test]
    fn finished_fetch_is_ended_once() {
        let cache = Mutex::new(CacheState::default());
        let first = FetchGuard::begin(&cache);
        let second = FetchGuard::begin(&cache);
        {
            let mut state = cache.lock();
            first.finish(&mut state);
        }
        assert_eq!(cache.lock().journal.in_flight_fetches(), 1);
        drop(second);
        assert_eq!(cache.lock().journal.in_flight_fetches(), 0);
    }

    #[test]
    fn push_during_fetch_is_not_undone() {
        let mut cache = CacheState::default();
        cache.links.upsert(create_link_expression("old", "x"));
        let mark = cache.journal.begin_fetch();

        // pushed while the fetch was in flight: one addition, one removal
        let pushed = create_link_expression("new", "x");
        cache.journal.record(&CacheKey::from(&pushed));
        cache.links.upsert(pushed);
        let removed = CacheKey::of(&Triple::new("old", "p", "x"));
        cache.journal.record(&removed);
        cache.links.remove(&removed);

        // the fetch still sees the old state
        let diff = reconcile(&mut cache, vec![create_link_expression("old", "x")], mark);
        cache.journal.end_fetch(mark);

        assert!(diff.is_empty());
        assert!(cache.links.contains(&CacheKey::of(&Triple::new("new", "p", "x"))));
        assert!(!cache.links.contains(&removed));
    }
}
