use std::collections::{BTreeMap, HashMap};

use derive_more::Display;
use indexmap::IndexMap;

use crate::store::Statement;
use crate::CACHE_KEY_DELIMITER;
use link_sync_integrity::{LinkExpression, Triple};

/// `subject::predicate::object`. Identifies a statement independent of who
/// wrote it and when.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn of(data: &Triple) -> CacheKey {
        Self::join(&data.source, &data.predicate, &data.target)
    }

    pub fn of_statement(statement: &Statement) -> CacheKey {
        Self::join(&statement.subject, &statement.predicate, &statement.object)
    }

    fn join(subject: &str, predicate: &str, object: &str) -> CacheKey {
        CacheKey([subject, predicate, object].join(CACHE_KEY_DELIMITER))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&LinkExpression> for CacheKey {
    fn from(link: &LinkExpression) -> Self {
        CacheKey::of(&link.data)
    }
}

/// Last known expression per distinct statement, in insertion order.
#[derive(Clone, Debug, Default)]
pub struct LinkCache {
    entries: IndexMap<CacheKey, LinkExpression>,
}

impl LinkCache {
    pub fn new() -> LinkCache {
        LinkCache {
            entries: IndexMap::new(),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<LinkExpression> {
        self.entries.get(key).cloned()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the expression this one replaced, if any. A replaced entry
    /// keeps its position.
    pub fn upsert(&mut self, expr: LinkExpression) -> Option<LinkExpression> {
        self.entries.insert(CacheKey::from(&expr), expr)
    }

    pub fn remove(&mut self, key: &CacheKey) -> Option<LinkExpression> {
        self.entries.shift_remove(key)
    }

    pub fn snapshot(&self) -> Vec<(CacheKey, LinkExpression)> {
        self.entries
            .iter()
            .map(|(key, expr)| (key.clone(), expr.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Keys written by the push path while a full fetch is in flight. The fetch
/// result predates those writes, so reconciliation must leave them alone.
#[derive(Clone, Debug, Default)]
pub struct PushJournal {
    version: u64,
    touched: HashMap<CacheKey, u64>,
    in_flight: BTreeMap<u64, usize>,
}

impl PushJournal {
    pub fn begin_fetch(&mut self) -> u64 {
        let mark = self.version;
        *self.in_flight.entry(mark).or_default() += 1;
        mark
    }

    pub fn end_fetch(&mut self, mark: u64) {
        if let Some(count) = self.in_flight.get_mut(&mark) {
            *count -= 1;
            if *count == 0 {
                self.in_flight.remove(&mark);
            }
        }
        match self.in_flight.keys().next().copied() {
            Some(oldest) => self.touched.retain(|_, version| *version > oldest),
            None => self.touched.clear(),
        }
    }

    pub fn record(&mut self, key: &CacheKey) {
        self.version += 1;
        if !self.in_flight.is_empty() {
            self.touched.insert(key.clone(), self.version);
        }
    }

    pub fn touched_after(&self, key: &CacheKey, mark: u64) -> bool {
        self.touched
            .get(key)
            .map(|version| *version > mark)
            .unwrap_or(false)
    }

    pub fn in_flight_fetches(&self) -> usize {
        self.in_flight.values().sum()
    }

    pub fn clear(&mut self) {
        self.touched.clear();
        self.in_flight.clear();
    }
}

/// Keys of our own writes whose echo from the store has not been seen yet.
/// Counted, since the same key can be written again before its first echo
/// arrives.
#[derive(Clone, Debug, Default)]
pub struct PendingEchoes {
    counts: HashMap<CacheKey, usize>,
}

impl PendingEchoes {
    pub fn expect(&mut self, key: &CacheKey) {
        *self.counts.entry(key.clone()).or_default() += 1;
    }

    /// Consumes one expected echo for `key`, returns whether there was one.
    pub fn take(&mut self, key: &CacheKey) -> bool {
        match self.counts.get_mut(key) {
            Some(count) => {
                *count -= 1;
                if *count == 0 {
                    self.counts.remove(key);
                }
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

/// Everything guarded by the adapter's cache lock.
#[derive(Clone, Debug, Default)]
pub struct CacheState {
    pub links: LinkCache,
    pub journal: PushJournal,
    pub echoes: PendingEchoes,
}
