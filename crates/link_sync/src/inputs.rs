use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::config::RepoCaps;
use crate::REPO_DID_PREFIX;

/// Identifier of the repo an adapter is bound to, `did:ng:repo:<id>`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
pub struct StoreId(String);

impl StoreId {
    pub fn new(id: impl Into<String>) -> Self {
        StoreId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds a repo id from the raw store id a session hands out.
    pub fn from_private_store(store: &str) -> Self {
        if store.starts_with(REPO_DID_PREFIX) {
            StoreId(String::from(store))
        } else {
            StoreId(format!("{}{}", REPO_DID_PREFIX, store))
        }
    }

    /// The object NURI of the repo (`did:ng:<id>`), the form the store's
    /// query and subscribe endpoints expect.
    pub fn nuri(&self) -> String {
        match self.0.strip_prefix(REPO_DID_PREFIX) {
            Some(rest) => format!("did:ng:{}", rest),
            None => self.0.clone(),
        }
    }
}

impl From<&str> for StoreId {
    fn from(id: &str) -> Self {
        StoreId(String::from(id))
    }
}

/// Opaque revision token handed out by the store on every write.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, Display, From, Into)]
pub struct RevisionId(String);

impl RevisionId {
    pub fn new(id: impl Into<String>) -> Self {
        RevisionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RevisionId {
    fn from(id: &str) -> Self {
        RevisionId(String::from(id))
    }
}

pub type Did = String;

/// Passed to the store when provisioning the repo. `caps` is set when the
/// repo already exists and should be loaded instead of created.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RepoParams {
    pub name: Option<String>,
    pub uid: Option<String>,
    pub caps: Option<RepoCaps>,
}

impl RepoParams {
    pub fn label(&self) -> String {
        match (&self.name, &self.uid) {
            (Some(name), _) => format!("Link Sync Repo - {}", name),
            (None, Some(uid)) => format!("Link Sync Repo - {}", uid),
            (None, None) => String::from("Link Sync Repo"),
        }
    }
}
