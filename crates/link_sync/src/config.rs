use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{LinkSyncError, LinkSyncResult};
use crate::inputs::RepoParams;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplateData {
    pub name: Option<String>,
    pub uid: Option<String>,
}

/// Per-language configuration, usually deserialized from the template data a
/// perspective is created with.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkSyncConfig {
    pub storage_directory: Option<PathBuf>,
    pub template_data: TemplateData,
    /// `nextgraph://<repo>?readKey=..&writeKey=..` of an existing repo.
    pub repo_uri: Option<String>,
}

impl LinkSyncConfig {
    pub fn from_json(json: &str) -> LinkSyncResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn repo_params(&self) -> LinkSyncResult<RepoParams> {
        let caps = match &self.repo_uri {
            Some(uri) => Some(RepoCaps::parse(uri)?),
            None => None,
        };
        Ok(RepoParams {
            name: self.template_data.name.clone(),
            uid: self.template_data.uid.clone(),
            caps,
        })
    }
}

/// Capabilities encoded in a repo URI.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RepoCaps {
    pub repo_id: String,
    pub read_key: Option<String>,
    pub write_key: Option<String>,
}

impl RepoCaps {
    pub fn parse(uri: &str) -> LinkSyncResult<Self> {
        let url = Url::parse(uri)?;
        if url.scheme() != "nextgraph" {
            return Err(LinkSyncError::Config(format!(
                "Unsupported repo uri scheme: {}",
                url.scheme()
            )));
        }
        let repo_id = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| LinkSyncError::Config(format!("Repo uri without repo id: {}", uri)))?;

        let mut caps = RepoCaps {
            repo_id: String::from(repo_id),
            read_key: None,
            write_key: None,
        };
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "readKey" if !value.is_empty() => caps.read_key = Some(value.into_owned()),
                "writeKey" if !value.is_empty() => caps.write_key = Some(value.into_owned()),
                _ => {}
            }
        }
        Ok(caps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repo_uri_with_keys() {
        let caps = RepoCaps::parse("nextgraph://repo-1?readKey=r1&writeKey=w1").unwrap();
        assert_eq!(caps.repo_id, "repo-1");
        assert_eq!(caps.read_key.as_deref(), Some("r1"));
        assert_eq!(caps.write_key.as_deref(), Some("w1"));
    }

    #[test]
    fn parses_repo_uri_without_keys() {
        let caps = RepoCaps::parse("nextgraph://repo-1").unwrap();
        assert_eq!(caps.repo_id, "repo-1");
        assert_eq!(caps.read_key, None);
        assert_eq!(caps.write_key, None);
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert!(matches!(
            RepoCaps::parse("https://repo-1"),
            Err(LinkSyncError::Config(_))
        ));
        assert!(RepoCaps::parse("not a uri").is_err());
    }

    #[test]
    fn config_from_template_json() {
        let config = LinkSyncConfig::from_json(
            r#"{
                "storageDirectory": "/tmp/link-sync",
                "templateData": { "name": "CommunityGarden" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.storage_directory, Some(PathBuf::from("/tmp/link-sync")));
        let params = config.repo_params().unwrap();
        assert_eq!(params.name.as_deref(), Some("CommunityGarden"));
        assert_eq!(params.uid, None);
        assert_eq!(params.caps, None);
    }

    #[test]
    fn config_with_bad_repo_uri_fails_on_params() {
        let config = LinkSyncConfig {
            repo_uri: Some(String::from("ftp://x")),
            ..Default::default()
        };
        assert!(config.repo_params().is_err());
    }
}
