//! Canonical mapper: native group + resolved usernames -> [`CanonicalGroup`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::contract::NativeGroup;
use crate::error::SyncError;

pub const SOURCE_HOST_ANNOTATION: &str = "group-sync/source-host";
pub const SOURCE_UID_ANNOTATION: &str = "group-sync/source-uid";

/// The provider-independent group record handed to the group writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalGroup {
    pub kind: String,
    pub name: String,
    pub annotations: BTreeMap<String, String>,
    pub users: Vec<String>,
}

impl CanonicalGroup {
    pub fn source_host(&self) -> Option<&str> {
        self.annotations
            .get(SOURCE_HOST_ANNOTATION)
            .map(String::as_str)
    }

    pub fn source_uid(&self) -> Option<&str> {
        self.annotations.get(SOURCE_UID_ANNOTATION).map(String::as_str)
    }
}

/// Host portion of a provider URL, used for the source-host annotation.
pub fn source_host(provider_url: &str) -> Result<String, SyncError> {
    let parsed = Url::parse(provider_url).map_err(|source| SyncError::InvalidUrl {
        url: provider_url.to_string(),
        source,
    })?;
    let host = parsed.host_str().unwrap_or_default();
    Ok(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Returns `None` (with a warning) when the group has no usable display name.
pub fn map_group(group: &NativeGroup, users: Vec<String>, host: &str) -> Option<CanonicalGroup> {
    let name = match group.name.as_deref() {
        Some(name) if !name.is_empty() => name,
        _ => {
            warn!(group_id = %group.id, "[MAP] Skipping group record with empty display name");
            return None;
        }
    };

    let annotations = BTreeMap::from([
        (SOURCE_HOST_ANNOTATION.to_string(), host.to_string()),
        (SOURCE_UID_ANNOTATION.to_string(), group.id.clone()),
    ]);

    Some(CanonicalGroup {
        kind: "Group".to_string(),
        name: name.to_string(),
        annotations,
        users,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_name_annotations_and_users() {
        let group = NativeGroup::new("1b9e", "eng");
        let mapped = map_group(&group, vec!["alice".into(), "bob".into()], "kc.example.com")
            .expect("named group maps");

        assert_eq!(mapped.kind, "Group");
        assert_eq!(mapped.name, "eng");
        assert_eq!(mapped.source_host(), Some("kc.example.com"));
        assert_eq!(mapped.source_uid(), Some("1b9e"));
        assert_eq!(mapped.users, vec!["alice", "bob"]);
    }

    #[test]
    fn drops_group_without_name() {
        let mut group = NativeGroup::new("x", "");
        assert!(map_group(&group, Vec::new(), "host").is_none());

        group.name = None;
        assert!(map_group(&group, Vec::new(), "host").is_none());
    }

    #[test]
    fn source_host_keeps_explicit_port() {
        assert_eq!(
            source_host("https://keycloak.example.com:8443/auth").unwrap(),
            "keycloak.example.com:8443"
        );
        assert_eq!(
            source_host("https://login.microsoftonline.com/").unwrap(),
            "login.microsoftonline.com"
        );
        assert!(matches!(
            source_host("not a url"),
            Err(SyncError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn serializes_kind_field() {
        let group = map_group(&NativeGroup::new("g", "ops"), vec![], "h").unwrap();
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["kind"], "Group");
        assert_eq!(json["annotations"][SOURCE_UID_ANNOTATION], "g");
    }
}
