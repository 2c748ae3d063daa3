use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_LOGIN_REALM: &str = "master";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com/";
pub const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/v1.0";

/// Whether a sync descends into sub-groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncScope {
    /// Group-only: members of each listed group, no descent.
    #[serde(rename = "one")]
    GroupOnly,
    /// Walk sub-groups and bubble their members up into ancestors.
    #[serde(rename = "sub")]
    IncludeSubgroups,
}

/// Selects the provider family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Realm-based identity server with nested sub-groups.
    Keycloak,
    /// Cloud directory graph with base-group scoped search.
    Azure,
}

/// Configuration of one provider instance. Read-only for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Instance name, used in logs and reports.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    /// Server URL (Keycloak) or authority host (Azure).
    #[serde(default)]
    pub url: Option<String>,
    /// Realm whose groups are synchronised.
    #[serde(default)]
    pub realm: Option<String>,
    /// Realm the admin credentials log into.
    #[serde(default)]
    pub login_realm: Option<String>,
    #[serde(default)]
    pub scope: Option<SyncScope>,
    #[serde(default)]
    pub insecure: bool,
    #[serde(default)]
    pub base_groups: Vec<String>,
    /// How many levels of group-typed members a base group expands through.
    #[serde(default)]
    pub base_group_depth: Option<usize>,
    /// Provider-native filter expression narrowing group/member queries.
    #[serde(default)]
    pub filter: Option<String>,
    /// User attributes tried in order to find a username.
    #[serde(default)]
    pub username_attributes: Vec<String>,
    /// Allow-list of top-level group names. Empty allows every group.
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub prune: bool,
    /// Graph API base URL.
    #[serde(default)]
    pub graph_url: Option<String>,
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>, kind: ProviderKind) -> Self {
        Self {
            name: name.into(),
            kind,
            url: None,
            realm: None,
            login_realm: None,
            scope: None,
            insecure: false,
            base_groups: Vec::new(),
            base_group_depth: None,
            filter: None,
            username_attributes: Vec::new(),
            groups: Vec::new(),
            prune: false,
            graph_url: None,
        }
    }

    /// Scope in effect; include-subgroups when unset.
    pub fn effective_scope(&self) -> SyncScope {
        self.scope.unwrap_or(SyncScope::IncludeSubgroups)
    }

    pub fn trace_loaded(&self) {
        info!(
            provider = %self.name,
            kind = ?self.kind,
            url = self.url.as_deref().unwrap_or("<default>"),
            scope = ?self.scope,
            base_groups = self.base_groups.len(),
            allow_list = self.groups.len(),
            prune = self.prune,
            "Loaded provider config"
        );
        debug!(?self, "Provider config loaded (full debug)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_scope_is_rejected() {
        let json = r#"{ "name": "corp", "type": "keycloak", "scope": "everything" }"#;

        assert!(serde_json::from_str::<ProviderConfig>(json).is_err());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let json = r#"{ "name": "corp", "type": "keycloak", "url": "https://kc.example.com", "scope": "one" }"#;
        let config: ProviderConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.kind, ProviderKind::Keycloak);
        assert_eq!(config.scope, Some(SyncScope::GroupOnly));
        assert!(config.groups.is_empty());
        assert!(!config.prune);
        assert!(!config.insecure);
    }
}
