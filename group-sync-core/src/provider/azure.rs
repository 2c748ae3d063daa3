//! Microsoft Graph provider.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use super::{check_url, http_client, request_token, send_json};
use crate::config::{ProviderConfig, SyncScope, DEFAULT_AUTHORITY_HOST, DEFAULT_GRAPH_URL};
use crate::contract::{Credential, DirectoryClient, NativeGroup, NativeUser, Provider};
use crate::error::{AuthenticationError, TransportError, ValidationError};

pub const TENANT_ID_KEY: &str = "AZURE_TENANT_ID";
pub const CLIENT_ID_KEY: &str = "AZURE_CLIENT_ID";
pub const CLIENT_SECRET_KEY: &str = "AZURE_CLIENT_SECRET";

const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";
const GRAPH_GROUP_TYPE: &str = "#microsoft.graph.group";
const GRAPH_USER_TYPE: &str = "#microsoft.graph.user";
const ODATA_TYPE: &str = "@odata.type";
const DEFAULT_USERNAME_ATTRIBUTE: &str = "userPrincipalName";
const DEFAULT_BASE_GROUP_DEPTH: usize = 1;

pub struct AzureProvider {
    config: ProviderConfig,
}

impl AzureProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    fn authority_host(&self) -> &str {
        self.config.url.as_deref().unwrap_or(DEFAULT_AUTHORITY_HOST)
    }
}

#[async_trait]
impl Provider for AzureProvider {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn init(&mut self) -> bool {
        let mut changed = false;

        if self.config.url.is_none() {
            self.config.url = Some(DEFAULT_AUTHORITY_HOST.to_string());
            changed = true;
        }

        // Graph groups carry no sub-group stubs.
        if self.config.scope.is_none() {
            self.config.scope = Some(SyncScope::GroupOnly);
            changed = true;
        }

        changed
    }

    fn validate(&self, credential: &Credential) -> Vec<ValidationError> {
        let mut errors = credential.missing_keys(&[TENANT_ID_KEY, CLIENT_ID_KEY, CLIENT_SECRET_KEY]);

        if let Some(url) = self.config.url.as_deref() {
            errors.extend(check_url(url));
        }
        if let Some(graph_url) = self.config.graph_url.as_deref() {
            errors.extend(check_url(graph_url));
        }
        errors
    }

    async fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<Box<dyn DirectoryClient>, AuthenticationError> {
        let secret = |key: &str| {
            credential
                .get_str(key)
                .ok_or_else(|| AuthenticationError::MissingSecret(key.to_string()))
        };
        let tenant_id = secret(TENANT_ID_KEY)?;
        let client_id = secret(CLIENT_ID_KEY)?;
        let client_secret = secret(CLIENT_SECRET_KEY)?;

        let http = http_client(self.config.insecure, None)?;
        let token_url = format!(
            "{}/{tenant_id}/oauth2/v2.0/token",
            self.authority_host().trim_end_matches('/')
        );
        info!(url = %token_url, "Requesting Graph access token");
        let token = request_token(http.post(&token_url).form(&[
            ("grant_type", "client_credentials"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("scope", GRAPH_SCOPE),
        ]))
        .await?;

        let username_attributes = if self.config.username_attributes.is_empty() {
            vec![DEFAULT_USERNAME_ATTRIBUTE.to_string()]
        } else {
            self.config.username_attributes.clone()
        };

        Ok(Box::new(GraphClient {
            http,
            graph_url: self
                .config
                .graph_url
                .as_deref()
                .unwrap_or(DEFAULT_GRAPH_URL)
                .trim_end_matches('/')
                .to_string(),
            token,
            base_groups: self.config.base_groups.clone(),
            base_group_depth: self
                .config
                .base_group_depth
                .unwrap_or(DEFAULT_BASE_GROUP_DEPTH),
            filter: self.config.filter.clone().filter(|f| !f.is_empty()),
            username_attributes,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct ODataPage {
    value: Vec<Map<String, Value>>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

fn string_field(object: &Map<String, Value>, field: &str) -> Option<String> {
    object.get(field).and_then(Value::as_str).map(String::from)
}

fn is_type(object: &Map<String, Value>, odata_type: &str) -> bool {
    object.get(ODATA_TYPE).and_then(Value::as_str) == Some(odata_type)
}

fn to_group(object: &Map<String, Value>) -> Option<NativeGroup> {
    Some(NativeGroup {
        id: string_field(object, "id")?,
        name: string_field(object, "displayName"),
        sub_groups: Vec::new(),
    })
}

fn escape_odata(value: &str) -> String {
    value.replace('\'', "''")
}

pub struct GraphClient {
    http: reqwest::Client,
    graph_url: String,
    token: String,
    base_groups: Vec<String>,
    base_group_depth: usize,
    filter: Option<String>,
    username_attributes: Vec<String>,
}

impl GraphClient {
    /// Follow `@odata.nextLink` until exhausted.
    async fn get_all(
        &self,
        path: &str,
        filter: Option<&str>,
    ) -> Result<Vec<Map<String, Value>>, TransportError> {
        let mut request = self
            .http
            .get(format!("{}{path}", self.graph_url))
            .bearer_auth(&self.token);
        if let Some(filter) = filter {
            request = request.query(&[("$filter", filter)]);
        }

        let mut all = Vec::new();
        let mut page: ODataPage = send_json(request).await?;
        loop {
            all.append(&mut page.value);
            match page.next_link.take() {
                Some(next) => {
                    page = send_json(self.http.get(&next).bearer_auth(&self.token)).await?;
                }
                None => break,
            }
        }
        Ok(all)
    }

    fn username_for(&self, user: &Map<String, Value>) -> Option<String> {
        self.username_attributes
            .iter()
            .find_map(|attribute| string_field(user, attribute))
    }

    /// Base groups plus the group-typed members reached breadth-first from them.
    async fn expand_base_groups(&self) -> Result<Vec<NativeGroup>, TransportError> {
        let mut groups = Vec::new();
        let mut seen = HashSet::new();

        for base_group in &self.base_groups {
            let filter = format!("displayName eq '{}'", escape_odata(base_group));
            let matches = self.get_all("/groups", Some(&filter)).await.map_err(|e| {
                error!(base_group = %base_group, error = %e, "Failed to get base group");
                e
            })?;

            if matches.len() != 1 {
                info!(base_group = %base_group, found = matches.len(), "Failed to find a single base group to search from");
                continue;
            }
            let Some(root) = to_group(&matches[0]) else {
                warn!(base_group = %base_group, "Base group record has no id");
                continue;
            };

            let mut queue = VecDeque::new();
            if seen.insert(root.id.clone()) {
                queue.push_back((root.id.clone(), 0));
                groups.push(root);
            }

            while let Some((group_id, depth)) = queue.pop_front() {
                if depth >= self.base_group_depth {
                    continue;
                }
                let members = self
                    .get_all(&format!("/groups/{group_id}/members"), self.filter.as_deref())
                    .await
                    .map_err(|e| {
                        error!(base_group = %base_group, group_id = %group_id, error = %e, "Failed to get base group members");
                        e
                    })?;

                for member in members.iter().filter(|m| is_type(m, GRAPH_GROUP_TYPE)) {
                    if let Some(group) = to_group(member) {
                        if seen.insert(group.id.clone()) {
                            queue.push_back((group.id.clone(), depth + 1));
                            groups.push(group);
                        }
                    }
                }
            }
        }

        Ok(groups)
    }
}

#[async_trait]
impl DirectoryClient for GraphClient {
    async fn list_top_level_groups(
        &self,
        _scope: SyncScope,
    ) -> Result<Vec<NativeGroup>, TransportError> {
        if !self.base_groups.is_empty() {
            return self.expand_base_groups().await;
        }

        let objects = self.get_all("/groups", self.filter.as_deref()).await?;
        debug!(count = objects.len(), "Fetched Graph groups");
        Ok(objects.iter().filter_map(to_group).collect())
    }

    async fn list_group_members(&self, group_id: &str) -> Result<Vec<NativeUser>, TransportError> {
        let members = self
            .get_all(&format!("/groups/{group_id}/transitiveMembers"), None)
            .await?;

        let mut users = Vec::new();
        for member in members.iter().filter(|m| is_type(m, GRAPH_USER_TYPE)) {
            let id = string_field(member, "id").unwrap_or_default();
            match self.username_for(member) {
                Some(username) => users.push(NativeUser::new(id, username)),
                None => {
                    warn!(group_id, user_id = %id, "Username for user cannot be found in group");
                }
            }
        }
        Ok(users)
    }
}
