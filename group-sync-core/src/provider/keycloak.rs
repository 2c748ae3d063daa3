//! Keycloak admin REST API provider.
//!
//! Endpoints are resolved relative to the configured `url`. Servers that still
//! serve under the legacy `/auth` context path need it included in `url`.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{check_url, http_client, request_token, send_json};
use crate::config::{ProviderConfig, SyncScope, DEFAULT_LOGIN_REALM};
use crate::contract::{Credential, DirectoryClient, NativeGroup, NativeUser, Provider};
use crate::error::{AuthenticationError, TransportError, ValidationError};

pub const SECRET_USERNAME_KEY: &str = "username";
pub const SECRET_PASSWORD_KEY: &str = "password";
pub const SECRET_CA_KEY: &str = "ca.crt";

const ADMIN_CLIENT_ID: &str = "admin-cli";
const PAGE_SIZE: usize = 100;

pub struct KeycloakProvider {
    config: ProviderConfig,
}

impl KeycloakProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    fn base_url(&self) -> String {
        self.config
            .url
            .as_deref()
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string()
    }
}

#[async_trait]
impl Provider for KeycloakProvider {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn init(&mut self) -> bool {
        let mut changed = false;

        if self.config.login_realm.as_deref().unwrap_or_default().is_empty() {
            self.config.login_realm = Some(DEFAULT_LOGIN_REALM.to_string());
            changed = true;
        }

        if self.config.scope.is_none() {
            self.config.scope = Some(SyncScope::IncludeSubgroups);
            changed = true;
        }

        changed
    }

    fn validate(&self, credential: &Credential) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        match self.config.url.as_deref() {
            Some(url) => errors.extend(check_url(url)),
            None => errors.push(ValidationError::MissingField("url")),
        }

        if self.config.realm.as_deref().unwrap_or_default().is_empty() {
            errors.push(ValidationError::MissingField("realm"));
        }

        errors.extend(credential.missing_keys(&[SECRET_USERNAME_KEY, SECRET_PASSWORD_KEY]));
        errors
    }

    async fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<Box<dyn DirectoryClient>, AuthenticationError> {
        let username = credential
            .get_str(SECRET_USERNAME_KEY)
            .ok_or_else(|| AuthenticationError::MissingSecret(SECRET_USERNAME_KEY.into()))?;
        let password = credential
            .get_str(SECRET_PASSWORD_KEY)
            .ok_or_else(|| AuthenticationError::MissingSecret(SECRET_PASSWORD_KEY.into()))?;

        let http = http_client(self.config.insecure, credential.get(SECRET_CA_KEY))?;
        let base_url = self.base_url();
        let login_realm = self
            .config
            .login_realm
            .as_deref()
            .unwrap_or(DEFAULT_LOGIN_REALM);

        let token_url = format!("{base_url}/realms/{login_realm}/protocol/openid-connect/token");
        info!(url = %token_url, "Requesting Keycloak admin token");
        let token = request_token(http.post(&token_url).form(&[
            ("grant_type", "password"),
            ("client_id", ADMIN_CLIENT_ID),
            ("username", username.as_str()),
            ("password", password.as_str()),
        ]))
        .await?;

        Ok(Box::new(KeycloakClient {
            http,
            admin_url: format!(
                "{base_url}/admin/realms/{}",
                self.config.realm.as_deref().unwrap_or_default()
            ),
            token,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct GroupRepresentation {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "subGroups")]
    sub_groups: Vec<GroupRepresentation>,
}

impl From<GroupRepresentation> for NativeGroup {
    fn from(group: GroupRepresentation) -> Self {
        NativeGroup {
            id: group.id,
            name: group.name,
            sub_groups: group.sub_groups.into_iter().map(NativeGroup::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserRepresentation {
    id: String,
    #[serde(default)]
    username: Option<String>,
}

pub struct KeycloakClient {
    http: reqwest::Client,
    admin_url: String,
    token: String,
}

impl KeycloakClient {
    /// Page through a `first`/`max` list endpoint until a short page.
    async fn get_all<T>(&self, url: &str, brief: bool) -> Result<Vec<T>, TransportError>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut all = Vec::new();
        let mut first = 0;
        loop {
            let page: Vec<T> = send_json(
                self.http
                    .get(url)
                    .bearer_auth(&self.token)
                    .query(&[
                        ("first", first.to_string()),
                        ("max", PAGE_SIZE.to_string()),
                        ("briefRepresentation", brief.to_string()),
                    ]),
            )
            .await?;
            let size = page.len();
            all.extend(page);
            if size < PAGE_SIZE {
                break;
            }
            first += PAGE_SIZE;
        }
        Ok(all)
    }
}

#[async_trait]
impl DirectoryClient for KeycloakClient {
    async fn list_top_level_groups(
        &self,
        _scope: SyncScope,
    ) -> Result<Vec<NativeGroup>, TransportError> {
        let url = format!("{}/groups", self.admin_url);
        let groups: Vec<GroupRepresentation> = self.get_all(&url, false).await?;
        debug!(count = groups.len(), "Fetched Keycloak groups");
        Ok(groups.into_iter().map(NativeGroup::from).collect())
    }

    async fn list_group_members(&self, group_id: &str) -> Result<Vec<NativeUser>, TransportError> {
        let url = format!("{}/groups/{group_id}/members", self.admin_url);
        let users: Vec<UserRepresentation> = self.get_all(&url, true).await?;

        Ok(users
            .into_iter()
            .filter_map(|user| match user.username {
                Some(username) if !username.is_empty() => Some(NativeUser::new(user.id, username)),
                _ => {
                    warn!(group_id, user_id = %user.id, "Skipping Keycloak user without username");
                    None
                }
            })
            .collect())
    }
}
