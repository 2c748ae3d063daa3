//! # contract: the interface every directory provider plugs into
//!
//! This module defines the two traits the engine drives, plus the plain data
//! types that cross them:
//!
//! - [`Provider`]: per-instance lifecycle (defaults, validation, authentication).
//! - [`DirectoryClient`]: an authenticated handle that lists groups and members.
//!
//! The walker, mapper and filter only ever see these traits, never a concrete
//! provider type. Both traits are annotated for `mockall`, so the orchestrator
//! can be exercised end-to-end without a live directory.
//!
//! ## Adding a new provider family
//! - Implement [`Provider`] and a [`DirectoryClient`] for it.
//! - Extend [`crate::config::ProviderKind`] and the match in
//!   [`crate::provider::build_provider`].

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use mockall::automock;

use crate::config::{ProviderConfig, SyncScope};
use crate::error::{AuthenticationError, TransportError, ValidationError};

/// A group as the provider returns it, before normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeGroup {
    /// Provider-native identifier, unique within one provider's namespace.
    pub id: String,
    /// Display name. Absence is a skip condition, not an error.
    pub name: Option<String>,
    /// Nested sub-group stubs. Always empty for graph-directory providers.
    pub sub_groups: Vec<NativeGroup>,
}

impl NativeGroup {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            sub_groups: Vec::new(),
        }
    }

    pub fn with_sub_groups(mut self, sub_groups: Vec<NativeGroup>) -> Self {
        self.sub_groups = sub_groups;
        self
    }
}

/// A user as the provider returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeUser {
    pub id: String,
    pub username: String,
}

impl NativeUser {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

/// Opaque secret material (username/password/ca.crt, or tenant/client id/secret).
///
/// `Debug` lists key names only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential {
    data: BTreeMap<String, Vec<u8>>,
}

impl Credential {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.data.get(key).map(Vec::as_slice)
    }

    /// Value as UTF-8 text, lossily decoded.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Every key in `required` that is absent, reported one error per key.
    pub fn missing_keys(&self, required: &[&str]) -> Vec<ValidationError> {
        required
            .iter()
            .filter(|key| !self.contains(key))
            .map(|key| ValidationError::MissingSecretKey {
                key: (*key).to_string(),
            })
            .collect()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<K, V> FromIterator<(K, V)> for Credential
where
    K: Into<String>,
    V: Into<Vec<u8>>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut credential = Credential::new();
        for (key, value) in iter {
            credential.insert(key, value);
        }
        credential
    }
}

/// Authenticated handle onto one directory.
///
/// Pagination is hidden inside the implementor: every call returns the fully
/// materialised result in provider order.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Top-level groups. Hierarchical providers include sub-group stubs;
    /// graph providers with base groups perform their bounded expansion here.
    async fn list_top_level_groups(
        &self,
        scope: SyncScope,
    ) -> Result<Vec<NativeGroup>, TransportError>;

    /// Direct members of a group (transitive for graph providers).
    async fn list_group_members(&self, group_id: &str) -> Result<Vec<NativeUser>, TransportError>;
}

/// One provider instance: configuration plus the steps needed before a sync.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Configuration for this instance (with defaults applied once `init` ran).
    fn config(&self) -> &ProviderConfig;

    /// Fill unset defaults. Returns whether anything was defaulted.
    fn init(&mut self) -> bool;

    /// Collect every structural problem with the config and credential.
    fn validate(&self, credential: &Credential) -> Vec<ValidationError>;

    /// Single authentication attempt; no retry.
    async fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<Box<dyn DirectoryClient>, AuthenticationError>;
}
