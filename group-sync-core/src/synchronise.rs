//! High-level pipeline: init → validate → bind → walk + map, per provider.
//!
//! This module provides the orchestration for "synchronising" one or more
//! configured directory providers into canonical groups:
//!   - Fills provider defaults and reports whether any were applied
//!   - Validates config and credential, aggregating every problem into one error
//!   - Authenticates once (no retry) and keeps the bound [`DirectoryClient`]
//!   - Walks the group hierarchy into a fresh [`GroupCache`], filters the
//!     top-level set through the allow-list, and maps cached entries to
//!     [`CanonicalGroup`] records
//!
//! # Major Types
//! - [`Syncer`]: one provider instance with its own credential, client and cache
//! - [`SyncOutcome`]: canonical groups of one provider run, plus its prune flag
//! - [`SynchroniseReport`]: per-provider successes and failures of [`synchronise_all`]
//!
//! # Error Handling
//! Validation reports all causes together. Bind and sync are fail-fast: the
//! first error is returned and no partial output is produced for that provider.
//! [`synchronise_all`] isolates providers so one failure never hides the
//! others' results.
//!
//! # Concurrency
//! A [`Syncer`] is used by one task at a time (`&mut self`). Distinct syncers
//! share nothing and may run concurrently.

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::cache::GroupCache;
use crate::contract::{Credential, DirectoryClient, Provider};
use crate::error::{SyncError, ValidationError, ValidationErrors};
use crate::filter::filter_top_level;
use crate::mapper::{map_group, source_host, CanonicalGroup};
use crate::walker::walk;

/// Canonical groups produced by one provider run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub provider: String,
    /// Whether the group writer should prune groups this provider no longer reports.
    pub prune: bool,
    pub groups: Vec<CanonicalGroup>,
}

#[derive(Debug)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: SyncError,
}

#[derive(Debug, Default)]
pub struct SynchroniseReport {
    pub outcomes: Vec<SyncOutcome>,
    pub failures: Vec<ProviderFailure>,
}

impl SynchroniseReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Syncer {
    provider: Box<dyn Provider>,
    credential: Credential,
    credential_error: Option<String>,
    client: Option<Box<dyn DirectoryClient>>,
    cache: GroupCache,
}

impl Syncer {
    pub fn new(provider: Box<dyn Provider>, credential: Credential) -> Self {
        Self {
            provider,
            credential,
            credential_error: None,
            client: None,
            cache: GroupCache::new(),
        }
    }

    /// A syncer whose credential could not be looked up. Validation reports
    /// the lookup failure alongside every other problem.
    pub fn with_unavailable_credential(provider: Box<dyn Provider>, reason: impl Into<String>) -> Self {
        Self {
            credential_error: Some(reason.into()),
            ..Self::new(provider, Credential::new())
        }
    }

    pub fn name(&self) -> &str {
        &self.provider.config().name
    }

    /// Read-only view of the last run's cache.
    pub fn cache(&self) -> &GroupCache {
        &self.cache
    }

    pub fn init(&mut self) -> bool {
        let changed = self.provider.init();
        if changed {
            info!(provider = %self.name(), "[SYNC] Applied provider defaults");
        }
        changed
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        let mut errors = Vec::new();
        if let Some(reason) = &self.credential_error {
            errors.push(ValidationError::CredentialUnavailable(reason.clone()));
        }
        errors.extend(self.provider.validate(&self.credential));

        match ValidationErrors::from_vec(errors) {
            None => Ok(()),
            Some(errors) => {
                error!(provider = %self.name(), errors = %errors, "[SYNC][ERROR] Provider failed validation");
                Err(SyncError::Validation {
                    provider: self.name().to_string(),
                    errors,
                })
            }
        }
    }

    pub async fn bind(&mut self) -> Result<(), SyncError> {
        self.client = None;
        self.cache.clear();
        match self.provider.authenticate(&self.credential).await {
            Ok(client) => {
                info!(provider = %self.name(), "[SYNC] Successfully authenticated with provider");
                self.client = Some(client);
                Ok(())
            }
            Err(source) => {
                error!(provider = %self.name(), error = %source, "[SYNC][ERROR] Authentication failed");
                Err(SyncError::Authentication {
                    provider: self.name().to_string(),
                    source,
                })
            }
        }
    }

    /// Walk, filter and map. Requires a successful [`Syncer::bind`].
    pub async fn sync(&mut self) -> Result<Vec<CanonicalGroup>, SyncError> {
        let config = self.provider.config();
        let client = self
            .client
            .as_deref()
            .ok_or_else(|| SyncError::NotBound(config.name.clone()))?;

        self.cache.clear();
        let scope = config.effective_scope();
        let host = source_host(config.url.as_deref().unwrap_or_default())?;

        let top_level = client.list_top_level_groups(scope).await.map_err(|e| {
            error!(provider = %config.name, error = %e, "[SYNC][ERROR] Failed to get groups");
            e
        })?;
        info!(provider = %config.name, groups = top_level.len(), "[SYNC] Listed top-level groups");

        let top_level = filter_top_level(top_level, &config.groups);
        walk(client, top_level, scope, &mut self.cache).await?;

        let mut groups = Vec::with_capacity(self.cache.len());
        for (group, members) in self.cache.snapshot() {
            let users = members.into_iter().map(|user| user.username).collect();
            if let Some(canonical) = map_group(&group, users, &host) {
                debug!(group = %canonical.name, users = canonical.users.len(), "[SYNC] Mapped group");
                groups.push(canonical);
            }
        }

        info!(provider = %config.name, groups = groups.len(), "[SYNC] Synchronisation produced canonical groups");
        Ok(groups)
    }

    /// All four steps in order, inside a span identifying this run.
    pub async fn run(&mut self) -> Result<SyncOutcome, SyncError> {
        let span = info_span!("sync_run", provider = %self.name(), run_id = %Uuid::new_v4());
        async move {
            info!("[SYNC] Starting provider synchronisation");
            self.init();
            self.validate()?;
            self.bind().await?;
            let groups = self.sync().await?;
            Ok(SyncOutcome {
                provider: self.name().to_string(),
                prune: self.provider.config().prune,
                groups,
            })
        }
        .instrument(span)
        .await
    }
}

/// Run every syncer to completion and collect one result per provider.
pub async fn synchronise_all(syncers: &mut [Syncer]) -> SynchroniseReport {
    info!(providers = syncers.len(), "[SYNC] Starting full synchronisation");

    let runs = syncers.iter_mut().map(|syncer| async move {
        let provider = syncer.name().to_string();
        (provider, syncer.run().await)
    });

    let mut report = SynchroniseReport::default();
    for (provider, result) in join_all(runs).await {
        match result {
            Ok(outcome) => {
                info!(provider = %provider, groups = outcome.groups.len(), "[SYNC] Provider synchronised");
                report.outcomes.push(outcome);
            }
            Err(error) => {
                error!(provider = %provider, error = %error, "[SYNC][ERROR] Provider synchronisation failed");
                report.failures.push(ProviderFailure { provider, error });
            }
        }
    }
    report
}
