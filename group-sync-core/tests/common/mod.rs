//! Shared fixtures for group-sync-core integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use group_sync_core::config::SyncScope;
use group_sync_core::contract::{DirectoryClient, NativeGroup, NativeUser};
use group_sync_core::error::TransportError;

/// In-memory directory: fixed top-level groups and members per group id.
#[derive(Clone, Default)]
pub struct StaticDirectory {
    pub top_level: Vec<NativeGroup>,
    pub members: HashMap<String, Vec<NativeUser>>,
    pub failing_group: Option<String>,
    pub member_calls: Arc<Mutex<Vec<String>>>,
}

impl StaticDirectory {
    pub fn new(top_level: Vec<NativeGroup>) -> Self {
        Self {
            top_level,
            ..Self::default()
        }
    }

    pub fn with_members(mut self, group_id: &str, usernames: &[&str]) -> Self {
        self.members.insert(
            group_id.to_string(),
            usernames.iter().map(|name| user(name)).collect(),
        );
        self
    }

    pub fn failing_on(mut self, group_id: &str) -> Self {
        self.failing_group = Some(group_id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.member_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DirectoryClient for StaticDirectory {
    async fn list_top_level_groups(
        &self,
        _scope: SyncScope,
    ) -> Result<Vec<NativeGroup>, TransportError> {
        Ok(self.top_level.clone())
    }

    async fn list_group_members(&self, group_id: &str) -> Result<Vec<NativeUser>, TransportError> {
        self.member_calls.lock().unwrap().push(group_id.to_string());
        if self.failing_group.as_deref() == Some(group_id) {
            return Err(TransportError::Status {
                url: format!("https://directory.test/groups/{group_id}/members"),
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(self.members.get(group_id).cloned().unwrap_or_default())
    }
}

pub fn user(name: &str) -> NativeUser {
    NativeUser::new(format!("uid-{name}"), name)
}

pub fn group(id: &str, name: &str, sub_groups: Vec<NativeGroup>) -> NativeGroup {
    NativeGroup::new(id, name).with_sub_groups(sub_groups)
}

pub fn usernames(users: &[NativeUser]) -> Vec<String> {
    users.iter().map(|u| u.username.clone()).collect()
}
