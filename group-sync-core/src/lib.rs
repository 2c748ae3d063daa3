#![doc = "group-sync-core: provider-agnostic engine for directory group synchronisation."]

//! This crate turns provider-native group and member records into canonical
//! groups. It walks nested group hierarchies, bubbles members from sub-groups
//! into their ancestors, filters by allow-list and normalises the result.
//!
//! Writing canonical groups into a target system, scheduling and CLI concerns
//! live outside this crate.
//!
//! # Usage
//! Build a [`synchronise::Syncer`] per provider instance from a
//! [`config::ProviderConfig`] (via [`provider::build_provider`]) and a
//! [`contract::Credential`], then call [`synchronise::Syncer::run`] or
//! [`synchronise::synchronise_all`].

pub mod cache;
pub mod config;
pub mod contract;
pub mod error;
pub mod filter;
pub mod mapper;
pub mod provider;
pub mod synchronise;
pub mod walker;
