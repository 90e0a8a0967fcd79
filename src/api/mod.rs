//! Remote data provider abstraction and the PokeAPI client.
//!
//! This module provides:
//! - `Provider` trait for the read-only group/member/detail resources
//! - `PokeApi` implementation backed by a blocking reqwest client
//! - The data model shared by the selection pipeline

pub mod pokeapi;

use image::DynamicImage;
use thiserror::Error;

pub use pokeapi::PokeApi;

/// A selectable group ("dex") from the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub name: String,
}

impl GroupSummary {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A member listed inside a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    pub name: String,
    /// Entry number inside the owning group
    pub ordinal: u32,
    /// National identifier, when the provider exposes one
    pub species_id: Option<u32>,
}

impl MemberRef {
    pub fn new(name: impl Into<String>, ordinal: u32) -> Self {
        Self {
            name: name.into(),
            ordinal,
            species_id: None,
        }
    }

    pub fn with_species_id(mut self, species_id: Option<u32>) -> Self {
        self.species_id = species_id;
        self
    }

    /// Identifier passed to `Provider::item_detail`
    pub fn detail_key(&self) -> String {
        self.species_id.unwrap_or(self.ordinal).to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTag {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseStat {
    pub name: String,
    pub value: u32,
}

/// Full attribute record for one member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDetail {
    pub name: String,
    pub types: Vec<TypeTag>,
    pub sprite_url: Option<String>,
    pub stats: Vec<BaseStat>,
}

/// One row of the stat table
#[derive(Debug, Clone)]
pub struct StatRow {
    pub icon: Option<DynamicImage>,
    pub label: String,
    pub value: String,
}

impl StatRow {
    pub fn type_row(tag: &TypeTag, icon: Option<DynamicImage>) -> Self {
        Self {
            icon,
            label: "Type".to_string(),
            value: tag.name.clone(),
        }
    }

    pub fn stat_row(stat: &BaseStat) -> Self {
        Self {
            icon: None,
            label: stat.name.clone(),
            value: stat.value.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Read-only access to the remote catalog.
///
/// Every call is blocking and idempotent; the pipeline only invokes them from
/// worker threads, except the catalog fetch at startup.
pub trait Provider: Send + Sync {
    /// Fetch the full list of groups, in provider order
    fn group_list(&self) -> Result<Vec<GroupSummary>, ProviderError>;

    /// Fetch the members of one group, in provider order
    fn group_members(&self, group: &str) -> Result<Vec<MemberRef>, ProviderError>;

    /// Fetch the detail record for one member
    fn item_detail(&self, id: &str) -> Result<ItemDetail, ProviderError>;

    /// Fetch raw bytes (sprites)
    fn raw_bytes(&self, url: &str) -> Result<Vec<u8>, ProviderError>;
}
