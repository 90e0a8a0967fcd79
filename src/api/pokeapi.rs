//! PokeAPI v2 client using reqwest's blocking API.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ApiConfig;

use super::{BaseStat, GroupSummary, ItemDetail, MemberRef, Provider, ProviderError, TypeTag};

pub struct PokeApi {
    client: Client,
    base_url: String,
    catalog_limit: u32,
}

impl PokeApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder
            .build()
            .with_context(|| "failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            catalog_limit: config.catalog_limit,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|source| ProviderError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        self.get(url)?
            .json::<T>()
            .map_err(|err| ProviderError::Decode {
                url: url.to_string(),
                message: err.to_string(),
            })
    }
}

impl Provider for PokeApi {
    fn group_list(&self) -> Result<Vec<GroupSummary>, ProviderError> {
        let url = self.endpoint(&format!("pokedex?offset=0&limit={}", self.catalog_limit));
        let page: ResourceList = self.get_json(&url)?;
        Ok(page.into_groups())
    }

    fn group_members(&self, group: &str) -> Result<Vec<MemberRef>, ProviderError> {
        let url = self.endpoint(&format!("pokedex/{}", path_segment(group)));
        let dex: Pokedex = self.get_json(&url)?;
        Ok(dex.into_members())
    }

    fn item_detail(&self, id: &str) -> Result<ItemDetail, ProviderError> {
        let url = self.endpoint(&format!("pokemon/{}", path_segment(id)));
        let pokemon: Pokemon = self.get_json(&url)?;
        Ok(pokemon.into_detail())
    }

    fn raw_bytes(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let bytes = self
            .get(url)?
            .bytes()
            .map_err(|source| ProviderError::Http {
                url: url.to_string(),
                source,
            })?;
        Ok(bytes.to_vec())
    }
}

/// Lowercases the identifier and strips characters that would change the path
fn path_segment(id: &str) -> String {
    id.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Trailing numeric segment of a resource URL (`.../pokemon-species/25/` -> 25)
fn trailing_id(url: &str) -> Option<u32> {
    url.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct NamedResource {
    name: String,
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct ResourceList {
    #[serde(default)]
    results: Vec<NamedResource>,
}

impl ResourceList {
    fn into_groups(self) -> Vec<GroupSummary> {
        self.results
            .into_iter()
            .map(|item| GroupSummary::new(item.name))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct Pokedex {
    #[serde(default)]
    pokemon_entries: Vec<PokedexEntry>,
}

#[derive(Debug, Deserialize)]
struct PokedexEntry {
    entry_number: u32,
    pokemon_species: NamedResource,
}

impl Pokedex {
    fn into_members(self) -> Vec<MemberRef> {
        self.pokemon_entries
            .into_iter()
            .map(|entry| {
                let species_id = trailing_id(&entry.pokemon_species.url);
                MemberRef::new(entry.pokemon_species.name, entry.entry_number)
                    .with_species_id(species_id)
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct Pokemon {
    name: String,
    #[serde(default)]
    types: Vec<PokemonType>,
    #[serde(default)]
    sprites: Sprites,
    #[serde(default)]
    stats: Vec<PokemonStat>,
}

#[derive(Debug, Deserialize)]
struct PokemonType {
    slot: u32,
    #[serde(rename = "type")]
    kind: NamedResource,
}

#[derive(Debug, Default, Deserialize)]
struct Sprites {
    front_default: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PokemonStat {
    base_stat: u32,
    stat: NamedResource,
}

impl Pokemon {
    fn into_detail(mut self) -> ItemDetail {
        self.types.sort_by_key(|t| t.slot);
        ItemDetail {
            name: self.name,
            types: self
                .types
                .into_iter()
                .map(|t| TypeTag { name: t.kind.name })
                .collect(),
            sprite_url: self.sprites.front_default.filter(|url| !url.is_empty()),
            stats: self
                .stats
                .into_iter()
                .map(|s| BaseStat {
                    name: s.stat.name,
                    value: s.base_stat,
                })
                .collect(),
        }
    }
}
