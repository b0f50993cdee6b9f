// registry.rs - GLEIF LEI registry lookup
//
// Queries the public LEI record search for a company name and maps the
// response into RegistryCandidate records. The upstream ordering is the
// ranking signal: when a record carries no explicit rank we assign its
// position in the response. Records with malformed LEI codes are dropped.

use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::ranker::{is_valid_lei, RegistryCandidate};

pub const DEFAULT_ENDPOINT: &str = "https://api.gleif.org/api/v1/lei-records";

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

pub const DEFAULT_MAX_CANDIDATES: usize = 20;

/// HTTP client for the LEI registry search endpoint.
pub struct RegistryClient {
    client: reqwest::Client,
    endpoint: String,
    max_candidates: usize,
}

#[derive(Deserialize)]
struct LeiSearchResponse {
    #[serde(default)]
    data: Vec<LeiRecord>,
}

#[derive(Deserialize)]
struct LeiRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    attributes: Option<LeiAttributes>,
}

#[derive(Deserialize)]
struct LeiAttributes {
    #[serde(default)]
    lei: Option<String>,
    #[serde(default)]
    entity: Option<LeiEntity>,
    #[serde(default, rename = "rankPosition")]
    rank_position: Option<u32>,
    #[serde(default, rename = "weightedScore")]
    weighted_score: Option<f64>,
}

#[derive(Deserialize)]
struct LeiEntity {
    #[serde(default, rename = "legalName")]
    legal_name: Option<LeiLegalName>,
    #[serde(default)]
    jurisdiction: Option<String>,
    #[serde(default, rename = "legalAddress")]
    legal_address: Option<LeiAddress>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
struct LeiLegalName {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct LeiAddress {
    #[serde(default)]
    country: Option<String>,
}

impl RegistryClient {
    pub fn new(endpoint: String, timeout_secs: u64, max_candidates: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| anyhow!("Failed to build registry HTTP client: {}", e))?;

        Ok(Self {
            client,
            endpoint,
            max_candidates,
        })
    }

    /// Search the registry for legal entities matching a company name.
    /// Returns an empty list when nothing matches.
    pub async fn lookup(&self, company_name: &str) -> Result<Vec<RegistryCandidate>> {
        if company_name.trim().is_empty() {
            return Ok(Vec::new());
        }

        debug!("Registry lookup for '{}'", company_name);

        let page_size = self.max_candidates.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("filter[fulltext]", company_name),
                ("page[size]", page_size.as_str()),
            ])
            .send()
            .await
            .map_err(|e| anyhow!("Registry request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!("Registry returned status {}", response.status()));
        }

        let search: LeiSearchResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Registry response was not valid JSON: {}", e))?;

        Ok(candidates_from_records(search.data))
    }
}

/// Map raw registry records to candidates, assigning response-order ranks
/// where the upstream did not provide one and dropping malformed LEIs.
fn candidates_from_records(records: Vec<LeiRecord>) -> Vec<RegistryCandidate> {
    let mut candidates = Vec::new();

    for record in records {
        let attributes = match record.attributes {
            Some(a) => a,
            None => continue,
        };

        let lei_code = match attributes.lei.or(record.id) {
            Some(code) => code,
            None => continue,
        };
        if !is_valid_lei(&lei_code) {
            warn!("Dropping registry record with malformed LEI '{}'", lei_code);
            continue;
        }

        let entity = attributes.entity;
        let legal_name = entity
            .as_ref()
            .and_then(|e| e.legal_name.as_ref())
            .and_then(|n| n.name.clone());
        let legal_name = match legal_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => continue,
        };

        let jurisdiction = entity.as_ref().and_then(|e| {
            e.jurisdiction.clone().or_else(|| {
                e.legal_address.as_ref().and_then(|a| a.country.clone())
            })
        });
        let entity_status = entity.as_ref().and_then(|e| e.status.clone());

        let rank_position = attributes
            .rank_position
            .unwrap_or(candidates.len() as u32 + 1);

        candidates.push(RegistryCandidate {
            lei_code,
            legal_name,
            jurisdiction,
            entity_status,
            rank_position,
            weighted_score: attributes.weighted_score,
            is_primary_selection: false,
            selection_reason: None,
        });
    }

    candidates
}
