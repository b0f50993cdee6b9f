// pipeline.rs - Per-domain processing flow
//
// Coordinates the collaborators around the pure core: fetch the landing
// page, mine entity candidates, optionally ask the LLM for a hint, look the
// winning name up in the LEI registry, and rank the candidates. Collaborator
// failures degrade the report instead of aborting it; the only distinction
// surfaced is fetch failure versus an empty extraction.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregate::ObservationRecord;
use crate::config::AppConfig;
use crate::extract::{self, CandidateSource, ExtractionCandidate, ExtractionResult};
use crate::fetch;
use crate::identity::DomainIdentity;
use crate::llm::{LlmClient, LlmExtraction};
use crate::ranker::{self, RankOutcome, RankingParams};
use crate::registry::RegistryClient;
use crate::text;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_NO_ENTITY: &str = "no_entity";
pub const STATUS_FETCH_FAILED: &str = "fetch_failed";

/// Schema field name used when asking the LLM collaborator for a hint.
pub const LLM_COMPANY_FIELD: &str = "company_name";

/// Everything learned about one domain in one processing attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainReport {
    pub domain: String,
    pub identity: DomainIdentity,

    /// success, no_entity, or fetch_failed
    pub status: String,

    /// Absent when the page could not be fetched
    pub extraction: Option<ExtractionResult>,

    /// LLM-sourced fields, empty when disabled or failed
    #[serde(default)]
    pub llm_fields: LlmExtraction,

    /// Registry ranking and bias assessment, absent when lookup was
    /// disabled, failed, or there was no name to look up
    pub ranking: Option<RankOutcome>,

    /// Confidence in the primary entity on a 0-100 scale
    pub confidence_score: Option<f64>,

    pub processed_at: DateTime<Utc>,
}

impl DomainReport {
    /// Primary entity name this attempt settled on, if any.
    pub fn company_name(&self) -> Option<&str> {
        self.extraction
            .as_ref()
            .and_then(|e| e.primary_entity.as_deref())
    }

    /// Record this attempt for cross-batch aggregation.
    pub fn to_observation(&self, batch_id: &str) -> ObservationRecord {
        ObservationRecord {
            identity_key: self.identity.identity_key.clone(),
            batch_id: batch_id.to_string(),
            confidence_score: self.confidence_score,
            company_name: self.company_name().map(|n| n.to_string()),
            status: self.status.clone(),
            created_at: self.processed_at,
        }
    }
}

/// Wires the collaborators together for repeated per-domain runs.
pub struct Pipeline {
    config: AppConfig,
    http: reqwest::Client,
    registry: Option<RegistryClient>,
    llm: Option<LlmClient>,
    ranking_params: RankingParams,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Result<Self> {
        let http = fetch::build_client(&config.http.user_agent, config.http.request_timeout_secs)?;

        let registry = if config.registry.enabled {
            Some(RegistryClient::new(
                config.registry.endpoint.clone(),
                config.registry.request_timeout_secs,
                config.registry.max_candidates,
            )?)
        } else {
            None
        };

        let llm = if config.extraction.llm_enabled {
            Some(LlmClient::new(
                config.llm.endpoint.clone(),
                config.llm.model.clone(),
                config.llm.api_key(),
                config.llm.request_timeout_secs,
            )?)
        } else {
            None
        };

        let ranking_params = config.ranking.to_params();

        Ok(Self {
            config,
            http,
            registry,
            llm,
            ranking_params,
        })
    }

    /// Process one domain end to end. Never fails: collaborator problems
    /// show up as a degraded report.
    pub async fn process_domain(&self, domain: &str) -> DomainReport {
        let identity = DomainIdentity::new(domain);

        let html = match fetch::fetch_page_content(&self.http, domain).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Fetch failed for {}: {}", domain, e);
                return DomainReport {
                    domain: domain.to_string(),
                    identity,
                    status: STATUS_FETCH_FAILED.to_string(),
                    extraction: None,
                    llm_fields: LlmExtraction::new(),
                    ranking: None,
                    confidence_score: None,
                    processed_at: Utc::now(),
                };
            }
        };

        self.process_html(domain, &html).await
    }

    /// Process already-fetched HTML for a domain.
    pub async fn process_html(&self, domain: &str, html: &str) -> DomainReport {
        let identity = DomainIdentity::new(domain);

        let mut extraction = extract::extract_with_limits(
            html,
            domain,
            self.config.extraction.max_emails,
            self.config.extraction.max_phones,
        );

        let llm_fields = self.supplement_with_llm(domain, html, &mut extraction).await;

        let ranking = self.rank_candidates(domain, &extraction).await;

        let confidence_score = primary_confidence(&extraction);
        let status = if extraction.primary_entity.is_some() {
            STATUS_SUCCESS
        } else {
            STATUS_NO_ENTITY
        };

        if let Some(name) = &extraction.primary_entity {
            info!("{}: primary entity '{}'", domain, name);
        } else {
            debug!("{}: no entity candidates survived cleaning", domain);
        }

        DomainReport {
            domain: domain.to_string(),
            identity,
            status: status.to_string(),
            extraction: Some(extraction),
            llm_fields,
            ranking,
            confidence_score,
            processed_at: Utc::now(),
        }
    }

    /// Ask the LLM collaborator for a company-name hint and merge it into
    /// the candidate list. Only consulted when nothing was mined from the
    /// markup, the deterministic sources win otherwise.
    async fn supplement_with_llm(
        &self,
        domain: &str,
        html: &str,
        extraction: &mut ExtractionResult,
    ) -> LlmExtraction {
        let llm = match &self.llm {
            Some(client) if extraction.primary_entity.is_none() => client,
            _ => return LlmExtraction::new(),
        };

        let visible = text::strip_markup(html);
        if visible.trim().is_empty() {
            return LlmExtraction::new();
        }

        let mut schema = BTreeMap::new();
        schema.insert(
            LLM_COMPANY_FIELD.to_string(),
            "legal or trading name of the company that operates this website".to_string(),
        );

        let fields = llm.extract_fields(&visible, &schema, Some(domain)).await;

        if let Some(field) = fields.get(LLM_COMPANY_FIELD) {
            if let Some(entity) = text::clean_entity_name(&field.value) {
                let already_known = extraction.candidates.iter().any(|c| c.text == entity);
                if !already_known {
                    extraction.candidates.push(ExtractionCandidate {
                        text: entity.clone(),
                        source: CandidateSource::LlmField,
                        confidence: (field.confidence / 100.0) as f32,
                        span: Some(field.position),
                    });
                }
                if extraction.primary_entity.is_none() {
                    extraction.primary_entity = Some(entity);
                }
            }
        }

        fields
    }

    /// Look the primary entity up in the LEI registry and rank the result.
    async fn rank_candidates(
        &self,
        domain: &str,
        extraction: &ExtractionResult,
    ) -> Option<RankOutcome> {
        let registry = self.registry.as_ref()?;
        let name = extraction.primary_entity.as_deref()?;

        let candidates = match registry.lookup(name).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Registry lookup failed for {}: {}", domain, e);
                Vec::new()
            }
        };

        Some(ranker::rank(
            domain,
            Some(name),
            &candidates,
            &self.ranking_params,
        ))
    }
}

/// Confidence in the primary entity, scaled to 0-100: the strongest
/// source that produced the winning text. Rounded to whole points.
fn primary_confidence(extraction: &ExtractionResult) -> Option<f64> {
    let primary = extraction.primary_entity.as_deref()?;
    extraction
        .candidates
        .iter()
        .filter(|c| c.text == primary)
        .map(|c| (c.confidence as f64 * 100.0).round())
        .fold(None, |acc: Option<f64>, score| {
            Some(acc.map_or(score, |a| a.max(score)))
        })
}
