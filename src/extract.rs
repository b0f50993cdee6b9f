//! HTML entity extraction
//!
//! Harvests candidate legal-entity names from crawled HTML using:
//! - Title tag patterns
//! - Site-name meta tags (og:site_name and friends)
//! - Schema.org JSON-LD structured data
//! - Copyright/footer notices
//! - Contact signals (emails, phone-like strings)
//!
//! Extraction never fails on malformed markup: an unparseable document
//! degrades to whatever partial signals are recoverable.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::text::{clean_entity_name, clean_title_entity, has_corporate_suffix, strip_markup};

/// Default cap on unique contact signals kept per document
pub const DEFAULT_CONTACT_LIMIT: usize = 5;

// Empirical per-source confidence defaults, machine-declared sources first
pub const CONFIDENCE_STRUCTURED_DATA: f32 = 0.95;
pub const CONFIDENCE_META_SITE_NAME: f32 = 0.85;
pub const CONFIDENCE_TITLE: f32 = 0.65;
pub const CONFIDENCE_COPYRIGHT: f32 = 0.60;

/// Where an extraction candidate was mined from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Title,
    MetaSiteName,
    StructuredData,
    CopyrightNotice,
    LlmField,
}

impl std::fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateSource::Title => write!(f, "title"),
            CandidateSource::MetaSiteName => write!(f, "meta_site_name"),
            CandidateSource::StructuredData => write!(f, "structured_data"),
            CandidateSource::CopyrightNotice => write!(f, "copyright_notice"),
            CandidateSource::LlmField => write!(f, "llm_field"),
        }
    }
}

/// One mined entity-name signal with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionCandidate {
    /// Cleaned entity name, length always in [3,100]
    pub text: String,
    /// Structural source the name was mined from
    pub source: CandidateSource,
    /// Confidence in [0,1], per-source empirical default
    pub confidence: f32,
    /// Byte offsets of the first occurrence in the normalized document text,
    /// when the candidate is locatable there
    pub span: Option<(usize, usize)>,
}

/// Output of one extraction run over one document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub domain: String,
    /// Raw (whitespace-collapsed) document title, if any
    pub title: Option<String>,
    /// Candidates in discovery order, deduplicated by exact cleaned text
    pub candidates: Vec<ExtractionCandidate>,
    /// The candidate chosen as most likely correct
    pub primary_entity: Option<String>,
    /// Unique email addresses, capped
    pub emails: Vec<String>,
    /// Unique phone-like strings (format-only matching), capped
    pub phones: Vec<String>,
}

/// Schema.org structured-data node (partial)
#[derive(Debug, Deserialize)]
struct SchemaOrgData {
    #[serde(rename = "@type")]
    schema_type: Option<String>,
    name: Option<String>,
    #[serde(rename = "legalName")]
    legal_name: Option<String>,
    publisher: Option<Box<SchemaOrgData>>,
    author: Option<Box<SchemaOrgData>>,
    #[serde(rename = "@graph")]
    graph: Option<Vec<SchemaOrgData>>,
}

static COPYRIGHT_RE: Lazy<Regex> = Lazy::new(|| {
    // "(©|Copyright) [year] Name" ending at a period, comma, "All", or
    // "Rights". A period only terminates when followed by whitespace or
    // end-of-input so dotted suffixes ("B.V.") stay in the capture.
    Regex::new(
        r"(?i)(?:©|&copy;|\(c\)|copyright)\s*(?:©\s*)?(?:\d{4}[\s,\-\u{2013}]*)?([A-Za-z][A-Za-z0-9\s&.,'\-]+?)(?:\s*\.(?:\s|$)|\s*,|\s+All\b|\s+Rights\b)",
    )
    .unwrap()
});

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b").unwrap());

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\+?\(?[0-9]{1,3}\)?[\-\s.]?\(?[0-9]{1,3}\)?[\-\s.]?[0-9]{3,4}[\-\s.]?[0-9]{3,4}")
        .unwrap()
});

/// Extract entity candidates and contact signals from HTML.
///
/// All sources are scanned; source priority decides the primary-entity
/// tie-break, not exclusion. An empty or unparseable document yields a
/// result with no candidates and a null primary entity.
pub fn extract(html: &str, domain: &str) -> ExtractionResult {
    extract_with_limits(html, domain, DEFAULT_CONTACT_LIMIT, DEFAULT_CONTACT_LIMIT)
}

/// [`extract`] with configurable contact-signal caps.
pub fn extract_with_limits(
    html: &str,
    domain: &str,
    max_emails: usize,
    max_phones: usize,
) -> ExtractionResult {
    let document = Html::parse_document(html);
    let normalized = strip_markup(html);

    let mut result = ExtractionResult {
        domain: domain.to_string(),
        ..Default::default()
    };
    let mut raw_candidates: Vec<(String, CandidateSource, f32)> = Vec::new();

    // 1. Title
    if let Some(title_text) = document_title(&document) {
        result.title = Some(title_text.clone());
        if let Some(entity) = clean_title_entity(&title_text) {
            raw_candidates.push((entity, CandidateSource::Title, CONFIDENCE_TITLE));
        }
    }

    // 2. Site-name meta tags; the first hit can become the primary entity
    let mut meta_primary: Option<String> = None;
    for content in site_name_meta_values(&document) {
        if let Some(entity) = clean_entity_name(&content) {
            if meta_primary.is_none() {
                meta_primary = Some(entity.clone());
            }
            raw_candidates.push((entity, CandidateSource::MetaSiteName, CONFIDENCE_META_SITE_NAME));
        }
    }

    // 3. JSON-LD organization blocks; machine-declared, so the first
    //    organization name takes precedence over title/meta
    let mut structured_primary: Option<String> = None;
    for name in structured_org_names(&document) {
        if let Some(entity) = clean_entity_name(&name) {
            if structured_primary.is_none() {
                structured_primary = Some(entity.clone());
            }
            raw_candidates.push((entity, CandidateSource::StructuredData, CONFIDENCE_STRUCTURED_DATA));
        }
    }

    // 4. Copyright notices in the visible text
    for caps in COPYRIGHT_RE.captures_iter(&normalized) {
        if let Some(m) = caps.get(1) {
            if let Some(entity) = clean_entity_name(m.as_str()) {
                raw_candidates.push((entity, CandidateSource::CopyrightNotice, CONFIDENCE_COPYRIGHT));
            }
        }
    }

    // 5. Contact signals (never entity candidates)
    result.emails = collect_unique(EMAIL_RE.find_iter(&normalized).map(|m| m.as_str()), max_emails);
    result.phones = collect_unique(
        PHONE_RE
            .find_iter(&normalized)
            .map(|m| m.as_str().trim())
            .filter(|s| s.chars().filter(|c| c.is_ascii_digit()).count() >= 7),
        max_phones,
    );

    // Deduplicate by exact cleaned text, keeping first-discovery order
    let mut seen: HashSet<String> = HashSet::new();
    for (text, source, confidence) in raw_candidates {
        if seen.insert(text.clone()) {
            let span = normalized.find(&text).map(|start| (start, start + text.len()));
            result.candidates.push(ExtractionCandidate {
                text,
                source,
                confidence,
                span,
            });
        }
    }

    result.primary_entity = select_primary(&result.candidates, structured_primary, meta_primary);

    debug!(
        domain,
        candidates = result.candidates.len(),
        primary = result.primary_entity.as_deref().unwrap_or("-"),
        "extraction complete"
    );

    result
}

/// Primary-entity precedence: structured data, then the first site-name meta
/// tag, then the first candidate carrying a corporate suffix, then the first
/// candidate in discovery order.
fn select_primary(
    candidates: &[ExtractionCandidate],
    structured_primary: Option<String>,
    meta_primary: Option<String>,
) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }
    if let Some(name) = structured_primary {
        return Some(name);
    }
    if let Some(name) = meta_primary {
        return Some(name);
    }
    if let Some(suffixed) = candidates.iter().find(|c| has_corporate_suffix(&c.text)) {
        return Some(suffixed.text.clone());
    }
    candidates.first().map(|c| c.text.clone())
}

fn document_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let title = document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>();
    let title = crate::text::normalize_whitespace(&title);
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Collect content values of meta tags whose name/property marks a site name
fn site_name_meta_values(document: &Html) -> Vec<String> {
    let selector = match Selector::parse("meta") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    document
        .select(&selector)
        .filter_map(|el| {
            let tag_name = el
                .value()
                .attr("property")
                .or_else(|| el.value().attr("name"))?;
            if !is_site_name_indicator(tag_name) {
                return None;
            }
            el.value().attr("content").map(|s| s.to_string())
        })
        .collect()
}

fn is_site_name_indicator(tag_name: &str) -> bool {
    matches!(
        tag_name.to_ascii_lowercase().as_str(),
        "og:site_name" | "site_name" | "application-name"
    )
}

/// Collect organization names declared in JSON-LD blocks, in document order
fn structured_org_names(document: &Html) -> Vec<String> {
    let selector = match Selector::parse(r#"script[type="application/ld+json"]"#) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut names = Vec::new();
    for element in document.select(&selector) {
        let json_text = element.text().collect::<String>();

        if let Ok(data) = serde_json::from_str::<SchemaOrgData>(&json_text) {
            collect_org_names(&data, &mut names);
        } else if let Ok(items) = serde_json::from_str::<Vec<SchemaOrgData>>(&json_text) {
            for data in &items {
                collect_org_names(data, &mut names);
            }
        }
        // Non-JSON or unexpected shapes are silently skipped
    }
    names
}

fn collect_org_names(data: &SchemaOrgData, names: &mut Vec<String>) {
    if let Some(ref schema_type) = data.schema_type {
        let org_types = [
            "Organization",
            "Corporation",
            "LocalBusiness",
            "Company",
            "NGO",
            "GovernmentOrganization",
            "EducationalOrganization",
        ];
        if org_types.iter().any(|t| schema_type.contains(t)) {
            // Prefer the declared legal name over the display name
            if let Some(ref legal_name) = data.legal_name {
                names.push(legal_name.clone());
            } else if let Some(ref name) = data.name {
                names.push(name.clone());
            }
        }
    }

    if let Some(ref graph) = data.graph {
        for item in graph {
            collect_org_names(item, names);
        }
    }
    if let Some(ref publisher) = data.publisher {
        collect_org_names(publisher, names);
    }
    if let Some(ref author) = data.author {
        collect_org_names(author, names);
    }
}

fn collect_unique<'a>(items: impl Iterator<Item = &'a str>, cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if out.len() >= cap {
            break;
        }
        if seen.insert(item.to_string()) {
            out.push(item.to_string());
        }
    }
    out
}
