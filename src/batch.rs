//! Batch domain processing from CSV/JSON input files
//!
//! Supports:
//! - CSV files with one domain per line or a "domain" column
//! - JSON files with an array of domain strings or objects with a "domain" field
//! - Parallel processing with a bounded number of in-flight domains
//! - Error resilience (a failed domain becomes a fetch_failed report, the
//!   batch continues)

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::aggregate::{self, DuplicateReport, ObservationRecord};
use crate::pipeline::{DomainReport, Pipeline, STATUS_FETCH_FAILED, STATUS_SUCCESS};

/// One domain queued for processing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainEntry {
    pub domain: String,
    /// Optional label carried through from the input file (e.g. a known
    /// company name, for the operator's reference only)
    #[serde(default)]
    pub label: Option<String>,
}

impl DomainEntry {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            label: None,
        }
    }
}

/// Summary of one batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    /// Identifier shared by every observation this run produced
    pub batch_id: String,
    pub total_domains: usize,
    /// Domains that yielded a primary entity
    pub successful: usize,
    /// Domains whose page could not be fetched
    pub fetch_failures: usize,
    /// Domains fetched but with no entity surviving cleaning
    pub no_entity: usize,
    /// Total extraction candidates mined across the batch
    pub total_candidates: usize,
    /// Domains observed more than once within this run's input
    pub duplicates: Vec<DuplicateReport>,
    pub started_at: String,
    pub completed_at: String,
}

/// Output of one batch run: per-domain reports plus the append-only
/// observations they produced.
pub struct BatchOutcome {
    pub summary: BatchSummary,
    pub reports: Vec<DomainReport>,
    pub observations: Vec<ObservationRecord>,
}

/// Generate a batch identifier from the current UTC time.
pub fn new_batch_id() -> String {
    format!("batch-{}", Utc::now().format("%Y%m%d%H%M%S"))
}

/// Process every entry through the pipeline, at most `parallelism` domains
/// in flight at once. Input order is preserved in the outputs.
pub async fn run_batch(
    pipeline: Arc<Pipeline>,
    entries: Vec<DomainEntry>,
    batch_id: &str,
    parallelism: usize,
) -> BatchOutcome {
    let started_at = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
    let mut tasks: JoinSet<(usize, DomainReport)> = JoinSet::new();

    info!(
        "Starting batch {} with {} domains ({} in flight)",
        batch_id,
        entries.len(),
        parallelism.max(1)
    );

    for (index, entry) in entries.iter().enumerate() {
        let pipeline = Arc::clone(&pipeline);
        let semaphore = Arc::clone(&semaphore);
        let domain = entry.domain.clone();
        tasks.spawn(async move {
            // Semaphore bounds how many fetches run at once
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("semaphore never closed");
            let report = pipeline.process_domain(&domain).await;
            (index, report)
        });
    }

    let mut indexed: Vec<(usize, DomainReport)> = Vec::with_capacity(entries.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(pair) => indexed.push(pair),
            Err(e) => warn!("Batch task panicked: {}", e),
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    let reports: Vec<DomainReport> = indexed.into_iter().map(|(_, r)| r).collect();

    let observations: Vec<ObservationRecord> = reports
        .iter()
        .map(|r| r.to_observation(batch_id))
        .collect();

    let summary = BatchSummary {
        batch_id: batch_id.to_string(),
        total_domains: reports.len(),
        successful: reports.iter().filter(|r| r.status == STATUS_SUCCESS).count(),
        fetch_failures: reports
            .iter()
            .filter(|r| r.status == STATUS_FETCH_FAILED)
            .count(),
        no_entity: reports
            .iter()
            .filter(|r| r.status != STATUS_SUCCESS && r.status != STATUS_FETCH_FAILED)
            .count(),
        total_candidates: reports
            .iter()
            .filter_map(|r| r.extraction.as_ref())
            .map(|e| e.candidates.len())
            .sum(),
        duplicates: aggregate::find_duplicates(&observations),
        started_at,
        completed_at: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    };

    BatchOutcome {
        summary,
        reports,
        observations,
    }
}

/// Input format for batch domain files
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("csv") => Some(Self::Csv),
            Some("json") => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse domain list from a file (auto-detects format from extension)
pub fn parse_domain_file(path: &Path) -> Result<Vec<DomainEntry>> {
    let format = InputFormat::from_path(path).context(format!(
        "Cannot determine input format from file extension. Expected .csv or .json: {}",
        path.display()
    ))?;

    let content = fs::read_to_string(path)
        .context(format!("Failed to read input file: {}", path.display()))?;

    match format {
        InputFormat::Csv => parse_csv_domains(&content),
        InputFormat::Json => parse_json_domains(&content),
    }
}

/// Parse domains from CSV content.
///
/// Accepts either one domain per line (no header) or a CSV with a "domain"
/// column header and an optional "label" column.
pub fn parse_csv_domains(content: &str) -> Result<Vec<DomainEntry>> {
    let mut domains = Vec::new();
    let lines: Vec<&str> = content.lines().collect();

    if lines.is_empty() {
        return Ok(domains);
    }

    let has_header = lines[0].to_lowercase().contains("domain");

    if has_header {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = reader.headers().context("Failed to read CSV headers")?.clone();
        let domain_idx = headers
            .iter()
            .position(|h| h.to_lowercase() == "domain")
            .context("CSV must have a 'domain' column when using headers")?;
        let label_idx = headers.iter().position(|h| h.to_lowercase() == "label");

        for result in reader.records() {
            let record = result.context("Failed to parse CSV record")?;

            let domain = record
                .get(domain_idx)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());

            if let Some(domain) = domain {
                if !is_valid_domain(&domain) {
                    continue;
                }

                let label = label_idx
                    .and_then(|idx| record.get(idx))
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty());

                domains.push(DomainEntry { domain, label });
            }
        }
    } else {
        for line in lines {
            let domain = line.split(',').next().unwrap_or(line).trim();

            if domain.is_empty() || domain.starts_with('#') {
                continue;
            }
            if !is_valid_domain(domain) {
                continue;
            }

            domains.push(DomainEntry::new(domain));
        }
    }

    Ok(domains)
}

/// Parse domains from JSON content.
///
/// Accepts an array of domain strings, an array of objects with a "domain"
/// field, or an object with a "domains" array.
pub fn parse_json_domains(content: &str) -> Result<Vec<DomainEntry>> {
    let value: serde_json::Value =
        serde_json::from_str(content).context("Failed to parse JSON content")?;

    let entries = match &value {
        serde_json::Value::Array(arr) => parse_json_array(arr),

        serde_json::Value::Object(obj) => match obj.get("domains") {
            Some(serde_json::Value::Array(arr)) => parse_json_array(arr),
            Some(_) => bail!("'domains' field must be an array"),
            None => bail!("JSON object must have a 'domains' array field"),
        },

        _ => bail!("JSON must be an array of domains or an object with 'domains' field"),
    };

    Ok(entries)
}

fn parse_json_array(arr: &[serde_json::Value]) -> Vec<DomainEntry> {
    let mut entries = Vec::new();

    for item in arr {
        match item {
            serde_json::Value::String(domain) => {
                let domain = domain.trim();
                if !domain.is_empty() && is_valid_domain(domain) {
                    entries.push(DomainEntry::new(domain));
                }
            }

            serde_json::Value::Object(obj) => {
                if let Some(serde_json::Value::String(domain)) = obj.get("domain") {
                    let domain = domain.trim();
                    if !domain.is_empty() && is_valid_domain(domain) {
                        let label = obj
                            .get("label")
                            .and_then(|v| v.as_str())
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty());

                        entries.push(DomainEntry {
                            domain: domain.to_string(),
                            label,
                        });
                    }
                }
            }

            _ => {}
        }
    }

    entries
}

/// Basic domain shape validation: dotted hostname, no scheme or path.
fn is_valid_domain(domain: &str) -> bool {
    if !domain.contains('.') {
        return false;
    }
    if domain.contains("://") || domain.contains('/') {
        return false;
    }
    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return false;
    }
    if domain.contains("..") {
        return false;
    }
    domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_simple_domains() {
        let content = "example.com\ntest.org\nfoo.bar.com";
        let result = parse_csv_domains(content).unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].domain, "example.com");
        assert_eq!(result[1].domain, "test.org");
        assert_eq!(result[2].domain, "foo.bar.com");
        assert!(result.iter().all(|e| e.label.is_none()));
    }

    #[test]
    fn test_parse_csv_with_header() {
        let content = "domain,label\nexample.com,Example Inc\ntest.org,Test Corp";
        let result = parse_csv_domains(content).unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].domain, "example.com");
        assert_eq!(result[0].label, Some("Example Inc".to_string()));
        assert_eq!(result[1].domain, "test.org");
        assert_eq!(result[1].label, Some("Test Corp".to_string()));
    }

    #[test]
    fn test_parse_csv_skip_comments_and_invalid() {
        let content = "example.com\n# comment\n\ninvalid\ntest.org";
        let result = parse_csv_domains(content).unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].domain, "example.com");
        assert_eq!(result[1].domain, "test.org");
    }

    #[test]
    fn test_parse_json_string_array() {
        let content = r#"["example.com", "test.org"]"#;
        let result = parse_json_domains(content).unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].domain, "example.com");
    }

    #[test]
    fn test_parse_json_object_array_with_labels() {
        let content = r#"[
            {"domain": "example.com"},
            {"domain": "test.org", "label": "Test Corp"}
        ]"#;
        let result = parse_json_domains(content).unwrap();

        assert_eq!(result.len(), 2);
        assert!(result[0].label.is_none());
        assert_eq!(result[1].label, Some("Test Corp".to_string()));
    }

    #[test]
    fn test_parse_json_domains_field() {
        let content = r#"{"domains": ["example.com", "test.org"]}"#;
        let result = parse_json_domains(content).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_parse_json_skip_invalid_entries() {
        let content = r#"["example.com", "invalid", 123, null, "test.org"]"#;
        let result = parse_json_domains(content).unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[1].domain, "test.org");
    }

    #[test]
    fn test_parse_json_invalid_payload() {
        assert!(parse_json_domains("not valid json").is_err());
        assert!(parse_json_domains(r#"{"other": 1}"#).is_err());
    }

    #[test]
    fn test_is_valid_domain() {
        assert!(is_valid_domain("example.com"));
        assert!(is_valid_domain("sub.example.com"));
        assert!(is_valid_domain("my-site.example.com"));

        assert!(!is_valid_domain("invalid"));
        assert!(!is_valid_domain("http://example.com"));
        assert!(!is_valid_domain("example.com/path"));
        assert!(!is_valid_domain(".example.com"));
        assert!(!is_valid_domain("example..com"));
    }

    #[test]
    fn test_input_format_detection() {
        assert_eq!(
            InputFormat::from_path(Path::new("domains.csv")),
            Some(InputFormat::Csv)
        );
        assert_eq!(
            InputFormat::from_path(Path::new("domains.JSON")),
            Some(InputFormat::Json)
        );
        assert_eq!(InputFormat::from_path(Path::new("domains.txt")), None);
    }

    #[test]
    fn test_batch_id_shape() {
        let id = new_batch_id();
        assert!(id.starts_with("batch-"));
        assert_eq!(id.len(), "batch-".len() + 14);
    }
}
