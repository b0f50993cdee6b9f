// aggregate.rs - Cross-observation history over repeated domain processing
//
// Every processing attempt for a domain produces one append-only
// ObservationRecord keyed by the domain's identity key. Aggregation is a
// read-time fold over all records sharing a key: it never mutates records
// and never fails, an unknown key simply yields an empty history.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status string recorded when an attempt produced a usable entity name.
pub const STATUS_SUCCESS: &str = "success";

/// One (domain, batch) processing attempt. Created once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Identity key of the observed domain (see identity module)
    pub identity_key: String,

    /// Batch this attempt belonged to
    pub batch_id: String,

    /// Extraction confidence on a 0-100 scale, if the attempt produced one
    pub confidence_score: Option<f64>,

    /// Company name the attempt settled on, if any
    pub company_name: Option<String>,

    /// Outcome of the attempt (success, no_entity, fetch_failed, ...)
    pub status: String,

    /// UTC timestamp of the attempt
    pub created_at: DateTime<Utc>,
}

/// Aggregated view of every recorded attempt for one identity key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainHistory {
    pub identity_key: String,

    /// Number of recorded attempts
    pub total_attempts: usize,

    /// Distinct batches that observed this domain, sorted
    pub batches: Vec<String>,

    /// Highest-confidence record; ties broken by most recent attempt.
    /// None when no record carries a confidence score.
    pub best: Option<ObservationRecord>,

    /// Timestamp of the earliest attempt
    pub first_seen: Option<DateTime<Utc>>,

    /// Status of the most recent attempt
    pub latest_status: Option<String>,

    /// Distinct company names seen across attempts, in first-occurrence order
    pub name_variations: Vec<String>,

    /// best_confidence - worst_confidence across scored attempts,
    /// present only when at least one attempt was scored
    pub confidence_improvement: Option<f64>,

    /// Whether any attempt completed with success status
    pub ever_successful: bool,
}

/// One domain observed more than once, reported for data-quality review.
/// Repeat observation is expected across batches, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub identity_key: String,
    pub occurrence_count: usize,

    /// Distinct batches spanned by the duplicate observations, sorted
    pub batch_ids: Vec<String>,

    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Fold all records for one identity key into a history view.
/// Records carrying a different identity key are ignored.
pub fn aggregate(identity_key: &str, records: &[ObservationRecord]) -> DomainHistory {
    let mut matching: Vec<&ObservationRecord> = records
        .iter()
        .filter(|r| r.identity_key == identity_key)
        .collect();
    matching.sort_by_key(|r| r.created_at);

    let mut batches: Vec<String> = matching.iter().map(|r| r.batch_id.clone()).collect();
    batches.sort();
    batches.dedup();

    let best = matching
        .iter()
        .filter(|r| r.confidence_score.is_some())
        .max_by(|a, b| {
            let score_a = a.confidence_score.unwrap_or(f64::MIN);
            let score_b = b.confidence_score.unwrap_or(f64::MIN);
            score_a
                .partial_cmp(&score_b)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.created_at.cmp(&b.created_at))
        })
        .map(|r| (*r).clone());

    let scored: Vec<f64> = matching.iter().filter_map(|r| r.confidence_score).collect();
    let confidence_improvement = match (
        scored.iter().cloned().fold(None::<f64>, |acc, s| {
            Some(acc.map_or(s, |a| a.max(s)))
        }),
        scored.iter().cloned().fold(None::<f64>, |acc, s| {
            Some(acc.map_or(s, |a| a.min(s)))
        }),
    ) {
        (Some(high), Some(low)) => Some(high - low),
        _ => None,
    };

    let mut name_variations: Vec<String> = Vec::new();
    for record in &matching {
        if let Some(name) = &record.company_name {
            if !name_variations.iter().any(|n| n == name) {
                name_variations.push(name.clone());
            }
        }
    }

    DomainHistory {
        identity_key: identity_key.to_string(),
        total_attempts: matching.len(),
        batches,
        first_seen: matching.first().map(|r| r.created_at),
        latest_status: matching.last().map(|r| r.status.clone()),
        ever_successful: matching.iter().any(|r| r.status == STATUS_SUCCESS),
        name_variations,
        confidence_improvement,
        best,
    }
}

/// Group records by identity key and report every key observed more than once.
/// Reports are sorted by descending occurrence count, then key.
pub fn find_duplicates(records: &[ObservationRecord]) -> Vec<DuplicateReport> {
    let mut groups: BTreeMap<&str, Vec<&ObservationRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(&record.identity_key).or_default().push(record);
    }

    let mut reports: Vec<DuplicateReport> = groups
        .into_iter()
        .filter(|(_, group)| group.len() > 1)
        .map(|(key, group)| {
            let mut batch_ids: Vec<String> =
                group.iter().map(|r| r.batch_id.clone()).collect();
            batch_ids.sort();
            batch_ids.dedup();

            let first_seen = group.iter().map(|r| r.created_at).min().unwrap_or_default();
            let last_seen = group.iter().map(|r| r.created_at).max().unwrap_or_default();

            DuplicateReport {
                identity_key: key.to_string(),
                occurrence_count: group.len(),
                batch_ids,
                first_seen,
                last_seen,
            }
        })
        .collect();

    reports.sort_by(|a, b| {
        b.occurrence_count
            .cmp(&a.occurrence_count)
            .then_with(|| a.identity_key.cmp(&b.identity_key))
    });
    reports
}
