//! Registry candidate ranking and jurisdiction-bias analysis
//!
//! The upstream registry lookup already scores and ranks its candidates;
//! this module surfaces the current primary selection and reports whether
//! the ranking shows geographic (jurisdiction) selection bias. It is a pure
//! function over already-fetched candidate lists and performs no I/O.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bias assessment string emitted when the dominant-jurisdiction share
/// exceeds the configured threshold. Downstream consumers match on these
/// exact strings.
pub const ASSESSMENT_HIGH_BIAS: &str = "High bias detected";
pub const ASSESSMENT_BALANCED: &str = "Balanced distribution";

/// One legal-entity record returned by the registry lookup for a domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryCandidate {
    /// Legal Entity Identifier, 20 alphanumeric characters
    pub lei_code: String,
    pub legal_name: String,
    /// 2-letter country code of the legal domicile, when known
    pub jurisdiction: Option<String>,
    /// e.g. "ACTIVE" / "INACTIVE"
    pub entity_status: Option<String>,
    /// Rank assigned by the upstream lookup, 1 = best per its own scoring
    pub rank_position: u32,
    pub weighted_score: Option<f64>,
    /// Set by an upstream process; reported here, never computed
    #[serde(default)]
    pub is_primary_selection: bool,
    /// Upstream's stated reason for the selection, when provided
    #[serde(default)]
    pub selection_reason: Option<String>,
}

/// Tunable parameters for bias detection. The defaults match the observed
/// skew in the upstream registry's scoring; they are empirical, not derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingParams {
    /// Jurisdiction suspected of being systematically favored
    pub dominant_jurisdiction: String,
    /// Fraction of candidates in the dominant jurisdiction above which the
    /// selection is flagged as biased
    pub bias_threshold: f64,
    /// More distinct jurisdictions than this marks a multinational structure
    pub multinational_min_jurisdictions: usize,
}

impl Default for RankingParams {
    fn default() -> Self {
        Self {
            dominant_jurisdiction: "US".to_string(),
            bias_threshold: 0.6,
            multinational_min_jurisdictions: 2,
        }
    }
}

/// Geographic bias assessment over one candidate list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasReport {
    /// Jurisdiction the analysis tested for dominance
    pub dominant_jurisdiction: String,
    /// Share of all candidates domiciled in the dominant jurisdiction,
    /// as a percentage of the full candidate list
    pub dominant_share_pct: f64,
    /// Exact assessment string, see [`ASSESSMENT_HIGH_BIAS`]
    pub assessment: String,
    /// Candidates per jurisdiction (null jurisdictions excluded)
    pub jurisdiction_distribution: BTreeMap<String, usize>,
    /// True when more distinct jurisdictions are represented than the
    /// configured minimum
    pub multinational_structure: bool,
}

/// Full ranking outcome for one domain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankOutcome {
    pub domain: String,
    /// Entity name mined from the domain's HTML, when extraction succeeded
    pub extracted_name: Option<String>,
    pub total_candidates: usize,
    /// The candidate currently marked as the primary selection, falling
    /// back to the best-ranked candidate when none is marked
    pub primary: Option<RegistryCandidate>,
    /// All candidates, in upstream rank order as received
    pub candidates: Vec<RegistryCandidate>,
    pub bias: BiasReport,
    /// Distribution of upstream weighted scores, in candidate order
    pub score_distribution: Vec<Option<f64>>,
    /// Candidates per entity status value
    pub status_breakdown: BTreeMap<String, usize>,
}

/// Check the LEI code format: exactly 20 ASCII alphanumeric characters.
pub fn is_valid_lei(lei: &str) -> bool {
    lei.len() == 20 && lei.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Rank registry candidates for a domain and assess jurisdiction bias.
///
/// Selection is not re-scored here: the upstream `rank_position` and
/// `is_primary_selection` are input facts. This function only surfaces them
/// and computes the descriptive aggregates.
pub fn rank(
    domain: &str,
    extracted_name: Option<&str>,
    candidates: &[RegistryCandidate],
    params: &RankingParams,
) -> RankOutcome {
    let primary = candidates
        .iter()
        .find(|c| c.is_primary_selection)
        .or_else(|| candidates.iter().min_by_key(|c| c.rank_position))
        .cloned();

    let mut status_breakdown: BTreeMap<String, usize> = BTreeMap::new();
    for candidate in candidates {
        let status = candidate
            .entity_status
            .clone()
            .unwrap_or_else(|| "Unknown".to_string());
        *status_breakdown.entry(status).or_insert(0) += 1;
    }

    RankOutcome {
        domain: domain.to_string(),
        extracted_name: extracted_name.map(|s| s.to_string()),
        total_candidates: candidates.len(),
        primary,
        bias: assess_bias(candidates, params),
        candidates: candidates.to_vec(),
        score_distribution: candidates.iter().map(|c| c.weighted_score).collect(),
        status_breakdown,
    }
}

/// Detect whether the upstream ranking systematically favors one
/// jurisdiction irrespective of true domain ownership.
pub fn assess_bias(candidates: &[RegistryCandidate], params: &RankingParams) -> BiasReport {
    let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
    for candidate in candidates {
        if let Some(ref jurisdiction) = candidate.jurisdiction {
            *distribution.entry(jurisdiction.clone()).or_insert(0) += 1;
        }
    }

    let total = candidates.len();
    let dominant_count = distribution
        .get(&params.dominant_jurisdiction)
        .copied()
        .unwrap_or(0);
    // Share is over the full candidate list, null jurisdictions included in
    // the denominator: an unknown domicile is still a non-dominant one.
    let dominant_fraction = if total > 0 {
        dominant_count as f64 / total as f64
    } else {
        0.0
    };

    let assessment = if dominant_fraction > params.bias_threshold {
        ASSESSMENT_HIGH_BIAS.to_string()
    } else {
        ASSESSMENT_BALANCED.to_string()
    };
    let multinational_structure = distribution.len() > params.multinational_min_jurisdictions;

    BiasReport {
        dominant_jurisdiction: params.dominant_jurisdiction.clone(),
        dominant_share_pct: dominant_fraction * 100.0,
        assessment,
        jurisdiction_distribution: distribution,
        multinational_structure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(lei: &str, jurisdiction: Option<&str>, rank_position: u32) -> RegistryCandidate {
        RegistryCandidate {
            lei_code: lei.to_string(),
            legal_name: format!("Entity {}", lei),
            jurisdiction: jurisdiction.map(|s| s.to_string()),
            entity_status: Some("ACTIVE".to_string()),
            rank_position,
            weighted_score: Some(rank_position as f64),
            is_primary_selection: false,
            selection_reason: None,
        }
    }

    #[test]
    fn test_is_valid_lei() {
        assert!(is_valid_lei("529900T8BM49AURSDO55"));
        assert!(!is_valid_lei("529900T8BM49AURSDO5")); // 19 chars
        assert!(!is_valid_lei("529900T8BM49AURSDO555")); // 21 chars
        assert!(!is_valid_lei("529900T8BM49AURSDO5!"));
        assert!(!is_valid_lei(""));
    }

    #[test]
    fn test_high_bias_detected_above_threshold() {
        let mut candidates: Vec<RegistryCandidate> = (0..7)
            .map(|i| candidate(&format!("{:020}", i), Some("US"), i + 1))
            .collect();
        candidates.push(candidate("00000000000000000007", Some("GB"), 8));
        candidates.push(candidate("00000000000000000008", Some("NL"), 9));
        candidates.push(candidate("00000000000000000009", Some("DE"), 10));

        let report = assess_bias(&candidates, &RankingParams::default());
        assert_eq!(report.assessment, ASSESSMENT_HIGH_BIAS);
        assert!((report.dominant_share_pct - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_balanced_distribution_at_threshold() {
        let mut candidates: Vec<RegistryCandidate> = (0..5)
            .map(|i| candidate(&format!("{:020}", i), Some("US"), i + 1))
            .collect();
        for (i, j) in ["GB", "NL", "DE", "FR", "JP"].into_iter().enumerate() {
            candidates.push(candidate(&format!("{:020}", i + 5), Some(j), (i + 6) as u32));
        }

        let report = assess_bias(&candidates, &RankingParams::default());
        assert_eq!(report.assessment, ASSESSMENT_BALANCED);
        assert!((report.dominant_share_pct - 50.0).abs() < 1e-9);
        assert!(report.multinational_structure);
    }

    #[test]
    fn test_null_jurisdictions_count_in_denominator_only() {
        let candidates = vec![
            candidate("00000000000000000001", Some("US"), 1),
            candidate("00000000000000000002", Some("US"), 2),
            candidate("00000000000000000003", None, 3),
            candidate("00000000000000000004", None, 4),
        ];
        let report = assess_bias(&candidates, &RankingParams::default());
        // 2 of 4 candidates are US
        assert!((report.dominant_share_pct - 50.0).abs() < 1e-9);
        assert_eq!(report.jurisdiction_distribution.len(), 1);
        assert_eq!(report.jurisdiction_distribution["US"], 2);
        assert_eq!(report.assessment, ASSESSMENT_BALANCED);
    }

    #[test]
    fn test_empty_candidate_list() {
        let outcome = rank("example.com", None, &[], &RankingParams::default());
        assert_eq!(outcome.total_candidates, 0);
        assert!(outcome.primary.is_none());
        assert_eq!(outcome.bias.assessment, ASSESSMENT_BALANCED);
        assert!(outcome.score_distribution.is_empty());
        assert!(outcome.status_breakdown.is_empty());
    }

    #[test]
    fn test_primary_is_the_flagged_candidate() {
        let mut candidates = vec![
            candidate("00000000000000000001", Some("US"), 1),
            candidate("00000000000000000002", Some("GB"), 2),
        ];
        candidates[1].is_primary_selection = true;

        let outcome = rank("shell.com", Some("Shell"), &candidates, &RankingParams::default());
        let primary = outcome.primary.unwrap();
        assert_eq!(primary.lei_code, "00000000000000000002");
    }

    #[test]
    fn test_primary_falls_back_to_best_rank() {
        let candidates = vec![
            candidate("00000000000000000003", Some("NL"), 3),
            candidate("00000000000000000001", Some("US"), 1),
            candidate("00000000000000000002", Some("GB"), 2),
        ];
        let outcome = rank("shell.com", None, &candidates, &RankingParams::default());
        assert_eq!(outcome.primary.unwrap().rank_position, 1);
    }

    #[test]
    fn test_status_breakdown_counts() {
        let mut candidates = vec![
            candidate("00000000000000000001", Some("US"), 1),
            candidate("00000000000000000002", Some("US"), 2),
            candidate("00000000000000000003", Some("GB"), 3),
        ];
        candidates[1].entity_status = Some("INACTIVE".to_string());
        candidates[2].entity_status = None;

        let outcome = rank("example.com", None, &candidates, &RankingParams::default());
        assert_eq!(outcome.status_breakdown["ACTIVE"], 1);
        assert_eq!(outcome.status_breakdown["INACTIVE"], 1);
        assert_eq!(outcome.status_breakdown["Unknown"], 1);
    }

    #[test]
    fn test_configurable_dominant_jurisdiction() {
        let candidates = vec![
            candidate("00000000000000000001", Some("DE"), 1),
            candidate("00000000000000000002", Some("DE"), 2),
            candidate("00000000000000000003", Some("US"), 3),
        ];
        let params = RankingParams {
            dominant_jurisdiction: "DE".to_string(),
            bias_threshold: 0.5,
            multinational_min_jurisdictions: 2,
        };
        let report = assess_bias(&candidates, &params);
        assert_eq!(report.assessment, ASSESSMENT_HIGH_BIAS);
        assert_eq!(report.dominant_jurisdiction, "DE");
    }

    #[test]
    fn test_multinational_structure_requires_more_than_minimum() {
        let two = vec![
            candidate("00000000000000000001", Some("US"), 1),
            candidate("00000000000000000002", Some("GB"), 2),
        ];
        assert!(!assess_bias(&two, &RankingParams::default()).multinational_structure);

        let three = vec![
            candidate("00000000000000000001", Some("US"), 1),
            candidate("00000000000000000002", Some("GB"), 2),
            candidate("00000000000000000003", Some("NL"), 3),
        ];
        assert!(assess_bias(&three, &RankingParams::default()).multinational_structure);
    }
}
