//! Batch input parsing and batch execution

use std::io::Write;
use std::sync::Arc;

use leifinder::batch::{self, parse_domain_file};
use leifinder::config::{AppConfig, DEFAULT_CONFIG};
use leifinder::pipeline::{Pipeline, STATUS_FETCH_FAILED};

fn offline_pipeline() -> Arc<Pipeline> {
    let mut config: AppConfig = toml::from_str(DEFAULT_CONFIG).expect("default config parses");
    config.registry.enabled = false;
    config.extraction.llm_enabled = false;
    config.http.request_timeout_secs = 2;
    Arc::new(Pipeline::new(config).unwrap())
}

#[test]
fn test_parse_csv_file_with_header() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "domain,label").unwrap();
    writeln!(file, "example.com,Example Inc").unwrap();
    writeln!(file, "test.org,").unwrap();
    file.flush().unwrap();

    let entries = parse_domain_file(file.path()).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].domain, "example.com");
    assert_eq!(entries[0].label.as_deref(), Some("Example Inc"));
    assert!(entries[1].label.is_none());
}

#[test]
fn test_parse_json_file() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"{{"domains": ["example.com", "not a domain", "test.org"]}}"#
    )
    .unwrap();
    file.flush().unwrap();

    let entries = parse_domain_file(file.path()).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].domain, "test.org");
}

#[test]
fn test_unknown_extension_is_rejected() {
    let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    assert!(parse_domain_file(file.path()).is_err());
}

#[tokio::test]
async fn test_batch_run_survives_unreachable_domains() {
    // .invalid never resolves, so every fetch fails; the batch must still
    // complete and report each domain
    let entries = vec![
        batch::DomainEntry::new("one.invalid"),
        batch::DomainEntry::new("two.invalid"),
        batch::DomainEntry::new("one.invalid"),
    ];

    let outcome = batch::run_batch(offline_pipeline(), entries, "batch-test", 2).await;

    assert_eq!(outcome.summary.total_domains, 3);
    assert_eq!(outcome.summary.fetch_failures, 3);
    assert_eq!(outcome.summary.successful, 0);
    assert_eq!(outcome.reports.len(), 3);
    assert!(outcome
        .reports
        .iter()
        .all(|r| r.status == STATUS_FETCH_FAILED));

    // Input order is preserved
    assert_eq!(outcome.reports[0].domain, "one.invalid");
    assert_eq!(outcome.reports[1].domain, "two.invalid");

    // The repeated domain is flagged as a duplicate within the run
    assert_eq!(outcome.summary.duplicates.len(), 1);
    assert_eq!(outcome.summary.duplicates[0].occurrence_count, 2);

    // Observations share the batch id
    assert!(outcome
        .observations
        .iter()
        .all(|o| o.batch_id == "batch-test"));
}

#[tokio::test]
async fn test_batch_run_serialized_completes_every_domain() {
    // Parallelism of 1 forces each task through the permit gate in turn
    let entries = vec![
        batch::DomainEntry::new("one.invalid"),
        batch::DomainEntry::new("two.invalid"),
        batch::DomainEntry::new("three.invalid"),
    ];

    let outcome = batch::run_batch(offline_pipeline(), entries, "batch-serial", 1).await;

    assert_eq!(outcome.reports.len(), 3);
    assert_eq!(outcome.reports[2].domain, "three.invalid");
}
