//! Pipeline flow over already-fetched HTML, with mocked collaborators

mod common;

use common::wiremock_helpers::{mock_chat_server, mock_registry_server};
use leifinder::aggregate;
use leifinder::config::{AppConfig, DEFAULT_CONFIG};
use leifinder::pipeline::{Pipeline, STATUS_NO_ENTITY, STATUS_SUCCESS};
use leifinder::ranker::ASSESSMENT_HIGH_BIAS;

fn base_config() -> AppConfig {
    let mut config: AppConfig = toml::from_str(DEFAULT_CONFIG).expect("default config parses");
    config.registry.enabled = false;
    config.extraction.llm_enabled = false;
    config
}

#[tokio::test]
async fn test_process_html_success_without_collaborators() {
    let pipeline = Pipeline::new(base_config()).unwrap();

    let html = "<title>Welcome to Acme Corp</title>\
                <meta property='og:site_name' content='Acme Corporation'>";
    let report = pipeline.process_html("acme.com", html).await;

    assert_eq!(report.status, STATUS_SUCCESS);
    assert_eq!(report.company_name(), Some("Acme Corporation"));
    assert!(report.ranking.is_none());
    // Meta site-name source scores 0.85, scaled to percent
    assert_eq!(report.confidence_score, Some(85.0));
    assert_eq!(report.identity.identity_key.len(), 64);
}

#[tokio::test]
async fn test_process_html_without_signals_reports_no_entity() {
    let pipeline = Pipeline::new(base_config()).unwrap();

    let report = pipeline.process_html("empty.example", "<html><body></body></html>").await;

    assert_eq!(report.status, STATUS_NO_ENTITY);
    assert!(report.company_name().is_none());
    assert!(report.confidence_score.is_none());

    let observation = report.to_observation("batch-1");
    assert_eq!(observation.status, STATUS_NO_ENTITY);
    assert!(observation.confidence_score.is_none());
}

#[tokio::test]
async fn test_registry_lookup_feeds_ranking_and_bias() {
    // 3 of 4 candidates domiciled in the dominant jurisdiction (75% > 60%)
    let records: Vec<serde_json::Value> = (0..4)
        .map(|i| {
            let jurisdiction = if i < 3 { "US" } else { "DE" };
            serde_json::json!({
                "attributes": {
                    "lei": format!("5493001KJTIIGC8Y1R{:02}", i),
                    "entity": {
                        "legalName": {"name": format!("Acme Holding {}", i)},
                        "jurisdiction": jurisdiction,
                        "status": "ACTIVE"
                    }
                }
            })
        })
        .collect();
    let server = mock_registry_server(serde_json::Value::Array(records)).await;

    let mut config = base_config();
    config.registry.enabled = true;
    config.registry.endpoint = format!("{}/api/v1/lei-records", server.uri());
    let pipeline = Pipeline::new(config).unwrap();

    let html = "<meta property='og:site_name' content='Acme Holding'>";
    let report = pipeline.process_html("acme.com", html).await;

    let outcome = report.ranking.expect("ranking should be present");
    assert_eq!(outcome.total_candidates, 4);
    assert_eq!(outcome.primary.as_ref().unwrap().rank_position, 1);
    assert_eq!(outcome.bias.assessment, ASSESSMENT_HIGH_BIAS);
    assert_eq!(outcome.status_breakdown.get("ACTIVE"), Some(&4));
}

#[tokio::test]
async fn test_registry_failure_degrades_to_empty_ranking() {
    let mut config = base_config();
    config.registry.enabled = true;
    // Nothing listens here: the lookup fails, the report survives
    config.registry.endpoint = "http://127.0.0.1:9/lei-records".to_string();
    let pipeline = Pipeline::new(config).unwrap();

    let html = "<meta property='og:site_name' content='Acme Corporation'>";
    let report = pipeline.process_html("acme.com", html).await;

    assert_eq!(report.status, STATUS_SUCCESS);
    let outcome = report.ranking.expect("ranking should still be present");
    assert_eq!(outcome.total_candidates, 0);
    assert!(outcome.primary.is_none());
}

#[tokio::test]
async fn test_llm_supplements_when_markup_is_bare() {
    let payload =
        r#"{"company_name": {"value": "Initech GmbH", "confidence": 75, "context": "footer"}}"#;
    let server = mock_chat_server(payload).await;

    let mut config = base_config();
    config.extraction.llm_enabled = true;
    config.llm.endpoint = format!("{}/chat/completions", server.uri());
    let pipeline = Pipeline::new(config).unwrap();

    let html = "<html><body><p>Initech GmbH builds workflow tooling.</p></body></html>";
    let report = pipeline.process_html("initech.de", html).await;

    assert_eq!(report.status, STATUS_SUCCESS);
    assert_eq!(report.company_name(), Some("Initech GmbH"));
    assert!(report.llm_fields.contains_key("company_name"));
}

#[tokio::test]
async fn test_llm_is_not_consulted_when_markup_wins() {
    let mut config = base_config();
    config.extraction.llm_enabled = true;
    // Unroutable endpoint: a request would hang or fail, so the assertion
    // also proves no call was made
    config.llm.endpoint = "https://llm.invalid/chat/completions".to_string();
    let pipeline = Pipeline::new(config).unwrap();

    let html = "<meta property='og:site_name' content='Acme Corporation'>";
    let report = pipeline.process_html("acme.com", html).await;

    assert_eq!(report.company_name(), Some("Acme Corporation"));
    assert!(report.llm_fields.is_empty());
}

#[tokio::test]
async fn test_observations_aggregate_across_batches() {
    let pipeline = Pipeline::new(base_config()).unwrap();

    let thin = pipeline
        .process_html("acme.com", "<title>Welcome to Acme Corp</title>")
        .await;
    let rich = pipeline
        .process_html(
            "acme.com",
            "<script type=\"application/ld+json\">{\"@type\": \"Organization\", \"name\": \"Acme Corporation\"}</script>",
        )
        .await;

    let observations = vec![thin.to_observation("batch-a"), rich.to_observation("batch-b")];
    let history = aggregate::aggregate(&thin.identity.identity_key, &observations);

    assert_eq!(history.total_attempts, 2);
    assert_eq!(history.batches, vec!["batch-a", "batch-b"]);
    // Structured data (0.95) outranks the title source (0.65)
    assert_eq!(
        history.best.as_ref().unwrap().company_name.as_deref(),
        Some("Acme Corporation")
    );
    assert_eq!(history.confidence_improvement, Some(30.0));

    let duplicates = aggregate::find_duplicates(&observations);
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].occurrence_count, 2);
    assert_eq!(duplicates[0].batch_ids, vec!["batch-a", "batch-b"]);
}
