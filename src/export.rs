use anyhow::Result;
use csv::Writer;
use std::fs::File;
use std::io::Write;
use tracing::{debug, info};

use crate::batch::BatchSummary;
use crate::pipeline::DomainReport;

/// Join a list of per-candidate values into a single CSV cell.
fn join_cell<I: IntoIterator<Item = String>>(values: I) -> String {
    values.into_iter().collect::<Vec<_>>().join("; ")
}

fn format_confidence(confidence: Option<f64>) -> String {
    confidence.map(|c| format!("{:.0}", c)).unwrap_or_default()
}

pub fn export_csv(reports: &[DomainReport], output_path: &str) -> Result<()> {
    debug!("Exporting {} domain reports to CSV: {}", reports.len(), output_path);

    let file = File::create(output_path)?;
    let mut wtr = Writer::from_writer(file);

    wtr.write_record([
        "Domain",
        "Identity Key",
        "Status",
        "Primary Entity",
        "Confidence",
        "Candidate Sources",
        "Emails",
        "Phones",
        "Primary LEI",
        "Primary Legal Name",
        "Primary Jurisdiction",
        "Bias Assessment",
        "All LEIs",
        "All Legal Names",
        "All Jurisdictions",
        "All Statuses",
    ])?;

    for report in reports {
        let extraction = report.extraction.as_ref();
        let ranking = report.ranking.as_ref();

        let candidate_sources = extraction
            .map(|e| {
                join_cell(
                    e.candidates
                        .iter()
                        .map(|c| format!("{} ({})", c.text, c.source)),
                )
            })
            .unwrap_or_default();

        let primary = ranking.and_then(|r| r.primary.as_ref());

        let (all_leis, all_names, all_jurisdictions, all_statuses) = match ranking {
            Some(outcome) => {
                let candidates = &outcome.candidates;
                (
                    join_cell(candidates.iter().map(|c| c.lei_code.clone())),
                    join_cell(candidates.iter().map(|c| c.legal_name.clone())),
                    join_cell(
                        candidates
                            .iter()
                            .map(|c| c.jurisdiction.clone().unwrap_or_default()),
                    ),
                    join_cell(
                        candidates
                            .iter()
                            .map(|c| c.entity_status.clone().unwrap_or_default()),
                    ),
                )
            }
            None => Default::default(),
        };

        let confidence = format_confidence(report.confidence_score);
        let emails = extraction.map(|e| join_cell(e.emails.clone())).unwrap_or_default();
        let phones = extraction.map(|e| join_cell(e.phones.clone())).unwrap_or_default();

        wtr.write_record([
            report.domain.as_str(),
            report.identity.identity_key.as_str(),
            report.status.as_str(),
            report.company_name().unwrap_or(""),
            confidence.as_str(),
            candidate_sources.as_str(),
            emails.as_str(),
            phones.as_str(),
            primary.map(|p| p.lei_code.as_str()).unwrap_or(""),
            primary.map(|p| p.legal_name.as_str()).unwrap_or(""),
            primary
                .and_then(|p| p.jurisdiction.as_deref())
                .unwrap_or(""),
            ranking.map(|r| r.bias.assessment.as_str()).unwrap_or(""),
            all_leis.as_str(),
            all_names.as_str(),
            all_jurisdictions.as_str(),
            all_statuses.as_str(),
        ])?;
    }

    wtr.flush()?;
    info!("Exported {} domain reports to CSV: {}", reports.len(), output_path);

    Ok(())
}

pub fn export_json(
    reports: &[DomainReport],
    summary: Option<&BatchSummary>,
    output_path: &str,
) -> Result<()> {
    debug!("Exporting {} domain reports to JSON: {}", reports.len(), output_path);

    let json_output = JsonExport {
        summary,
        reports,
    };

    let json_string = serde_json::to_string_pretty(&json_output)?;

    let mut file = File::create(output_path)?;
    file.write_all(json_string.as_bytes())?;

    info!("Exported {} domain reports to JSON: {}", reports.len(), output_path);

    Ok(())
}

#[derive(serde::Serialize)]
struct JsonExport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a BatchSummary>,
    reports: &'a [DomainReport],
}

/// Console summary after a run, single-domain or batch.
pub fn print_summary(reports: &[DomainReport], summary: Option<&BatchSummary>) {
    if reports.is_empty() {
        println!("No domains processed.");
        return;
    }

    println!("\n=== Entity Extraction Summary ===");
    println!("Domains processed: {}", reports.len());

    for report in reports {
        match report.company_name() {
            Some(name) => {
                let confidence = report
                    .confidence_score
                    .map(|c| format!(" ({:.0}%)", c))
                    .unwrap_or_default();
                println!("  {} -> {}{}", report.domain, name, confidence);
            }
            None => println!("  {} -> [{}]", report.domain, report.status),
        }

        if let Some(outcome) = &report.ranking {
            if let Some(primary) = &outcome.primary {
                println!(
                    "      LEI {} {} [{}]",
                    primary.lei_code,
                    primary.legal_name,
                    primary.jurisdiction.as_deref().unwrap_or("??")
                );
            }
            if outcome.total_candidates > 0 {
                println!(
                    "      {} registry candidates, {}",
                    outcome.total_candidates, outcome.bias.assessment
                );
            }
        }
    }

    if let Some(batch) = summary {
        println!("\nBatch {}:", batch.batch_id);
        println!(
            "  {} succeeded, {} without entity, {} fetch failures",
            batch.successful, batch.no_entity, batch.fetch_failures
        );
        if !batch.duplicates.is_empty() {
            println!("  {} domains observed more than once:", batch.duplicates.len());
            for dup in &batch.duplicates {
                println!(
                    "    {} seen {} times across {:?}",
                    dup.identity_key, dup.occurrence_count, dup.batch_ids
                );
            }
        }
    }

    println!("=================================\n");
}
