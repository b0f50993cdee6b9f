use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use leifinder::batch::{self, BatchOutcome};
use leifinder::cli::Args;
use leifinder::config::{self, AppConfig};
use leifinder::export;
use leifinder::pipeline::Pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Err(message) = args.validate() {
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }

    init_logging(args.verbose);

    // Handle --init before any other processing
    if args.init {
        match AppConfig::create_default_config() {
            Ok(path) => {
                println!("Created default configuration file at: {}", path.display());
                println!("Edit this file to customize settings, then run leifinder again.");
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("Failed to create configuration file: {}", e);
                std::process::exit(1);
            }
        }
    }

    let mut app_config = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(config::ConfigError::FileNotFound(path)) => {
            match AppConfig::prompt_create_config() {
                Ok(Some(created_path)) => {
                    println!(
                        "Created default configuration file at: {}",
                        created_path.display()
                    );
                    println!("Edit this file to customize settings, then run leifinder again.");
                    std::process::exit(0);
                }
                Ok(None) => {
                    eprintln!("Configuration file not found at: {}", path.display());
                    eprintln!("Run with --init to create a default configuration file.");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Failed to create configuration file: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // CLI flags override the config's collaborator toggles
    if args.llm {
        app_config.extraction.llm_enabled = true;
    }
    if args.no_llm {
        app_config.extraction.llm_enabled = false;
    }
    if args.registry {
        app_config.registry.enabled = true;
    }
    if args.no_registry {
        app_config.registry.enabled = false;
    }

    let pipeline = Arc::new(Pipeline::new(app_config)?);
    let output_path = args.output_path();

    if let Some(input_file) = &args.input_file {
        run_batch_mode(pipeline, Path::new(input_file), &args, &output_path).await?;
    } else if let Some(domain) = &args.domain {
        run_single_domain(pipeline, domain, &args, &output_path).await?;
    }

    Ok(())
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "leifinder=warn",
        1 => "leifinder=info",
        _ => "leifinder=debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run_single_domain(
    pipeline: Arc<Pipeline>,
    domain: &str,
    args: &Args,
    output_path: &str,
) -> Result<()> {
    debug!("Processing single domain {}", domain);
    let report = pipeline.process_domain(domain).await;
    let reports = vec![report];

    match args.output_format.as_str() {
        "json" => export::export_json(&reports, None, output_path)?,
        _ => export::export_csv(&reports, output_path)?,
    }

    export::print_summary(&reports, None);
    println!("Report written to {}", output_path);
    Ok(())
}

async fn run_batch_mode(
    pipeline: Arc<Pipeline>,
    input_file: &Path,
    args: &Args,
    output_path: &str,
) -> Result<()> {
    let entries = batch::parse_domain_file(input_file)?;
    if entries.is_empty() {
        eprintln!("No valid domains found in {}", input_file.display());
        std::process::exit(1);
    }

    let batch_id = batch::new_batch_id();
    let BatchOutcome {
        summary, reports, ..
    } = batch::run_batch(pipeline, entries, &batch_id, args.batch_parallel).await;

    match args.output_format.as_str() {
        "json" => export::export_json(&reports, Some(&summary), output_path)?,
        _ => export::export_csv(&reports, output_path)?,
    }

    export::print_summary(&reports, Some(&summary));
    println!("Report written to {}", output_path);
    Ok(())
}
