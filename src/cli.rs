use clap::Parser;
use dirs;

#[derive(Parser, Debug)]
#[command(name = "leifinder")]
#[command(about = "Mine legal-entity names from web pages and resolve them against the LEI registry")]
#[command(version)]
pub struct Args {
    /// Create default configuration file at ./config/leifinder.toml
    #[arg(long)]
    pub init: bool,

    /// Single domain to process
    #[arg(short, long)]
    pub domain: Option<String>,

    /// Path to CSV or JSON file containing multiple domains to process
    /// CSV: one domain per line, or a column named "domain" (optional "label" column)
    /// JSON: array of domain strings, or array of objects with "domain" field
    #[arg(long, value_name = "FILE")]
    pub input_file: Option<String>,

    /// Output format: 'csv' (default) or 'json'
    #[arg(short = 'f', long, default_value = "csv")]
    pub output_format: String,

    /// Output filename (extension is set from the format if not provided)
    #[arg(short, long, default_value = "entity_report")]
    pub output: String,

    /// Output directory for the report file (defaults to the desktop, then
    /// the current directory)
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Number of domains to process in parallel during batch runs
    #[arg(long, value_name = "N", default_value = "5")]
    pub batch_parallel: usize,

    /// Ask the configured LLM for a company-name hint when markup mining finds nothing
    #[arg(long, conflicts_with = "no_llm")]
    pub llm: bool,

    /// Skip the LLM collaborator (overrides config)
    #[arg(long, conflicts_with = "llm")]
    pub no_llm: bool,

    /// Look extracted names up in the LEI registry (overrides config)
    #[arg(long, conflicts_with = "no_registry")]
    pub registry: bool,

    /// Skip the LEI registry lookup (overrides config)
    #[arg(long, conflicts_with = "registry")]
    pub no_registry: bool,

    /// Verbose logging (use -v for INFO, -vv for DEBUG)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Check if running in batch mode (--input-file provided)
    pub fn is_batch_mode(&self) -> bool {
        self.input_file.is_some()
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.init && !self.is_batch_mode() {
            match &self.domain {
                None => {
                    return Err(
                        "Domain is required (use --domain or --input-file for batch mode)"
                            .to_string(),
                    )
                }
                Some(d) if d.is_empty() => return Err("Domain cannot be empty".to_string()),
                _ => {}
            }
        }

        if self.domain.is_some() && self.is_batch_mode() {
            return Err("--domain and --input-file are mutually exclusive".to_string());
        }

        if self.is_batch_mode() {
            if self.batch_parallel == 0 {
                return Err("Batch parallel must be greater than 0".to_string());
            }
            if self.batch_parallel > 20 {
                return Err(
                    "Batch parallel cannot exceed 20 to avoid overwhelming target sites"
                        .to_string(),
                );
            }
        }

        if !["csv", "json"].contains(&self.output_format.as_str()) {
            return Err("Output format must be 'csv' or 'json'".to_string());
        }

        Ok(())
    }

    /// Explicit --output-dir, else the user's desktop, else the current
    /// directory.
    pub fn get_output_dir(&self) -> String {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => dirs::desktop_dir()
                .map(|d| d.to_string_lossy().to_string())
                .unwrap_or_else(|| ".".to_string()),
        }
    }

    /// Full path of the report file, with the format extension applied.
    pub fn output_path(&self) -> String {
        let mut name = self.output.clone();
        let suffix = format!(".{}", self.output_format);
        if !name.ends_with(&suffix) {
            name.push_str(&suffix);
        }
        std::path::Path::new(&self.get_output_dir())
            .join(name)
            .to_string_lossy()
            .to_string()
    }
}
