use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use annoseek::go_terms::{read_iprscan_tsv, GoTermSet};
use annoseek::config::CURATED_ECO_CODES;
use annoseek::report::{write_failed_units, write_report};
use annoseek::{AnnotationRegistry, DomainUnit, EngineConfig, TransferEngine};

#[derive(Parser)]
#[command(name = "annoseek")]
#[command(about = "Transfer curated annotations from seed sequences onto novel domain hits")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transfer annotations through one or more domain alignments
    Transfer {
        /// Alignment files of seeds and novel hits (Stockholm, optionally gzipped)
        #[arg(short, long, required = true, num_args = 1..)]
        alignment: Vec<PathBuf>,

        /// Directory holding <DOMAIN>/annotations.json curated data
        #[arg(short, long)]
        resource_dir: PathBuf,

        /// Directory receiving <target>/<DOMAIN>_report.json reports
        #[arg(short, long)]
        output_dir: PathBuf,

        /// InterProScan TSV reports with GO terms for the novel sequences
        #[arg(long, num_args = 1..)]
        iprscan: Vec<PathBuf>,

        /// Domain id for every alignment (default: taken from each file name)
        #[arg(short, long)]
        domain: Option<String>,

        /// JSON engine configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Conservation threshold for high-confidence transfers
        #[arg(long)]
        threshold: Option<f64>,

        /// Number of worker threads
        #[arg(short, long)]
        threads: Option<usize>,

        /// Keep only experimental and curator-inferred evidence
        #[arg(long, default_value = "false")]
        curated_evidence: bool,

        /// Log at debug level unless RUST_LOG says otherwise
        #[arg(short, long, default_value = "false")]
        verbose: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Transfer {
            alignment,
            resource_dir,
            output_dir,
            iprscan,
            domain,
            config,
            threshold,
            threads,
            curated_evidence,
            verbose,
        } => {
            init_logging(verbose);

            let mut engine_config = match &config {
                Some(path) => EngineConfig::from_json_path(path)
                    .with_context(|| format!("loading configuration {}", path.display()))?,
                None => EngineConfig::default(),
            };
            if let Some(threshold) = threshold {
                engine_config.confidence_threshold = threshold;
            }
            if threads.is_some() {
                engine_config.num_threads = threads;
            }
            if curated_evidence {
                engine_config.accepted_eco_codes =
                    CURATED_ECO_CODES.iter().map(|c| c.to_string()).collect();
                engine_config.require_evidence = true;
            }
            engine_config.validate()?;

            if !resource_dir.is_dir() {
                bail!("resource directory {} does not exist", resource_dir.display());
            }
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("creating output directory {}", output_dir.display()))?;

            let units = alignment
                .iter()
                .map(|path| DomainUnit::from_path(path, domain.as_deref()))
                .collect::<Result<Vec<_>, _>>()?;

            let mut target_go: HashMap<String, GoTermSet> = HashMap::new();
            for path in &iprscan {
                let terms = read_iprscan_tsv(path)
                    .with_context(|| format!("reading InterProScan report {}", path.display()))?;
                for (sequence, set) in terms {
                    target_go.entry(sequence).or_default().extend_from(&set);
                }
            }

            info!(
                alignments = units.len(),
                resource_dir = %resource_dir.display(),
                threshold = engine_config.confidence_threshold,
                go_sequences = target_go.len(),
                "Starting annotation transfer"
            );

            let registry =
                AnnotationRegistry::preload(&resource_dir, units.iter().map(|u| u.domain.as_str()));
            let engine =
                TransferEngine::new(&registry, &engine_config).with_target_go_terms(target_go);
            let batch = engine.process_batch(&units)?;

            for report in &batch.reports {
                write_report(report, &output_dir).with_context(|| {
                    format!("writing report for {} / {}", report.target, report.domain)
                })?;
            }
            for failed in &batch.failed_units {
                error!(
                    domain = %failed.domain,
                    source = %failed.source,
                    reason = %failed.reason,
                    "Alignment skipped"
                );
            }
            write_failed_units(&batch.failed_units, &output_dir).context("writing failed units")?;

            let failed_reports = batch.reports.iter().filter(|r| r.is_failed()).count();
            println!(
                "{} reports written to {} ({} failed), {} alignments skipped, {} annotations transferred",
                batch.reports.len(),
                output_dir.display(),
                failed_reports,
                batch.failed_units.len(),
                batch.metrics.annotations_transferred
            );
        }
    }

    Ok(())
}
