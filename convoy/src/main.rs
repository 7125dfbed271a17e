mod artifacts;
mod enrich;
mod errors;
mod submit;

use clap::{Parser, Subcommand};
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use std::process::ExitCode;
use submitter::SubmitOverrides;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "convoy",
    about = "Batch enrichment and submission pipeline for JSON job bundles"
)]
struct Cli {
    /// Send run metrics to this statsd host
    #[arg(long, global = true)]
    statsd_host: Option<String>,

    #[arg(long, global = true, default_value_t = 8125)]
    statsd_port: u16,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a bundle's enrichment rules and write the enriched document
    Enrich {
        /// Path to the job bundle JSON file
        bundle: PathBuf,

        /// Output file path (default: <bundle>_enriched.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum concurrent API requests
        #[arg(long, default_value_t = enricher::DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },

    /// Submit an enriched document to the target endpoint in batches
    Submit {
        /// Path to the enriched JSON document (or a retry payload)
        input: PathBuf,

        /// Override the target URL from the document
        #[arg(long)]
        url: Option<String>,

        /// Override the HTTP method (POST or PUT)
        #[arg(long)]
        method: Option<String>,

        /// Override the batch size
        #[arg(long)]
        batch_size: Option<usize>,

        /// Print the batch plan without sending anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Some(host) = &cli.statsd_host {
        install_statsd(host, cli.statsd_port);
    }

    let result = match cli.command {
        Command::Enrich {
            bundle,
            output,
            concurrency,
        } => enrich::run(&bundle, output.as_deref(), concurrency).await,
        Command::Submit {
            input,
            url,
            method,
            batch_size,
            dry_run,
        } => {
            let overrides = match parse_overrides(url, method, batch_size, dry_run) {
                Ok(overrides) => overrides,
                Err(e) => {
                    tracing::error!("{e}");
                    return ExitCode::FAILURE;
                }
            };
            submit::run(&input, overrides).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn parse_overrides(
    url: Option<String>,
    method: Option<String>,
    batch_size: Option<usize>,
    dry_run: bool,
) -> Result<SubmitOverrides, bundle::ValidationError> {
    Ok(SubmitOverrides {
        target_url: url,
        method: method.as_deref().map(str::parse).transpose()?,
        batch_size,
        dry_run,
    })
}

fn install_statsd(host: &str, port: u16) {
    match StatsdBuilder::from(host, port).build(Some("convoy")) {
        Ok(recorder) => {
            if metrics::set_global_recorder(recorder).is_err() {
                tracing::warn!("metrics recorder already installed");
                return;
            }
            describe_metrics();
        }
        Err(e) => tracing::warn!(error = %e, "failed to set up statsd metrics exporter"),
    }
}

/// Registers descriptions for every metric the pipeline emits
fn describe_metrics() {
    use bundle::metrics_defs::{MetricDef, MetricType};

    let all: Vec<&MetricDef> = enricher::metrics_defs::ALL_METRICS
        .iter()
        .chain(submitter::metrics_defs::ALL_METRICS.iter())
        .collect();

    for def in all {
        match def.metric_type {
            MetricType::Counter => metrics::describe_counter!(def.name, def.description),
            MetricType::Gauge => metrics::describe_gauge!(def.name, def.description),
            MetricType::Histogram => metrics::describe_histogram!(def.name, def.description),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundle::SubmitMethod;

    #[test]
    fn overrides_parse_methods_case_insensitively() {
        let overrides = parse_overrides(None, Some("put".to_string()), None, false).unwrap();
        assert_eq!(overrides.method, Some(SubmitMethod::Put));
    }

    #[test]
    fn overrides_reject_unknown_methods() {
        assert!(parse_overrides(None, Some("DELETE".to_string()), None, false).is_err());
    }
}
