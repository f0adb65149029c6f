use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, error::ErrorKind};
use tracing_subscriber::EnvFilter;

use crate::config::{IngestConfig, PipelineConfig, QuotaTier, SchemaPolicy, SubsetOutputs};
use crate::constants::ingest::{DEFAULT_QUOTA, DEFAULT_SEED};
use crate::constants::paths::{
    DEFAULT_ADJUDICATION_OUT, DEFAULT_ANNOTATIONS, DEFAULT_CATALOG, DEFAULT_RATING_OUT,
};
use crate::pipeline::{progress_report, run_ingest, run_pipeline};
use crate::router::Subset;

#[derive(Debug, Parser)]
#[command(
    name = "get_samples",
    disable_help_subcommand = true,
    about = "Route annotated items into rating and adjudication subsets",
    long_about = "Group annotation records by item, check completeness and agreement, consolidate revisions, and write one JSONL file per subset."
)]
struct GetSamplesCli {
    #[arg(long, value_name = "PATH", default_value = DEFAULT_ANNOTATIONS, help = "Annotation export (JSONL)")]
    annotations: PathBuf,
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CATALOG, help = "Item catalog (CSV)")]
    catalog: PathBuf,
    #[arg(
        long = "adjudicated",
        value_name = "PATH",
        help = "Already-adjudicated export (JSONL), repeat as needed"
    )]
    adjudicated: Vec<PathBuf>,
    #[arg(long = "rating-out", value_name = "PATH", default_value = DEFAULT_RATING_OUT)]
    rating_out: PathBuf,
    #[arg(long = "adjudication-out", value_name = "PATH", default_value = DEFAULT_ADJUDICATION_OUT)]
    adjudication_out: PathBuf,
    #[arg(long = "approved-out", value_name = "PATH", help = "Optional output for approved items")]
    approved_out: Option<PathBuf>,
    #[arg(long = "rejected-out", value_name = "PATH", help = "Optional output for rejected items")]
    rejected_out: Option<PathBuf>,
    #[arg(
        long = "clean-annotations-out",
        value_name = "PATH",
        help = "Optional output for validated annotations with bookkeeping fields stripped"
    )]
    clean_annotations_out: Option<PathBuf>,
    #[arg(
        long = "passthrough-field",
        value_name = "NAME",
        help = "Item field to keep in consolidated output, repeat as needed"
    )]
    passthrough_fields: Vec<String>,
    #[arg(
        long = "ignore-field",
        value_name = "NAME",
        help = "Extra field to drop on load, repeat as needed"
    )]
    ignored_fields: Vec<String>,
    #[arg(long = "lenient-schema", help = "Drop unknown fields with a warning instead of failing")]
    lenient_schema: bool,
}

impl GetSamplesCli {
    fn into_config(self) -> PipelineConfig {
        let mut schema = SchemaPolicy::default().with_unknown_fields_allowed(self.lenient_schema);
        for field in self.passthrough_fields {
            schema = schema.with_passthrough_field(field);
        }
        for field in self.ignored_fields {
            schema = schema.with_ignored_field(field);
        }
        PipelineConfig {
            annotations: self.annotations,
            catalog: self.catalog,
            adjudicated: self.adjudicated,
            clean_annotations: self.clean_annotations_out,
            schema,
            outputs: SubsetOutputs {
                rating: Some(self.rating_out),
                adjudication: Some(self.adjudication_out),
                approved: self.approved_out,
                rejected: self.rejected_out,
            },
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "ingest_items",
    disable_help_subcommand = true,
    about = "Turn a CSV item catalog into JSONL annotation inputs",
    long_about = "Shuffle a CSV item catalog with a fixed seed, optionally draw a sample into a separate file, and optionally assign per-item annotator quotas."
)]
struct IngestItemsCli {
    #[arg(long, value_name = "PATH", help = "Item catalog (CSV)")]
    catalog: PathBuf,
    #[arg(long, value_name = "PATH", help = "Output for the shuffled (or sampled) items")]
    out: PathBuf,
    #[arg(
        long = "remainder-out",
        value_name = "PATH",
        requires = "sample",
        help = "Output for items not drawn into the sample"
    )]
    remainder_out: Option<PathBuf>,
    #[arg(
        long,
        value_name = "N",
        value_parser = parse_positive_usize,
        requires = "remainder_out",
        help = "Draw N items into --out and write the rest to --remainder-out"
    )]
    sample: Option<usize>,
    #[arg(long, default_value_t = DEFAULT_SEED, help = "Deterministic shuffle seed")]
    seed: u64,
    #[arg(long = "no-shuffle", help = "Keep catalog order when not sampling")]
    no_shuffle: bool,
    #[arg(
        long = "quota",
        value_name = "ROWS:ANNOTATORS",
        value_parser = parse_quota_tier,
        help = "Assign ANNOTATORS to the next ROWS items (0 means every annotator), repeat in order"
    )]
    quotas: Vec<QuotaTier>,
    #[arg(
        long = "default-quota",
        default_value_t = DEFAULT_QUOTA,
        help = "Annotators for items past the last --quota tier"
    )]
    default_quota: u32,
}

#[derive(Debug, Parser)]
#[command(
    name = "progress_check",
    disable_help_subcommand = true,
    about = "Count annotations per annotator"
)]
struct ProgressCheckCli {
    #[arg(long, value_name = "PATH", default_value = DEFAULT_ANNOTATIONS, help = "Annotation export (JSONL)")]
    annotations: PathBuf,
    #[arg(long, value_name = "PREFIX", help = "Only count annotator ids starting with PREFIX")]
    prefix: Option<String>,
}

/// Install a stderr `tracing` subscriber filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run the sampling pipeline from command-line arguments (without the program name).
pub fn run_get_samples<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let Some(cli) =
        parse_cli::<GetSamplesCli, _>(std::iter::once("get_samples".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    let config = cli.into_config();
    let (summary, _) = run_pipeline(&config)?;

    println!("=== get_samples ===");
    println!("annotation records: {}", summary.records);
    println!("items: {}", summary.items);
    for subset in Subset::ALL {
        let count = summary.counts.get(&subset).copied().unwrap_or(0);
        match summary.written.get(&subset) {
            Some(path) => println!("  {subset}: {count} -> {}", path.display()),
            None => println!("  {subset}: {count}"),
        }
    }
    Ok(())
}

/// Run catalog ingestion from command-line arguments (without the program name).
pub fn run_ingest_items<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let Some(cli) = parse_cli::<IngestItemsCli, _>(
        std::iter::once("ingest_items".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let config = IngestConfig {
        seed: cli.seed,
        shuffle: !cli.no_shuffle,
        sample_size: cli.sample,
        quota_tiers: cli.quotas,
        default_quota: cli.default_quota,
    };
    let summary = run_ingest(
        &cli.catalog,
        &config,
        &cli.out,
        cli.remainder_out.as_deref(),
    )?;

    println!("Writing to {}: {} items", cli.out.display(), summary.primary);
    if let (Some(path), Some(count)) = (&cli.remainder_out, summary.remainder) {
        println!("Writing to {}: {} items", path.display(), count);
    }
    println!("Done!");
    Ok(())
}

/// Print per-annotator annotation counts from command-line arguments (without the program name).
pub fn run_progress_check<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let Some(cli) = parse_cli::<ProgressCheckCli, _>(
        std::iter::once("progress_check".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let Some(progress) = progress_report(&cli.annotations, cli.prefix.as_deref())? else {
        println!("Total annotations: 0");
        return Ok(());
    };
    println!("Total annotations: {}", progress.total);
    println!(
        "annotators: {} (min {}, max {}, mean {:.1})",
        progress.annotators, progress.min, progress.max, progress.mean
    );
    for entry in &progress.per_annotator {
        println!(
            "  {}: {} ({:.1}%)",
            entry.annotator,
            entry.count,
            entry.share * 100.0
        );
    }
    Ok(())
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse '{raw}' as a positive integer"))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_quota_tier(raw: &str) -> Result<QuotaTier, String> {
    let (rows, annotators) = raw
        .split_once(':')
        .ok_or_else(|| format!("--quota expects ROWS:ANNOTATORS, got '{raw}'"))?;
    let rows = rows
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("invalid row count '{}': must be an integer", rows.trim()))?;
    let annotators = annotators.trim().parse::<u32>().map_err(|_| {
        format!(
            "invalid annotator count '{}': must be an integer",
            annotators.trim()
        )
    })?;
    Ok(QuotaTier { rows, annotators })
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
