use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use crate::cli::output::get_formatter;
use crate::models::{
    AggregateRequest, AggregationConfig, AggregationMethod, Config, DistanceMetric, MethodParams,
    OutputFormat,
};
use crate::services::{aggregate_with_progress, create_backend};

#[derive(Debug, Args)]
pub struct AggregateArgs {
    #[arg(required = true, help = "Source collection holding chunk points")]
    pub input: String,

    #[arg(
        long,
        short = 'k',
        help = "Payload field to group by, dot-delimited (e.g. 'metadata.document_name')"
    )]
    pub key: String,

    #[arg(
        long,
        short = 'o',
        help = "Destination collection (dropped and recreated)"
    )]
    pub output: String,

    #[arg(long, short = 'm', help = "Aggregation method (see `vagg methods`)")]
    pub method: Option<AggregationMethod>,

    #[arg(
        long,
        value_delimiter = ',',
        help = "Comma-separated weights for weighted_average, one per chunk"
    )]
    pub weights: Option<Vec<f32>>,

    #[arg(long, help = "Fraction trimmed by trimmed_mean, in [0, 1)")]
    pub trim: Option<f32>,

    #[arg(long, help = "Number of clusters for centroid")]
    pub clusters: Option<usize>,

    #[arg(
        long,
        short = 'd',
        help = "Distance metric of the destination: cosine, euclid, dot, manhattan"
    )]
    pub distance: Option<DistanceMetric>,

    #[arg(long, help = "Write merged metadata to this snapshot file")]
    pub snapshot: Option<PathBuf>,

    #[arg(long, help = "Points per scroll request")]
    pub scroll_batch: Option<u32>,

    #[arg(long, help = "Points per upsert request")]
    pub upsert_batch: Option<usize>,
}

impl AggregateArgs {
    /// Merge command-line flags over the `[aggregation]` config section.
    pub fn to_request(&self, defaults: &AggregationConfig) -> AggregateRequest {
        let params = MethodParams {
            weights: self.weights.clone(),
            trim_percentage: self.trim.unwrap_or(defaults.trim_percentage),
            clusters: self.clusters.unwrap_or(defaults.clusters),
        };

        let request = AggregateRequest::new(&self.input, &self.key, &self.output)
            .with_method(self.method.unwrap_or(defaults.method))
            .with_params(params)
            .with_distance(self.distance.unwrap_or(defaults.distance))
            .with_batch_sizes(
                self.scroll_batch.unwrap_or(defaults.scroll_batch_size),
                self.upsert_batch.unwrap_or(defaults.upsert_batch_size),
            );

        match self.snapshot {
            Some(ref path) => request.with_snapshot(path),
            None => request,
        }
    }
}

pub async fn handle_aggregate(
    args: AggregateArgs,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let config = Config::load()?.config;
    let formatter = get_formatter(format);
    let request = args.to_request(&config.aggregation);

    request
        .params
        .validate_for(request.method)
        .context("invalid aggregation parameters")?;

    if verbose {
        eprintln!("Input:    {}", request.input_collection);
        eprintln!("Key:      {}", request.key_path);
        eprintln!("Output:   {}", request.output_collection);
        eprintln!("Method:   {}", request.method);
        eprintln!("Distance: {}", request.distance);
    }

    let store = create_backend(&config.vector_store)?;

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} points",
            )
            .context("invalid progress template")?
            .progress_chars("#>-"),
    );

    let report = aggregate_with_progress(store.as_ref(), &request, |written, total| {
        pb.set_length(total as u64);
        pb.set_position(written as u64);
    })
    .await;
    pb.finish_and_clear();

    let report = report.with_context(|| {
        format!(
            "failed to aggregate '{}' into '{}'",
            request.input_collection, request.output_collection
        )
    })?;

    print!("{}", formatter.format_report(&report));
    Ok(())
}
