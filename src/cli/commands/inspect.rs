use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::{create_backend, inspect_groups};

#[derive(Debug, Args)]
pub struct InspectArgs {
    #[arg(required = true, help = "Source collection to scan")]
    pub collection: String,

    #[arg(long, short = 'k', help = "Payload field to group by, dot-delimited")]
    pub key: String,

    #[arg(
        long,
        short = 'n',
        default_value_t = 5,
        help = "Number of sample groups to show"
    )]
    pub limit: usize,
}

pub async fn handle_inspect(args: InspectArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?.config;
    let formatter = get_formatter(format);

    if verbose {
        eprintln!("Grouping '{}' by '{}'", args.collection, args.key);
    }

    let store = create_backend(&config.vector_store)?;
    let report = inspect_groups(
        store.as_ref(),
        &args.collection,
        &args.key,
        config.aggregation.scroll_batch_size,
        args.limit,
    )
    .await
    .with_context(|| format!("failed to inspect '{}'", args.collection))?;

    print!("{}", formatter.format_inspect(&report));

    if report.groups == 0 {
        eprintln!();
        eprintln!(
            "Hint: no point has a non-null '{}'. Check the field path against a sample payload.",
            args.key
        );
    }

    Ok(())
}
