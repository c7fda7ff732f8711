use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::{create_backend, verify_collection};

#[derive(Debug, Args)]
pub struct VerifyArgs {
    #[arg(required = true, help = "Aggregated collection to check")]
    pub collection: String,

    #[arg(
        long,
        short = 'n',
        default_value_t = 3,
        help = "Number of sample documents to show"
    )]
    pub samples: usize,
}

pub async fn handle_verify(args: VerifyArgs, format: OutputFormat, _verbose: bool) -> Result<()> {
    let config = Config::load()?.config;
    let formatter = get_formatter(format);

    let store = create_backend(&config.vector_store)?;
    let report = verify_collection(store.as_ref(), &args.collection, args.samples)
        .await
        .with_context(|| format!("failed to verify '{}'", args.collection))?;

    print!("{}", formatter.format_verification(&report));
    Ok(())
}
