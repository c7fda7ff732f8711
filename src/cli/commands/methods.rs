use anyhow::Result;

use crate::cli::output::get_formatter;
use crate::models::{AggregationMethod, OutputFormat};

pub fn handle_methods(format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    print!("{}", formatter.format_methods(&AggregationMethod::ALL));
    Ok(())
}
