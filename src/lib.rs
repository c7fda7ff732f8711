pub mod cli;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use cli::{Cli, Commands};
pub use error::{AggregateError, ConfigError, VectorStoreError};
pub use models::{AggregateRequest, AggregationReport, Config, OutputFormat};
pub use services::aggregate;
