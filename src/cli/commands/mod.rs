mod aggregate;
mod config;
mod inspect;
mod methods;
mod snapshot;
mod status;
mod verify;

pub use aggregate::AggregateArgs;
pub use config::ConfigCommand;
pub use inspect::InspectArgs;
pub use snapshot::SnapshotArgs;
pub use status::StatusArgs;
pub use verify::VerifyArgs;

pub use aggregate::handle_aggregate;
pub use config::handle_config;
pub use inspect::handle_inspect;
pub use methods::handle_methods;
pub use snapshot::handle_snapshot;
pub use status::handle_status;
pub use verify::handle_verify;
