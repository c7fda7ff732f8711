pub mod aggregator;
pub mod grouper;
pub mod inspect;
pub mod merger;
pub mod methods;
pub mod snapshot;
pub mod vector_store;
pub mod writer;

pub use aggregator::{aggregate, aggregate_with_progress};
pub use grouper::{GroupedRecords, collect_groups};
pub use inspect::{
    GroupSummary, InspectReport, PointSummary, VerificationReport, inspect_groups,
    verify_collection,
};
pub use merger::{ORDERING_CANDIDATES, merge_payloads};
pub use methods::{reduce, to_matrix};
pub use snapshot::{load_snapshot, save_snapshot};
pub use vector_store::{
    CollectionInfo, MemoryStore, QdrantBackend, ScrollPage, VectorStore, create_backend,
};
pub use writer::{build_points, write_points};
