use anyhow::Result;
use clap::Args;

use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::{Config, OutputFormat};
use crate::services::{VectorStore, create_backend};

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[arg(help = "Collection to show details for")]
    pub collection: Option<String>,
}

pub async fn handle_status(args: StatusArgs, format: OutputFormat, _verbose: bool) -> Result<()> {
    let config = Config::load()?.config;
    let formatter = get_formatter(format);

    let mut status = StatusInfo {
        url: config.vector_store.url.clone(),
        connected: false,
        error: None,
        collections: Vec::new(),
        requested: args.collection.clone(),
        collection: None,
    };

    match create_backend(&config.vector_store) {
        Ok(store) => probe(store.as_ref(), args.collection.as_deref(), &mut status).await,
        Err(e) => status.error = Some(e.to_string()),
    }

    print!("{}", formatter.format_status(&status));

    if !status.connected {
        eprintln!();
        eprintln!(
            "Warning: Qdrant not reachable. Start with: docker run -p 6334:6334 qdrant/qdrant"
        );
        eprintln!("         or set QDRANT_URL / QDRANT_API_KEY in your environment or .env file.");
    }

    Ok(())
}

async fn probe(store: &dyn VectorStore, collection: Option<&str>, status: &mut StatusInfo) {
    match store.health_check().await {
        Ok(healthy) => status.connected = healthy,
        Err(e) => {
            status.error = Some(e.to_string());
            return;
        }
    }

    match store.list_collections().await {
        Ok(mut names) => {
            names.sort();
            status.collections = names;
        }
        Err(e) => status.error = Some(e.to_string()),
    }

    if let Some(name) = collection {
        match store.collection_info(name).await {
            Ok(info) => status.collection = info,
            Err(e) => status.error = Some(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DistanceMetric;
    use crate::services::MemoryStore;

    fn empty_status(requested: Option<&str>) -> StatusInfo {
        StatusInfo {
            url: "memory".to_string(),
            connected: false,
            error: None,
            collections: Vec::new(),
            requested: requested.map(str::to_string),
            collection: None,
        }
    }

    #[tokio::test]
    async fn test_probe_lists_sorted_collections() {
        let store = MemoryStore::new();
        for name in ["zeta", "alpha"] {
            store
                .insert_collection(name, 4, DistanceMetric::Cosine, Vec::new())
                .unwrap();
        }

        let mut status = empty_status(Some("zeta"));
        probe(&store, Some("zeta"), &mut status).await;

        assert!(status.connected);
        assert_eq!(status.collections, vec!["alpha", "zeta"]);
        assert_eq!(status.collection.unwrap().vector_size, Some(4));
    }

    #[tokio::test]
    async fn test_probe_missing_collection() {
        let store = MemoryStore::new();
        let mut status = empty_status(Some("nope"));
        probe(&store, Some("nope"), &mut status).await;

        assert!(status.connected);
        assert!(status.collection.is_none());
        assert!(status.error.is_none());
    }
}
