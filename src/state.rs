use std::sync::Arc;

use crate::core::config::{AppPaths, Settings};
use crate::core::errors::ApiError;
use crate::llm::{EmbeddingProvider, GenerationProvider, TogetherProvider};
use crate::rag::{RagPipeline, SqliteVectorStore, VectorStore};

/// Shared application state: configuration, the durable vector index, and
/// the RAG pipeline wired to the upstream gateways.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Settings,
    pub store: Arc<dyn VectorStore>,
    pub pipeline: Arc<RagPipeline>,
}

impl AppState {
    /// Initializes paths, settings, the SQLite index, and the Together AI
    /// gateways.
    pub async fn initialize() -> Result<Arc<Self>, ApiError> {
        let paths = Arc::new(AppPaths::new());
        let settings = Settings::from_env()?;

        let store: Arc<dyn VectorStore> = Arc::new(SqliteVectorStore::new(&paths).await?);

        let provider = Arc::new(TogetherProvider::new(&settings.upstream)?);
        let embedder: Arc<dyn EmbeddingProvider> = provider.clone();
        let llm: Arc<dyn GenerationProvider> = provider;

        Ok(Self::assemble(paths, settings, store, embedder, llm))
    }

    /// Wire explicit collaborators, used by tests to substitute stub
    /// gateways and scratch stores.
    pub fn assemble(
        paths: Arc<AppPaths>,
        settings: Settings,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn GenerationProvider>,
    ) -> Arc<Self> {
        let pipeline = Arc::new(RagPipeline::new(
            settings.clone(),
            embedder,
            llm,
            store.clone(),
        ));

        Arc::new(AppState {
            paths,
            settings,
            store,
            pipeline,
        })
    }
}
