//! End-to-end RAG pipeline.
//!
//! Ingest path: documents → chunker → embedding gateway → vector index.
//! Query path: (question, history) → standalone rewrite → similarity
//! search → grounded generation → answer with citations.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::chunker::split_documents;
use super::loader::Document;
use super::rewriter::rewrite_standalone;
use super::store::{EmbeddingRecord, PassageMatch, VectorStore};
use crate::core::config::Settings;
use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatRequest, EmbeddingProvider, GenerationProvider};

const QA_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Use the following context to \
answer the user's question. If the answer is not contained within the context, say 'I don't \
know' or 'I couldn't find that information in the provided documents.'";

pub const NO_DOCUMENTS_MESSAGE: &str = "Please upload and process documents first.";

/// Maximum preview length of a citation, in characters.
const CITATION_PREVIEW_CHARS: usize = 200;

/// A response-attached reference back to a source passage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub name: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
    pub sources: Vec<Citation>,
}

/// Composes the chunker, the gateways, and the vector index into the
/// ingest and answer operations. Stateless apart from its collaborators;
/// conversation history is supplied per call and never persisted here.
pub struct RagPipeline {
    settings: Settings,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn GenerationProvider>,
    store: Arc<dyn VectorStore>,
}

impl RagPipeline {
    pub fn new(
        settings: Settings,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn GenerationProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            settings,
            embedder,
            llm,
            store,
        }
    }

    /// Chunk, embed, and index a document set, replacing the previous
    /// collection contents. Returns the number of chunks indexed.
    ///
    /// Embeddings are fetched before the store is touched, so no index
    /// transaction spans a gateway call.
    pub async fn ingest(&self, documents: Vec<Document>) -> Result<usize, ApiError> {
        let mut chunks = split_documents(
            &documents,
            self.settings.chunk_size,
            self.settings.chunk_overlap,
        )?;
        // the embedding gateway rejects empty inputs
        chunks.retain(|chunk| !chunk.text.trim().is_empty());

        if chunks.is_empty() {
            return Err(ApiError::NoValidInput(
                "the provided documents produced no indexable content".to_string(),
            ));
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(ApiError::UpstreamUnavailable(format!(
                "embedding gateway returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let records: Vec<EmbeddingRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| EmbeddingRecord::from_chunk(chunk, embedding))
            .collect();

        let count = records.len();
        self.store
            .replace(&self.settings.collection, records)
            .await?;

        tracing::info!(
            "Indexed {} chunks into collection '{}'",
            count,
            self.settings.collection
        );
        Ok(count)
    }

    /// Answer a question grounded in the indexed documents, carrying the
    /// supplied conversation history.
    pub async fn answer(
        &self,
        question: &str,
        history: &[ChatMessage],
    ) -> Result<ChatAnswer, ApiError> {
        if question.trim().is_empty() {
            return Err(ApiError::InvalidInput("question must not be empty".to_string()));
        }

        // empty collection short-circuits before any gateway call
        if self.store.count(&self.settings.collection).await? == 0 {
            return Ok(ChatAnswer {
                answer: NO_DOCUMENTS_MESSAGE.to_string(),
                sources: Vec::new(),
            });
        }

        let standalone = rewrite_standalone(self.llm.as_ref(), history, question).await?;

        let query_embedding = self
            .embedder
            .embed(&[standalone.clone()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ApiError::UpstreamUnavailable(
                    "embedding gateway returned no vector for the query".to_string(),
                )
            })?;

        let matches = self
            .store
            .query(&self.settings.collection, &query_embedding, self.settings.top_k)
            .await?;

        let context = matches
            .iter()
            .map(|m| m.passage.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        // the original question goes to the model; the rewritten one was
        // only for retrieval
        let mut messages = Vec::with_capacity(history.len() + 3);
        messages.push(ChatMessage::system(QA_SYSTEM_PROMPT));
        messages.push(ChatMessage::system(format!("Context: {}", context)));
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(question));

        let answer = self.llm.chat(ChatRequest::new(messages)).await?;
        let sources = matches.iter().map(to_citation).collect();

        Ok(ChatAnswer { answer, sources })
    }
}

fn to_citation(entry: &PassageMatch) -> Citation {
    let content = &entry.passage.content;
    let preview = if content.chars().count() > CITATION_PREVIEW_CHARS {
        let truncated: String = content.chars().take(CITATION_PREVIEW_CHARS).collect();
        format!("{}...", truncated)
    } else {
        content.clone()
    };

    Citation {
        name: entry.passage.source.clone(),
        content: preview,
        page: entry.passage.page,
    }
}
