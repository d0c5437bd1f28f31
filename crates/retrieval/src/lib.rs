//! An in-memory retrieval engine.
//!
//! Documents are split into chunks, each chunk is embedded with an
//! [`EmbeddingProvider`] and kept in memory. Queries are answered by a
//! brute-force cosine similarity scan over all chunks.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod chunker;
mod import;
mod similarity;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use relay_agent_model::EmbeddingProvider;

pub use chunker::split_text;
pub use import::{ImportEntry, ImportReport};
pub use similarity::cosine_similarity;

/// Free-form metadata attached to a document.
pub type Metadata = BTreeMap<String, String>;

/// The error type for retrieval operations.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// The embedder rejected a chunk. Nothing of the document was stored.
    #[error("failed to embed chunk {index}: {message}")]
    Embedding {
        /// Position of the chunk within its document.
        index: usize,
        /// The embedder's error message.
        message: String,
    },

    /// The embedder rejected the search query.
    #[error("failed to embed query: {0}")]
    QueryEmbedding(String),

    /// The embedder returned a zero-length vector.
    #[error("embedding of chunk {index} is empty")]
    EmptyEmbedding {
        /// Position of the chunk within its document.
        index: usize,
    },

    /// A vector's length differs from the vectors already stored.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the stored vectors.
        expected: usize,
        /// Dimension of the rejected vector.
        actual: usize,
    },

    /// A document directory could not be read.
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        /// The directory being read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Chunking options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetrievalConfig {
    /// Maximum number of characters in a chunk.
    pub chunk_size: usize,
    /// Number of characters shared by adjacent chunks.
    pub chunk_overlap: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// An embedded piece of a document.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    /// `<document id>_chunk_<index>`.
    pub id: String,
    /// Trimmed chunk text.
    pub content: String,
    /// The chunk's embedding vector.
    pub embedding: Vec<f32>,
    /// Metadata inherited from the document.
    pub metadata: Metadata,
}

/// A chunk matching a query.
#[derive(Clone, Debug)]
pub struct SearchResult {
    /// The stored chunk.
    pub chunk: Arc<Chunk>,
    /// Cosine similarity to the query, in `[-1, 1]`.
    pub score: f32,
}

#[derive(Default)]
struct Store {
    chunks: Vec<Arc<Chunk>>,
    dimension: Option<usize>,
}

impl Store {
    fn check_dimension(&self, actual: usize) -> Result<(), RetrievalError> {
        match self.dimension {
            Some(expected) if expected != actual => {
                Err(RetrievalError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }
}

/// The retrieval engine.
///
/// Chunks are only ever appended, or dropped all together by
/// [`RetrievalEngine::clear`]. Searches always observe whole documents.
pub struct RetrievalEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
    store: RwLock<Store>,
}

impl RetrievalEngine {
    /// Creates an empty engine that embeds with `embedder`.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            config,
            store: Default::default(),
        }
    }

    /// Returns the chunking options.
    #[inline]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Splits `content` into chunks and stores them.
    ///
    /// Returns the number of chunks stored.
    pub async fn add_document(
        &self,
        id: &str,
        content: &str,
        metadata: Metadata,
    ) -> Result<usize, RetrievalError> {
        let chunks = split_text(
            content,
            self.config.chunk_size,
            self.config.chunk_overlap,
        );
        let count = self.ingest(id, chunks, metadata).await?;
        info!(id, chunks = count, "document added");
        Ok(count)
    }

    /// Stores chunks that were split by the caller.
    pub async fn add_document_with_chunks(
        &self,
        id: &str,
        chunks: Vec<String>,
        metadata: Metadata,
    ) -> Result<usize, RetrievalError> {
        let count = self.ingest(id, chunks, metadata).await?;
        info!(id, chunks = count, "document chunks added");
        Ok(count)
    }

    async fn ingest(
        &self,
        id: &str,
        contents: Vec<String>,
        metadata: Metadata,
    ) -> Result<usize, RetrievalError> {
        let mut chunks = Vec::with_capacity(contents.len());
        let mut dimension = self.read_store().dimension;
        for (index, content) in contents.into_iter().enumerate() {
            let embedding =
                self.embedder.embed(&content).await.map_err(|err| {
                    RetrievalError::Embedding {
                        index,
                        message: err.to_string(),
                    }
                })?;
            if embedding.is_empty() {
                return Err(RetrievalError::EmptyEmbedding { index });
            }
            let expected = *dimension.get_or_insert(embedding.len());
            if expected != embedding.len() {
                return Err(RetrievalError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
            chunks.push(Arc::new(Chunk {
                id: format!("{id}_chunk_{index}"),
                content,
                embedding,
                metadata: metadata.clone(),
            }));
        }

        let count = chunks.len();
        let mut store = self.write_store();
        // Another document may have set the dimension while embedding.
        if let Some(dimension) = dimension {
            store.check_dimension(dimension)?;
            store.dimension = Some(dimension);
        }
        store.chunks.extend(chunks);
        Ok(count)
    }

    /// Returns at most `top_k` chunks ordered by decreasing similarity.
    ///
    /// Chunks with equal scores keep their insertion order.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, RetrievalError> {
        let chunks = self.read_store().chunks.clone();
        if chunks.is_empty() {
            return Ok(vec![]);
        }

        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|err| RetrievalError::QueryEmbedding(err.to_string()))?;
        let mut results: Vec<_> = chunks
            .into_iter()
            .map(|chunk| SearchResult {
                score: cosine_similarity(&query_embedding, &chunk.embedding),
                chunk,
            })
            .collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);

        debug!(
            query,
            top_k = results.len(),
            top_score = results.first().map(|r| r.score),
            "search completed"
        );
        Ok(results)
    }

    /// Searches `query` and renders the results for prompt injection.
    ///
    /// Returns an empty string when nothing matches.
    pub async fn get_context(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<String, RetrievalError> {
        let results = self.search(query, top_k).await?;
        Ok(render_context(&results))
    }

    /// Returns the number of stored chunks.
    pub fn document_count(&self) -> usize {
        self.read_store().chunks.len()
    }

    /// Drops every stored chunk.
    pub fn clear(&self) {
        let mut store = self.write_store();
        store.chunks.clear();
        store.dimension = None;
    }

    fn read_store(&self) -> std::sync::RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_store(&self) -> std::sync::RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Renders search results with the reference material template.
pub fn render_context(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return String::new();
    }

    let mut context = String::from(
        "以下是与问题相关的参考资料 / \
         Reference material related to the question:\n\n",
    );
    for (idx, result) in results.iter().enumerate() {
        let n = idx + 1;
        context.push_str(&format!(
            "【参考资料 {n} / Reference {n}】(相关度 / relevance: {:.2})\n{}\n\n",
            result.score, result.chunk.content
        ));
    }
    context.push_str(
        "请基于以上参考资料回答用户问题。如果参考资料中没有相关信息，请明确说明。\n\
         Answer the question based on the references above. \
         If they contain nothing relevant, say so explicitly.\n\n",
    );
    context
}
