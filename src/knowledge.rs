// Knowledge store with embedding-similarity retrieval
// Facts live in memory for one analyst session; the embedding model is a
// capability injected at construction so test doubles and alternate models
// drop in without code changes.

use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Duration;

use crate::error::{InsightError, Result};
use crate::models::QueryResult;

/// Default Ollama API URL
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default sentence-embedding model served by Ollama
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";

/// Vector length produced by the default embedding model
pub const DEFAULT_EMBED_DIM: usize = 768;

/// Vector length of the offline hash embedder
pub const HASH_EMBEDDING_DIM: usize = 384;

/// Capability interface for text embedding.
///
/// Implementations map text to vectors of a fixed dimensionality; the store
/// only ever compares vectors produced by the same implementation.
pub trait Embedder {
    /// Map text to a fixed-length vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of every vector produced by `embed`.
    fn dimension(&self) -> usize;
}

/// Cosine similarity between two equal-length vectors.
///
/// Zero-norm operands yield 0.0; never fails for valid inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a.sqrt() * norm_b.sqrt())
    } else {
        0.0
    }
}

// ============================================================================
// HashEmbedder
// ============================================================================

/// Deterministic bag-of-words embedder.
///
/// Buckets lowercased words and their character bigrams into a fixed number
/// of dimensions and L2-normalizes the result. No model download, no
/// network; suitable offline and as a test double for [`Embedder`].
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            dim: HASH_EMBEDDING_DIM,
        }
    }

    pub fn with_dimension(dim: usize) -> Self {
        Self { dim }
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dim];
        let lowered = text.to_lowercase();
        for raw in lowered.split_whitespace() {
            // Strip punctuation so "bitcoin?" and "bitcoin" share a bucket.
            let word = raw.trim_matches(|c: char| !c.is_alphanumeric());
            if word.is_empty() {
                continue;
            }
            vector[bucket(word, self.dim)] += 1.0;
            let chars: Vec<char> = word.chars().collect();
            for pair in chars.windows(2) {
                let bigram: String = pair.iter().collect();
                vector[bucket(&bigram, self.dim)] += 0.5;
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

fn bucket(token: &str, dim: usize) -> usize {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    (hasher.finish() % dim as u64) as usize
}

// ============================================================================
// OllamaEmbedder
// ============================================================================

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Client for a pretrained sentence-embedding model served by Ollama.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    dimension: usize,
}

impl Default for OllamaEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl OllamaEmbedder {
    /// Create an embedder with default settings.
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| reqwest::blocking::Client::new()),
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_EMBED_MODEL.to_string(),
            dimension: DEFAULT_EMBED_DIM,
        }
    }

    /// Create an embedder against a custom Ollama URL.
    pub fn with_url(url: &str) -> Self {
        let mut embedder = Self::new();
        embedder.base_url = url.to_string();
        embedder
    }

    /// Set the embedding model and its vector length.
    pub fn with_model(mut self, model: &str, dimension: usize) -> Self {
        self.model = model.to_string();
        self.dimension = dimension;
        self
    }
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(InsightError::Embedding("cannot embed empty text".into()));
        }

        let request = EmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .map_err(|e| InsightError::Embedding(format!("request to Ollama failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(InsightError::Embedding(format!(
                "Ollama API error {}: {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .map_err(|e| InsightError::Embedding(format!("invalid embedding response: {}", e)))?;

        if parsed.embedding.len() != self.dimension {
            return Err(InsightError::Embedding(format!(
                "expected {}-dimensional embedding, got {}",
                self.dimension,
                parsed.embedding.len()
            )));
        }
        Ok(parsed.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// KnowledgeStore
// ============================================================================

/// Append-only store of text facts with similarity retrieval.
///
/// Facts and their embeddings are parallel lists; adding embeds only the new
/// entries, existing vectors are reused. There is no deletion operation and
/// re-adding an identical fact duplicates it.
pub struct KnowledgeStore {
    embedder: Box<dyn Embedder>,
    facts: Vec<String>,
    embeddings: Vec<Vec<f32>>,
}

impl KnowledgeStore {
    /// Create a store backed by the given embedding model.
    pub fn new(embedder: Box<dyn Embedder>) -> Self {
        Self {
            embedder,
            facts: Vec::new(),
            embeddings: Vec::new(),
        }
    }

    /// Create a store backed by the offline hash embedder.
    pub fn with_hash_embedder() -> Self {
        Self::new(Box::new(HashEmbedder::new()))
    }

    /// Append facts to the store.
    ///
    /// All new facts are embedded before any is stored, so a failing
    /// embedding leaves the store unchanged.
    pub fn add<S: AsRef<str>>(&mut self, facts: &[S]) -> Result<()> {
        let mut new_embeddings = Vec::with_capacity(facts.len());
        for fact in facts {
            new_embeddings.push(self.embedder.embed(fact.as_ref())?);
        }
        self.facts
            .extend(facts.iter().map(|f| f.as_ref().to_string()));
        self.embeddings.extend(new_embeddings);
        debug!("knowledge store holds {} facts", self.facts.len());
        Ok(())
    }

    /// Retrieve the `top_k` facts most similar to the question.
    ///
    /// Results are in non-increasing similarity order; ties keep insertion
    /// order. An empty store yields an empty list, never an error.
    pub fn query(&self, question: &str, top_k: usize) -> Result<Vec<QueryResult>> {
        if self.facts.is_empty() {
            return Ok(Vec::new());
        }

        let question_embedding = self.embedder.embed(question)?;
        let mut results: Vec<QueryResult> = self
            .facts
            .iter()
            .zip(&self.embeddings)
            .map(|(fact, embedding)| QueryResult {
                fact: fact.clone(),
                similarity: cosine_similarity(&question_embedding, embedding),
            })
            .collect();

        // sort_by is stable: equal scores stay in insertion order.
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        results.truncate(top_k);
        Ok(results)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn facts(&self) -> &[String] {
        &self.facts
    }
}
