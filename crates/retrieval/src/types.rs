use serde::{Deserialize, Serialize};
use std::fmt;

/// Free-form key/value metadata carried from a document onto its chunks.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Blog,
    Project,
    Page,
    Custom,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Blog => "blog",
            SourceType::Project => "project",
            SourceType::Page => "page",
            SourceType::Custom => "custom",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ingestion input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Document {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            source_type: None,
            source_url: None,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn with_source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = Some(source_type);
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Contiguous slice of a document's normalized text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// `{document_id}::chunk::{chunk_index}`
    pub id: String,
    pub document_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Zero-based position within the parent document
    pub chunk_index: usize,
    pub content: String,
}

impl Chunk {
    pub fn chunk_id(document_id: &str, chunk_index: usize) -> String {
        format!("{}::chunk::{}", document_id, chunk_index)
    }

    pub fn from_document(document: &Document, chunk_index: usize, content: String) -> Self {
        Self {
            id: Self::chunk_id(&document.id, chunk_index),
            document_id: document.id.clone(),
            title: document.title.clone(),
            source_type: document.source_type,
            source_url: document.source_url.clone(),
            metadata: document.metadata.clone(),
            chunk_index,
            content,
        }
    }
}

/// A chunk plus its vector; the unit of the retrieval corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

pub type VectorStoreItem = EmbeddedChunk;

/// A chunk with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl RetrievedChunk {
    pub fn new(chunk: Chunk, score: f32) -> Self {
        Self {
            chunk,
            score: Some(score),
        }
    }

    pub fn id(&self) -> &str {
        &self.chunk.id
    }

    /// Unscored chunks rank below every scored one.
    pub(crate) fn rank_score(&self) -> f32 {
        match self.score {
            Some(score) if !score.is_nan() => score,
            _ => f32::NEG_INFINITY,
        }
    }
}

/// Everything retrieval and assembly need for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPreparation {
    pub query_embedding: Vec<f32>,
    pub top_k: usize,
    pub min_score: f32,
    pub max_context_chars: usize,
    pub strict_dimensions: bool,
}
