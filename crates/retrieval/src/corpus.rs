use parking_lot::RwLock;
use std::ops::Deref;
use std::sync::Arc;
use tracing::info;

use crate::types::VectorStoreItem;

/// Immutable, cheaply clonable view of a corpus.
///
/// A query holds its snapshot for its whole duration; replacing the corpus
/// in a [`CorpusHandle`] never changes a snapshot already taken.
#[derive(Debug, Clone, Default)]
pub struct CorpusSnapshot {
    items: Arc<[VectorStoreItem]>,
}

impl CorpusSnapshot {
    pub fn new(items: Vec<VectorStoreItem>) -> Self {
        Self {
            items: items.into(),
        }
    }

    pub fn items(&self) -> &[VectorStoreItem] {
        &self.items
    }

    /// Vector length of the first item
    pub fn dimension(&self) -> Option<usize> {
        self.items.first().map(|item| item.embedding.len())
    }
}

impl Deref for CorpusSnapshot {
    type Target = [VectorStoreItem];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl From<Vec<VectorStoreItem>> for CorpusSnapshot {
    fn from(items: Vec<VectorStoreItem>) -> Self {
        Self::new(items)
    }
}

/// Shared owner of the current corpus snapshot.
#[derive(Debug, Clone, Default)]
pub struct CorpusHandle {
    current: Arc<RwLock<CorpusSnapshot>>,
}

impl CorpusHandle {
    pub fn new(items: Vec<VectorStoreItem>) -> Self {
        Self {
            current: Arc::new(RwLock::new(CorpusSnapshot::new(items))),
        }
    }

    pub fn snapshot(&self) -> CorpusSnapshot {
        self.current.read().clone()
    }

    /// Swap in a rebuilt corpus and return the previous one.
    pub fn replace(&self, items: Vec<VectorStoreItem>) -> CorpusSnapshot {
        let next = CorpusSnapshot::new(items);
        info!("Corpus replaced: {} items", next.len());
        std::mem::replace(&mut *self.current.write(), next)
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.current.read().dimension()
    }
}
