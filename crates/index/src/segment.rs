//! Segment definitions
//!
//! A segment is an immutable run of documents. Segments written by a merge
//! under a sorting policy carry the `SortKey` their documents satisfy; flushed
//! segments and segments from before the policy was enabled are untagged.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tc_core::{Document, SortKey};

pub type SegmentId = u64;

/// Point-in-time set of segments, in index order
pub type SegmentSet = Arc<Vec<Arc<Segment>>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    id: SegmentId,
    docs: Vec<Document>,
    sort: Option<SortKey>,
    size_bytes: usize,
}

impl Segment {
    /// Create an untagged segment
    pub fn new(id: SegmentId, docs: Vec<Document>) -> Self {
        let size_bytes = docs.iter().map(Document::approx_bytes).sum();
        Self {
            id,
            docs,
            sort: None,
            size_bytes,
        }
    }

    /// Create a segment whose documents satisfy `sort`
    pub fn sorted(id: SegmentId, docs: Vec<Document>, sort: SortKey) -> Self {
        let mut segment = Self::new(id, docs);
        segment.sort = Some(sort);
        segment
    }

    /// Concatenate inputs in order; the result is untagged
    pub fn concat(id: SegmentId, inputs: &[Arc<Segment>]) -> Self {
        let docs = inputs
            .iter()
            .flat_map(|s| s.docs.iter().cloned())
            .collect();
        Self::new(id, docs)
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// Segment name in `_<id>` form
    pub fn name(&self) -> String {
        format!("_{}", self.id)
    }

    pub fn docs(&self) -> &[Document] {
        &self.docs
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// The sort this segment's documents satisfy, if known
    pub fn sort(&self) -> Option<&SortKey> {
        self.sort.as_ref()
    }

    pub fn is_sorted_by(&self, sort: &SortKey) -> bool {
        self.sort.as_ref() == Some(sort)
    }
}
