//! Merge policies
//!
//! A merge policy decides which segments to combine and how the combined
//! segment is written.

mod log_doc;
mod no_merge;
mod sorting;
mod tiered;

pub use log_doc::LogDocMergePolicy;
pub use no_merge::NoMergePolicy;
pub use sorting::SortingMergePolicy;
pub use tiered::TieredMergePolicy;

use std::any::Any;
use std::sync::Arc;

use crate::segment::{Segment, SegmentId};

/// One planned merge: the ids of the segments to combine, in index order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneMerge {
    pub segments: Vec<SegmentId>,
}

impl OneMerge {
    pub fn new(segments: Vec<SegmentId>) -> Self {
        Self { segments }
    }
}

pub trait MergePolicy: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Merges to run after a commit
    fn find_merges(&self, segments: &[Arc<Segment>]) -> Vec<OneMerge>;

    /// Merges needed to reach at most `max_segment_count` segments
    fn find_forced_merges(&self, segments: &[Arc<Segment>], max_segment_count: usize)
        -> Vec<OneMerge>;

    /// Write the merged segment. Plain concatenation unless overridden.
    fn merge_segments(&self, id: SegmentId, inputs: &[Arc<Segment>]) -> Segment {
        Segment::concat(id, inputs)
    }

    fn as_any(&self) -> &dyn Any;
}

/// Merge the trailing run of adjacent segments so at most `max_segment_count`
/// remain.
pub(crate) fn forced_merge_plan(
    segments: &[Arc<Segment>],
    max_segment_count: usize,
) -> Vec<OneMerge> {
    let max_segment_count = max_segment_count.max(1);
    if segments.len() <= max_segment_count {
        return Vec::new();
    }
    let first = max_segment_count - 1;
    vec![OneMerge::new(
        segments[first..].iter().map(|s| s.id()).collect(),
    )]
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tc_core::Document;

    /// Untagged segment with `count` docs keyed `<id>-<n>`
    pub fn segment(id: SegmentId, count: usize) -> Arc<Segment> {
        let docs = (0..count)
            .map(|n| Document::new(format!("{}-{}", id, n)))
            .collect();
        Arc::new(Segment::new(id, docs))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::segment;
    use super::*;

    #[test]
    fn test_forced_merge_plan() {
        let segments: Vec<_> = (0..5).map(|i| segment(i, 3)).collect();

        assert_eq!(
            forced_merge_plan(&segments, 1),
            vec![OneMerge::new(vec![0, 1, 2, 3, 4])]
        );
        assert_eq!(
            forced_merge_plan(&segments, 3),
            vec![OneMerge::new(vec![2, 3, 4])]
        );
        assert!(forced_merge_plan(&segments, 5).is_empty());
        assert!(forced_merge_plan(&segments[..1], 1).is_empty());
    }
}
