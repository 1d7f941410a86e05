//! Log-doc merge policy
//!
//! Segments are bucketed into log-scale levels by document count; a run of
//! `merge_factor` adjacent segments on the same level is merged.

use std::any::Any;
use std::sync::Arc;

use super::{forced_merge_plan, MergePolicy, OneMerge};
use crate::segment::Segment;

#[derive(Debug, Clone, PartialEq)]
pub struct LogDocMergePolicy {
    pub merge_factor: usize,
    /// Segments smaller than this are all treated as the lowest level
    pub min_merge_docs: usize,
}

impl Default for LogDocMergePolicy {
    fn default() -> Self {
        Self {
            merge_factor: 10,
            min_merge_docs: 1000,
        }
    }
}

impl LogDocMergePolicy {
    fn level(&self, doc_count: usize) -> u32 {
        let docs = doc_count.max(self.min_merge_docs).max(1) as f64;
        let factor = self.merge_factor.max(2) as f64;
        (docs.ln() / factor.ln()).floor() as u32
    }
}

impl MergePolicy for LogDocMergePolicy {
    fn name(&self) -> &'static str {
        "LogDocMergePolicy"
    }

    fn find_merges(&self, segments: &[Arc<Segment>]) -> Vec<OneMerge> {
        let factor = self.merge_factor.max(2);
        if segments.len() < factor {
            return Vec::new();
        }

        let levels: Vec<u32> = segments.iter().map(|s| self.level(s.len())).collect();
        let mut merges = Vec::new();
        let mut start = 0;
        while start + factor <= segments.len() {
            let window = &levels[start..start + factor];
            if window.iter().all(|l| *l == window[0]) {
                merges.push(OneMerge::new(
                    segments[start..start + factor].iter().map(|s| s.id()).collect(),
                ));
                start += factor;
            } else {
                start += 1;
            }
        }
        merges
    }

    fn find_forced_merges(
        &self,
        segments: &[Arc<Segment>],
        max_segment_count: usize,
    ) -> Vec<OneMerge> {
        forced_merge_plan(segments, max_segment_count)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::test_support::segment;

    #[test]
    fn test_merges_same_level_run() {
        let policy = LogDocMergePolicy {
            merge_factor: 3,
            min_merge_docs: 10,
        };
        // levels: 100 docs -> 4, the small ones bucket at min_merge_docs -> 2
        let segments = vec![segment(0, 100), segment(1, 2), segment(2, 3), segment(3, 1)];

        assert_eq!(policy.find_merges(&segments), vec![OneMerge::new(vec![1, 2, 3])]);
    }

    #[test]
    fn test_not_enough_segments() {
        let policy = LogDocMergePolicy::default();
        let segments: Vec<_> = (0..9).map(|i| segment(i, 1)).collect();
        assert!(policy.find_merges(&segments).is_empty());
    }
}
