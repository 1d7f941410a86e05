//! Tiered merge policy
//!
//! Once more than `segments_per_tier` segments below the size cap exist, the
//! `max_merge_at_once` smallest of them are merged together.

use std::any::Any;
use std::sync::Arc;

use super::{forced_merge_plan, MergePolicy, OneMerge};
use crate::segment::Segment;

#[derive(Debug, Clone, PartialEq)]
pub struct TieredMergePolicy {
    pub max_merge_at_once: usize,
    pub segments_per_tier: usize,
    pub max_merged_segment_mb: f64,
}

impl Default for TieredMergePolicy {
    fn default() -> Self {
        Self {
            max_merge_at_once: 10,
            segments_per_tier: 10,
            max_merged_segment_mb: 5120.0,
        }
    }
}

impl TieredMergePolicy {
    fn max_merged_segment_bytes(&self) -> usize {
        (self.max_merged_segment_mb * 1024.0 * 1024.0) as usize
    }
}

impl MergePolicy for TieredMergePolicy {
    fn name(&self) -> &'static str {
        "TieredMergePolicy"
    }

    fn find_merges(&self, segments: &[Arc<Segment>]) -> Vec<OneMerge> {
        // Segments already past half the cap cannot take part in a merge
        let cap = self.max_merged_segment_bytes();
        let mut eligible: Vec<(usize, &Arc<Segment>)> = segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.size_bytes() < cap / 2)
            .collect();

        if eligible.len() <= self.segments_per_tier || self.max_merge_at_once < 2 {
            return Vec::new();
        }

        eligible.sort_by_key(|(pos, s)| (s.size_bytes(), *pos));
        let mut chosen: Vec<(usize, &Arc<Segment>)> = eligible
            .into_iter()
            .take(self.max_merge_at_once)
            .collect();
        chosen.sort_by_key(|(pos, _)| *pos);

        vec![OneMerge::new(chosen.iter().map(|(_, s)| s.id()).collect())]
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
