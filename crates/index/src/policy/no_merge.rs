use std::any::Any;
use std::sync::Arc;

use super::{MergePolicy, OneMerge};
use crate::segment::Segment;

/// Never merges, not even on a forced merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoMergePolicy;

impl MergePolicy for NoMergePolicy {
    fn name(&self) -> &'static str {
        "NoMergePolicy"
    }

    fn find_merges(&self, _segments: &[Arc<Segment>]) -> Vec<OneMerge> {
        Vec::new()
    }

    fn find_forced_merges(&self, _segments: &[Arc<Segment>], _max: usize) -> Vec<OneMerge> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
