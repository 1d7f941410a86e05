//! Sort-preserving merge policy
//!
//! Delegates merge selection to an inner policy, but writes every merged
//! segment in `sort` order and tags it with that key, so queries sorted on a
//! prefix of the key can stop scanning it early.

use std::any::Any;
use std::cmp::Ordering;
use std::sync::Arc;

use tc_core::{Document, SortKey, SortValues};
use tracing::debug;

use super::{MergePolicy, NoMergePolicy, OneMerge};
use crate::segment::{Segment, SegmentId};

#[derive(Debug)]
pub struct SortingMergePolicy {
    inner: Arc<dyn MergePolicy>,
    sort: SortKey,
    unique_key: String,
}

impl SortingMergePolicy {
    pub fn new(inner: Arc<dyn MergePolicy>, sort: SortKey, unique_key: impl Into<String>) -> Self {
        Self {
            inner,
            sort,
            unique_key: unique_key.into(),
        }
    }

    pub fn sort(&self) -> &SortKey {
        &self.sort
    }

    pub fn inner(&self) -> &Arc<dyn MergePolicy> {
        &self.inner
    }

    /// Documents of one input with their sort values, in `sort` order.
    ///
    /// Inputs already tagged with our key are taken as-is; anything else is
    /// stably sorted first.
    fn sorted_run(&self, segment: &Segment) -> Vec<(SortValues, Document)> {
        let mut run: Vec<(SortValues, Document)> = segment
            .docs()
            .iter()
            .map(|d| (self.sort.values_for(d, &self.unique_key), d.clone()))
            .collect();
        if !segment.is_sorted_by(&self.sort) {
            run.sort_by(|a, b| self.sort.compare(&a.0, &b.0));
        }
        run
    }
}

impl MergePolicy for SortingMergePolicy {
    fn name(&self) -> &'static str {
        "SortingMergePolicy"
    }

    fn find_merges(&self, segments: &[Arc<Segment>]) -> Vec<OneMerge> {
        self.inner.find_merges(segments)
    }

    fn find_forced_merges(
        &self,
        segments: &[Arc<Segment>],
        max_segment_count: usize,
    ) -> Vec<OneMerge> {
        let merges = self.inner.find_forced_merges(segments, max_segment_count);
        let never_merges = self.inner.as_any().is::<NoMergePolicy>();
        if never_merges || !merges.is_empty() || segments.len() > max_segment_count.max(1) {
            return merges;
        }
        // Already few enough segments, but an unsorted one is not fully merged
        segments
            .iter()
            .filter(|s| !s.is_sorted_by(&self.sort))
            .map(|s| OneMerge::new(vec![s.id()]))
            .collect()
    }

    fn merge_segments(&self, id: SegmentId, inputs: &[Arc<Segment>]) -> Segment {
        let runs: Vec<Vec<(SortValues, Document)>> =
            inputs.iter().map(|s| self.sorted_run(s)).collect();
        let total: usize = runs.iter().map(Vec::len).sum();

        // k-way merge; on ties the earliest input wins, keeping the merge stable
        let mut cursors = vec![0usize; runs.len()];
        let mut docs = Vec::with_capacity(total);
        while docs.len() < total {
            let mut best: Option<usize> = None;
            for (i, run) in runs.iter().enumerate() {
                let Some((values, _)) = run.get(cursors[i]) else {
                    continue;
                };
                best = match best {
                    None => Some(i),
                    Some(b) => {
                        let (best_values, _) = &runs[b][cursors[b]];
                        if self.sort.compare(values, best_values) == Ordering::Less {
                            Some(i)
                        } else {
                            Some(b)
                        }
                    }
                };
            }
            let Some(b) = best else { break };
            docs.push(runs[b][cursors[b]].1.clone());
            cursors[b] += 1;
        }

        debug!(
            "Sort-merged {} segments into _{} ({} docs, sort: {})",
            inputs.len(),
            id,
            docs.len(),
            self.sort
        );
        Segment::sorted(id, docs, self.sort.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::TieredMergePolicy;
    use tc_core::FieldValue;

    fn doc(id: &str, ts: i64) -> Document {
        Document::new(id).with_field("ts_l1", ts)
    }

    fn policy() -> SortingMergePolicy {
        SortingMergePolicy::new(
            Arc::new(TieredMergePolicy::default()),
            SortKey::parse("ts_l1 desc").unwrap(),
            "id",
        )
    }

    fn timestamps(segment: &Segment) -> Vec<i64> {
        segment
            .docs()
            .iter()
            .map(|d| match d.get("ts_l1") {
                Some(FieldValue::Long(v)) => *v,
                _ => panic!("missing ts"),
            })
            .collect()
    }

    #[test]
    fn test_merge_of_sorted_segments_stays_sorted() {
        let policy = policy();
        let key = policy.sort().clone();
        let a = Arc::new(Segment::sorted(1, vec![doc("a1", 9), doc("a2", 5), doc("a3", 1)], key.clone()));
        let b = Arc::new(Segment::sorted(2, vec![doc("b1", 8), doc("b2", 5), doc("b3", 2)], key.clone()));

        let merged = policy.merge_segments(3, &[a, b]);
        assert!(merged.is_sorted_by(&key));
        assert_eq!(timestamps(&merged), vec![9, 8, 5, 5, 2, 1]);

        // ties keep input order
        let ids: Vec<&str> = merged.docs().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids[2], "a2");
        assert_eq!(ids[3], "b2");
    }

    #[test]
    fn test_unsorted_inputs_are_sorted_before_merge() {
        let policy = policy();
        let a = Arc::new(Segment::new(1, vec![doc("a1", 1), doc("a2", 7)]));
        let b = Arc::new(Segment::new(2, vec![doc("b1", 3), doc("b2", 9)]));

        let merged = policy.merge_segments(3, &[a, b]);
        assert_eq!(timestamps(&merged), vec![9, 7, 3, 1]);
        assert_eq!(merged.sort(), Some(policy.sort()));
    }

    #[test]
    fn test_forced_merge_rewrites_single_unsorted_segment() {
        let policy = policy();
        let unsorted = Arc::new(Segment::new(1, vec![doc("a", 1), doc("b", 2)]));
        assert_eq!(
            policy.find_forced_merges(&[unsorted], 1),
            vec![OneMerge::new(vec![1])]
        );

        let sorted = Arc::new(Segment::sorted(2, vec![doc("b", 2)], policy.sort().clone()));
        assert!(policy.find_forced_merges(&[sorted], 1).is_empty());
    }

    #[test]
    fn test_no_merge_inner_leaves_unsorted_segment_alone() {
        let policy = SortingMergePolicy::new(
            Arc::new(NoMergePolicy),
            SortKey::parse("ts_l1 desc").unwrap(),
            "id",
        );
        let unsorted = Arc::new(Segment::new(1, vec![doc("a", 1), doc("b", 2)]));
        assert!(policy.find_forced_merges(&[unsorted.clone()], 1).is_empty());
        assert!(policy.find_merges(&[unsorted]).is_empty());
    }
}
