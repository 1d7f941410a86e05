//! Early-terminating top-N collection
//!
//! Collects the top `start + rows` matches of one shard under the request
//! sort. When the request asks for it and a segment's own sort begins with
//! the request sort, collection of that segment stops once it has supplied
//! `start + rows` matches: nothing later in the segment can outrank them.
//! The match count is then a lower bound.

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tc_core::{Document, FieldValue, Query, SortKey, SortValues};
use tracing::debug;

use crate::segment::{Segment, SegmentId};

/// Decision returned by a leaf collector after each document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Skip the rest of the segment
    Stop,
}

/// Group on a field, keeping each group's best document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub field: String,
}

/// One shard's share of a search request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardQuery {
    pub query: Query,
    /// Empty for index order
    pub sort: SortKey,
    pub start: usize,
    pub rows: usize,
    pub segment_terminate_early: bool,
    pub group: Option<GroupSpec>,
}

impl ShardQuery {
    pub fn new(query: Query, sort: SortKey, rows: usize) -> Self {
        Self {
            query,
            sort,
            start: 0,
            rows,
            segment_terminate_early: false,
            group: None,
        }
    }

    /// How many of the best hits a shard must return
    pub fn window(&self) -> usize {
        self.start.saturating_add(self.rows)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub doc: Document,
    pub sort_values: SortValues,
    pub segment: SegmentId,
    /// Position inside the segment
    pub ord: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupHits {
    /// `None` groups documents without the field
    pub value: Option<FieldValue>,
    pub matches: usize,
    pub top: Hit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardResult {
    /// Best `window()` hits in sort order
    pub hits: Vec<Hit>,
    pub num_found: usize,
    /// False when some segment was exited early
    pub num_found_exact: bool,
    pub terminated_early: bool,
    /// Best `window()` groups when grouping was requested
    pub groups: Option<Vec<GroupHits>>,
    pub segments_searched: usize,
    pub segments_terminated: usize,
    pub elapsed_micros: u64,
}

/// Per-segment collector
pub struct LeafCollector<'a> {
    parent: &'a mut EarlyTerminationCollector,
    segment: SegmentId,
    can_stop: bool,
    collected: usize,
}

impl LeafCollector<'_> {
    pub fn collect(&mut self, ord: usize, doc: &Document) -> Flow {
        let parent = &mut *self.parent;
        let sort_values = parent.sort.values_for(doc, &parent.unique_key);
        parent.num_found += 1;
        self.collected += 1;

        let hit = Hit {
            doc: doc.clone(),
            sort_values,
            segment: self.segment,
            ord,
        };
        match parent.group.clone() {
            Some(spec) => parent.offer_group(&spec, hit),
            None => parent.offer(hit),
        }

        if self.can_stop && self.collected >= parent.window {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }
}

pub struct EarlyTerminationCollector {
    query: Query,
    sort: SortKey,
    unique_key: String,
    window: usize,
    early_termination: bool,
    group: Option<GroupSpec>,
    hits: Vec<Hit>,
    groups: Vec<GroupHits>,
    group_index: HashMap<String, usize>,
    num_found: usize,
    terminated_early: bool,
    segments_searched: usize,
    segments_terminated: usize,
}

impl EarlyTerminationCollector {
    pub fn new(request: &ShardQuery, unique_key: impl Into<String>) -> Self {
        Self {
            query: request.query.clone(),
            sort: request.sort.clone(),
            unique_key: unique_key.into(),
            window: request.window(),
            // Grouping needs every match to count group sizes
            early_termination: request.segment_terminate_early && request.group.is_none(),
            group: request.group.clone(),
            hits: Vec::new(),
            groups: Vec::new(),
            group_index: HashMap::new(),
            num_found: 0,
            terminated_early: false,
            segments_searched: 0,
            segments_terminated: 0,
        }
    }

    /// Whether collection of `segment` may stop early
    pub fn can_terminate(&self, segment: &Segment) -> bool {
        self.early_termination
            && self.window > 0
            && segment
                .sort()
                .map_or(false, |segment_sort| self.sort.is_prefix_of(segment_sort))
    }

    pub fn leaf(&mut self, segment: &Segment) -> LeafCollector<'_> {
        let can_stop = self.can_terminate(segment);
        LeafCollector {
            parent: self,
            segment: segment.id(),
            can_stop,
            collected: 0,
        }
    }

    /// Collect every matching document of `segment`, honoring leaf `Stop`
    pub fn collect_segment(&mut self, segment: &Segment) {
        self.segments_searched += 1;
        let query = self.query.clone();
        let unique_key = self.unique_key.clone();
        let docs = segment.docs();

        let mut leaf = self.leaf(segment);
        let mut stopped_at = None;
        for (ord, doc) in docs.iter().enumerate() {
            if !query.matches(doc, &unique_key) {
                continue;
            }
            if leaf.collect(ord, doc) == Flow::Stop {
                stopped_at = Some(ord);
                break;
            }
        }

        // Only a stop that left documents unvisited counts as terminating
        if let Some(ord) = stopped_at {
            if ord + 1 < docs.len() {
                debug!(
                    "Terminated {} early after {} of {} docs",
                    segment.name(),
                    ord + 1,
                    docs.len()
                );
                self.terminated_early = true;
                self.segments_terminated += 1;
            }
        }
    }

    pub fn search(mut self, segments: &[std::sync::Arc<Segment>]) -> ShardResult {
        let started = Instant::now();
        for segment in segments {
            self.collect_segment(segment);
        }
        let mut result = self.finish();
        result.elapsed_micros = started.elapsed().as_micros() as u64;
        result
    }

    pub fn finish(mut self) -> ShardResult {
        self.trim_hits();
        let groups = self.group.as_ref().map(|_| {
            let mut groups = std::mem::take(&mut self.groups);
            let sort = &self.sort;
            groups.sort_by(|a, b| sort.compare(&a.top.sort_values, &b.top.sort_values));
            groups.truncate(self.window);
            groups
        });
        ShardResult {
            hits: self.hits,
            num_found: self.num_found,
            num_found_exact: self.segments_terminated == 0,
            terminated_early: self.terminated_early,
            groups,
            segments_searched: self.segments_searched,
            segments_terminated: self.segments_terminated,
            elapsed_micros: 0,
        }
    }

    fn offer(&mut self, hit: Hit) {
        self.hits.push(hit);
        if self.hits.len() >= self.window.saturating_mul(2).max(64) {
            self.trim_hits();
        }
    }

    /// Keep the best `window` hits; stable, so ties stay in index order
    fn trim_hits(&mut self) {
        let sort = &self.sort;
        self.hits
            .sort_by(|a, b| sort.compare(&a.sort_values, &b.sort_values));
        self.hits.truncate(self.window);
    }

    fn offer_group(&mut self, spec: &GroupSpec, hit: Hit) {
        let value = hit.doc.value_of(&spec.field, &self.unique_key);
        let key = value
            .as_ref()
            .map_or_else(|| "\u{0}null".to_string(), |v| v.to_string());

        match self.group_index.get(&key) {
            Some(&i) => {
                let group = &mut self.groups[i];
                group.matches += 1;
                if self.sort.compare(&hit.sort_values, &group.top.sort_values)
                    == std::cmp::Ordering::Less
                {
                    group.top = hit;
                }
            }
            None => {
                self.group_index.insert(key, self.groups.len());
                self.groups.push(GroupHits {
                    value,
                    matches: 1,
                    top: hit,
                });
            }
        }
    }
}
