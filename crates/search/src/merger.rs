//! Shard response merging
//!
//! Runs on the node coordinating a distributed search. Shard results arrive
//! in any order; they are processed in shard-name order so the merged
//! response does not depend on arrival order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use index::{GroupHits, Hit, ShardResult};
use tracing::{debug, warn};

use crate::request::SearchRequest;
use crate::response::{
    MergedGroup, ResponseHeader, ResultDoc, SearchResponse, ShardDiagnostics, ShardResponse,
};

pub struct ShardResponseMerger<'a> {
    request: &'a SearchRequest,
}

impl<'a> ShardResponseMerger<'a> {
    pub fn new(request: &'a SearchRequest) -> Self {
        Self { request }
    }

    pub fn merge(&self, mut responses: Vec<ShardResponse>) -> SearchResponse {
        responses.sort_by(|a, b| a.shard.cmp(&b.shard).then_with(|| a.replica.cmp(&b.replica)));

        let mut num_found = 0;
        let mut num_found_exact = true;
        let mut any_terminated = false;
        let mut partial_results = false;
        let mut shards_info = BTreeMap::new();
        let mut lists: Vec<(&str, &[Hit])> = Vec::with_capacity(responses.len());
        let mut groups: Vec<(&str, &[GroupHits])> = Vec::new();

        for response in &responses {
            match &response.result {
                Ok(result) => {
                    num_found += result.num_found;
                    num_found_exact &= result.num_found_exact;
                    any_terminated |= result.terminated_early;
                    lists.push((response.shard.as_str(), result.hits.as_slice()));
                    if let Some(g) = &result.groups {
                        groups.push((response.shard.as_str(), g.as_slice()));
                    }
                    if self.request.shards_info {
                        shards_info.insert(response.shard.clone(), self.diagnostics(response, result));
                    }
                }
                Err(error) => {
                    warn!(
                        "Shard {} ({}) failed, contributing no results: {}",
                        response.shard, response.replica, error
                    );
                    partial_results = true;
                    if self.request.shards_info {
                        shards_info.insert(
                            response.shard.clone(),
                            ShardDiagnostics {
                                replica: response.replica.clone(),
                                num_found: 0,
                                max_sort_values: None,
                                elapsed_micros: 0,
                                segment_terminated_early: None,
                                error: Some(error.clone()),
                            },
                        );
                    }
                }
            }
        }

        let docs = self.merge_hits(&lists);
        let groups = self.request.group.as_ref().map(|_| self.merge_groups(&groups));
        debug!(
            "Merged {} shard responses: numFound={}, exact={}, docs={}",
            responses.len(),
            num_found,
            num_found_exact,
            docs.len()
        );

        SearchResponse {
            header: ResponseHeader {
                segment_terminated_early: self.overall_flag(any_terminated),
                partial_results,
            },
            num_found,
            num_found_exact,
            start: self.request.start,
            docs,
            groups,
            shards_info: self.request.shards_info.then_some(shards_info),
        }
    }

    /// `None` when not requested; grouped requests never report true
    fn overall_flag(&self, any_terminated: bool) -> Option<bool> {
        if !self.request.segment_terminate_early {
            None
        } else if self.request.group.is_some() {
            Some(false)
        } else {
            Some(any_terminated)
        }
    }

    fn diagnostics(&self, response: &ShardResponse, result: &ShardResult) -> ShardDiagnostics {
        let best = match &result.groups {
            Some(groups) => groups.first().map(|g| &g.top),
            None => result.hits.first(),
        };
        ShardDiagnostics {
            replica: response.replica.clone(),
            num_found: result.num_found,
            max_sort_values: best.map(|h| h.sort_values.clone()),
            elapsed_micros: result.elapsed_micros,
            segment_terminated_early: self.overall_flag(result.terminated_early),
            error: None,
        }
    }

    /// k-way merge of per-shard sorted lists; ties go to the earlier shard,
    /// then the earlier position
    fn merge_hits(&self, lists: &[(&str, &[Hit])]) -> Vec<ResultDoc> {
        let sort = &self.request.sort;
        let window = self.request.start.saturating_add(self.request.rows);
        let mut cursors = vec![0usize; lists.len()];
        let mut merged = Vec::new();

        while merged.len() < window {
            let mut best: Option<usize> = None;
            for (i, (_, hits)) in lists.iter().enumerate() {
                let Some(candidate) = hits.get(cursors[i]) else {
                    continue;
                };
                best = match best {
                    Some(b) if sort.compare(&candidate.sort_values, &lists[b].1[cursors[b]].sort_values)
                        != Ordering::Less =>
                    {
                        Some(b)
                    }
                    _ => Some(i),
                };
            }
            let Some(b) = best else { break };
            let (shard, hits) = lists[b];
            let hit = &hits[cursors[b]];
            cursors[b] += 1;
            merged.push(ResultDoc {
                shard: shard.to_string(),
                doc: hit.doc.clone(),
                sort_values: hit.sort_values.clone(),
            });
        }

        merged.into_iter().skip(self.request.start).collect()
    }

    fn merge_groups(&self, shard_groups: &[(&str, &[GroupHits])]) -> Vec<MergedGroup> {
        let sort = &self.request.sort;
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut merged: Vec<MergedGroup> = Vec::new();

        for (shard, groups) in shard_groups {
            for group in groups.iter() {
                let key = group
                    .value
                    .as_ref()
                    .map_or_else(|| "\u{0}null".to_string(), |v| v.to_string());
                let top = ResultDoc {
                    shard: shard.to_string(),
                    doc: group.top.doc.clone(),
                    sort_values: group.top.sort_values.clone(),
                };
                match index.get(&key) {
                    Some(&i) => {
                        let existing = &mut merged[i];
                        existing.matches += group.matches;
                        if sort.compare(&top.sort_values, &existing.top.sort_values) == Ordering::Less {
                            existing.top = top;
                        }
                    }
                    None => {
                        index.insert(key, merged.len());
                        merged.push(MergedGroup {
                            value: group.value.clone(),
                            matches: group.matches,
                            top,
                        });
                    }
                }
            }
        }

        merged.sort_by(|a, b| sort.compare(&a.top.sort_values, &b.top.sort_values));
        merged
            .into_iter()
            .skip(self.request.start)
            .take(self.request.rows)
            .collect()
    }
}
