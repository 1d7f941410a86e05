use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use index::ShardResult;
use tc_core::{Document, FieldValue, SortValues};

/// One shard's contribution to a distributed search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardResponse {
    /// Slice name
    pub shard: String,
    /// Replica (core) that answered, or was asked
    pub replica: String,
    pub result: Result<ShardResult, String>,
}

impl ShardResponse {
    pub fn ok(shard: impl Into<String>, replica: impl Into<String>, result: ShardResult) -> Self {
        Self {
            shard: shard.into(),
            replica: replica.into(),
            result: Ok(result),
        }
    }

    pub fn failed(
        shard: impl Into<String>,
        replica: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            shard: shard.into(),
            replica: replica.into(),
            result: Err(error.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    /// Absent unless early termination was requested
    #[serde(rename = "segmentTerminatedEarly", skip_serializing_if = "Option::is_none")]
    pub segment_terminated_early: Option<bool>,
    /// Some shard failed and contributed nothing
    #[serde(rename = "partialResults")]
    pub partial_results: bool,
}

/// Per-shard entry in the `shards.info` block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardDiagnostics {
    pub replica: String,
    #[serde(rename = "numFound")]
    pub num_found: usize,
    /// Sort values of the shard's best hit
    #[serde(rename = "maxSortValues", skip_serializing_if = "Option::is_none")]
    pub max_sort_values: Option<SortValues>,
    #[serde(rename = "time")]
    pub elapsed_micros: u64,
    #[serde(rename = "segmentTerminatedEarly", skip_serializing_if = "Option::is_none")]
    pub segment_terminated_early: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultDoc {
    pub shard: String,
    pub doc: Document,
    pub sort_values: SortValues,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedGroup {
    pub value: Option<FieldValue>,
    /// Matches summed over shards
    pub matches: usize,
    pub top: ResultDoc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "responseHeader")]
    pub header: ResponseHeader,
    #[serde(rename = "numFound")]
    pub num_found: usize,
    #[serde(rename = "numFoundExact")]
    pub num_found_exact: bool,
    pub start: usize,
    pub docs: Vec<ResultDoc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<MergedGroup>>,
    #[serde(rename = "shards.info", skip_serializing_if = "Option::is_none")]
    pub shards_info: Option<BTreeMap<String, ShardDiagnostics>>,
}

impl SearchResponse {
    /// Overall early-termination flag, `None` when not requested
    pub fn segment_terminated_early(&self) -> Option<bool> {
        self.header.segment_terminated_early
    }

    pub fn doc_ids(&self) -> Vec<&str> {
        self.docs.iter().map(|d| d.doc.id.as_str()).collect()
    }
}
