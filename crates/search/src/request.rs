use serde::{Deserialize, Serialize};

use index::{GroupSpec, ShardQuery};
use tc_core::{Query, SortKey};

use crate::error::SearchError;

pub const DEFAULT_ROWS: usize = 10;

/// A search against one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: Query,
    /// Empty for index order
    pub sort: SortKey,
    pub start: usize,
    pub rows: usize,
    /// Allow sorted segments to stop being scanned once their top rows are
    /// known
    pub segment_terminate_early: bool,
    /// Include the per-shard diagnostics block
    pub shards_info: bool,
    pub group: Option<GroupSpec>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: Query::All,
            sort: SortKey::index_order(),
            start: 0,
            rows: DEFAULT_ROWS,
            segment_terminate_early: false,
            shards_info: false,
            group: None,
        }
    }
}

impl SearchRequest {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            ..Self::default()
        }
    }

    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_start(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_segment_terminate_early(mut self, enabled: bool) -> Self {
        self.segment_terminate_early = enabled;
        self
    }

    pub fn with_shards_info(mut self, enabled: bool) -> Self {
        self.shards_info = enabled;
        self
    }

    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.group = Some(GroupSpec {
            field: field.into(),
        });
        self
    }

    /// Build a request from `name=value` parameters.
    ///
    /// Understands `q`, `sort`, `start`, `rows`, `segmentTerminateEarly`,
    /// `shards.info`, `group` and `group.field`.
    pub fn from_params<'a, I>(params: I) -> Result<Self, SearchError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut request = Self::default();
        let mut grouping = false;
        let mut group_field = None;

        for (name, value) in params {
            match name {
                "q" => request.query = Query::parse(value)?,
                "sort" => request.sort = SortKey::parse(value)?,
                "start" => request.start = parse_param(name, value)?,
                "rows" => request.rows = parse_param(name, value)?,
                "segmentTerminateEarly" => {
                    request.segment_terminate_early = parse_param(name, value)?
                }
                "shards.info" => request.shards_info = parse_param(name, value)?,
                "group" => grouping = parse_param(name, value)?,
                "group.field" => group_field = Some(value.to_string()),
                other => return Err(SearchError::UnknownParam(other.to_string())),
            }
        }

        if grouping {
            let field = group_field.ok_or_else(|| SearchError::InvalidParam {
                param: "group.field".to_string(),
                value: String::new(),
            })?;
            request.group = Some(GroupSpec { field });
        }
        Ok(request)
    }

    /// The per-shard form: every shard collects the full `start + rows` window
    pub fn shard_query(&self) -> ShardQuery {
        ShardQuery {
            query: self.query.clone(),
            sort: self.sort.clone(),
            start: self.start,
            rows: self.rows,
            segment_terminate_early: self.segment_terminate_early,
            group: self.group.clone(),
        }
    }
}

fn parse_param<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, SearchError> {
    value.parse().map_err(|_| SearchError::InvalidParam {
        param: name.to_string(),
        value: value.to_string(),
    })
}
