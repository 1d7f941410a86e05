//! Distributed search surface
//!
//! - `SearchRequest`: what a client asks a collection
//! - `ShardResponse`: one shard's contribution
//! - `ShardResponseMerger`: fan-in of shard results into a `SearchResponse`

pub mod error;
pub mod merger;
pub mod request;
pub mod response;

pub use error::SearchError;
pub use merger::ShardResponseMerger;
pub use request::SearchRequest;
pub use response::{
    MergedGroup, ResponseHeader, ResultDoc, SearchResponse, ShardDiagnostics, ShardResponse,
};
