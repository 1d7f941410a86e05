//! Segment index engine
//!
//! - `PolicyArgs` namespaces and the merge-policy factory framework
//! - Merge policies, including the sort-preserving `SortingMergePolicy`
//! - `IndexWriter`: buffered commits, merges, point-in-time snapshots
//! - `EarlyTerminationCollector`: per-shard top-N collection

pub mod args;
pub mod collector;
pub mod error;
pub mod factory;
pub mod policy;
pub mod segment;
pub mod writer;

pub use args::PolicyArgs;
pub use collector::{
    EarlyTerminationCollector, Flow, GroupHits, GroupSpec, Hit, LeafCollector, ShardQuery,
    ShardResult,
};
pub use error::{ConfigError, IndexError, InstantiationError, PolicyError};
pub use factory::{
    MergePolicyFactory, PolicyLoader, PolicySettings, SortingMergePolicyFactory,
    WrappedPolicyArgs, WrapperMergePolicyFactory, WRAPPED_PREFIX,
};
pub use policy::{
    LogDocMergePolicy, MergePolicy, NoMergePolicy, OneMerge, SortingMergePolicy,
    TieredMergePolicy,
};
pub use segment::{Segment, SegmentId, SegmentSet};
pub use writer::{IndexWriter, IndexWriterConfig, MergeScheduler};
