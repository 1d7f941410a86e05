//! Search node
//!
//! One node process of the cluster: configuration, the cores placed on it,
//! and the launcher that starts and stops it.

pub mod config;
pub mod config_set;
pub mod cores;
pub mod error;
pub mod launcher;
pub mod node;

pub use config::{Config, ConfigError, IndexConfig, LogConfig, NodeConfig, RecoveryConfig};
pub use config_set::ConfigSet;
pub use cores::{Core, CoreDescriptor};
pub use error::NodeError;
pub use launcher::{FaultHook, FaultPoint, LocalLauncher, NodeLauncher};
pub use node::SearchNode;
