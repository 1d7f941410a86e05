//! Merge-policy factories
//!
//! Factories are resolved by name through a `PolicyLoader`, an explicit
//! registry populated at startup. Each factory consumes its arguments at
//! construction and then produces a `MergePolicy` on demand.

mod simple;
mod sorting;
mod wrapper;

pub use simple::{LogDocMergePolicyFactory, NoMergePolicyFactory, TieredMergePolicyFactory};
pub use sorting::SortingMergePolicyFactory;
pub use wrapper::{WrappedPolicyArgs, WrapperMergePolicyFactory, WRAPPED_PREFIX};

use std::collections::HashMap;
use std::sync::Arc;

use tc_core::IndexSchema;
use tracing::debug;

use crate::args::PolicyArgs;
use crate::error::{InstantiationError, PolicyError};
use crate::policy::MergePolicy;

/// Reserved key naming the factory to build
pub const CLASS_KEY: &str = "class";

/// Factory used when a config names none
pub const DEFAULT_FACTORY: &str = "TieredMergePolicyFactory";

pub trait MergePolicyFactory: Send + Sync {
    /// Build the configured policy; a pure function of the configuration
    fn get_merge_policy(&self) -> Result<Arc<dyn MergePolicy>, PolicyError>;
}

/// Builder registered under a factory name
pub type FactoryBuilder = fn(
    Arc<PolicyLoader>,
    PolicyArgs,
    Arc<IndexSchema>,
) -> Result<Box<dyn MergePolicyFactory>, PolicyError>;

/// Bootstrap settings visible to every factory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySettings {
    /// When false, sorting factories return their wrapped policy unchanged
    pub sorting_merge_policy_enabled: bool,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            sorting_merge_policy_enabled: true,
        }
    }
}

/// Name-resolution capability for merge-policy factories
pub struct PolicyLoader {
    registry: HashMap<String, FactoryBuilder>,
    settings: PolicySettings,
}

impl PolicyLoader {
    /// Loader with the built-in factories registered
    pub fn new(settings: PolicySettings) -> Self {
        let mut loader = Self::empty(settings);
        loader.register("TieredMergePolicyFactory", TieredMergePolicyFactory::build);
        loader.register("LogDocMergePolicyFactory", LogDocMergePolicyFactory::build);
        loader.register("NoMergePolicyFactory", NoMergePolicyFactory::build);
        loader.register("SortingMergePolicyFactory", SortingMergePolicyFactory::build);
        loader
    }

    pub fn empty(settings: PolicySettings) -> Self {
        Self {
            registry: HashMap::new(),
            settings,
        }
    }

    pub fn register(&mut self, name: impl Into<String>, builder: FactoryBuilder) {
        self.registry.insert(name.into(), builder);
    }

    pub fn settings(&self) -> &PolicySettings {
        &self.settings
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registry.contains_key(name)
    }

    /// Resolve `class` and construct it with `args`
    pub fn new_factory(
        self: &Arc<Self>,
        class: &str,
        args: PolicyArgs,
        schema: Arc<IndexSchema>,
    ) -> Result<Box<dyn MergePolicyFactory>, PolicyError> {
        let builder = self
            .registry
            .get(class)
            .ok_or_else(|| InstantiationError::UnknownClass(class.to_string()))?;
        debug!("Constructing merge policy factory {} with keys {:?}", class, args.keys());
        builder(self.clone(), args, schema)
    }

    /// Build the merge policy described by a top-level config namespace.
    ///
    /// `class` names the factory (default `TieredMergePolicyFactory`); the
    /// remaining keys go to it.
    pub fn merge_policy_from_args(
        self: &Arc<Self>,
        mut args: PolicyArgs,
        schema: Arc<IndexSchema>,
    ) -> Result<Arc<dyn MergePolicy>, PolicyError> {
        let class = args
            .take_str(CLASS_KEY)?
            .unwrap_or_else(|| DEFAULT_FACTORY.to_string());
        self.new_factory(&class, args, schema)?.get_merge_policy()
    }
}

impl Default for PolicyLoader {
    fn default() -> Self {
        Self::new(PolicySettings::default())
    }
}

impl std::fmt::Debug for PolicyLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.registry.keys().collect();
        names.sort();
        f.debug_struct("PolicyLoader")
            .field("registry", &names)
            .field("settings", &self.settings)
            .finish()
    }
}
