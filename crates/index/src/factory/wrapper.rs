//! Wrapping merge-policy factories
//!
//! A wrapper factory decorates the policy produced by a *wrapped* factory.
//! The reserved key `wrapped.prefix` names a namespace; every `<prefix>.<key>`
//! entry is moved out of the parent's args and handed to the wrapped factory
//! as `<key>`. The wrapped namespace must name its factory with `class`.
//!
//! ```text
//! wrapped.prefix = inner
//! inner.class = TieredMergePolicyFactory
//! inner.maxMergeAtOnce = 20
//! sort = timestamp desc
//! ```

use std::sync::Arc;

use tc_core::IndexSchema;

use super::{MergePolicyFactory, PolicyLoader, CLASS_KEY};
use crate::args::PolicyArgs;
use crate::error::{ConfigError, PolicyError};
use crate::policy::{MergePolicy, TieredMergePolicy};

/// Reserved key naming the wrapped namespace
pub const WRAPPED_PREFIX: &str = "wrapped.prefix";

/// The wrapped namespace claimed from a wrapper's args
#[derive(Debug, Clone)]
pub struct WrappedPolicyArgs {
    loader: Arc<PolicyLoader>,
    schema: Arc<IndexSchema>,
    prefix: Option<String>,
    args: Option<PolicyArgs>,
}

impl WrappedPolicyArgs {
    /// Claim `wrapped.prefix` and every `<prefix>.*` entry from `args`.
    ///
    /// With no prefix nothing else is touched.
    pub fn claim(
        loader: Arc<PolicyLoader>,
        args: &mut PolicyArgs,
        schema: Arc<IndexSchema>,
    ) -> Result<Self, ConfigError> {
        let prefix = args.take_str(WRAPPED_PREFIX)?;
        let wrapped = prefix.as_deref().map(|p| args.filter_and_strip(p));
        Ok(Self {
            loader,
            schema,
            prefix,
            args: wrapped,
        })
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// The wrapped namespace with the prefix stripped, `class` included
    pub fn args(&self) -> Option<&PolicyArgs> {
        self.args.as_ref()
    }

    pub fn loader(&self) -> &Arc<PolicyLoader> {
        &self.loader
    }

    pub fn schema(&self) -> &Arc<IndexSchema> {
        &self.schema
    }

    /// Build the wrapped policy, or fall back to `default` when no prefix
    /// was configured. Can be called any number of times.
    pub fn resolve<F>(&self, default: F) -> Result<Arc<dyn MergePolicy>, PolicyError>
    where
        F: FnOnce() -> Result<Arc<dyn MergePolicy>, PolicyError>,
    {
        let Some(wrapped) = &self.args else {
            return default();
        };
        let mut wrapped = wrapped.clone();
        let class = wrapped.take_str(CLASS_KEY)?.ok_or_else(|| ConfigError::MissingKey {
            owner: format!("wrapped merge policy '{}'", self.prefix.as_deref().unwrap_or("")),
            key: CLASS_KEY.to_string(),
        })?;
        self.loader
            .new_factory(&class, wrapped, self.schema.clone())?
            .get_merge_policy()
    }
}

/// A factory whose policy decorates the one built from its wrapped namespace
pub trait WrapperMergePolicyFactory: MergePolicyFactory {
    fn wrapped(&self) -> &WrappedPolicyArgs;

    /// Policy used when no `wrapped.prefix` is configured
    fn default_wrapped_merge_policy(&self) -> Result<Arc<dyn MergePolicy>, PolicyError> {
        Ok(Arc::new(TieredMergePolicy::default()))
    }

    fn wrapped_merge_policy(&self) -> Result<Arc<dyn MergePolicy>, PolicyError> {
        self.wrapped()
            .resolve(|| self.default_wrapped_merge_policy())
    }
}
