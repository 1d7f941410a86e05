use std::sync::Arc;

use tc_core::{IndexSchema, SortKey};
use tracing::info;

use super::{MergePolicyFactory, PolicyLoader, WrappedPolicyArgs, WrapperMergePolicyFactory};
use crate::args::PolicyArgs;
use crate::error::{ConfigError, PolicyError};
use crate::policy::{MergePolicy, SortingMergePolicy};

const SORT_KEY: &str = "sort";

/// Wraps another factory's policy in a `SortingMergePolicy`.
///
/// Claims the mandatory `sort` key, validated against the schema. When the
/// loader's `sorting_merge_policy_enabled` setting is off, the wrapped policy
/// is returned undecorated.
#[derive(Debug)]
pub struct SortingMergePolicyFactory {
    wrapped: WrappedPolicyArgs,
    sort: SortKey,
    unique_key: String,
    enabled: bool,
}

impl SortingMergePolicyFactory {
    pub fn new(
        loader: Arc<PolicyLoader>,
        mut args: PolicyArgs,
        schema: Arc<IndexSchema>,
    ) -> Result<Self, PolicyError> {
        let enabled = loader.settings().sorting_merge_policy_enabled;
        let wrapped = WrappedPolicyArgs::claim(loader, &mut args, schema.clone())?;

        let text = args.take_str(SORT_KEY)?.ok_or_else(|| ConfigError::MissingKey {
            owner: "SortingMergePolicyFactory".to_string(),
            key: SORT_KEY.to_string(),
        })?;
        let sort = SortKey::parse(&text).map_err(|e| ConfigError::InvalidValue {
            key: SORT_KEY.to_string(),
            reason: e.to_string(),
        })?;
        if sort.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: SORT_KEY.to_string(),
                reason: "sort must name at least one field".to_string(),
            }
            .into());
        }
        schema
            .validate_sort(&sort)
            .map_err(|e| ConfigError::InvalidValue {
                key: SORT_KEY.to_string(),
                reason: e.to_string(),
            })?;

        args.ensure_empty("SortingMergePolicyFactory")?;
        Ok(Self {
            wrapped,
            sort,
            unique_key: schema.unique_key.clone(),
            enabled,
        })
    }

    pub fn sort(&self) -> &SortKey {
        &self.sort
    }

    pub(crate) fn build(
        loader: Arc<PolicyLoader>,
        args: PolicyArgs,
        schema: Arc<IndexSchema>,
    ) -> Result<Box<dyn MergePolicyFactory>, PolicyError> {
        Ok(Box::new(Self::new(loader, args, schema)?))
    }
}

impl MergePolicyFactory for SortingMergePolicyFactory {
    fn get_merge_policy(&self) -> Result<Arc<dyn MergePolicy>, PolicyError> {
        let inner = self.wrapped_merge_policy()?;
        if !self.enabled {
            info!(
                "Sorting merge policy disabled, using {} without sort {}",
                inner.name(),
                self.sort
            );
            return Ok(inner);
        }
        Ok(Arc::new(SortingMergePolicy::new(
            inner,
            self.sort.clone(),
            self.unique_key.clone(),
        )))
    }
}

impl WrapperMergePolicyFactory for SortingMergePolicyFactory {
    fn wrapped(&self) -> &WrappedPolicyArgs {
        &self.wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{PolicySettings, WRAPPED_PREFIX};
    use crate::policy::{LogDocMergePolicy, TieredMergePolicy};
    use tc_core::FieldType;

    fn schema() -> Arc<IndexSchema> {
        Arc::new(IndexSchema::default().with_field("timestamp", FieldType::Long))
    }

    fn sorting_args() -> PolicyArgs {
        PolicyArgs::new()
            .with("class", "SortingMergePolicyFactory")
            .with(WRAPPED_PREFIX, "inner")
            .with("inner.class", "LogDocMergePolicyFactory")
            .with("inner.mergeFactor", 5)
            .with("sort", "timestamp desc")
    }

    #[test]
    fn test_builds_sorting_policy_around_wrapped() {
        let loader = Arc::new(PolicyLoader::default());
        let policy = loader.merge_policy_from_args(sorting_args(), schema()).unwrap();

        let sorting = policy.as_any().downcast_ref::<SortingMergePolicy>().unwrap();
        assert_eq!(sorting.sort(), &SortKey::parse("timestamp desc").unwrap());
        let inner = sorting
            .inner()
            .as_any()
            .downcast_ref::<LogDocMergePolicy>()
            .unwrap();
        assert_eq!(inner.merge_factor, 5);
    }

    #[test]
    fn test_defaults_to_tiered_without_prefix() {
        let loader = Arc::new(PolicyLoader::default());
        let args = PolicyArgs::new()
            .with("class", "SortingMergePolicyFactory")
            .with("sort", "timestamp desc");
        let policy = loader.merge_policy_from_args(args, schema()).unwrap();
        let sorting = policy.as_any().downcast_ref::<SortingMergePolicy>().unwrap();
        assert!(sorting.inner().as_any().downcast_ref::<TieredMergePolicy>().is_some());
    }

    #[test]
    fn test_disabled_returns_wrapped_policy() {
        let loader = Arc::new(PolicyLoader::new(PolicySettings {
            sorting_merge_policy_enabled: false,
        }));
        let policy = loader.merge_policy_from_args(sorting_args(), schema()).unwrap();
        assert!(policy.as_any().downcast_ref::<LogDocMergePolicy>().is_some());
    }

    #[test]
    fn test_sort_is_mandatory_and_validated() {
        let loader = Arc::new(PolicyLoader::default());
        let missing = PolicyArgs::new().with("class", "SortingMergePolicyFactory");
        assert!(matches!(
            loader.merge_policy_from_args(missing, schema()).err().unwrap(),
            PolicyError::Config(ConfigError::MissingKey { .. })
        ));

        let undefined = PolicyArgs::new()
            .with("class", "SortingMergePolicyFactory")
            .with("sort", "nosuchfield desc");
        assert!(matches!(
            loader.merge_policy_from_args(undefined, schema()).err().unwrap(),
            PolicyError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_policy_is_stable_across_calls() {
        let loader = Arc::new(PolicyLoader::default());
        let factory = loader
            .new_factory(
                "SortingMergePolicyFactory",
                PolicyArgs::new()
                    .with(WRAPPED_PREFIX, "inner")
                    .with("inner.class", "TieredMergePolicyFactory")
                    .with("sort", "timestamp desc"),
                schema(),
            )
            .unwrap();
        let first = factory.get_merge_policy().unwrap();
        let second = factory.get_merge_policy().unwrap();
        assert_eq!(first.name(), second.name());
        let a = first.as_any().downcast_ref::<SortingMergePolicy>().unwrap();
        let b = second.as_any().downcast_ref::<SortingMergePolicy>().unwrap();
        assert_eq!(a.sort(), b.sort());
    }
}
