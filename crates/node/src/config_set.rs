//! Named index configuration shared by every core of a collection

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use index::{MergePolicy, PolicyArgs, PolicyError, PolicyLoader, PolicySettings};
use tc_core::IndexSchema;

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSet {
    pub name: String,
    pub schema: IndexSchema,
    /// Top-level merge-policy namespace; `class` picks the factory
    #[serde(default)]
    pub merge_policy: PolicyArgs,
}

impl ConfigSet {
    pub fn new(name: impl Into<String>, schema: IndexSchema, merge_policy: PolicyArgs) -> Self {
        Self {
            name: name.into(),
            schema,
            merge_policy,
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Build the merge policy for one core, substituting `${prop}` references
    /// from the core's properties
    pub fn merge_policy(
        &self,
        settings: &PolicySettings,
        properties: &HashMap<String, String>,
    ) -> Result<Arc<dyn MergePolicy>, PolicyError> {
        let mut args = self.merge_policy.clone();
        args.substitute_properties(properties)?;
        let loader = Arc::new(PolicyLoader::new(settings.clone()));
        loader.merge_policy_from_args(args, Arc::new(self.schema.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use index::{SortingMergePolicy, TieredMergePolicy};

    const YAML: &str = r#"
name: sorted
schema:
  name: sorted
  unique_key: id
  fields:
    - name: id
      type: text
      sortable: true
    - name: timestamp
      type: long
      sortable: true
merge_policy:
  class: ${mergePolicyFactory:SortingMergePolicyFactory}
  wrapped.prefix: in
  in.class: TieredMergePolicyFactory
  sort: timestamp desc
"#;

    #[test]
    fn test_config_set_from_yaml_builds_sorting_policy() {
        let config_set = ConfigSet::from_yaml(YAML).unwrap();
        assert_eq!(config_set.name, "sorted");

        let policy = config_set
            .merge_policy(&PolicySettings::default(), &HashMap::new())
            .unwrap();
        assert!(policy.as_any().downcast_ref::<SortingMergePolicy>().is_some());
    }

    #[test]
    fn test_properties_override_factory() {
        let config_set = ConfigSet::from_yaml(YAML).unwrap();
        let props = HashMap::from([(
            "mergePolicyFactory".to_string(),
            "TieredMergePolicyFactory".to_string(),
        )]);
        // Tiered does not claim the sorting keys
        assert!(config_set
            .merge_policy(&PolicySettings::default(), &props)
            .is_err());

        let disabled = PolicySettings {
            sorting_merge_policy_enabled: false,
        };
        let policy = config_set.merge_policy(&disabled, &HashMap::new()).unwrap();
        assert!(policy.as_any().downcast_ref::<TieredMergePolicy>().is_some());
    }
}
