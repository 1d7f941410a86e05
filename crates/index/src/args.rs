//! Merge-policy factory arguments
//!
//! A flat `key -> value` namespace. Factories claim (remove) the keys they
//! understand; whatever is left over after construction is a configuration
//! error for whoever validates the namespace.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyArgs {
    entries: BTreeMap<String, Value>,
}

impl PolicyArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style `put`
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.put(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in sorted order
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Extract every entry whose key starts with `"<prefix>."`, removing them
    /// from `self` and returning them with the prefix stripped.
    pub fn filter_and_strip(&mut self, prefix: &str) -> PolicyArgs {
        let full_prefix = format!("{}.", prefix);
        let claimed: Vec<String> = self
            .entries
            .keys()
            .filter(|k| k.starts_with(&full_prefix))
            .cloned()
            .collect();

        let mut child = PolicyArgs::new();
        for key in claimed {
            if let Some(value) = self.entries.remove(&key) {
                child
                    .entries
                    .insert(key[full_prefix.len()..].to_string(), value);
            }
        }
        child
    }

    /// Claim a string value
    pub fn take_str(&mut self, key: &str) -> Result<Option<String>, ConfigError> {
        match self.entries.remove(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(wrong_type(key, "string", &other)),
        }
    }

    /// Claim a non-negative integer value (numeric strings accepted)
    pub fn take_usize(&mut self, key: &str) -> Result<Option<usize>, ConfigError> {
        match self.entries.remove(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(|v| Some(v as usize))
                .ok_or_else(|| wrong_type(key, "non-negative integer", &Value::Number(n))),
            Some(Value::String(s)) => s
                .parse::<usize>()
                .map(Some)
                .map_err(|_| wrong_type(key, "non-negative integer", &Value::String(s))),
            Some(other) => Err(wrong_type(key, "non-negative integer", &other)),
        }
    }

    /// Claim a floating point value (numeric strings accepted)
    pub fn take_f64(&mut self, key: &str) -> Result<Option<f64>, ConfigError> {
        match self.entries.remove(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| wrong_type(key, "number", &Value::Number(n))),
            Some(Value::String(s)) => s
                .parse::<f64>()
                .map(Some)
                .map_err(|_| wrong_type(key, "number", &Value::String(s))),
            Some(other) => Err(wrong_type(key, "number", &other)),
        }
    }

    /// Claim a boolean value (`"true"`/`"false"` strings accepted)
    pub fn take_bool(&mut self, key: &str) -> Result<Option<bool>, ConfigError> {
        match self.entries.remove(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(Value::String(s)) => s
                .parse::<bool>()
                .map(Some)
                .map_err(|_| wrong_type(key, "boolean", &Value::String(s))),
            Some(other) => Err(wrong_type(key, "boolean", &other)),
        }
    }

    /// Fail if any key is left unclaimed
    pub fn ensure_empty(&self, owner: &str) -> Result<(), ConfigError> {
        if self.entries.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::UnclaimedArgs {
                owner: owner.to_string(),
                keys: self.keys(),
            })
        }
    }

    /// Replace string values of the form `${name}` or `${name:default}` with
    /// the named property.
    pub fn substitute_properties(
        &mut self,
        properties: &HashMap<String, String>,
    ) -> Result<(), ConfigError> {
        for (key, value) in self.entries.iter_mut() {
            let Value::String(text) = value else {
                continue;
            };
            let Some(inner) = text.strip_prefix("${").and_then(|t| t.strip_suffix('}')) else {
                continue;
            };
            let (name, default) = match inner.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (inner, None),
            };
            let resolved = match (properties.get(name), default) {
                (Some(v), _) => v.clone(),
                (None, Some(d)) => d.to_string(),
                (None, None) => {
                    return Err(ConfigError::InvalidValue {
                        key: key.clone(),
                        reason: format!("property '{}' is not defined", name),
                    })
                }
            };
            *value = Value::String(resolved);
        }
        Ok(())
    }
}

fn wrong_type(key: &str, expected: &'static str, actual: &Value) -> ConfigError {
    ConfigError::WrongType {
        key: key.to_string(),
        expected,
        actual: actual.to_string(),
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for PolicyArgs {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut args = PolicyArgs::new();
        for (k, v) in iter {
            args.put(k, v);
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_and_strip_claims_prefixed_keys() {
        let mut args: PolicyArgs = [
            ("wrapped.prefix", "inner"),
            ("inner.class", "TieredMergePolicyFactory"),
            ("inner.maxMergeAtOnce", "20"),
            ("innerish", "untouched"),
            ("sort", "timestamp desc"),
        ]
        .into_iter()
        .collect();

        let child = args.filter_and_strip("inner");
        assert_eq!(child.keys(), vec!["class", "maxMergeAtOnce"]);
        assert_eq!(args.keys(), vec!["innerish", "sort", "wrapped.prefix"]);
    }

    #[test]
    fn test_typed_claims() {
        let mut args = PolicyArgs::new()
            .with("a", 3)
            .with("b", "4")
            .with("c", 2.5)
            .with("d", "true")
            .with("e", "x");

        assert_eq!(args.take_usize("a").unwrap(), Some(3));
        assert_eq!(args.take_usize("b").unwrap(), Some(4));
        assert_eq!(args.take_f64("c").unwrap(), Some(2.5));
        assert_eq!(args.take_bool("d").unwrap(), Some(true));
        assert!(matches!(
            args.take_usize("e"),
            Err(ConfigError::WrongType { .. })
        ));
        assert_eq!(args.take_usize("missing").unwrap(), None);
        assert!(args.is_empty());
    }

    #[test]
    fn test_ensure_empty_lists_leftovers() {
        let args = PolicyArgs::new().with("z", 1).with("a", 2);
        let err = args.ensure_empty("TestFactory").unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnclaimedArgs {
                owner: "TestFactory".to_string(),
                keys: vec!["a".to_string(), "z".to_string()],
            }
        );
        assert!(PolicyArgs::new().ensure_empty("TestFactory").is_ok());
    }

    #[test]
    fn test_substitute_properties() {
        let mut args = PolicyArgs::new()
            .with("class", "${mergePolicy}")
            .with("maxMergeAtOnce", "${maxMerge:7}")
            .with("literal", "plain");
        let props = HashMap::from([(
            "mergePolicy".to_string(),
            "LogDocMergePolicyFactory".to_string(),
        )]);

        args.substitute_properties(&props).unwrap();
        assert_eq!(args.take_str("class").unwrap().as_deref(), Some("LogDocMergePolicyFactory"));
        assert_eq!(args.take_usize("maxMergeAtOnce").unwrap(), Some(7));
        assert_eq!(args.take_str("literal").unwrap().as_deref(), Some("plain"));

        let mut unresolved = PolicyArgs::new().with("class", "${nope}");
        assert!(unresolved.substitute_properties(&props).is_err());
    }
}
