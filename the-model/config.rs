//! Opaque editor configuration carried by a state.

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
  #[error("invalid editor config: {0}")]
  Parse(#[from] toml::de::Error),
}

/// Ordered key to optional value map. Keys present with no value are
/// distinct from absent keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorConfig {
  values: IndexMap<String, Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
struct UnsetKeys {
  keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
  #[serde(default)]
  unset:  UnsetKeys,
  #[serde(flatten)]
  values: IndexMap<String, String>,
}

impl EditorConfig {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reads string values from the top level of a TOML document. Keys listed
  /// under `[unset] keys` are recorded as present without a value.
  pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
    let raw: RawConfig = toml::from_str(source)?;
    let mut config = Self::new();
    for (key, value) in raw.values {
      config.set(key, Some(value));
    }
    for key in raw.unset.keys {
      config.set(key, None);
    }
    Ok(config)
  }

  /// The value of `key`: `None` when absent, `Some(None)` when explicitly
  /// unset.
  pub fn get(&self, key: &str) -> Option<Option<&str>> {
    self.values.get(key).map(Option::as_deref)
  }

  pub fn value(&self, key: &str) -> Option<&str> {
    self.get(key).flatten()
  }

  pub fn contains(&self, key: &str) -> bool {
    self.values.contains_key(key)
  }

  pub fn set(&mut self, key: impl Into<String>, value: Option<String>) -> Option<Option<String>> {
    self.values.insert(key.into(), value)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
    self
      .values
      .iter()
      .map(|(key, value)| (key.as_str(), value.as_deref()))
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_values_and_unset_keys() {
    let config = EditorConfig::from_toml(
      r#"
paste-behaviour = "full-html"

[unset]
keys = ["link-target"]
"#,
    )
    .unwrap();
    assert_eq!(config.value("paste-behaviour"), Some("full-html"));
    assert_eq!(config.get("link-target"), Some(None));
    assert!(config.contains("link-target"));
    assert_eq!(config.get("missing"), None);
    assert_eq!(config.len(), 2);
  }

  #[test]
  fn rejects_non_string_values() {
    assert!(matches!(
      EditorConfig::from_toml("depth = 3"),
      Err(ConfigError::Parse(_))
    ));
  }

  #[test]
  fn setting_keeps_insertion_order() {
    let mut config = EditorConfig::new();
    config.set("b", Some("1".into()));
    config.set("a", None);
    assert_eq!(config.set("b", Some("2".into())), Some(Some("1".into())));
    let keys: Vec<&str> = config.iter().map(|(key, _)| key).collect();
    assert_eq!(keys, vec!["b", "a"]);
  }
}
