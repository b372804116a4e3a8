//! Prefix and base configuration supplied by the caller.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::{
  error::Result,
  term::Term,
};

const DEFAULT_PREFIXES: &[(&str, &str)] = &[
  ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
  ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
  ("xsd", "http://www.w3.org/2001/XMLSchema#"),
  ("owl", "http://www.w3.org/2002/07/owl#"),
  ("schema", "http://schema.org/"),
];

/// How attribute values and concise query terms become IRIs. Documents are
/// never consulted for prefixes; this config is the only source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatastoreConfig {
  pub prefixes: IndexMap<String, String>,
  /// Namespace for bare terms such as `property="name"`.
  pub vocab:    Option<String>,
  /// IRI relative references resolve against, and the subject of the root.
  pub base:     Option<String>,
}

impl Default for DatastoreConfig {
  fn default() -> Self {
    Self {
      prefixes: DEFAULT_PREFIXES
        .iter()
        .map(|(prefix, iri)| (prefix.to_string(), iri.to_string()))
        .collect(),
      vocab:    None,
      base:     None,
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
struct RawConfig {
  prefixes: IndexMap<String, String>,
  vocab:    Option<String>,
  base:     Option<String>,
}

/// `scheme:` followed by something other than a CURIE reference we know.
fn has_scheme(value: &str) -> bool {
  value.split_once(':').is_some_and(|(scheme, _)| {
    !scheme.is_empty()
      && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
      && scheme
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
  })
}

impl DatastoreConfig {
  /// Reads a config whose `[prefixes]` table extends the default prefixes.
  ///
  /// ```toml
  /// vocab = "http://schema.org/"
  /// base = "http://example.org/doc"
  ///
  /// [prefixes]
  /// ex = "http://example.org/"
  /// ```
  pub fn from_toml(source: &str) -> Result<Self> {
    let raw: RawConfig = toml::from_str(source)?;
    let mut config = Self::default();
    config.prefixes.extend(raw.prefixes);
    config.vocab = raw.vocab;
    config.base = raw.base;
    Ok(config)
  }

  pub fn prefix(&self, prefix: &str) -> Option<&str> {
    self.prefixes.get(prefix).map(String::as_str)
  }

  fn expand_curie(&self, value: &str) -> Option<String> {
    let (prefix, local) = value.split_once(':')?;
    self
      .prefix(prefix)
      .map(|namespace| format!("{namespace}{local}"))
  }

  /// Resolves a reference against `base`. Without a base the reference is
  /// kept as written.
  pub fn resolve_relative(&self, reference: &str) -> String {
    let Some(base) = self.base.as_deref() else {
      return reference.to_string();
    };
    let without_fragment = base.split('#').next().unwrap_or(base);
    if reference.is_empty() {
      return without_fragment.to_string();
    }
    if reference.starts_with('#') {
      return format!("{without_fragment}{reference}");
    }
    if let Some(path) = reference.strip_prefix('/') {
      let authority_end = without_fragment
        .find("://")
        .and_then(|scheme_end| {
          without_fragment[scheme_end + 3..]
            .find('/')
            .map(|slash| scheme_end + 3 + slash)
        })
        .unwrap_or(without_fragment.len());
      return format!("{}/{path}", &without_fragment[..authority_end]);
    }
    let directory = without_fragment
      .rfind('/')
      .filter(|slash| !without_fragment[..*slash].ends_with('/'))
      .map_or(without_fragment, |slash| &without_fragment[..=slash]);
    if directory.ends_with('/') {
      format!("{directory}{reference}")
    } else {
      format!("{directory}/{reference}")
    }
  }

  /// Resolves `about` and `resource` values: safe CURIEs in brackets, blank
  /// node labels, CURIEs with a configured prefix, then IRIs.
  pub fn resolve_resource(&self, value: &str) -> Option<Term> {
    let value = value.trim();
    if let Some(safe) = value
      .strip_prefix('[')
      .and_then(|rest| rest.strip_suffix(']'))
    {
      if let Some(label) = safe.strip_prefix("_:") {
        return Some(Term::blank(label));
      }
      let expanded = self.expand_curie(safe);
      if expanded.is_none() {
        tracing::warn!(curie = safe, "ignoring safe CURIE with an unknown prefix");
      }
      return expanded.map(Term::named);
    }
    if let Some(label) = value.strip_prefix("_:") {
      return Some(Term::blank(label));
    }
    if let Some(expanded) = self.expand_curie(value) {
      return Some(Term::named(expanded));
    }
    Some(Term::named(self.resolve_iri(value)))
  }

  /// Resolves `href` and `src` values, which are always IRIs.
  pub fn resolve_iri(&self, value: &str) -> String {
    let value = value.trim();
    if has_scheme(value) {
      value.to_string()
    } else {
      self.resolve_relative(value)
    }
  }

  /// Resolves `property`, `rel`, `rev`, `typeof` and `datatype` values:
  /// absolute IRIs, CURIEs, then bare terms against the vocabulary.
  pub fn resolve_predicate(&self, value: &str) -> Option<String> {
    if value.contains("://") {
      return Some(value.to_string());
    }
    if value.contains(':') {
      let expanded = self.expand_curie(value);
      if expanded.is_none() {
        if has_scheme(value) && !value.starts_with("_:") {
          tracing::warn!(curie = value, "unknown prefix, keeping value as an IRI");
          return Some(value.to_string());
        }
        tracing::warn!(curie = value, "ignoring value that is not a valid predicate");
      }
      return expanded;
    }
    match &self.vocab {
      Some(vocab) => Some(format!("{vocab}{value}")),
      None => {
        tracing::warn!(term = value, "ignoring bare term without a vocabulary");
        None
      },
    }
  }
}
