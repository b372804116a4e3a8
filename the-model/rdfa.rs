//! RDFa projection of node attributes.
//!
//! The model does not interpret RDFa itself; it only exposes which of the
//! reserved attributes a node carries so the datastore can walk the tree.

use crate::node::Attributes;

/// Attribute keys read by [`RdfaAttributes::from_attributes`].
pub const RDFA_ATTRIBUTE_KEYS: &[&str] = &[
  "about", "property", "resource", "href", "src", "rel", "rev", "typeof", "datatype", "content",
  "lang", "xml:lang",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RdfaAttributes {
  pub about:    Option<String>,
  pub property: Vec<String>,
  pub resource: Option<String>,
  pub href:     Option<String>,
  pub src:      Option<String>,
  pub rel:      Vec<String>,
  pub rev:      Vec<String>,
  pub type_of:  Vec<String>,
  pub datatype: Option<String>,
  pub content:  Option<String>,
  pub language: Option<String>,
}

fn split_terms(value: Option<&String>) -> Vec<String> {
  value
    .map(|value| value.split_whitespace().map(str::to_string).collect())
    .unwrap_or_default()
}

/// Whether `key` is one of the attributes RDFa processing reads.
pub fn is_rdfa_attribute(key: &str) -> bool {
  RDFA_ATTRIBUTE_KEYS.contains(&key)
}

impl RdfaAttributes {
  pub fn from_attributes(attributes: &Attributes) -> Self {
    if !attributes.keys().any(|key| is_rdfa_attribute(key)) {
      return Self::default();
    }
    Self {
      about:    attributes.get("about").cloned(),
      property: split_terms(attributes.get("property")),
      resource: attributes.get("resource").cloned(),
      href:     attributes.get("href").cloned(),
      src:      attributes.get("src").cloned(),
      rel:      split_terms(attributes.get("rel")),
      rev:      split_terms(attributes.get("rev")),
      type_of:  split_terms(attributes.get("typeof")),
      datatype: attributes.get("datatype").cloned(),
      content:  attributes.get("content").cloned(),
      language: attributes
        .get("xml:lang")
        .or_else(|| attributes.get("lang"))
        .cloned(),
    }
  }

  /// `resource`, falling back to `href` then `src`.
  pub fn object_resource(&self) -> Option<&str> {
    self
      .resource
      .as_deref()
      .or(self.href.as_deref())
      .or(self.src.as_deref())
  }

  pub fn has_rel_or_rev(&self) -> bool {
    !self.rel.is_empty() || !self.rev.is_empty()
  }

  /// Whether the node takes part in RDFa processing at all. `lang` alone
  /// only changes the context.
  pub fn is_empty(&self) -> bool {
    self.about.is_none()
      && self.property.is_empty()
      && self.object_resource().is_none()
      && !self.has_rel_or_rev()
      && self.type_of.is_empty()
      && self.datatype.is_none()
      && self.content.is_none()
  }
}
