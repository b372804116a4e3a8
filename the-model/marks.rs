//! Inline formatting marks and the registry that recognizes them.
//!
//! A [`MarkSpec`] describes a kind of mark: its name, a priority used to order
//! marks when rendering, the [`TagMatcher`]s that recognize it in external
//! markup, and a render rule. A [`Mark`] is a spec plus attributes and is
//! compared by value. Text nodes carry marks in a [`MarkSet`], which holds at
//! most one mark per spec name.

use std::{
  collections::HashMap,
  sync::Arc,
};

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{
  Tendril,
  error::{
    ModelError,
    Result,
  },
};

pub type MarkAttributes = IndexMap<String, String>;

/// A tag as presented by an external reader, before it became a model node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalElement {
  pub tag:        String,
  pub attributes: IndexMap<String, String>,
}

impl ExternalElement {
  pub fn new(tag: impl Into<String>) -> Self {
    Self {
      tag:        tag.into(),
      attributes: IndexMap::new(),
    }
  }

  pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.attributes.insert(key.into(), value.into());
    self
  }

  pub fn attribute(&self, key: &str) -> Option<&str> {
    self.attributes.get(key).map(String::as_str)
  }
}

/// Builds the mark attributes for a matched tag. Returning `None` vetoes the
/// match.
pub type AttributeBuilder = fn(&ExternalElement) -> Option<MarkAttributes>;

#[derive(Debug, Clone)]
pub struct TagMatcher {
  pub tag:               Tendril,
  pub attribute_builder: Option<AttributeBuilder>,
}

impl TagMatcher {
  pub fn tag(tag: &str) -> Self {
    Self {
      tag:               tag.into(),
      attribute_builder: None,
    }
  }

  pub fn with_builder(tag: &str, builder: AttributeBuilder) -> Self {
    Self {
      tag:               tag.into(),
      attribute_builder: Some(builder),
    }
  }

  fn matches(&self, element: &ExternalElement) -> Option<MarkAttributes> {
    if !self.tag.eq_ignore_ascii_case(&element.tag) {
      return None;
    }
    match self.attribute_builder {
      Some(builder) => builder(element),
      None => Some(MarkAttributes::new()),
    }
  }
}

/// What a mark renders to in external markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSpec {
  pub tag:        Tendril,
  pub attributes: IndexMap<String, String>,
}

impl RenderSpec {
  pub fn tag(tag: &str) -> Self {
    Self {
      tag:        tag.into(),
      attributes: IndexMap::new(),
    }
  }
}

pub type RenderRule = fn(&MarkAttributes) -> RenderSpec;

#[derive(Debug, Clone)]
pub struct MarkSpec {
  pub name:     Tendril,
  pub priority: u32,
  pub matchers: Vec<TagMatcher>,
  pub render:   RenderRule,
}

#[derive(Debug, Clone)]
pub struct Mark {
  spec:       Arc<MarkSpec>,
  attributes: MarkAttributes,
}

impl Mark {
  pub fn new(spec: Arc<MarkSpec>, attributes: MarkAttributes) -> Self {
    Self { spec, attributes }
  }

  pub fn name(&self) -> &str {
    self.spec.name.as_str()
  }

  pub fn priority(&self) -> u32 {
    self.spec.priority
  }

  pub fn spec(&self) -> &Arc<MarkSpec> {
    &self.spec
  }

  pub fn attributes(&self) -> &MarkAttributes {
    &self.attributes
  }

  pub fn render(&self) -> RenderSpec {
    (self.spec.render)(&self.attributes)
  }
}

impl PartialEq for Mark {
  fn eq(&self, other: &Self) -> bool {
    self.spec.name == other.spec.name && self.attributes == other.attributes
  }
}

impl Eq for Mark {}

/// Marks of a text node, at most one per spec name, ordered by descending
/// priority then name so equal sets compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkSet {
  marks: SmallVec<[Mark; 2]>,
}

impl MarkSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds `mark`, replacing any mark with the same name.
  pub fn add(&mut self, mark: Mark) {
    self.remove(mark.name());
    let index = self
      .marks
      .iter()
      .position(|existing| {
        (existing.priority(), mark.name()) < (mark.priority(), existing.name())
      })
      .unwrap_or(self.marks.len());
    self.marks.insert(index, mark);
  }

  /// Removes the mark named `name`, returning whether one was present.
  pub fn remove(&mut self, name: &str) -> bool {
    let before = self.marks.len();
    self.marks.retain(|mark| mark.name() != name);
    before != self.marks.len()
  }

  pub fn has(&self, name: &str) -> bool {
    self.get(name).is_some()
  }

  pub fn get(&self, name: &str) -> Option<&Mark> {
    self.marks.iter().find(|mark| mark.name() == name)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Mark> {
    self.marks.iter()
  }

  pub fn len(&self) -> usize {
    self.marks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.marks.is_empty()
  }
}

impl FromIterator<Mark> for MarkSet {
  fn from_iter<I: IntoIterator<Item = Mark>>(iter: I) -> Self {
    let mut set = MarkSet::new();
    for mark in iter {
      set.add(mark);
    }
    set
  }
}

#[derive(Debug, Clone, Default)]
pub struct MarkRegistry {
  specs:  IndexMap<String, Arc<MarkSpec>>,
  by_tag: HashMap<String, Vec<(Arc<MarkSpec>, usize)>>,
}

impl MarkRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registry with bold, italic, underline, strikethrough and highlighted.
  pub fn with_defaults() -> Self {
    let mut registry = Self::new();
    for spec in default_specs() {
      registry.register_mark(spec);
    }
    registry
  }

  /// Registers `spec` under its name, replacing a previous spec of the same
  /// name.
  pub fn register_mark(&mut self, spec: MarkSpec) -> Arc<MarkSpec> {
    let spec = Arc::new(spec);
    let name = spec.name.to_string();
    if self.specs.contains_key(&name) {
      for matchers in self.by_tag.values_mut() {
        matchers.retain(|(existing, _)| existing.name != spec.name);
      }
    }
    for (index, matcher) in spec.matchers.iter().enumerate() {
      self
        .by_tag
        .entry(matcher.tag.to_ascii_lowercase())
        .or_default()
        .push((spec.clone(), index));
    }
    self.specs.insert(name, spec.clone());
    spec
  }

  pub fn lookup_mark(&self, name: &str) -> Option<Arc<MarkSpec>> {
    self.specs.get(name).cloned()
  }

  /// Builds a mark from a registered spec, failing for unknown names.
  pub fn mark(&self, name: &str, attributes: MarkAttributes) -> Result<Mark> {
    let spec = self
      .lookup_mark(name)
      .ok_or_else(|| ModelError::UnrecognizedMark {
        name: name.to_string(),
      })?;
    Ok(Mark::new(spec, attributes))
  }

  /// Every mark whose matcher applies to `element`. Order is unspecified.
  pub fn match_mark(&self, element: &ExternalElement) -> Vec<Mark> {
    let Some(candidates) = self.by_tag.get(&element.tag.to_ascii_lowercase()) else {
      return Vec::new();
    };

    let mut marks: Vec<Mark> = Vec::new();
    for (spec, index) in candidates {
      if marks.iter().any(|mark| mark.name() == spec.name.as_str()) {
        continue;
      }
      match spec.matchers[*index].matches(element) {
        Some(attributes) => marks.push(Mark::new(spec.clone(), attributes)),
        None => {
          tracing::trace!(mark = %spec.name, tag = %element.tag, "mark matcher vetoed");
        },
      }
    }
    marks
  }

  pub fn specs(&self) -> impl Iterator<Item = &Arc<MarkSpec>> {
    self.specs.values()
  }
}

fn default_specs() -> Vec<MarkSpec> {
  fn simple(name: &str, priority: u32, tags: &[&str], render: RenderRule) -> MarkSpec {
    MarkSpec {
      name: name.into(),
      priority,
      matchers: tags.iter().map(|tag| TagMatcher::tag(tag)).collect(),
      render,
    }
  }

  vec![
    simple("bold", 100, &["b", "strong"], |_| RenderSpec::tag("strong")),
    simple("italic", 200, &["i", "em"], |_| RenderSpec::tag("em")),
    simple("underline", 300, &["u"], |_| RenderSpec::tag("u")),
    simple("strikethrough", 400, &["s", "del"], |_| RenderSpec::tag("del")),
    MarkSpec {
      name:     "highlighted".into(),
      priority: 500,
      matchers: vec![TagMatcher::with_builder("span", |element| {
        element
          .attribute("data-editor-highlight")
          .map(|_| MarkAttributes::new())
      })],
      render:   |_| {
        let mut spec = RenderSpec::tag("span");
        spec
          .attributes
          .insert("data-editor-highlight".to_string(), "true".to_string());
        spec
      },
    },
  ]
}
