//! Registry of atomic inline components.
//!
//! An inline component is an opaque, non-editable node (a counter, a
//! citation widget, ...) that occupies exactly one offset. Readers ask the
//! registry whether an external element stands for a component.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::{
  Tendril,
  error::{
    ModelError,
    Result,
  },
  marks::ExternalElement,
};

pub type ComponentProps = IndexMap<String, String>;

/// Decides whether an external element is an instance of the component and
/// extracts its props.
pub type ComponentMatcher = fn(&ExternalElement) -> Option<ComponentProps>;

#[derive(Debug, Clone)]
pub struct InlineComponentSpec {
  pub name:    Tendril,
  pub matcher: ComponentMatcher,
}

impl InlineComponentSpec {
  /// Spec recognized only through the `data-inline-component` marker
  /// attribute, see [`InlineComponentRegistry::match_component`].
  pub fn named(name: &str) -> Self {
    Self {
      name:    name.into(),
      matcher: |_| None,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct InlineComponentRegistry {
  specs: IndexMap<String, Arc<InlineComponentSpec>>,
}

impl InlineComponentRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&mut self, spec: InlineComponentSpec) -> Arc<InlineComponentSpec> {
    let spec = Arc::new(spec);
    self.specs.insert(spec.name.to_string(), spec.clone());
    spec
  }

  pub fn lookup(&self, name: &str) -> Option<Arc<InlineComponentSpec>> {
    self.specs.get(name).cloned()
  }

  /// Like [`Self::lookup`] but failing for unknown names.
  pub fn require(&self, name: &str) -> Result<Arc<InlineComponentSpec>> {
    self
      .lookup(name)
      .ok_or_else(|| ModelError::UnrecognizedComponent {
        name: name.to_string(),
      })
  }

  /// Component recognizing `element`, with its props. A
  /// `data-inline-component` attribute naming a registered component wins
  /// and turns the remaining attributes into props; otherwise the first
  /// custom matcher that accepts the element is used.
  pub fn match_component(
    &self,
    element: &ExternalElement,
  ) -> Option<(Arc<InlineComponentSpec>, ComponentProps)> {
    if let Some(name) = element.attribute("data-inline-component")
      && let Some(spec) = self.lookup(name)
    {
      let props = element
        .attributes
        .iter()
        .filter(|(key, _)| key.as_str() != "data-inline-component")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
      return Some((spec, props));
    }

    self
      .specs
      .values()
      .find_map(|spec| (spec.matcher)(element).map(|props| (spec.clone(), props)))
  }
}
