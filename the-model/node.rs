//! Document tree nodes.
//!
//! A [`Node`] is one of three kinds: an [`Element`] that owns an ordered list
//! of children, a [`Text`] run carrying a [`MarkSet`], or an atomic
//! [`InlineComponent`]. Parent links are plain arena indices and never own
//! anything.

use indexmap::IndexMap;
use the_core::grapheme::len_chars;

use crate::{
  Tendril,
  marks::MarkSet,
  rdfa::RdfaAttributes,
  tree::NodeId,
};

pub type Attributes = IndexMap<String, String>;

/// HTML tags that render as their own block.
pub const BLOCK_TAGS: &[&str] = &[
  "address",
  "article",
  "aside",
  "blockquote",
  "body",
  "dd",
  "details",
  "dialog",
  "div",
  "dl",
  "dt",
  "fieldset",
  "figcaption",
  "figure",
  "footer",
  "form",
  "h1",
  "h2",
  "h3",
  "h4",
  "h5",
  "h6",
  "header",
  "hgroup",
  "hr",
  "li",
  "main",
  "nav",
  "ol",
  "p",
  "pre",
  "section",
  "table",
  "tbody",
  "td",
  "tfoot",
  "th",
  "thead",
  "tr",
  "ul",
];

pub const LINE_BREAK_TAG: &str = "br";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
  pub(crate) tag:      Tendril,
  pub(crate) children: Vec<NodeId>,
}

impl Element {
  pub fn tag(&self) -> &str {
    self.tag.as_str()
  }

  pub fn children(&self) -> &[NodeId] {
    &self.children
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
  content:   String,
  len_chars: usize,
  pub(crate) marks: MarkSet,
}

impl Text {
  pub fn new(content: impl Into<String>, marks: MarkSet) -> Self {
    let content = content.into();
    let len_chars = len_chars(&content);
    Self {
      content,
      len_chars,
      marks,
    }
  }

  pub fn content(&self) -> &str {
    &self.content
  }

  /// Length in chars, which is the offset size of a text node.
  pub fn len(&self) -> usize {
    self.len_chars
  }

  pub fn is_empty(&self) -> bool {
    self.len_chars == 0
  }

  pub fn marks(&self) -> &MarkSet {
    &self.marks
  }

  pub(crate) fn set_content(&mut self, content: String) {
    self.len_chars = len_chars(&content);
    self.content = content;
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineComponent {
  pub(crate) name:  Tendril,
  pub(crate) props: IndexMap<String, String>,
}

impl InlineComponent {
  pub fn name(&self) -> &str {
    self.name.as_str()
  }

  pub fn props(&self) -> &IndexMap<String, String> {
    &self.props
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
  Element(Element),
  Text(Text),
  InlineComponent(InlineComponent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
  pub(crate) parent:     Option<NodeId>,
  pub(crate) attributes: Attributes,
  pub(crate) kind:       NodeKind,
}

impl Node {
  pub fn element(tag: impl Into<Tendril>) -> Self {
    Self::new(NodeKind::Element(Element {
      tag:      tag.into(),
      children: Vec::new(),
    }))
  }

  pub fn text(content: impl Into<String>, marks: MarkSet) -> Self {
    Self::new(NodeKind::Text(Text::new(content, marks)))
  }

  pub fn inline_component(name: impl Into<Tendril>, props: IndexMap<String, String>) -> Self {
    Self::new(NodeKind::InlineComponent(InlineComponent {
      name: name.into(),
      props,
    }))
  }

  fn new(kind: NodeKind) -> Self {
    Self {
      parent: None,
      attributes: Attributes::new(),
      kind,
    }
  }

  pub fn kind(&self) -> &NodeKind {
    &self.kind
  }

  pub fn parent(&self) -> Option<NodeId> {
    self.parent
  }

  pub fn attributes(&self) -> &Attributes {
    &self.attributes
  }

  pub fn attribute(&self, key: &str) -> Option<&str> {
    self.attributes.get(key).map(String::as_str)
  }

  /// RDFa projection of the reserved attribute keys.
  pub fn rdfa(&self) -> RdfaAttributes {
    RdfaAttributes::from_attributes(&self.attributes)
  }

  /// 1 for elements and inline components, the char length for text.
  pub fn offset_size(&self) -> usize {
    match &self.kind {
      NodeKind::Element(_) | NodeKind::InlineComponent(_) => 1,
      NodeKind::Text(text) => text.len(),
    }
  }

  #[inline]
  pub fn is_element(&self) -> bool {
    matches!(self.kind, NodeKind::Element(_))
  }

  #[inline]
  pub fn is_text(&self) -> bool {
    matches!(self.kind, NodeKind::Text(_))
  }

  #[inline]
  pub fn is_inline_component(&self) -> bool {
    matches!(self.kind, NodeKind::InlineComponent(_))
  }

  pub fn as_element(&self) -> Option<&Element> {
    match &self.kind {
      NodeKind::Element(element) => Some(element),
      _ => None,
    }
  }

  pub(crate) fn as_element_mut(&mut self) -> Option<&mut Element> {
    match &mut self.kind {
      NodeKind::Element(element) => Some(element),
      _ => None,
    }
  }

  pub fn as_text(&self) -> Option<&Text> {
    match &self.kind {
      NodeKind::Text(text) => Some(text),
      _ => None,
    }
  }

  pub(crate) fn as_text_mut(&mut self) -> Option<&mut Text> {
    match &mut self.kind {
      NodeKind::Text(text) => Some(text),
      _ => None,
    }
  }

  pub fn as_inline_component(&self) -> Option<&InlineComponent> {
    match &self.kind {
      NodeKind::InlineComponent(component) => Some(component),
      _ => None,
    }
  }

  /// Element tag, `None` for text and inline components.
  pub fn tag(&self) -> Option<&str> {
    self.as_element().map(Element::tag)
  }

  pub fn has_tag(&self, tag: &str) -> bool {
    self.tag().is_some_and(|own| own.eq_ignore_ascii_case(tag))
  }

  pub fn children(&self) -> &[NodeId] {
    match &self.kind {
      NodeKind::Element(element) => &element.children,
      NodeKind::Text(_) | NodeKind::InlineComponent(_) => &[],
    }
  }

  pub fn is_block(&self) -> bool {
    self
      .tag()
      .is_some_and(|tag| BLOCK_TAGS.iter().any(|block| block.eq_ignore_ascii_case(tag)))
  }

  pub fn is_line_break(&self) -> bool {
    self.has_tag(LINE_BREAK_TAG)
  }

  /// Two text nodes can be merged into one when they carry the same marks
  /// and the same attributes. Elements and components never merge.
  pub fn is_mergeable_with(&self, other: &Node) -> bool {
    match (&self.kind, &other.kind) {
      (NodeKind::Text(left), NodeKind::Text(right)) => {
        left.marks == right.marks && self.attributes == other.attributes
      },
      _ => false,
    }
  }

  /// Copy of this node without children or parent.
  pub(crate) fn shallow_clone(&self) -> Self {
    let kind = match &self.kind {
      NodeKind::Element(element) => {
        NodeKind::Element(Element {
          tag:      element.tag.clone(),
          children: Vec::new(),
        })
      },
      NodeKind::Text(text) => NodeKind::Text(text.clone()),
      NodeKind::InlineComponent(component) => NodeKind::InlineComponent(component.clone()),
    };
    Self {
      parent: None,
      attributes: self.attributes.clone(),
      kind,
    }
  }
}
