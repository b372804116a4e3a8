//! Tree coordinates.
//!
//! A [`Position`] is a path of offsets from the root: every component but the
//! last selects an element child by the offset it starts at, and the last one
//! is an offset inside the element reached that way. Text nodes never appear
//! as path components; a point inside a text node is an offset in its parent
//! that falls within the text's span. Positions are plain values, valid only
//! against the tree version they were computed on.
//!
//! Ordering positions by their path compares them in document order.

use smallvec::SmallVec;
use the_core::grapheme::visible_graphemes;

use crate::{
  error::{
    ModelError,
    Result,
  },
  node::NodeKind,
  tree::{
    NodeId,
    Tree,
  },
};

pub type Path = SmallVec<[usize; 8]>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
  path: Path,
}

impl Position {
  /// Wraps a raw path without checking it against a tree. Paths must have
  /// at least one component.
  pub fn new(path: impl Into<Path>) -> Self {
    let mut path = path.into();
    if path.is_empty() {
      path.push(0);
    }
    Self { path }
  }

  /// Wraps a raw path after checking that it addresses a point in `tree`.
  pub fn from_path(tree: &Tree, path: &[usize]) -> Result<Self> {
    let position = Self::new(Path::from_slice(path));
    position.validate(tree)?;
    Ok(position)
  }

  pub fn from_in_element(tree: &Tree, element: NodeId, offset: usize) -> Result<Self> {
    if !tree.node(element)?.is_element() {
      return Err(ModelError::type_assertion(element, "expected an element"));
    }
    let max = tree.max_offset(element)?;
    if offset > max {
      return Err(ModelError::illegal(format!(
        "offset {offset} exceeds max offset {max}"
      )));
    }
    let mut path = tree.path_to(element)?;
    path.push(offset);
    Ok(Self { path })
  }

  pub fn from_in_text_node(tree: &Tree, text: NodeId, index: usize) -> Result<Self> {
    let len = tree
      .node(text)?
      .as_text()
      .ok_or_else(|| ModelError::type_assertion(text, "expected a text node"))?
      .len();
    if index > len {
      return Err(ModelError::illegal(format!(
        "index {index} exceeds text length {len}"
      )));
    }
    let parent = parent_of(tree, text)?;
    let offset = tree.start_offset(text)? + index;
    let mut path = tree.path_to(parent)?;
    path.push(offset);
    Ok(Self { path })
  }

  /// Dispatches on the node kind: elements take an offset, text nodes a char
  /// index.
  pub fn from_in_node(tree: &Tree, node: NodeId, offset: usize) -> Result<Self> {
    match tree.node(node)?.kind() {
      NodeKind::Element(_) => Self::from_in_element(tree, node, offset),
      NodeKind::Text(_) => Self::from_in_text_node(tree, node, offset),
      NodeKind::InlineComponent(_) => {
        Err(ModelError::type_assertion(
          node,
          "inline components have no inner positions",
        ))
      },
    }
  }

  pub fn from_before_node(tree: &Tree, node: NodeId) -> Result<Self> {
    let parent = parent_of(tree, node)?;
    let mut path = tree.path_to(parent)?;
    path.push(tree.start_offset(node)?);
    Ok(Self { path })
  }

  pub fn from_after_node(tree: &Tree, node: NodeId) -> Result<Self> {
    let parent = parent_of(tree, node)?;
    let mut path = tree.path_to(parent)?;
    path.push(tree.start_offset(node)? + tree.offset_size(node)?);
    Ok(Self { path })
  }

  pub fn path(&self) -> &[usize] {
    &self.path
  }

  /// Number of path components; a position directly in the root has depth 1.
  pub fn depth(&self) -> usize {
    self.path.len()
  }

  /// Offset inside the parent element.
  pub fn parent_offset(&self) -> usize {
    self.path[self.path.len() - 1]
  }

  /// Path of the parent element.
  pub fn parent_path(&self) -> &[usize] {
    &self.path[..self.path.len() - 1]
  }

  /// Element this position is an offset of.
  pub fn parent(&self, tree: &Tree) -> Result<NodeId> {
    tree
      .element_at_path(self.parent_path())
      .map_err(|err| match err {
        ModelError::InvalidPosition { .. } => self.invalid(),
        other => other,
      })
  }

  fn invalid(&self) -> ModelError {
    ModelError::InvalidPosition {
      path: self.path.clone(),
    }
  }

  /// Same parent, different offset.
  pub fn with_offset(&self, offset: usize) -> Self {
    let mut path = self.path.clone();
    let last = path.len() - 1;
    path[last] = offset;
    Self { path }
  }

  /// Longest path shared by the parent paths of both positions, which is the
  /// path of their deepest common ancestor element.
  pub fn common_ancestor_path(&self, other: &Position) -> Path {
    self
      .parent_path()
      .iter()
      .zip(other.parent_path())
      .take_while(|(a, b)| a == b)
      .map(|(a, _)| *a)
      .collect()
  }

  /// Checks that every path component is reachable and in bounds.
  pub fn validate(&self, tree: &Tree) -> Result<NodeId> {
    let parent = self.parent(tree)?;
    if self.parent_offset() > tree.max_offset(parent)? {
      return Err(self.invalid());
    }
    Ok(parent)
  }

  /// The node ending at or spanning this position from the left. Inside a
  /// text node that is the text node itself.
  pub fn node_before(&self, tree: &Tree) -> Result<Option<NodeId>> {
    let parent = self.validate(tree)?;
    let offset = self.parent_offset();
    if offset == 0 {
      return Ok(None);
    }
    match tree.child_at_offset(parent, offset - 1)? {
      Some((index, _)) => Ok(Some(tree.children(parent)?[index])),
      None => Ok(None),
    }
  }

  /// The node starting at or spanning this position from the right.
  pub fn node_after(&self, tree: &Tree) -> Result<Option<NodeId>> {
    let parent = self.validate(tree)?;
    match tree.child_at_offset(parent, self.parent_offset())? {
      Some((index, _)) => Ok(Some(tree.children(parent)?[index])),
      None => Ok(None),
    }
  }

  /// The text node strictly containing this position and the char index in
  /// it.
  pub fn text_index(&self, tree: &Tree) -> Result<Option<(NodeId, usize)>> {
    let parent = self.validate(tree)?;
    let offset = self.parent_offset();
    if let Some((index, start)) = tree.child_at_offset(parent, offset)? {
      let child = tree.children(parent)?[index];
      if start < offset && tree.node(child)?.is_text() {
        return Ok(Some((child, offset - start)));
      }
    }
    Ok(None)
  }

  pub fn is_inside_text(&self, tree: &Tree) -> Result<bool> {
    Ok(self.text_index(tree)?.is_some())
  }

  /// Moves `steps` visible units forward (positive) or backward (negative).
  /// A unit is a rendered grapheme cluster, an inline component, a childless
  /// inline element such as a line break, or an empty block. Invisible
  /// placeholder chars are stepped over together with their neighbours and
  /// grapheme clusters are never split. Walking past either end of the
  /// document clamps.
  pub fn shifted_visually(&self, tree: &Tree, steps: isize) -> Result<Position> {
    self.validate(tree)?;
    if steps == 0 {
      return Ok(self.clone());
    }

    let stops = visual_stops(tree)?;
    let count = steps.unsigned_abs();
    if steps > 0 {
      let Some(first) = stops.iter().position(|stop| stop.lo > *self) else {
        return Ok(self.clone());
      };
      let index = (first + count - 1).min(stops.len() - 1);
      Ok(stops[index].hi.clone())
    } else {
      let Some(last) = stops.iter().rposition(|stop| stop.hi < *self) else {
        return Ok(self.clone());
      };
      let index = last.saturating_sub(count - 1);
      Ok(stops[index].lo.clone())
    }
  }
}

fn parent_of(tree: &Tree, node: NodeId) -> Result<NodeId> {
  tree
    .parent(node)
    .ok_or_else(|| ModelError::illegal(format!("node {node:?} has no parent")))
}

/// A visual caret stop. Positions from `lo` to `hi` render at the same spot,
/// e.g. both sides of an invisible placeholder.
#[derive(Debug, Clone)]
struct VisualStop {
  lo: Position,
  hi: Position,
}

fn push_stop(stops: &mut Vec<VisualStop>, lo: Position, hi: Position) {
  match stops.last_mut() {
    Some(last) if lo <= last.hi => {
      if hi > last.hi {
        last.hi = hi;
      }
    },
    _ => stops.push(VisualStop { lo, hi }),
  }
}

/// Caret stops of the whole document in document order.
fn visual_stops(tree: &Tree) -> Result<Vec<VisualStop>> {
  let mut stops = Vec::new();
  collect_stops(tree, tree.root(), &mut Path::new(), &mut stops)?;
  Ok(stops)
}

fn collect_stops(
  tree: &Tree,
  element: NodeId,
  path: &mut Path,
  stops: &mut Vec<VisualStop>,
) -> Result<()> {
  let at = |path: &Path, offset: usize| {
    let mut path = path.clone();
    path.push(offset);
    Position { path }
  };

  let node = tree.node(element)?;
  if node.children().is_empty() {
    push_stop(stops, at(path, 0), at(path, 0));
    return Ok(());
  }

  let mut start = 0;
  for child in node.children() {
    let child_node = tree.node(*child)?;
    match child_node.kind() {
      NodeKind::Text(text) => {
        let mut lo = 0;
        for (span_start, span_end) in visible_graphemes(text.content()) {
          push_stop(stops, at(path, start + lo), at(path, start + span_start));
          lo = span_end;
        }
        push_stop(stops, at(path, start + lo), at(path, start + text.len()));
      },
      NodeKind::Element(_) if !child_node.children().is_empty() || child_node.is_block() => {
        path.push(start);
        collect_stops(tree, *child, path, stops)?;
        path.pop();
      },
      NodeKind::Element(_) | NodeKind::InlineComponent(_) => {
        push_stop(stops, at(path, start), at(path, start));
        push_stop(stops, at(path, start + 1), at(path, start + 1));
      },
    }
    start += child_node.offset_size();
  }
  Ok(())
}
