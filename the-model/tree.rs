//! Arena storage for the document tree.
//!
//! Nodes live in a slot map and refer to each other by [`NodeId`]. Parent
//! links are navigational only; ownership is the arena's. Cloning a [`Tree`]
//! clones every node while keeping ids stable, which is what lets a
//! transaction work on a private copy and still reason about the same nodes.

use indexmap::IndexMap;
use slotmap::HopSlotMap;
use the_core::grapheme::char_to_byte;

use crate::{
  Tendril,
  error::{
    ModelError,
    Result,
  },
  marks::MarkSet,
  node::{
    Node,
    NodeKind,
  },
  position::Path,
};

slotmap::new_key_type! {
  pub struct NodeId;
}

#[derive(Debug, Clone)]
pub struct Tree {
  nodes: HopSlotMap<NodeId, Node>,
  root:  NodeId,
}

impl Tree {
  /// A tree holding a single empty root element.
  pub fn new(root_tag: &str) -> Self {
    let mut nodes = HopSlotMap::with_key();
    let root = nodes.insert(Node::element(root_tag));
    Self { nodes, root }
  }

  #[inline]
  pub fn root(&self) -> NodeId {
    self.root
  }

  pub fn contains(&self, id: NodeId) -> bool {
    self.nodes.contains_key(id)
  }

  pub fn get(&self, id: NodeId) -> Option<&Node> {
    self.nodes.get(id)
  }

  pub fn node(&self, id: NodeId) -> Result<&Node> {
    self
      .nodes
      .get(id)
      .ok_or_else(|| ModelError::illegal(format!("node {id:?} is not part of this tree")))
  }

  pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
    self
      .nodes
      .get_mut(id)
      .ok_or_else(|| ModelError::illegal(format!("node {id:?} is not part of this tree")))
  }

  /// Number of nodes in the arena, attached or not.
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn create_element(&mut self, tag: &str) -> NodeId {
    self.nodes.insert(Node::element(tag))
  }

  pub fn create_text(&mut self, content: &str, marks: MarkSet) -> NodeId {
    self.nodes.insert(Node::text(content, marks))
  }

  pub fn create_inline_component(
    &mut self,
    name: impl Into<Tendril>,
    props: IndexMap<String, String>,
  ) -> NodeId {
    self.nodes.insert(Node::inline_component(name, props))
  }

  pub(crate) fn insert_detached(&mut self, mut node: Node) -> NodeId {
    node.parent = None;
    self.nodes.insert(node)
  }

  /// Creates an element and appends it as the last child of `parent`.
  pub fn append_element(&mut self, parent: NodeId, tag: &str) -> Result<NodeId> {
    let id = self.create_element(tag);
    self.append_child(parent, id)?;
    Ok(id)
  }

  /// Creates an unmarked text node and appends it as the last child of
  /// `parent`.
  pub fn append_text(&mut self, parent: NodeId, content: &str) -> Result<NodeId> {
    let id = self.create_text(content, MarkSet::new());
    self.append_child(parent, id)?;
    Ok(id)
  }

  pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
    let index = self.children(parent)?.len();
    self.insert_children(parent, index, &[child])
  }

  pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
    Ok(self.node(id)?.children())
  }

  pub fn parent(&self, id: NodeId) -> Option<NodeId> {
    self.nodes.get(id).and_then(Node::parent)
  }

  /// Index of `id` in its parent's child list, `None` for detached nodes.
  pub fn index_in_parent(&self, id: NodeId) -> Result<Option<usize>> {
    let Some(parent) = self.node(id)?.parent else {
      return Ok(None);
    };
    let index = self
      .children(parent)?
      .iter()
      .position(|child| *child == id)
      .ok_or_else(|| ModelError::illegal(format!("node {id:?} missing from its parent")))?;
    Ok(Some(index))
  }

  pub fn offset_size(&self, id: NodeId) -> Result<usize> {
    Ok(self.node(id)?.offset_size())
  }

  /// Sum of the children's offset sizes for elements, the char length for
  /// text. Inline components are atomic and have no inner offsets.
  pub fn max_offset(&self, id: NodeId) -> Result<usize> {
    let node = self.node(id)?;
    match node.kind() {
      NodeKind::Element(element) => {
        element
          .children()
          .iter()
          .map(|child| self.offset_size(*child))
          .sum()
      },
      NodeKind::Text(text) => Ok(text.len()),
      NodeKind::InlineComponent(_) => Ok(0),
    }
  }

  /// Offset in `parent` at which the child with index `index` starts.
  pub fn offset_of_child(&self, parent: NodeId, index: usize) -> Result<usize> {
    let children = self.children(parent)?;
    children[..index.min(children.len())]
      .iter()
      .map(|child| self.offset_size(*child))
      .sum()
  }

  /// Offset in its parent at which `id` starts.
  pub fn start_offset(&self, id: NodeId) -> Result<usize> {
    let parent = self
      .parent(id)
      .ok_or_else(|| ModelError::illegal(format!("node {id:?} has no parent")))?;
    let index = self.index_in_parent(id)?.unwrap_or_default();
    self.offset_of_child(parent, index)
  }

  /// The non-empty child covering `offset`, as `(index, start offset)`.
  pub fn child_at_offset(&self, parent: NodeId, offset: usize) -> Result<Option<(usize, usize)>> {
    let mut start = 0;
    for (index, child) in self.children(parent)?.iter().enumerate() {
      let size = self.offset_size(*child)?;
      if start <= offset && offset < start + size {
        return Ok(Some((index, start)));
      }
      start += size;
    }
    Ok(None)
  }

  /// The element child starting at `offset`.
  pub fn element_child_at(&self, parent: NodeId, offset: usize) -> Result<NodeId> {
    match self.child_at_offset(parent, offset)? {
      Some((index, _)) => {
        let child = self.children(parent)?[index];
        if self.node(child)?.is_element() {
          Ok(child)
        } else {
          Err(ModelError::type_assertion(
            child,
            format!("expected an element at offset {offset}"),
          ))
        }
      },
      None => {
        Err(ModelError::illegal(format!(
          "no child at offset {offset} of {parent:?}"
        )))
      },
    }
  }

  /// Makes sure a child boundary exists at `offset` of `parent`, splitting a
  /// text node if needed, and returns the index of the first child at or
  /// after that boundary.
  pub fn split_at_offset(&mut self, parent: NodeId, offset: usize) -> Result<usize> {
    let mut start = 0;
    let children = self.children(parent)?.to_vec();
    for (index, child) in children.iter().enumerate() {
      if start == offset {
        return Ok(index);
      }
      let size = self.offset_size(*child)?;
      if offset < start + size {
        self.split_text(*child, offset - start)?;
        return Ok(index + 1);
      }
      start += size;
    }
    if start == offset {
      Ok(children.len())
    } else {
      Err(ModelError::illegal(format!(
        "offset {offset} exceeds max offset {start} of {parent:?}"
      )))
    }
  }

  /// Splits the text node `id` at char `index`. The original node keeps the
  /// head and a new sibling with the same marks and attributes receives the
  /// tail.
  pub fn split_text(&mut self, id: NodeId, index: usize) -> Result<NodeId> {
    let node = self.node(id)?;
    let text = node
      .as_text()
      .ok_or_else(|| ModelError::type_assertion(id, "only text nodes can be split at an index"))?;
    if index > text.len() {
      return Err(ModelError::illegal(format!(
        "split index {index} exceeds text length {}",
        text.len()
      )));
    }
    let byte = char_to_byte(text.content(), index);
    let tail = text.content()[byte..].to_string();
    let head = text.content()[..byte].to_string();

    let mut sibling = node.shallow_clone();
    if let Some(text) = sibling.as_text_mut() {
      text.set_content(tail);
    }
    if let Some(text) = self.node_mut(id)?.as_text_mut() {
      text.set_content(head);
    }

    let sibling = self.nodes.insert(sibling);
    if let Some(parent) = self.parent(id) {
      let at = self.index_in_parent(id)?.unwrap_or_default() + 1;
      self.insert_children(parent, at, &[sibling])?;
    }
    Ok(sibling)
  }

  /// Inserts detached nodes into `parent` before the child at `index`.
  pub fn insert_children(&mut self, parent: NodeId, index: usize, nodes: &[NodeId]) -> Result<()> {
    for node in nodes {
      if self.node(*node)?.parent.is_some() {
        return Err(ModelError::illegal(format!(
          "node {node:?} is already attached"
        )));
      }
      if *node == parent || self.is_ancestor(*node, parent) || *node == self.root {
        return Err(ModelError::illegal(format!(
          "node {node:?} cannot be inserted inside itself"
        )));
      }
    }

    let element = self
      .node_mut(parent)?
      .as_element_mut()
      .ok_or_else(|| ModelError::type_assertion(parent, "only elements have children"))?;
    if index > element.children.len() {
      return Err(ModelError::illegal(format!(
        "child index {index} out of bounds"
      )));
    }
    for (shift, node) in nodes.iter().enumerate() {
      element.children.insert(index + shift, *node);
    }
    for node in nodes {
      self.node_mut(*node)?.parent = Some(parent);
    }
    Ok(())
  }

  /// Removes `id` from its parent's child list, keeping it in the arena.
  pub fn detach(&mut self, id: NodeId) -> Result<()> {
    let Some(parent) = self.node(id)?.parent else {
      return Ok(());
    };
    if let Some(element) = self.node_mut(parent)?.as_element_mut() {
      element.children.retain(|child| *child != id);
    }
    self.node_mut(id)?.parent = None;
    Ok(())
  }

  /// Detaches `id` and frees it together with all of its descendants.
  pub fn remove_subtree(&mut self, id: NodeId) -> Result<()> {
    if id == self.root {
      return Err(ModelError::illegal("the root node cannot be removed"));
    }
    self.detach(id)?;
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
      if let Some(node) = self.nodes.remove(current) {
        stack.extend_from_slice(node.children());
      }
    }
    Ok(())
  }

  /// Detached copy of the subtree rooted at `id`, with fresh ids.
  pub fn deep_clone_subtree(&mut self, id: NodeId) -> Result<NodeId> {
    let copy = self.node(id)?.shallow_clone();
    let children = self.children(id)?.to_vec();
    let copy = self.nodes.insert(copy);
    for child in children {
      let child_copy = self.deep_clone_subtree(child)?;
      self.append_child(copy, child_copy)?;
    }
    Ok(copy)
  }

  /// Concatenated content of every text node below `id`.
  pub fn text_content(&self, id: NodeId) -> Result<String> {
    let mut content = String::new();
    for node in std::iter::once(id).chain(self.descendants(id)?) {
      if let Some(text) = self.node(node)?.as_text() {
        content.push_str(text.content());
      }
    }
    Ok(content)
  }

  /// Path of child offsets from the root to the element `id`. The root has
  /// an empty path.
  pub fn path_to(&self, id: NodeId) -> Result<Path> {
    let mut path = Path::new();
    let mut current = id;
    while let Some(parent) = self.node(current)?.parent {
      path.push(self.start_offset(current)?);
      current = parent;
    }
    if current != self.root {
      return Err(ModelError::illegal(format!(
        "node {id:?} is not attached to the root"
      )));
    }
    path.reverse();
    Ok(path)
  }

  /// Resolves a path of element offsets starting at the root.
  pub fn element_at_path(&self, path: &[usize]) -> Result<NodeId> {
    let mut current = self.root;
    for offset in path {
      current = self.element_child_at(current, *offset).map_err(|_| {
        ModelError::InvalidPosition {
          path: path.iter().copied().collect(),
        }
      })?;
    }
    Ok(current)
  }

  /// Parent, grandparent and so on up to the root.
  pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(self.parent(id), |current| self.parent(*current))
  }

  /// Every node below `id` in pre-order, excluding `id` itself.
  pub fn descendants(&self, id: NodeId) -> Result<Vec<NodeId>> {
    let mut result = Vec::new();
    let mut stack: Vec<NodeId> = self.children(id)?.iter().rev().copied().collect();
    while let Some(current) = stack.pop() {
      result.push(current);
      stack.extend(self.children(current)?.iter().rev());
    }
    Ok(result)
  }

  /// Whether `ancestor` is a strict ancestor of `node`.
  pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
    self.ancestors(node).any(|current| current == ancestor)
  }

  /// Merges mergeable neighbouring text nodes among the children of `parent`
  /// with indices in `from..to`. Offsets are unaffected.
  pub fn merge_text_nodes(&mut self, parent: NodeId, from: usize, to: usize) -> Result<()> {
    let mut index = from;
    let mut end = to.min(self.children(parent)?.len());
    while index + 1 < end {
      let children = self.children(parent)?;
      let (left, right) = (children[index], children[index + 1]);
      if self.node(left)?.is_mergeable_with(self.node(right)?) {
        let tail = self
          .node(right)?
          .as_text()
          .map(|text| text.content().to_string())
          .unwrap_or_default();
        if let Some(text) = self.node_mut(left)?.as_text_mut() {
          let mut content = text.content().to_string();
          content.push_str(&tail);
          text.set_content(content);
        }
        self.remove_subtree(right)?;
        end -= 1;
      } else {
        index += 1;
      }
    }
    Ok(())
  }

  pub fn set_attribute(&mut self, id: NodeId, key: &str, value: &str) -> Result<Option<String>> {
    Ok(
      self
        .node_mut(id)?
        .attributes
        .insert(key.to_string(), value.to_string()),
    )
  }

  pub fn remove_attribute(&mut self, id: NodeId, key: &str) -> Result<Option<String>> {
    Ok(self.node_mut(id)?.attributes.shift_remove(key))
  }

  pub(crate) fn set_text_content(&mut self, id: NodeId, content: String) -> Result<()> {
    let text = self
      .node_mut(id)?
      .as_text_mut()
      .ok_or_else(|| ModelError::type_assertion(id, "expected a text node"))?;
    text.set_content(content);
    Ok(())
  }

  pub(crate) fn marks_mut(&mut self, id: NodeId) -> Result<&mut MarkSet> {
    let text = self
      .node_mut(id)?
      .as_text_mut()
      .ok_or_else(|| ModelError::type_assertion(id, "only text nodes carry marks"))?;
    Ok(&mut text.marks)
  }

  /// Checks the parent/child invariants of everything reachable from the
  /// root.
  pub fn validate(&self) -> Result<()> {
    let mut stack = vec![self.root];
    while let Some(current) = stack.pop() {
      let node = self.node(current)?;
      if node.is_text() && !node.children().is_empty() {
        return Err(ModelError::illegal(format!("text node {current:?} has children")));
      }
      for child in node.children() {
        if self.node(*child)?.parent != Some(current) {
          return Err(ModelError::illegal(format!(
            "child {child:?} does not point back to {current:?}"
          )));
        }
        if node.children().iter().filter(|other| *other == child).count() != 1 {
          return Err(ModelError::illegal(format!(
            "child {child:?} appears more than once"
          )));
        }
        stack.push(*child);
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> (Tree, NodeId, NodeId) {
    let mut tree = Tree::new("div");
    let root = tree.root();
    let p = tree.append_element(root, "p").unwrap();
    tree.append_text(p, "hello").unwrap();
    tree.append_element(p, "br").unwrap();
    tree.append_text(p, "world").unwrap();
    (tree, root, p)
  }

  #[test]
  fn max_offset_sums_children() {
    let (tree, root, p) = sample();
    assert_eq!(tree.max_offset(p).unwrap(), 11);
    assert_eq!(tree.max_offset(root).unwrap(), 1);
    assert_eq!(tree.offset_of_child(p, 2).unwrap(), 6);
    assert_eq!(tree.child_at_offset(p, 5).unwrap(), Some((1, 5)));
    assert_eq!(tree.child_at_offset(p, 11).unwrap(), None);
    tree.validate().unwrap();
  }

  #[test]
  fn split_at_offset_splits_text() {
    let (mut tree, _, p) = sample();
    let index = tree.split_at_offset(p, 2).unwrap();
    assert_eq!(index, 1);
    assert_eq!(tree.children(p).unwrap().len(), 4);
    assert_eq!(tree.max_offset(p).unwrap(), 11);
    assert_eq!(tree.text_content(p).unwrap(), "helloworld");

    // Existing boundaries are reused.
    assert_eq!(tree.split_at_offset(p, 5).unwrap(), 2);
    assert_eq!(tree.split_at_offset(p, 11).unwrap(), 4);
    assert!(tree.split_at_offset(p, 12).is_err());
    tree.validate().unwrap();
  }

  #[test]
  fn paths_resolve_back_to_elements() {
    let mut tree = Tree::new("div");
    let root = tree.root();
    tree.append_text(root, "ab").unwrap();
    let ul = tree.append_element(root, "ul").unwrap();
    let li = tree.append_element(ul, "li").unwrap();
    let second = tree.append_element(ul, "li").unwrap();

    assert_eq!(tree.path_to(root).unwrap().as_slice(), &[] as &[usize]);
    assert_eq!(tree.path_to(second).unwrap().as_slice(), &[2, 1]);
    assert_eq!(tree.element_at_path(&[2, 0]).unwrap(), li);
    assert!(matches!(
      tree.element_at_path(&[1]),
      Err(ModelError::InvalidPosition { .. })
    ));
  }

  #[test]
  fn merging_respects_mergeability() {
    let mut tree = Tree::new("p");
    let root = tree.root();
    tree.append_text(root, "a").unwrap();
    tree.append_text(root, "b").unwrap();
    let span = tree.append_element(root, "span").unwrap();
    tree.append_text(root, "c").unwrap();
    tree.merge_text_nodes(root, 0, 4).unwrap();

    let children = tree.children(root).unwrap();
    assert_eq!(children.len(), 3);
    assert_eq!(children[1], span);
    assert_eq!(tree.text_content(root).unwrap(), "abc");
  }

  #[test]
  fn remove_subtree_frees_descendants() {
    let (mut tree, root, p) = sample();
    let before = tree.len();
    tree.remove_subtree(p).unwrap();
    assert_eq!(tree.len(), before - 4);
    assert!(tree.children(root).unwrap().is_empty());
    assert!(tree.remove_subtree(root).is_err());
  }

  #[test]
  fn nodes_cannot_be_attached_twice_or_inside_themselves() {
    let (mut tree, root, p) = sample();
    assert!(tree.append_child(root, p).is_err());
    tree.detach(p).unwrap();
    let text = tree.children(p).unwrap()[0];
    assert!(tree.append_child(text, p).is_err());
    tree.append_child(root, p).unwrap();
    tree.validate().unwrap();
  }

  #[test]
  fn deep_clone_copies_structure() {
    let (mut tree, root, p) = sample();
    let copy = tree.deep_clone_subtree(p).unwrap();
    assert_ne!(copy, p);
    assert_eq!(tree.parent(copy), None);
    tree.append_child(root, copy).unwrap();
    assert_eq!(tree.text_content(root).unwrap(), "helloworldhelloworld");
    tree.validate().unwrap();
  }

  #[test]
  fn cloned_trees_share_ids_but_not_nodes() {
    let (tree, _, p) = sample();
    let mut copy = tree.clone();
    let text = copy.children(p).unwrap()[0];
    copy.set_text_content(text, "bye".to_string()).unwrap();
    assert_eq!(tree.text_content(p).unwrap(), "helloworld");
    assert_eq!(copy.text_content(p).unwrap(), "byeworld");
  }
}
