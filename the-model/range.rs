use indexmap::IndexSet;
use the_core::grapheme::char_to_byte;

use crate::{
  error::{
    ModelError,
    Result,
  },
  position::{
    Path,
    Position,
  },
  tree::{
    NodeId,
    Tree,
  },
};

/// Which nodes count as the context of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextStrategy {
  /// Nodes lying completely inside the range.
  RangeContains,
  /// Nodes the range lies completely inside of.
  RangeIsInside,
  /// Every node the range overlaps, partially or completely.
  RangeTouches,
}

/// An ordered pair of positions, `start <= end` in document order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Range {
  start: Position,
  end:   Position,
}

impl Range {
  pub fn new(start: Position, end: Position) -> Result<Self> {
    if end < start {
      return Err(ModelError::MisbehavedRange {
        start: start.path().iter().copied().collect(),
        end:   end.path().iter().copied().collect(),
      });
    }
    Ok(Self { start, end })
  }

  /// Builds a range from two ends, clamping `end` to `start` when it lies
  /// before it.
  pub(crate) fn ordered(start: Position, end: Position) -> Self {
    let end = if end < start { start.clone() } else { end };
    Self { start, end }
  }

  pub fn collapsed(position: Position) -> Self {
    Self {
      start: position.clone(),
      end:   position,
    }
  }

  pub fn from_in_element(tree: &Tree, element: NodeId, start: usize, end: usize) -> Result<Self> {
    Self::new(
      Position::from_in_element(tree, element, start)?,
      Position::from_in_element(tree, element, end)?,
    )
  }

  pub fn from_in_text_node(tree: &Tree, text: NodeId, start: usize, end: usize) -> Result<Self> {
    Self::new(
      Position::from_in_text_node(tree, text, start)?,
      Position::from_in_text_node(tree, text, end)?,
    )
  }

  /// From right before `node` to right after it.
  pub fn from_around_node(tree: &Tree, node: NodeId) -> Result<Self> {
    Self::new(
      Position::from_before_node(tree, node)?,
      Position::from_after_node(tree, node)?,
    )
  }

  /// Spans all children of `element`.
  pub fn from_children(tree: &Tree, element: NodeId) -> Result<Self> {
    Self::from_in_element(tree, element, 0, tree.max_offset(element)?)
  }

  pub fn start(&self) -> &Position {
    &self.start
  }

  pub fn end(&self) -> &Position {
    &self.end
  }

  pub fn is_collapsed(&self) -> bool {
    self.start == self.end
  }

  /// Start and end share the same parent element.
  pub fn is_confined(&self) -> bool {
    self.start.parent_path() == self.end.parent_path()
  }

  pub fn collapse(&self, to_start: bool) -> Self {
    let position = if to_start { &self.start } else { &self.end };
    Self::collapsed(position.clone())
  }

  /// Deepest element containing both ends.
  pub fn common_ancestor(&self, tree: &Tree) -> Result<NodeId> {
    tree.element_at_path(&self.start.common_ancestor_path(&self.end))
  }

  /// The common ancestor and its ancestors that satisfy `predicate`,
  /// innermost first.
  pub fn find_common_ancestors_where(
    &self,
    tree: &Tree,
    predicate: impl Fn(&Tree, NodeId) -> bool,
  ) -> Result<Vec<NodeId>> {
    let common = self.common_ancestor(tree)?;
    Ok(
      std::iter::once(common)
        .chain(tree.ancestors(common))
        .filter(|node| predicate(tree, *node))
        .collect(),
    )
  }

  /// Decomposes the range into confined ranges whose concatenation covers
  /// exactly the same content: up the start's ancestors to the common
  /// ancestor, across it, then down to the end. Empty pieces are dropped. A
  /// confined range is returned as is.
  pub fn minimum_confined_ranges(&self, tree: &Tree) -> Result<Vec<Range>> {
    if self.is_confined() {
      return Ok(vec![self.clone()]);
    }

    let depth = self.start.common_ancestor_path(&self.end).len() + 1;
    let mut ranges = Vec::new();

    let mut start = self.start.clone();
    while start.depth() > depth {
      let parent = start.parent(tree)?;
      let end_of_parent = start.with_offset(tree.max_offset(parent)?);
      ranges.push(Range {
        start: start.clone(),
        end:   end_of_parent,
      });
      let mut after_parent = Path::from_slice(start.parent_path());
      let last = after_parent.len() - 1;
      after_parent[last] += 1;
      start = Position::new(after_parent);
    }

    let mut tail = Vec::new();
    let mut end = self.end.clone();
    while end.depth() > depth {
      tail.push(Range {
        start: end.with_offset(0),
        end:   end.clone(),
      });
      end = Position::new(Path::from_slice(end.parent_path()));
    }

    ranges.push(Range::new(start, end)?);
    ranges.extend(tail.into_iter().rev());
    ranges.retain(|range| !range.is_collapsed());
    Ok(ranges)
  }

  /// Nodes lying completely inside the range, in document order, including
  /// descendants.
  pub fn contained_nodes(&self, tree: &Tree) -> Result<Vec<NodeId>> {
    let mut nodes = Vec::new();
    for range in self.minimum_confined_ranges(tree)? {
      let (from, to) = (range.start.parent_offset(), range.end.parent_offset());
      if from == to {
        continue;
      }
      let parent = range.start.parent(tree)?;
      let mut offset = 0;
      for child in tree.children(parent)? {
        let size = tree.offset_size(*child)?;
        if offset >= from && offset + size <= to {
          nodes.push(*child);
          nodes.extend(tree.descendants(*child)?);
        }
        offset += size;
      }
    }
    Ok(nodes)
  }

  pub fn context_nodes(&self, tree: &Tree, strategy: ContextStrategy) -> Result<Vec<NodeId>> {
    match strategy {
      ContextStrategy::RangeContains => self.contained_nodes(tree),
      ContextStrategy::RangeIsInside => {
        let mut nodes = Vec::new();
        if self.is_confined() {
          let parent = self.start.parent(tree)?;
          let (from, to) = (self.start.parent_offset(), self.end.parent_offset());
          if let Some((index, start)) = tree.child_at_offset(parent, from)? {
            let child = tree.children(parent)?[index];
            let node = tree.node(child)?;
            if node.is_text() && to <= start + node.offset_size() {
              nodes.push(child);
            }
          }
        }
        let common = self.common_ancestor(tree)?;
        nodes.push(common);
        nodes.extend(tree.ancestors(common));
        Ok(nodes)
      },
      ContextStrategy::RangeTouches => {
        let mut nodes: IndexSet<NodeId> = IndexSet::new();
        for position in [&self.start, &self.end] {
          let parent = position.parent(tree)?;
          nodes.insert(parent);
          nodes.extend(tree.ancestors(parent));
          if let Some((text, _)) = position.text_index(tree)? {
            nodes.insert(text);
          }
        }
        // Nodes right at the edges of a non-collapsed range overlap it too.
        if !self.is_collapsed() {
          if let Some(after) = self.start.node_after(tree)? {
            nodes.insert(after);
          }
          if let Some(before) = self.end.node_before(tree)? {
            nodes.insert(before);
          }
        }
        nodes.extend(self.contained_nodes(tree)?);
        Ok(nodes.into_iter().collect())
      },
    }
  }

  /// Text covered by the range.
  pub fn text_content(&self, tree: &Tree) -> Result<String> {
    let mut content = String::new();
    for range in self.minimum_confined_ranges(tree)? {
      let (from, to) = (range.start.parent_offset(), range.end.parent_offset());
      let parent = range.start.parent(tree)?;
      let mut offset = 0;
      for child in tree.children(parent)? {
        let node = tree.node(*child)?;
        let size = node.offset_size();
        let (child_from, child_to) = (from.max(offset), to.min(offset + size));
        if child_from < child_to {
          match node.as_text() {
            Some(text) => {
              let text = text.content();
              let slice_from = char_to_byte(text, child_from - offset);
              let slice_to = char_to_byte(text, child_to - offset);
              content.push_str(&text[slice_from..slice_to]);
            },
            None => content.push_str(&tree.text_content(*child)?),
          }
        }
        offset += size;
      }
    }
    Ok(content)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // <div>
  //   <p>ab<b>cd</b></p>
  //   <ul><li>ef</li><li>gh</li></ul>
  // </div>
  fn sample() -> Tree {
    let mut tree = Tree::new("div");
    let root = tree.root();
    let p = tree.append_element(root, "p").unwrap();
    tree.append_text(p, "ab").unwrap();
    let b = tree.append_element(p, "b").unwrap();
    tree.append_text(b, "cd").unwrap();
    let ul = tree.append_element(root, "ul").unwrap();
    for content in ["ef", "gh"] {
      let li = tree.append_element(ul, "li").unwrap();
      tree.append_text(li, content).unwrap();
    }
    tree
  }

  fn pos(path: &[usize]) -> Position {
    Position::new(Path::from_slice(path))
  }

  #[test]
  fn end_before_start_is_misbehaved() {
    let err = Range::new(pos(&[1]), pos(&[0, 1])).unwrap_err();
    assert!(matches!(err, ModelError::MisbehavedRange { .. }));
    assert!(Range::new(pos(&[0, 1]), pos(&[1])).is_ok());
  }

  quickcheck::quickcheck! {
    fn range_construction_follows_document_order(a: Vec<u8>, b: Vec<u8>) -> bool {
      let a: Vec<usize> = a.into_iter().take(4).map(usize::from).collect();
      let b: Vec<usize> = b.into_iter().take(4).map(usize::from).collect();
      let (a, b) = (Position::new(a), Position::new(b));
      Range::new(a.clone(), b.clone()).is_ok() == (a <= b)
    }
  }

  #[test]
  fn confinement_and_common_ancestor() {
    let tree = sample();
    let confined = Range::new(pos(&[1, 0, 0]), pos(&[1, 0, 2])).unwrap();
    assert!(confined.is_confined());
    assert_eq!(
      confined.common_ancestor(&tree).unwrap(),
      tree.element_at_path(&[1, 0]).unwrap()
    );

    let across = Range::new(pos(&[1, 0, 1]), pos(&[1, 1, 1])).unwrap();
    assert!(!across.is_confined());
    let ul = tree.element_at_path(&[1]).unwrap();
    assert_eq!(across.common_ancestor(&tree).unwrap(), ul);

    let lists = across
      .find_common_ancestors_where(&tree, |tree, node| {
        tree.get(node).is_some_and(|node| node.has_tag("ul"))
      })
      .unwrap();
    assert_eq!(lists, vec![ul]);
  }

  #[test]
  fn minimum_confined_ranges_cover_content() {
    let tree = sample();
    let range = Range::new(pos(&[0, 2, 1]), pos(&[1, 1, 1])).unwrap();
    let pieces = range.minimum_confined_ranges(&tree).unwrap();
    let paths: Vec<(Vec<usize>, Vec<usize>)> = pieces
      .iter()
      .map(|piece| (piece.start().path().to_vec(), piece.end().path().to_vec()))
      .collect();
    assert_eq!(
      paths,
      vec![
        (vec![0, 2, 1], vec![0, 2, 2]),
        (vec![1, 0], vec![1, 1]),
        (vec![1, 1, 0], vec![1, 1, 1]),
      ]
    );
    assert!(pieces.iter().all(Range::is_confined));
    assert_eq!(range.text_content(&tree).unwrap(), "defg");
  }

  #[test]
  fn contained_nodes_skip_partial_overlaps() {
    let tree = sample();
    let ul = tree.element_at_path(&[1]).unwrap();
    let first_li = tree.element_at_path(&[1, 0]).unwrap();
    let first_text = tree.children(first_li).unwrap()[0];

    let range = Range::new(pos(&[1, 0]), pos(&[1, 1, 1])).unwrap();
    assert_eq!(range.contained_nodes(&tree).unwrap(), vec![first_li, first_text]);

    let touched = range
      .context_nodes(&tree, ContextStrategy::RangeTouches)
      .unwrap();
    assert!(touched.contains(&ul));
    assert!(touched.contains(&first_text));
    assert!(touched.contains(&tree.root()));

    let inside = Range::new(pos(&[1, 0, 0]), pos(&[1, 0, 1]))
      .unwrap()
      .context_nodes(&tree, ContextStrategy::RangeIsInside)
      .unwrap();
    assert_eq!(inside, vec![first_text, first_li, ul, tree.root()]);
  }

  #[test]
  fn around_and_children() {
    let tree = sample();
    let p = tree.element_at_path(&[0]).unwrap();
    let around = Range::from_around_node(&tree, p).unwrap();
    assert_eq!(around.start().path(), &[0]);
    assert_eq!(around.end().path(), &[1]);
    assert_eq!(around.text_content(&tree).unwrap(), "abcd");

    let children = Range::from_children(&tree, p).unwrap();
    assert_eq!(children.end().path(), &[0, 3]);
    assert!(children.collapse(true).is_collapsed());
  }
}
