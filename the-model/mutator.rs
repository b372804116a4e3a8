//! Compound edits.
//!
//! The [`Mutator`] sequences operations against a tree, each call seeing the
//! result of the previous ones. It records every executed operation so the
//! owner (usually a transaction) can keep their mappers.

use crate::{
  error::{
    ModelError,
    Result,
  },
  mapper::{
    Bias,
    RangeMapper,
  },
  marks::{
    Mark,
    MarkSet,
  },
  node::{
    LINE_BREAK_TAG,
    Node,
  },
  operation::{
    InsertOperation,
    InsertTextOperation,
    MarkAction,
    MarkOperation,
    MoveOperation,
    Operation,
    OperationKind,
    OperationResult,
    SplitOperation,
  },
  position::Position,
  range::Range,
  tree::{
    NodeId,
    Tree,
  },
};

/// An operation together with what it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedOperation {
  pub kind:   OperationKind,
  pub range:  Range,
  pub result: OperationResult,
}

pub struct Mutator<'a> {
  tree:     &'a mut Tree,
  executed: Vec<ExecutedOperation>,
}

impl<'a> Mutator<'a> {
  pub fn new(tree: &'a mut Tree) -> Self {
    Self {
      tree,
      executed: Vec::new(),
    }
  }

  pub fn tree(&self) -> &Tree {
    self.tree
  }

  pub fn executed(&self) -> &[ExecutedOperation] {
    &self.executed
  }

  pub fn into_executed(self) -> Vec<ExecutedOperation> {
    self.executed
  }

  /// Composition of the mappers of every operation executed so far.
  pub fn mapper(&self) -> RangeMapper {
    self.mapper_since(0)
  }

  fn mapper_since(&self, index: usize) -> RangeMapper {
    let mut mapper = RangeMapper::identity();
    for executed in &self.executed[index.min(self.executed.len())..] {
      mapper.append(&executed.result.mapper);
    }
    mapper
  }

  pub fn execute(&mut self, operation: impl Into<Operation>) -> Result<OperationResult> {
    let operation = operation.into();
    let result = operation.execute(self.tree)?;
    self.executed.push(ExecutedOperation {
      kind:   operation.kind(),
      range:  operation.range().clone(),
      result: result.clone(),
    });
    Ok(result)
  }

  /// Replaces `range` with detached nodes, returning the range they cover.
  pub fn insert_nodes(&mut self, range: &Range, nodes: Vec<NodeId>) -> Result<Range> {
    Ok(
      self
        .execute(InsertOperation::new(range.clone(), nodes))?
        .range,
    )
  }

  pub fn insert_at_position(&mut self, position: &Position, nodes: Vec<NodeId>) -> Result<Range> {
    self.insert_nodes(&Range::collapsed(position.clone()), nodes)
  }

  /// Inserts text over `range`.
  ///
  /// Collapsed ranges splice into the text around the position. Confined
  /// ranges are replaced and mergeable text around the result is merged.
  /// Ranges crossing element boundaries are collapsed to their start so no
  /// content is dropped. Without explicit `marks` the text takes the marks of
  /// the text it lands in, then of an empty text at the position, then of the
  /// text before, then of the text after.
  pub fn insert_text(&mut self, range: &Range, text: &str, marks: Option<MarkSet>) -> Result<Range> {
    let range = if range.is_confined() {
      range.clone()
    } else {
      tracing::debug!(?range, "inserting text at the start of a non-confined range");
      range.collapse(true)
    };
    let marks = match marks {
      Some(marks) => marks,
      None => self.marks_at(&range)?,
    };

    let result = self
      .execute(InsertTextOperation::new(range.clone(), text, marks))?
      .range;
    if !range.is_collapsed() {
      self.merge_text_nodes_in_range(&result)?;
    }
    Ok(result)
  }

  fn marks_at(&self, range: &Range) -> Result<MarkSet> {
    let tree = &*self.tree;
    let start = range.start();
    let text_marks = |node: Option<NodeId>| -> Result<Option<MarkSet>> {
      Ok(match node {
        Some(node) => tree.node(node)?.as_text().map(|text| text.marks().clone()),
        None => None,
      })
    };

    if !range.is_collapsed() {
      // Replacing text keeps the formatting of what is replaced.
      if let Some(marks) = text_marks(start.node_after(tree)?)? {
        return Ok(marks);
      }
    }
    if let Some((text, _)) = start.text_index(tree)? {
      return Ok(text_marks(Some(text))?.unwrap_or_default());
    }

    let parent = start.parent(tree)?;
    let offset = start.parent_offset();
    let mut child_start = 0;
    for child in tree.children(parent)? {
      let node = tree.node(*child)?;
      if child_start == offset && node.is_text() && node.offset_size() == 0 {
        return Ok(text_marks(Some(*child))?.unwrap_or_default());
      }
      child_start += node.offset_size();
    }

    if let Some(marks) = text_marks(start.node_before(tree)?)? {
      return Ok(marks);
    }
    Ok(text_marks(start.node_after(tree)?)?.unwrap_or_default())
  }

  /// Removes the content of `range`, returning the collapsed range where it
  /// was.
  pub fn delete(&mut self, range: &Range) -> Result<Range> {
    self.insert_nodes(range, Vec::new())
  }

  pub fn move_to_position(&mut self, range: &Range, target: &Position) -> Result<Range> {
    Ok(
      self
        .execute(MoveOperation::new(range.clone(), target.clone()))?
        .range,
    )
  }

  /// Splits the text node around `position`, if any. Positions are
  /// unaffected.
  pub fn split_text_at(&mut self, position: &Position) -> Result<Position> {
    Ok(
      self
        .execute(SplitOperation::new(
          Range::collapsed(position.clone()),
          false,
        ))?
        .range
        .start()
        .clone(),
    )
  }

  /// Splits ancestors of `position` until its parent satisfies `predicate`
  /// or is the root, returning the position between the split halves.
  ///
  /// Unless `split_at_ends` is set, a position at the very start or end of
  /// its parent moves before or after the parent instead of splitting it,
  /// so no empty halves are created.
  pub fn split_until(
    &mut self,
    position: &Position,
    predicate: impl Fn(&Tree, NodeId) -> bool,
    split_at_ends: bool,
  ) -> Result<Position> {
    let mut position = position.clone();
    loop {
      let parent = position.parent(self.tree)?;
      if parent == self.tree.root() || predicate(self.tree, parent) {
        return Ok(position);
      }
      if !split_at_ends {
        if position.parent_offset() == 0 {
          position = Position::from_before_node(self.tree, parent)?;
          continue;
        }
        if position.parent_offset() == self.tree.max_offset(parent)? {
          position = Position::from_after_node(self.tree, parent)?;
          continue;
        }
      }
      let result = self.execute(SplitOperation::new(Range::collapsed(position), true))?;
      position = result.range.start().clone();
    }
  }

  /// [`Self::split_until`] with `element` as the limit. `element` must be an
  /// ancestor of the position.
  pub fn split_until_element(
    &mut self,
    position: &Position,
    element: NodeId,
    split_at_ends: bool,
  ) -> Result<Position> {
    let parent = position.parent(self.tree)?;
    if parent != element && !self.tree.is_ancestor(element, parent) {
      return Err(ModelError::illegal(format!(
        "{element:?} is not an ancestor of {:?}",
        position.path()
      )));
    }
    self.split_until(position, |_, node| node == element, split_at_ends)
  }

  /// Splits both ends of `range` up to their limit elements, end first.
  pub fn split_range_until_elements(
    &mut self,
    range: &Range,
    start_limit: NodeId,
    end_limit: NodeId,
    split_at_ends: bool,
  ) -> Result<Range> {
    let checkpoint = self.executed.len();
    let end = self.split_until_element(range.end(), end_limit, split_at_ends)?;
    let start = self
      .mapper_since(checkpoint)
      .map_position(range.start(), Bias::Left);

    let checkpoint = self.executed.len();
    let start = self.split_until_element(&start, start_limit, split_at_ends)?;
    let end = self.mapper_since(checkpoint).map_position(&end, Bias::Left);
    Range::new(start, end)
  }

  /// Merges mergeable text nodes touching `range`. Offsets are unaffected.
  pub fn merge_text_nodes_in_range(&mut self, range: &Range) -> Result<()> {
    for piece in range.minimum_confined_ranges(self.tree)? {
      let parent = piece.start().parent(self.tree)?;
      let (from, to) = (piece.start().parent_offset(), piece.end().parent_offset());
      let mut touched: Option<(usize, usize)> = None;
      let mut offset = 0;
      for (index, child) in self.tree.children(parent)?.iter().enumerate() {
        let end = offset + self.tree.offset_size(*child)?;
        if offset <= to && end >= from {
          touched = Some(match touched {
            Some((first, _)) => (first, index),
            None => (index, index),
          });
        }
        offset = end;
      }
      if let Some((first, last)) = touched {
        self.tree.merge_text_nodes(parent, first, last + 1)?;
      }
    }
    Ok(())
  }

  /// Replaces `element` with its children. With `ensure_block`, unwrapping a
  /// block element puts a line break wherever its inline content would run
  /// into inline content outside it. Returns the range of the former
  /// children.
  pub fn unwrap(&mut self, element: NodeId, ensure_block: bool) -> Result<Range> {
    if self.tree.parent(element).is_none() {
      return Err(ModelError::illegal(format!(
        "cannot unwrap detached or root node {element:?}"
      )));
    }
    let was_block = self.tree.node(element)?.is_block();

    let children = Range::from_children(self.tree, element)?;
    let before = Position::from_before_node(self.tree, element)?;
    let moved = self.move_to_position(&children, &before)?;

    let around = Range::from_around_node(self.tree, element)?;
    let checkpoint = self.executed.len();
    self.delete(&around)?;
    let mut content = self
      .mapper_since(checkpoint)
      .map_range(&moved, Bias::Left, Bias::Left);

    if ensure_block && was_block {
      if self.is_inline_junction(content.end())? {
        let br = self.tree.create_element(LINE_BREAK_TAG);
        self.insert_at_position(content.end(), vec![br])?;
      }
      if self.is_inline_junction(content.start())? {
        let checkpoint = self.executed.len();
        let br = self.tree.create_element(LINE_BREAK_TAG);
        self.insert_at_position(content.start(), vec![br])?;
        content = self
          .mapper_since(checkpoint)
          .map_range(&content, Bias::Right, Bias::Right);
      }
    }
    Ok(content)
  }

  fn is_inline_junction(&self, position: &Position) -> Result<bool> {
    let inline = |node: Option<NodeId>| -> Result<bool> {
      Ok(match node {
        Some(node) => {
          let node = self.tree.node(node)?;
          !node.is_block() && !node.is_line_break()
        },
        None => false,
      })
    };
    Ok(inline(position.node_before(self.tree)?)? && inline(position.node_after(self.tree)?)?)
  }

  /// Wraps a confined range in a new element, returning the element and the
  /// range around it.
  pub fn wrap_in_element(&mut self, range: &Range, tag: &str) -> Result<(NodeId, Range)> {
    if !range.is_confined() {
      return Err(ModelError::NotImplemented("wrapping a range that crosses elements"));
    }
    let element = self.tree.create_element(tag);
    let checkpoint = self.executed.len();
    self.insert_at_position(range.end(), vec![element])?;
    let range = self
      .mapper_since(checkpoint)
      .map_range(range, Bias::Left, Bias::Left);

    let target = Position::from_in_element(self.tree, element, 0)?;
    self.move_to_position(&range, &target)?;
    Ok((element, Range::from_around_node(self.tree, element)?))
  }

  /// Replaces adjacent siblings `old` with detached `nodes`.
  pub fn replace_nodes(&mut self, old: &[NodeId], nodes: Vec<NodeId>) -> Result<Range> {
    let (Some(first), Some(last)) = (old.first(), old.last()) else {
      return Err(ModelError::model("no nodes to replace"));
    };
    let range = Range::new(
      Position::from_before_node(self.tree, *first)?,
      Position::from_after_node(self.tree, *last)?,
    )?;
    if !range.is_confined() {
      return Err(ModelError::model("replaced nodes must be siblings"));
    }
    self.insert_nodes(&range, nodes)
  }

  pub fn remove_nodes(&mut self, nodes: &[NodeId]) -> Result<()> {
    for node in nodes {
      let range = Range::from_around_node(self.tree, *node)?;
      self.delete(&range)?;
    }
    Ok(())
  }

  pub fn add_mark(&mut self, range: &Range, mark: Mark) -> Result<Range> {
    Ok(
      self
        .execute(MarkOperation::new(range.clone(), mark, MarkAction::Add))?
        .range,
    )
  }

  pub fn remove_mark(&mut self, range: &Range, mark: Mark) -> Result<Range> {
    Ok(
      self
        .execute(MarkOperation::new(range.clone(), mark, MarkAction::Remove))?
        .range,
    )
  }

  pub fn set_attribute(&mut self, node: NodeId, key: &str, value: &str) -> Result<()> {
    self.tree.set_attribute(node, key, value)?;
    Ok(())
  }

  pub fn remove_attribute(&mut self, node: NodeId, key: &str) -> Result<()> {
    self.tree.remove_attribute(node, key)?;
    Ok(())
  }

  pub fn create_element(&mut self, tag: &str) -> NodeId {
    self.tree.create_element(tag)
  }

  pub fn create_text(&mut self, content: &str, marks: MarkSet) -> NodeId {
    self.tree.create_text(content, marks)
  }

  /// Detached copy of a node built elsewhere, for readers that build nodes
  /// before they have a tree.
  pub fn adopt(&mut self, node: Node) -> NodeId {
    self.tree.insert_detached(node)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::marks::MarkRegistry;

  fn texts(tree: &Tree, parent: NodeId) -> Vec<String> {
    tree
      .children(parent)
      .unwrap()
      .iter()
      .map(|child| tree.text_content(*child).unwrap())
      .collect()
  }

  #[test]
  fn collapsed_text_insertion() {
    let mut tree = Tree::new("p");
    let root = tree.root();
    let text = tree.append_text(root, "hello").unwrap();
    let position = Position::from_in_text_node(&tree, text, 2).unwrap();

    let mut mutator = Mutator::new(&mut tree);
    let result = mutator
      .insert_text(&Range::collapsed(position.clone()), "XY", None)
      .unwrap();
    let cursor = mutator
      .mapper()
      .map_position(&position, Bias::Right);
    assert_eq!(cursor.path(), &[4]);
    assert_eq!(result.end(), &cursor);
    assert_eq!(tree.text_content(root).unwrap(), "heXYllo");
  }

  #[test]
  fn replacement_merges_neighbours() {
    let mut tree = Tree::new("p");
    let root = tree.root();
    let text = tree.append_text(root, "hello").unwrap();
    let range = Range::from_in_text_node(&tree, text, 1, 4).unwrap();
    Mutator::new(&mut tree)
      .insert_text(&range, "ipp", None)
      .unwrap();
    assert_eq!(texts(&tree, root), vec!["hippo"]);
  }

  #[test]
  fn non_confined_insertion_keeps_content() {
    let mut tree = Tree::new("div");
    let root = tree.root();
    let first = tree.append_element(root, "p").unwrap();
    tree.append_text(first, "ab").unwrap();
    let second = tree.append_element(root, "p").unwrap();
    tree.append_text(second, "cd").unwrap();

    let range = Range::new(Position::new(vec![0, 1]), Position::new(vec![1, 1])).unwrap();
    let result = Mutator::new(&mut tree)
      .insert_text(&range, "!", None)
      .unwrap();
    assert_eq!(texts(&tree, root), vec!["a!b", "cd"]);
    assert_eq!(result.start().path(), &[0, 1]);
  }

  #[test]
  fn marks_follow_the_cursor_context() {
    let registry = MarkRegistry::with_defaults();
    let bold = MarkSet::from_iter([registry.mark("bold", Default::default()).unwrap()]);

    let mut tree = Tree::new("p");
    let root = tree.root();
    let marked = tree.create_text("ab", bold.clone());
    tree.append_child(root, marked).unwrap();
    tree.append_element(root, "br").unwrap();

    // Right after the bold text, the bold text is before the cursor.
    let range = Range::collapsed(Position::new(vec![2]));
    Mutator::new(&mut tree)
      .insert_text(&range, "c", None)
      .unwrap();
    assert_eq!(tree.node(marked).unwrap().as_text().unwrap().content(), "abc");
  }

  #[test]
  fn typing_into_a_marked_empty_item() {
    let registry = MarkRegistry::with_defaults();
    let bold = registry.mark("bold", Default::default()).unwrap();

    let mut tree = Tree::new("ul");
    let root = tree.root();
    let li = tree.append_element(root, "li").unwrap();
    let placeholder = tree.append_text(li, "").unwrap();
    let cursor = Range::collapsed(Position::from_in_element(&tree, li, 0).unwrap());

    let mut mutator = Mutator::new(&mut tree);
    mutator.add_mark(&cursor, bold).unwrap();
    mutator.insert_text(&cursor, "x", None).unwrap();
    let text = tree.node(placeholder).unwrap().as_text().unwrap();
    assert_eq!(text.content(), "x");
    assert!(text.marks().has("bold"));
  }

  #[test]
  fn split_until_short_circuits_at_edges() {
    let mut tree = Tree::new("div");
    let root = tree.root();
    let ul = tree.append_element(root, "ul").unwrap();
    let li = tree.append_element(ul, "li").unwrap();
    tree.append_text(li, "abc").unwrap();
    let before = format!("{:?}", texts(&tree, ul));

    let at_start = Position::from_in_element(&tree, li, 0).unwrap();
    let mut mutator = Mutator::new(&mut tree);
    let result = mutator
      .split_until(&at_start, |tree, node| tree.get(node).is_some_and(|node| node.has_tag("ul")), false)
      .unwrap();
    assert!(mutator.executed().is_empty());
    assert_eq!(result.path(), &[0, 0]);

    let at_end = Position::from_in_element(mutator.tree(), li, 3).unwrap();
    let result = mutator.split_until_element(&at_end, ul, false).unwrap();
    assert!(mutator.executed().is_empty());
    assert_eq!(result.path(), &[0, 1]);
    assert_eq!(format!("{:?}", texts(&tree, ul)), before);
  }

  #[test]
  fn split_until_splits_every_level() {
    let mut tree = Tree::new("div");
    let root = tree.root();
    let ul = tree.append_element(root, "ul").unwrap();
    let li = tree.append_element(ul, "li").unwrap();
    let span = tree.append_element(li, "span").unwrap();
    tree.append_text(span, "abcd").unwrap();

    let position = Position::from_in_element(&tree, span, 2).unwrap();
    let result = Mutator::new(&mut tree)
      .split_until_element(&position, ul, false)
      .unwrap();
    assert_eq!(result.path(), &[0, 1]);
    assert_eq!(texts(&tree, ul), vec!["ab", "cd"]);

    // The original list item is no longer an ancestor of the second half.
    let second_half = Position::new(vec![0, 1, 0, 1]);
    assert!(
      Mutator::new(&mut tree)
        .split_until_element(&second_half, li, false)
        .is_err()
    );
  }

  #[test]
  fn split_range_until_elements_isolates_middle() {
    let mut tree = Tree::new("div");
    let root = tree.root();
    let p = tree.append_element(root, "p").unwrap();
    tree.append_text(p, "abcdef").unwrap();
    let range = Range::from_in_element(&tree, p, 2, 4).unwrap();
    let result = Mutator::new(&mut tree)
      .split_range_until_elements(&range, root, root, false)
      .unwrap();
    assert_eq!(texts(&tree, root), vec!["ab", "cd", "ef"]);
    assert_eq!(result.start().path(), &[1]);
    assert_eq!(result.end().path(), &[2]);
  }

  #[test]
  fn wrap_then_unwrap_restores_content() {
    let mut tree = Tree::new("div");
    let root = tree.root();
    tree.append_text(root, "ab").unwrap();
    tree.append_element(root, "img").unwrap();
    tree.append_text(root, "cd").unwrap();
    let original = tree.text_content(root).unwrap();
    let range = Range::from_in_element(&tree, root, 1, 4).unwrap();

    let mut mutator = Mutator::new(&mut tree);
    let (span, around) = mutator.wrap_in_element(&range, "span").unwrap();
    assert_eq!(around.start().path(), &[1]);
    assert_eq!(mutator.tree().text_content(span).unwrap(), "bc");
    let restored = mutator.unwrap(span, false).unwrap();
    assert_eq!(restored.start().path(), &[1]);
    assert_eq!(restored.end().path(), &[4]);
    assert_eq!(tree.text_content(root).unwrap(), original);
    assert!(!tree.contains(span));
    assert_eq!(tree.max_offset(root).unwrap(), 5);
  }

  #[test]
  fn wrapping_across_elements_is_unsupported() {
    let mut tree = Tree::new("div");
    let root = tree.root();
    let first = tree.append_element(root, "p").unwrap();
    tree.append_text(first, "ab").unwrap();
    let second = tree.append_element(root, "p").unwrap();
    tree.append_text(second, "cd").unwrap();

    let range = Range::new(Position::new(vec![0, 1]), Position::new(vec![1, 1])).unwrap();
    assert!(matches!(
      Mutator::new(&mut tree).wrap_in_element(&range, "span"),
      Err(ModelError::NotImplemented(_))
    ));
  }

  #[test]
  fn unwrapping_blocks_keeps_line_breaks() {
    let mut tree = Tree::new("div");
    let root = tree.root();
    tree.append_text(root, "before").unwrap();
    let p = tree.append_element(root, "p").unwrap();
    tree.append_text(p, "inside").unwrap();
    tree.append_text(root, "after").unwrap();

    let range = Mutator::new(&mut tree).unwrap(p, true).unwrap();
    let tags: Vec<Option<String>> = tree
      .children(root)
      .unwrap()
      .iter()
      .map(|child| tree.node(*child).unwrap().tag().map(str::to_string))
      .collect();
    assert_eq!(tags, vec![None, Some("br".into()), None, Some("br".into()), None]);
    assert_eq!(range.text_content(&tree).unwrap(), "inside");
  }

  #[test]
  fn replace_and_remove_nodes() {
    let mut tree = Tree::new("div");
    let root = tree.root();
    let a = tree.append_element(root, "a").unwrap();
    let b = tree.append_element(root, "b").unwrap();
    let c = tree.append_element(root, "c").unwrap();

    let mut mutator = Mutator::new(&mut tree);
    let hr = mutator.create_element("hr");
    let range = mutator.replace_nodes(&[a, b], vec![hr]).unwrap();
    assert_eq!(range.end().path(), &[1]);
    mutator.remove_nodes(&[c]).unwrap();
    mutator.set_attribute(hr, "class", "rule").unwrap();
    assert_eq!(tree.children(root).unwrap(), &[hr]);
    assert_eq!(tree.node(hr).unwrap().attribute("class"), Some("rule"));
  }
}
