use the_core::grapheme::{
  char_to_byte,
  len_chars,
};

use crate::{
  error::Result,
  mapper::RangeMapper,
  marks::MarkSet,
  node::Node,
  operation::{
    OperationResult,
    remove_range,
    resolve,
  },
  range::Range,
  tree::{
    NodeId,
    Tree,
  },
};

/// Replaces the content of a range with text carrying `marks`. The text is
/// spliced into a neighbouring text node when that node is mergeable with
/// it, otherwise a new text node is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertTextOperation {
  pub(crate) range: Range,
  text:             String,
  marks:            MarkSet,
}

impl InsertTextOperation {
  pub fn new(range: Range, text: impl Into<String>, marks: MarkSet) -> Self {
    Self {
      range,
      text: text.into(),
      marks,
    }
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn marks(&self) -> &MarkSet {
    &self.marks
  }

  pub fn execute(&self, tree: &mut Tree) -> Result<OperationResult> {
    resolve(tree, self.range.start())?;
    resolve(tree, self.range.end())?;

    let mut mapper = remove_range(tree, &self.range)?;
    let start = self.range.start();
    let offset = start.parent_offset();
    let inserted = len_chars(&self.text);
    if inserted > 0 {
      let parent = start.parent(tree)?;
      self.splice(tree, parent, offset)?;
      mapper.append(&RangeMapper::replace(
        start.parent_path(),
        offset,
        offset,
        inserted,
      ));
    }

    Ok(OperationResult {
      range: Range::new(start.clone(), start.with_offset(offset + inserted))?,
      mapper,
    })
  }

  fn splice(&self, tree: &mut Tree, parent: NodeId, offset: usize) -> Result<()> {
    let candidate = Node::text("", self.marks.clone());

    // Strictly inside a text node.
    if let Some((index, start)) = tree.child_at_offset(parent, offset)?
      && start < offset
    {
      let text = tree.children(parent)?[index];
      if tree.node(text)?.is_mergeable_with(&candidate) {
        return self.insert_into(tree, text, offset - start);
      }
    }

    let index = tree.split_at_offset(parent, offset)?;
    let children = tree.children(parent)?;
    let before = index.checked_sub(1).map(|index| children[index]);
    let after = children.get(index).copied();
    for (neighbour, at_end) in [(before, true), (after, false)] {
      let Some(neighbour) = neighbour else { continue };
      let node = tree.node(neighbour)?;
      if node.is_mergeable_with(&candidate) {
        let at = if at_end { node.offset_size() } else { 0 };
        return self.insert_into(tree, neighbour, at);
      }
    }

    let text = tree.create_text(&self.text, self.marks.clone());
    tree.insert_children(parent, index, &[text])
  }

  fn insert_into(&self, tree: &mut Tree, text: NodeId, index: usize) -> Result<()> {
    let mut content = tree
      .node(text)?
      .as_text()
      .map(|text| text.content().to_string())
      .unwrap_or_default();
    content.insert_str(char_to_byte(&content, index), &self.text);
    tree.set_text_content(text, content)
  }
}
