use crate::{
  error::Result,
  mapper::RangeMapper,
  marks::{
    Mark,
    MarkSet,
  },
  operation::{
    OperationResult,
    isolate_children,
    resolve,
  },
  range::Range,
  tree::{
    NodeId,
    Tree,
  },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkAction {
  Add,
  Remove,
}

/// Adds or removes a mark on every text node inside a range. Text nodes
/// straddling the range ends are split first so marks always cover whole
/// text nodes. On a collapsed range the mark goes to the empty text nodes at
/// that point, and adding creates one if there is none, so typing there
/// picks the mark up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkOperation {
  pub(crate) range: Range,
  mark:             Mark,
  action:           MarkAction,
}

impl MarkOperation {
  pub fn new(range: Range, mark: Mark, action: MarkAction) -> Self {
    Self {
      range,
      mark,
      action,
    }
  }

  pub fn mark(&self) -> &Mark {
    &self.mark
  }

  pub fn action(&self) -> MarkAction {
    self.action
  }

  pub fn execute(&self, tree: &mut Tree) -> Result<OperationResult> {
    resolve(tree, self.range.start())?;
    resolve(tree, self.range.end())?;

    if self.range.is_collapsed() {
      self.execute_collapsed(tree)?;
    } else {
      for piece in self.range.minimum_confined_ranges(tree)? {
        let parent = piece.start().parent(tree)?;
        let children = isolate_children(
          tree,
          parent,
          piece.start().parent_offset(),
          piece.end().parent_offset(),
        )?;
        let covered = tree.children(parent)?[children].to_vec();
        for node in covered {
          self.apply_below(tree, node)?;
        }
      }
    }

    Ok(OperationResult {
      range:  self.range.clone(),
      mapper: RangeMapper::identity(),
    })
  }

  fn execute_collapsed(&self, tree: &mut Tree) -> Result<()> {
    let position = self.range.start();
    let parent = position.parent(tree)?;
    let offset = position.parent_offset();

    let index = tree.split_at_offset(parent, offset)?;
    let empty: Vec<NodeId> = tree.children(parent)?[index..]
      .iter()
      .copied()
      .take_while(|child| {
        tree
          .get(*child)
          .is_some_and(|node| node.is_text() && node.offset_size() == 0)
      })
      .collect();

    if empty.is_empty() {
      if self.action == MarkAction::Add {
        let text = tree.create_text("", MarkSet::from_iter([self.mark.clone()]));
        tree.insert_children(parent, index, &[text])?;
      }
      return Ok(());
    }
    for text in empty {
      self.apply(tree, text)?;
    }
    Ok(())
  }

  fn apply_below(&self, tree: &mut Tree, node: NodeId) -> Result<()> {
    if tree.node(node)?.is_text() {
      return self.apply(tree, node);
    }
    for descendant in tree.descendants(node)? {
      if tree.node(descendant)?.is_text() {
        self.apply(tree, descendant)?;
      }
    }
    Ok(())
  }

  fn apply(&self, tree: &mut Tree, text: NodeId) -> Result<()> {
    let marks = tree.marks_mut(text)?;
    match self.action {
      MarkAction::Add => marks.add(self.mark.clone()),
      MarkAction::Remove => {
        marks.remove(self.mark.name());
      },
    }
    Ok(())
  }
}
