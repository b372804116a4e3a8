//! Atomic tree mutations.
//!
//! Each operation mutates the tree in place and reports an
//! [`OperationResult`]: the range covering what it produced and the
//! [`RangeMapper`] translating positions from before the edit.

mod insert;
mod insert_text;
mod mark;
mod move_op;
mod split;

pub use insert::InsertOperation;
pub use insert_text::InsertTextOperation;
pub use mark::{
  MarkAction,
  MarkOperation,
};
pub use move_op::MoveOperation;
pub use split::SplitOperation;

use crate::{
  error::{
    ModelError,
    Result,
  },
  mapper::RangeMapper,
  position::Position,
  range::Range,
  tree::{
    NodeId,
    Tree,
  },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
  pub range:  Range,
  pub mapper: RangeMapper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
  Insert,
  InsertText,
  Move,
  Split,
  Mark,
}

#[derive(Debug, Clone)]
pub enum Operation {
  Insert(InsertOperation),
  InsertText(InsertTextOperation),
  Move(MoveOperation),
  Split(SplitOperation),
  Mark(MarkOperation),
}

impl Operation {
  pub fn kind(&self) -> OperationKind {
    match self {
      Self::Insert(_) => OperationKind::Insert,
      Self::InsertText(_) => OperationKind::InsertText,
      Self::Move(_) => OperationKind::Move,
      Self::Split(_) => OperationKind::Split,
      Self::Mark(_) => OperationKind::Mark,
    }
  }

  /// The range the operation was constructed with.
  pub fn range(&self) -> &Range {
    match self {
      Self::Insert(op) => &op.range,
      Self::InsertText(op) => &op.range,
      Self::Move(op) => &op.range,
      Self::Split(op) => &op.range,
      Self::Mark(op) => &op.range,
    }
  }

  pub fn execute(&self, tree: &mut Tree) -> Result<OperationResult> {
    let result = match self {
      Self::Insert(op) => op.execute(tree),
      Self::InsertText(op) => op.execute(tree),
      Self::Move(op) => op.execute(tree),
      Self::Split(op) => op.execute(tree),
      Self::Mark(op) => op.execute(tree),
    }?;
    tracing::trace!(
      kind = ?self.kind(),
      range = ?self.range(),
      result = ?result.range,
      "executed operation"
    );
    Ok(result)
  }
}

impl From<InsertOperation> for Operation {
  fn from(op: InsertOperation) -> Self {
    Self::Insert(op)
  }
}

impl From<InsertTextOperation> for Operation {
  fn from(op: InsertTextOperation) -> Self {
    Self::InsertText(op)
  }
}

impl From<MoveOperation> for Operation {
  fn from(op: MoveOperation) -> Self {
    Self::Move(op)
  }
}

impl From<SplitOperation> for Operation {
  fn from(op: SplitOperation) -> Self {
    Self::Split(op)
  }
}

impl From<MarkOperation> for Operation {
  fn from(op: MarkOperation) -> Self {
    Self::Mark(op)
  }
}

/// Children of `parent` between two offsets, splitting text nodes so both
/// offsets fall on child boundaries. Returns the child index range.
pub(crate) fn isolate_children(
  tree: &mut Tree,
  parent: NodeId,
  from: usize,
  to: usize,
) -> Result<std::ops::Range<usize>> {
  let start = tree.split_at_offset(parent, from)?;
  let end = tree.split_at_offset(parent, to)?;
  Ok(start..end.max(start))
}

/// Removes the content of a confined range. Returns the parent and the child
/// index where the content used to start.
pub(crate) fn remove_confined(tree: &mut Tree, range: &Range) -> Result<(NodeId, usize)> {
  let parent = range.start().parent(tree)?;
  let children = isolate_children(
    tree,
    parent,
    range.start().parent_offset(),
    range.end().parent_offset(),
  )?;
  let removed = tree.children(parent)?[children.clone()].to_vec();
  for node in removed {
    tree.remove_subtree(node)?;
  }
  Ok((parent, children.start))
}

/// Removes the content of any range, piece by piece from the last confined
/// piece to the first so earlier paths stay valid. Element boundaries
/// crossed by the range are kept.
pub(crate) fn remove_range(tree: &mut Tree, range: &Range) -> Result<RangeMapper> {
  let mut mapper = RangeMapper::identity();
  for piece in range.minimum_confined_ranges(tree)?.iter().rev() {
    if piece.is_collapsed() {
      continue;
    }
    remove_confined(tree, piece)?;
    mapper.append(&RangeMapper::replace(
      piece.start().parent_path(),
      piece.start().parent_offset(),
      piece.end().parent_offset(),
      0,
    ));
  }
  Ok(mapper)
}

/// Parent of a position an operation was built with. A position that no
/// longer resolves in `tree` means the tree changed under the operation.
pub(crate) fn resolve(tree: &Tree, position: &Position) -> Result<NodeId> {
  position.validate(tree).map_err(|err| match err {
    ModelError::InvalidPosition { path } => {
      ModelError::illegal(format!("position {path:?} is not reachable in this tree"))
    },
    other => other,
  })
}

/// Inserts detached nodes at `position`, returning the total offset size.
pub(crate) fn insert_at(tree: &mut Tree, position: &Position, nodes: &[NodeId]) -> Result<usize> {
  let parent = position.validate(tree)?;
  let index = tree.split_at_offset(parent, position.parent_offset())?;
  tree.insert_children(parent, index, nodes)?;
  nodes.iter().map(|node| tree.offset_size(*node)).sum()
}

#[cfg(test)]
mod tests {
  use quickcheck::{
    Arbitrary,
    Gen,
  };

  use super::*;
  use crate::{
    mapper::Bias,
    marks::MarkSet,
    position::Path,
  };

  /// `<div><p>abc</p><p>def</p><p>ghi</p></div>`
  fn paragraphs() -> Tree {
    let mut tree = Tree::new("div");
    let root = tree.root();
    for content in ["abc", "def", "ghi"] {
      let p = tree.append_element(root, "p").unwrap();
      tree.append_text(p, content).unwrap();
    }
    tree
  }

  fn all_positions(tree: &Tree) -> Vec<Position> {
    let mut positions = Vec::new();
    let mut stack = vec![(tree.root(), Path::new())];
    while let Some((element, path)) = stack.pop() {
      let max = tree.max_offset(element).unwrap();
      for offset in 0..=max {
        let mut inner = path.clone();
        inner.push(offset);
        positions.push(Position::new(inner));
      }
      let mut offset = 0;
      for child in tree.children(element).unwrap() {
        if tree.node(*child).unwrap().is_element() {
          let mut inner = path.clone();
          inner.push(offset);
          stack.push((*child, inner));
        }
        offset += tree.offset_size(*child).unwrap();
      }
    }
    positions
  }

  #[derive(Debug, Clone)]
  enum Edit {
    Text { at: usize, content: String },
    Delete { from: usize, to: usize },
    Split { at: usize },
    Move { from: usize, to: usize, target: usize },
    Wrap { from: usize, to: usize },
  }

  impl Arbitrary for Edit {
    fn arbitrary(g: &mut Gen) -> Self {
      let a = usize::arbitrary(g) % 64;
      let b = usize::arbitrary(g) % 64;
      let c = usize::arbitrary(g) % 64;
      match u8::arbitrary(g) % 5 {
        0 => {
          Edit::Text {
            at:      a,
            content: ["x", "yz", "", "\u{200B}"][b % 4].to_string(),
          }
        },
        1 => Edit::Delete { from: a, to: b },
        2 => Edit::Split { at: a },
        3 => Edit::Move { from: a, to: b, target: c },
        _ => Edit::Wrap { from: a, to: b },
      }
    }
  }

  /// Picks positions by index so any edit is valid on any tree.
  fn to_operation(tree: &mut Tree, edit: &Edit) -> Option<Operation> {
    let positions = all_positions(tree);
    let pick = |index: usize| positions[index % positions.len()].clone();
    let ordered = |a: usize, b: usize| {
      let (a, b) = (pick(a), pick(b));
      if a <= b { Range::new(a, b) } else { Range::new(b, a) }
    };
    let operation = match edit {
      Edit::Text { at, content } => {
        InsertTextOperation::new(Range::collapsed(pick(*at)), content, MarkSet::new()).into()
      },
      Edit::Delete { from, to } => InsertOperation::new(ordered(*from, *to).ok()?, Vec::new()).into(),
      Edit::Split { at } => {
        let position = pick(*at);
        if position.depth() < 2 {
          return None;
        }
        SplitOperation::new(Range::collapsed(position), true).into()
      },
      Edit::Move { from, to, target } => {
        let range = ordered(*from, *to).ok()?;
        if !range.is_confined() {
          return None;
        }
        MoveOperation::new(range, pick(*target)).into()
      },
      Edit::Wrap { from, to } => {
        let range = ordered(*from, *to).ok()?;
        if !range.is_confined() {
          return None;
        }
        let span = tree.create_element("span");
        InsertOperation::new(range, vec![span]).into()
      },
    };
    Some(operation)
  }

  quickcheck::quickcheck! {
    fn offsets_stay_consistent(edits: Vec<Edit>) -> bool {
      let mut tree = paragraphs();
      for edit in edits.iter().take(8) {
        let Some(operation) = to_operation(&mut tree, edit) else { continue };
        if operation.execute(&mut tree).is_err() {
          continue;
        }
        if tree.validate().is_err() {
          return false;
        }
        for position in all_positions(&tree) {
          if position.validate(&tree).is_err() {
            return false;
          }
        }
      }
      true
    }

    fn mapped_positions_stay_valid(edits: Vec<Edit>) -> bool {
      let mut tree = paragraphs();
      let tracked = all_positions(&tree);
      let mut mapper = RangeMapper::identity();
      for edit in edits.iter().take(8) {
        let Some(operation) = to_operation(&mut tree, edit) else { continue };
        match operation.execute(&mut tree) {
          Ok(result) => mapper.append(&result.mapper),
          Err(_) => return true,
        }
      }
      tracked.iter().all(|position| {
        [Bias::Left, Bias::Right]
          .into_iter()
          .all(|bias| mapper.map_position(position, bias).validate(&tree).is_ok())
      })
    }
  }

  #[test]
  fn removing_across_elements_keeps_boundaries() {
    let mut tree = paragraphs();
    let range = Range::new(
      Position::new(vec![0, 1]),
      Position::new(vec![2, 2]),
    )
    .unwrap();
    let mapper = remove_range(&mut tree, &range).unwrap();
    let root = tree.root();
    assert_eq!(tree.text_content(root).unwrap(), "ai");
    assert_eq!(tree.children(root).unwrap().len(), 2);
    assert_eq!(
      mapper
        .map_position(&Position::new(vec![2, 3]), Bias::Left)
        .path(),
      &[1, 1]
    );
  }
}
