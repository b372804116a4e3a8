use crate::{
  error::{
    ModelError,
    Result,
  },
  mapper::{
    Bias,
    RangeMapper,
  },
  operation::{
    OperationResult,
    insert_at,
    isolate_children,
    resolve,
  },
  position::Position,
  range::Range,
  tree::Tree,
};

/// Relocates the content of a range to a target position. The target must
/// not lie strictly inside the range. Non-confined ranges are moved one
/// confined piece at a time, last piece first, so the content keeps its
/// order at the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOperation {
  pub(crate) range: Range,
  target:           Position,
}

impl MoveOperation {
  pub fn new(range: Range, target: Position) -> Self {
    Self { range, target }
  }

  pub fn target(&self) -> &Position {
    &self.target
  }

  pub fn execute(&self, tree: &mut Tree) -> Result<OperationResult> {
    resolve(tree, self.range.start())?;
    resolve(tree, self.range.end())?;
    resolve(tree, &self.target)?;
    if *self.range.start() < self.target && self.target < *self.range.end() {
      return Err(ModelError::model(format!(
        "cannot move a range into itself: target {:?} lies inside {:?}",
        self.target.path(),
        self.range
      )));
    }

    let mut mapper = RangeMapper::identity();
    let mut target = self.target.clone();
    let mut moved = 0;
    let pieces = self.range.minimum_confined_ranges(tree)?;
    for piece in pieces.iter().rev() {
      let piece = mapper.map_range(piece, Bias::Left, Bias::Right);
      let (piece_mapper, landing, size) = move_confined(tree, &piece, &target)?;
      moved += size;
      mapper.append(&piece_mapper);
      // Earlier pieces land in front of the ones already moved.
      target = landing;
    }

    Ok(OperationResult {
      range: Range::new(
        target.clone(),
        target.with_offset(target.parent_offset() + moved),
      )?,
      mapper,
    })
  }
}

/// Moves one confined range. Returns the mapper, where the content landed and
/// its offset size.
fn move_confined(
  tree: &mut Tree,
  range: &Range,
  target: &Position,
) -> Result<(RangeMapper, Position, usize)> {
  let (from, to) = (range.start().parent_offset(), range.end().parent_offset());
  let parent = range.start().parent(tree)?;
  let children = isolate_children(tree, parent, from, to)?;
  let nodes = tree.children(parent)?[children].to_vec();
  for node in &nodes {
    tree.detach(*node)?;
  }

  let removal = RangeMapper::replace(range.start().parent_path(), from, to, 0);
  let landing = removal.map_position(target, Bias::Left);
  let size = insert_at(tree, &landing, &nodes)?;
  Ok((
    RangeMapper::move_range(range.start().parent_path(), from, to, landing.clone()),
    landing,
    size,
  ))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tree::NodeId;

  // <div><p>abc</p><p>de</p></div>
  fn sample() -> (Tree, NodeId, NodeId) {
    let mut tree = Tree::new("div");
    let root = tree.root();
    let first = tree.append_element(root, "p").unwrap();
    tree.append_text(first, "abc").unwrap();
    let second = tree.append_element(root, "p").unwrap();
    tree.append_text(second, "de").unwrap();
    (tree, first, second)
  }

  #[test]
  fn moves_text_between_elements() {
    let (mut tree, first, second) = sample();
    let range = Range::from_in_element(&tree, first, 1, 3).unwrap();
    let target = Position::from_in_element(&tree, second, 2).unwrap();
    let result = MoveOperation::new(range, target)
      .execute(&mut tree)
      .unwrap();

    assert_eq!(tree.text_content(first).unwrap(), "a");
    assert_eq!(tree.text_content(second).unwrap(), "debc");
    assert_eq!(result.range.start().path(), &[1, 2]);
    assert_eq!(result.range.end().path(), &[1, 4]);

    let inside = Position::new(vec![0, 2]);
    assert_eq!(
      result.mapper.map_position(&inside, Bias::Left).path(),
      &[1, 3]
    );
    tree.validate().unwrap();
  }

  #[test]
  fn moves_elements_forward_in_the_same_parent() {
    let (mut tree, first, second) = sample();
    let root = tree.root();
    let range = Range::from_around_node(&tree, first).unwrap();
    let target = Position::from_in_element(&tree, root, 2).unwrap();
    let result = MoveOperation::new(range, target)
      .execute(&mut tree)
      .unwrap();

    assert_eq!(tree.children(root).unwrap(), &[second, first]);
    assert_eq!(result.range.start().path(), &[1]);
    assert_eq!(
      result
        .mapper
        .map_position(&Position::new(vec![0, 1]), Bias::Left)
        .path(),
      &[1, 1]
    );
    assert_eq!(
      result
        .mapper
        .map_position(&Position::new(vec![1, 1]), Bias::Left)
        .path(),
      &[0, 1]
    );
  }

  #[test]
  fn rejects_targets_inside_the_range() {
    let (mut tree, first, _) = sample();
    let range = Range::from_around_node(&tree, first).unwrap();
    let target = Position::from_in_element(&tree, first, 1).unwrap();
    assert!(matches!(
      MoveOperation::new(range, target).execute(&mut tree),
      Err(ModelError::Model(_))
    ));
    assert_eq!(tree.text_content(first).unwrap(), "abc");
  }

  #[test]
  fn non_confined_ranges_keep_their_order() {
    let (mut tree, first, second) = sample();
    let root = tree.root();
    let end = tree.append_element(root, "p").unwrap();
    let range = Range::new(Position::new(vec![0, 2]), Position::new(vec![1, 1])).unwrap();
    let target = Position::from_in_element(&tree, end, 0).unwrap();
    MoveOperation::new(range, target)
      .execute(&mut tree)
      .unwrap();
    assert_eq!(tree.text_content(first).unwrap(), "ab");
    assert_eq!(tree.text_content(second).unwrap(), "e");
    assert_eq!(tree.text_content(end).unwrap(), "cd");
    tree.validate().unwrap();
  }
}
