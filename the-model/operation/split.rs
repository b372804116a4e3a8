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
    resolve,
  },
  position::{
    Path,
    Position,
  },
  range::Range,
  tree::Tree,
};

/// Splits at the ends of a range.
///
/// With `split_parent` the element holding each end is divided into two
/// siblings at that point; the tail half is a shallow copy carrying the same
/// tag and attributes. Without it only a text node around the point is split,
/// which leaves every position where it was. The root element is never
/// split. A non-collapsed range is split at its end first, then at its start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOperation {
  pub(crate) range: Range,
  split_parent:     bool,
}

impl SplitOperation {
  pub fn new(range: Range, split_parent: bool) -> Self {
    Self {
      range,
      split_parent,
    }
  }

  pub fn split_parent(&self) -> bool {
    self.split_parent
  }

  pub fn execute(&self, tree: &mut Tree) -> Result<OperationResult> {
    resolve(tree, self.range.start())?;
    resolve(tree, self.range.end())?;

    if self.range.is_collapsed() {
      let (mapper, boundary) = self.split_at(tree, self.range.start())?;
      return Ok(OperationResult {
        range: Range::collapsed(boundary),
        mapper,
      });
    }

    let (mut mapper, end) = self.split_at(tree, self.range.end())?;
    let (start_mapper, start) = self.split_at(tree, self.range.start())?;
    let end = start_mapper.map_position(&end, Bias::Left);
    mapper.append(&start_mapper);
    Ok(OperationResult {
      range: Range::new(start, end)?,
      mapper,
    })
  }

  /// Splits at one position, returning the mapper and the boundary between
  /// the two halves.
  fn split_at(&self, tree: &mut Tree, position: &Position) -> Result<(RangeMapper, Position)> {
    let element = position.parent(tree)?;
    let offset = position.parent_offset();

    if !self.split_parent {
      if let Some((text, index)) = position.text_index(tree)? {
        tree.split_text(text, index)?;
      }
      return Ok((RangeMapper::identity(), position.clone()));
    }

    if element == tree.root() {
      return Err(ModelError::illegal("the root element cannot be split"));
    }
    let index = tree.split_at_offset(element, offset)?;
    let tail: Vec<_> = tree.children(element)?[index..].to_vec();
    for child in &tail {
      tree.detach(*child)?;
    }

    let copy = tree
      .node(element)?
      .shallow_clone();
    let parent = tree
      .parent(element)
      .ok_or_else(|| ModelError::illegal("split element has no parent"))?;
    let at = tree.index_in_parent(element)?.unwrap_or_default() + 1;
    let copy = tree.insert_detached(copy);
    tree.insert_children(copy, 0, &tail)?;
    tree.insert_children(parent, at, &[copy])?;

    let parent_path = position.parent_path();
    let grand_path = &parent_path[..parent_path.len() - 1];
    let element_offset = parent_path[parent_path.len() - 1];
    let mut boundary = Path::from_slice(grand_path);
    boundary.push(element_offset + 1);
    Ok((
      RangeMapper::split(grand_path, element_offset, offset),
      Position::new(boundary),
    ))
  }
}
