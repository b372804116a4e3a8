//! Position mapping across tree edits.
//!
//! Every operation reports a [`RangeMapper`] that translates positions taken
//! on the tree before it ran into positions on the tree after it. A mapper is
//! a list of elementary steps applied in order, so composing two mappers is
//! concatenation and mapping through a composition equals mapping through
//! each part in turn.

use crate::{
  position::{
    Path,
    Position,
  },
  range::Range,
};

/// Which side a position sticks to when the content around it is replaced
/// or inserted exactly at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
  Left,
  Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MapStep {
  /// Offsets `from..to` of `parent` were replaced by `inserted` offsets.
  Replace {
    parent:   Path,
    from:     usize,
    to:       usize,
    inserted: usize,
  },
  /// The element starting at `offset` of `parent` was split at its inner
  /// offset `at`; the tail became a new sibling at `offset + 1`.
  Split {
    parent: Path,
    offset: usize,
    at:     usize,
  },
  /// Offsets `from..to` of `parent` were moved to `target`, expressed on the
  /// tree with the moved content already removed.
  Move {
    parent: Path,
    from:   usize,
    to:     usize,
    target: Position,
  },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeMapper {
  steps: Vec<MapStep>,
}

impl RangeMapper {
  pub fn identity() -> Self {
    Self::default()
  }

  pub(crate) fn replace(parent: &[usize], from: usize, to: usize, inserted: usize) -> Self {
    if from == to && inserted == 0 {
      return Self::identity();
    }
    Self {
      steps: vec![MapStep::Replace {
        parent: Path::from_slice(parent),
        from,
        to,
        inserted,
      }],
    }
  }

  pub(crate) fn split(parent: &[usize], offset: usize, at: usize) -> Self {
    Self {
      steps: vec![MapStep::Split {
        parent: Path::from_slice(parent),
        offset,
        at,
      }],
    }
  }

  pub(crate) fn move_range(parent: &[usize], from: usize, to: usize, target: Position) -> Self {
    if from == to {
      return Self::identity();
    }
    Self {
      steps: vec![MapStep::Move {
        parent: Path::from_slice(parent),
        from,
        to,
        target,
      }],
    }
  }

  pub fn is_identity(&self) -> bool {
    self.steps.is_empty()
  }

  /// Mapper equivalent to applying `self` and then `next`.
  pub fn then(mut self, next: RangeMapper) -> Self {
    self.steps.extend(next.steps);
    self
  }

  pub fn append(&mut self, next: &RangeMapper) {
    self.steps.extend(next.steps.iter().cloned());
  }

  pub fn map_position(&self, position: &Position, bias: Bias) -> Position {
    let mut path = Path::from_slice(position.path());
    for step in &self.steps {
      match step {
        MapStep::Replace {
          parent,
          from,
          to,
          inserted,
        } => map_replace(&mut path, parent, *from, *to, *inserted, bias),
        MapStep::Split { parent, offset, at } => map_split(&mut path, parent, *offset, *at, bias),
        MapStep::Move {
          parent,
          from,
          to,
          target,
        } => map_move(&mut path, parent, *from, *to, target, bias),
      }
    }
    Position::new(path)
  }

  /// Maps both ends. An end that would land before the start is clamped to
  /// it.
  pub fn map_range(&self, range: &Range, start_bias: Bias, end_bias: Bias) -> Range {
    let start = self.map_position(range.start(), start_bias);
    let end = self.map_position(range.end(), end_bias);
    Range::ordered(start, end)
  }
}

fn bias_offset(bias: Bias, left: usize, right: usize) -> usize {
  match bias {
    Bias::Left => left,
    Bias::Right => right,
  }
}

fn has_prefix(path: &[usize], parent: &[usize]) -> bool {
  path.len() > parent.len() && path[..parent.len()] == *parent
}

fn map_replace(path: &mut Path, parent: &[usize], from: usize, to: usize, inserted: usize, bias: Bias) {
  if !has_prefix(path, parent) {
    return;
  }
  let depth = parent.len();
  let offset = path[depth];
  let shifted = |offset: usize| offset - (to - from) + inserted;

  if path.len() == depth + 1 {
    path[depth] = if offset < from {
      offset
    } else if offset > to {
      shifted(offset)
    } else if from == to {
      bias_offset(bias, from, from + inserted)
    } else if offset == from {
      from
    } else if offset == to {
      from + inserted
    } else {
      bias_offset(bias, from, from + inserted)
    };
  } else if offset >= to {
    path[depth] = shifted(offset);
  } else if offset >= from {
    // The element holding the position is gone.
    path.truncate(depth + 1);
    path[depth] = bias_offset(bias, from, from + inserted);
  }
}

fn map_split(path: &mut Path, parent: &[usize], offset: usize, at: usize, bias: Bias) {
  if !has_prefix(path, parent) {
    return;
  }
  let depth = parent.len();
  let current = path[depth];
  if current > offset {
    path[depth] = current + 1;
    return;
  }
  if current < offset || path.len() == depth + 1 {
    return;
  }

  let inner = path[depth + 1];
  let moves = if path.len() > depth + 2 {
    inner >= at
  } else {
    inner > at || (inner == at && bias == Bias::Right)
  };
  if moves {
    path[depth] = offset + 1;
    path[depth + 1] = inner - at;
  }
}

fn map_move(path: &mut Path, parent: &[usize], from: usize, to: usize, target: &Position, bias: Bias) {
  if has_prefix(path, parent) {
    let depth = parent.len();
    let offset = path[depth];
    let inside = if path.len() > depth + 1 {
      from <= offset && offset < to
    } else {
      (from < offset && offset < to)
        || (offset == from && bias == Bias::Right)
        || (offset == to && bias == Bias::Left)
    };
    if inside {
      let mut moved = Path::from_slice(target.parent_path());
      moved.push(target.parent_offset() + (offset - from));
      moved.extend_from_slice(&path[depth + 1..]);
      *path = moved;
      return;
    }
  }

  map_replace(path, parent, from, to, 0, bias);
  let at = target.parent_offset();
  map_replace(path, target.parent_path(), at, at, to - from, bias);
}
