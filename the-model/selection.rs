//! The set of ranges the user has selected.

use smallvec::{
  SmallVec,
  smallvec,
};

use crate::{
  error::{
    ModelError,
    Result,
  },
  mapper::{
    Bias,
    RangeMapper,
  },
  position::Position,
  range::Range,
};

/// Ordered ranges. Usually exactly one; an empty selection means nothing is
/// selected (the document has no focus).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
  ranges: SmallVec<[Range; 1]>,
}

impl Selection {
  pub fn new(ranges: impl IntoIterator<Item = Range>) -> Self {
    Self {
      ranges: ranges.into_iter().collect(),
    }
  }

  pub fn single(range: Range) -> Self {
    Self {
      ranges: smallvec![range],
    }
  }

  pub fn cursor(position: Position) -> Self {
    Self::single(Range::collapsed(position))
  }

  pub fn ranges(&self) -> &[Range] {
    &self.ranges
  }

  pub fn is_empty(&self) -> bool {
    self.ranges.is_empty()
  }

  /// The only range, failing when there are none or several.
  pub fn single_range(&self) -> Result<&Range> {
    match self.ranges.as_slice() {
      [range] => Ok(range),
      ranges => {
        Err(ModelError::MisbehavedSelection {
          ranges: ranges.len(),
        })
      },
    }
  }

  pub fn last_range(&self) -> Option<&Range> {
    self.ranges.last()
  }

  /// Whether every range is collapsed. An empty selection is not.
  pub fn is_collapsed(&self) -> bool {
    !self.ranges.is_empty() && self.ranges.iter().all(Range::is_collapsed)
  }

  pub fn map(&self, mapper: &RangeMapper, start_bias: Bias, end_bias: Bias) -> Self {
    Self {
      ranges: self
        .ranges
        .iter()
        .map(|range| mapper.map_range(range, start_bias, end_bias))
        .collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn single_range_requires_exactly_one() {
    assert!(matches!(
      Selection::default().single_range(),
      Err(ModelError::MisbehavedSelection { ranges: 0 })
    ));

    let cursor = Range::collapsed(Position::new(vec![1]));
    let selection = Selection::single(cursor.clone());
    assert_eq!(selection.single_range().unwrap(), &cursor);
    assert!(selection.is_collapsed());

    let wide = Range::new(Position::new(vec![0]), Position::new(vec![2])).unwrap();
    let selection = Selection::new([cursor, wide.clone()]);
    assert!(selection.single_range().is_err());
    assert_eq!(selection.last_range(), Some(&wide));
    assert!(!selection.is_collapsed());
  }

  #[test]
  fn maps_every_range() {
    let selection = Selection::new([
      Range::collapsed(Position::new(vec![1])),
      Range::collapsed(Position::new(vec![4])),
    ]);
    let mapper = RangeMapper::replace(&[], 2, 2, 3);
    let mapped = selection.map(&mapper, Bias::Right, Bias::Right);
    let offsets: Vec<usize> = mapped
      .ranges()
      .iter()
      .map(|range| range.start().parent_offset())
      .collect();
    assert_eq!(offsets, vec![1, 7]);
  }
}
