use crate::{
  error::{
    ModelError,
    Result,
  },
  mapper::RangeMapper,
  operation::{
    OperationResult,
    insert_at,
    remove_range,
    resolve,
  },
  position::Position,
  range::Range,
  tree::{
    NodeId,
    Tree,
  },
};

/// Replaces the content of a range with detached nodes. With no nodes it is
/// a plain deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOperation {
  pub(crate) range: Range,
  nodes:            Vec<NodeId>,
}

impl InsertOperation {
  pub fn new(range: Range, nodes: Vec<NodeId>) -> Self {
    Self { range, nodes }
  }

  pub fn nodes(&self) -> &[NodeId] {
    &self.nodes
  }

  pub fn execute(&self, tree: &mut Tree) -> Result<OperationResult> {
    for node in &self.nodes {
      if tree.node(*node)?.parent().is_some() {
        return Err(ModelError::illegal(format!(
          "node {node:?} must be detached before it is inserted"
        )));
      }
    }
    resolve(tree, self.range.start())?;
    resolve(tree, self.range.end())?;

    let mut mapper = remove_range(tree, &self.range)?;
    let start = self.range.start();
    let inserted = insert_at(tree, start, &self.nodes)?;
    let offset = start.parent_offset();
    mapper.append(&RangeMapper::replace(
      start.parent_path(),
      offset,
      offset,
      inserted,
    ));

    Ok(OperationResult {
      range: Range::new(start.clone(), start.with_offset(offset + inserted))?,
      mapper,
    })
  }
}

/// Convenience for callers that insert at a single position.
pub(crate) fn insert_nodes_at(
  tree: &mut Tree,
  position: Position,
  nodes: Vec<NodeId>,
) -> Result<OperationResult> {
  InsertOperation::new(Range::collapsed(position), nodes).execute(tree)
}
