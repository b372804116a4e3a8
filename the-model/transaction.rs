//! Units of work against a [`State`].
//!
//! A [`Transaction`] clones the state it is opened on and records every edit
//! as a [`Step`]. Operation steps carry the [`RangeMapper`] of the operation,
//! so anything captured against the original state can be mapped onto the
//! working copy with [`Transaction::mapper`]. Steps run eagerly: each one
//! sees the tree left by the previous one.
//!
//! A step that fails aborts the transaction. The working copy may then be
//! half edited, so [`Transaction::commit`] refuses to publish it and every
//! further edit fails with [`ModelError::AbortedTransaction`].
//!
//! ```ignore
//! let mut transaction = state.transaction();
//! let range = transaction.working_copy().selection().single_range()?.clone();
//! transaction.insert_text(&range, "hello", None)?;
//! transaction.map_initial_selection_and_set(Bias::Right, Bias::Right);
//! let state = transaction.commit()?;
//! ```

use indexmap::IndexMap;

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
    MarkAttributes,
    MarkSet,
  },
  mutator::{
    ExecutedOperation,
    Mutator,
  },
  position::Position,
  range::Range,
  selection::Selection,
  state::State,
  tree::{
    NodeId,
    Tree,
  },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
  /// An executed operation and its mapper.
  Operation(ExecutedOperation),
  /// The selection was replaced. Positions are unaffected.
  Selection(Selection),
  /// One config key was replaced. Positions are unaffected.
  Config {
    key:   String,
    value: Option<String>,
  },
}

impl Step {
  pub fn mapper(&self) -> Option<&RangeMapper> {
    match self {
      Self::Operation(executed) => Some(&executed.result.mapper),
      Self::Selection(_) | Self::Config { .. } => None,
    }
  }
}

#[derive(Debug, Clone)]
pub struct Transaction {
  initial_selection: Selection,
  working_copy:      State,
  steps:             Vec<Step>,
  aborted:           bool,
}

impl Transaction {
  pub fn new(state: &State) -> Self {
    Self {
      initial_selection: state.selection.clone(),
      working_copy:      state.clone(),
      steps:             Vec::new(),
      aborted:           false,
    }
  }

  /// The in-progress state.
  pub fn working_copy(&self) -> &State {
    &self.working_copy
  }

  pub fn document(&self) -> &Tree {
    &self.working_copy.document
  }

  pub fn steps(&self) -> &[Step] {
    &self.steps
  }

  pub fn is_aborted(&self) -> bool {
    self.aborted
  }

  /// All operation mappers so far, in order.
  pub fn mapper(&self) -> RangeMapper {
    self.mapper_since(0)
  }

  /// Mappers of the steps from index `step` on, for edits that only need to
  /// map what they captured themselves.
  pub fn mapper_since(&self, step: usize) -> RangeMapper {
    let mut mapper = RangeMapper::identity();
    for step in self.steps.iter().skip(step) {
      if let Some(step_mapper) = step.mapper() {
        mapper.append(step_mapper);
      }
    }
    mapper
  }

  /// Maps a position captured against the original state.
  pub fn map_position(&self, position: &Position, bias: Bias) -> Position {
    self.mapper().map_position(position, bias)
  }

  pub fn map_range(&self, range: &Range, start_bias: Bias, end_bias: Bias) -> Range {
    self.mapper().map_range(range, start_bias, end_bias)
  }

  /// Maps the selection of the original state onto the working copy and
  /// selects the result.
  pub fn map_initial_selection_and_set(&mut self, start_bias: Bias, end_bias: Bias) {
    let selection = self
      .initial_selection
      .map(&self.mapper(), start_bias, end_bias);
    self.set_selection(selection);
  }

  pub fn set_selection(&mut self, selection: Selection) {
    self.working_copy.selection = selection.clone();
    self.steps.push(Step::Selection(selection));
  }

  pub fn select_range(&mut self, range: Range) {
    self.set_selection(Selection::single(range));
  }

  pub fn set_config(&mut self, key: impl Into<String>, value: Option<String>) {
    let key = key.into();
    self.working_copy.config.set(key.clone(), value.clone());
    self.steps.push(Step::Config { key, value });
  }

  /// Publishes the working copy as a new state.
  pub fn commit(self) -> Result<State> {
    if self.aborted {
      return Err(ModelError::AbortedTransaction);
    }
    let mut state = self.working_copy;
    state.version += 1;
    tracing::debug!(
      steps = self.steps.len(),
      version = state.version,
      "committed transaction"
    );
    Ok(state)
  }

  /// Runs an edit through a [`Mutator`] over the working copy, recording its
  /// operations as steps.
  pub fn mutate<T>(&mut self, edit: impl FnOnce(&mut Mutator<'_>) -> Result<T>) -> Result<T> {
    if self.aborted {
      return Err(ModelError::AbortedTransaction);
    }
    let mut mutator = Mutator::new(&mut self.working_copy.document);
    let outcome = edit(&mut mutator);
    self
      .steps
      .extend(mutator.into_executed().into_iter().map(Step::Operation));
    if let Err(err) = &outcome {
      tracing::debug!(%err, "transaction step failed, aborting");
      self.aborted = true;
    }
    outcome
  }

  pub fn create_element(&mut self, tag: &str) -> NodeId {
    self.working_copy.document.create_element(tag)
  }

  pub fn create_text(&mut self, content: &str, marks: MarkSet) -> NodeId {
    self.working_copy.document.create_text(content, marks)
  }

  /// Creates a detached component node. The name must be registered.
  pub fn create_inline_component(
    &mut self,
    name: &str,
    props: IndexMap<String, String>,
  ) -> Result<NodeId> {
    let spec = self.working_copy.inline_components.require(name)?;
    Ok(
      self
        .working_copy
        .document
        .create_inline_component(spec.name.as_str(), props),
    )
  }

  pub fn insert_nodes(&mut self, range: &Range, nodes: Vec<NodeId>) -> Result<Range> {
    self.mutate(|mutator| mutator.insert_nodes(range, nodes))
  }

  pub fn insert_at_position(&mut self, position: &Position, nodes: Vec<NodeId>) -> Result<Range> {
    self.mutate(|mutator| mutator.insert_at_position(position, nodes))
  }

  pub fn insert_text(&mut self, range: &Range, text: &str, marks: Option<MarkSet>) -> Result<Range> {
    self.mutate(|mutator| mutator.insert_text(range, text, marks))
  }

  pub fn delete(&mut self, range: &Range) -> Result<Range> {
    self.mutate(|mutator| mutator.delete(range))
  }

  pub fn move_to_position(&mut self, range: &Range, target: &Position) -> Result<Range> {
    self.mutate(|mutator| mutator.move_to_position(range, target))
  }

  pub fn split_text_at(&mut self, position: &Position) -> Result<Position> {
    self.mutate(|mutator| mutator.split_text_at(position))
  }

  pub fn split_until(
    &mut self,
    position: &Position,
    predicate: impl Fn(&Tree, NodeId) -> bool,
    split_at_ends: bool,
  ) -> Result<Position> {
    self.mutate(|mutator| mutator.split_until(position, predicate, split_at_ends))
  }

  pub fn split_until_element(
    &mut self,
    position: &Position,
    element: NodeId,
    split_at_ends: bool,
  ) -> Result<Position> {
    self.mutate(|mutator| mutator.split_until_element(position, element, split_at_ends))
  }

  pub fn split_range_until_elements(
    &mut self,
    range: &Range,
    start_limit: NodeId,
    end_limit: NodeId,
    split_at_ends: bool,
  ) -> Result<Range> {
    self.mutate(|mutator| {
      mutator.split_range_until_elements(range, start_limit, end_limit, split_at_ends)
    })
  }

  pub fn merge_text_nodes_in_range(&mut self, range: &Range) -> Result<()> {
    self.mutate(|mutator| mutator.merge_text_nodes_in_range(range))
  }

  pub fn unwrap(&mut self, element: NodeId, ensure_block: bool) -> Result<Range> {
    self.mutate(|mutator| mutator.unwrap(element, ensure_block))
  }

  pub fn wrap_in_element(&mut self, range: &Range, tag: &str) -> Result<(NodeId, Range)> {
    self.mutate(|mutator| mutator.wrap_in_element(range, tag))
  }

  pub fn replace_nodes(&mut self, old: &[NodeId], nodes: Vec<NodeId>) -> Result<Range> {
    self.mutate(|mutator| mutator.replace_nodes(old, nodes))
  }

  pub fn remove_nodes(&mut self, nodes: &[NodeId]) -> Result<()> {
    self.mutate(|mutator| mutator.remove_nodes(nodes))
  }

  /// Adds the mark registered as `name`.
  pub fn add_mark(&mut self, range: &Range, name: &str, attributes: MarkAttributes) -> Result<Range> {
    let marks = self.working_copy.marks.clone();
    self.mutate(|mutator| mutator.add_mark(range, marks.mark(name, attributes)?))
  }

  pub fn remove_mark(&mut self, range: &Range, name: &str) -> Result<Range> {
    let marks = self.working_copy.marks.clone();
    self.mutate(|mutator| mutator.remove_mark(range, marks.mark(name, MarkAttributes::new())?))
  }

  pub fn set_attribute(&mut self, node: NodeId, key: &str, value: &str) -> Result<()> {
    self.mutate(|mutator| mutator.set_attribute(node, key, value))
  }

  pub fn remove_attribute(&mut self, node: NodeId, key: &str) -> Result<()> {
    self.mutate(|mutator| mutator.remove_attribute(node, key))
  }
}
