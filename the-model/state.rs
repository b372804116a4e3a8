use std::sync::Arc;

use crate::{
  commands::Command,
  config::EditorConfig,
  error::{
    ModelError,
    Result,
  },
  inline_component::InlineComponentRegistry,
  marks::MarkRegistry,
  selection::Selection,
  transaction::Transaction,
  tree::Tree,
};

/// A document version: the tree, what is selected in it and the registries
/// commands resolve names against. States are never edited in place; a
/// [`Transaction`] works on a copy and commits a new state.
#[derive(Debug, Clone)]
pub struct State {
  pub(crate) document:          Tree,
  pub(crate) selection:         Selection,
  pub(crate) config:            EditorConfig,
  pub(crate) marks:             Arc<MarkRegistry>,
  pub(crate) inline_components: Arc<InlineComponentRegistry>,
  pub(crate) version:           u64,
}

impl State {
  pub fn new(
    document: Tree,
    marks: Arc<MarkRegistry>,
    inline_components: Arc<InlineComponentRegistry>,
  ) -> Self {
    Self {
      document,
      selection: Selection::default(),
      config: EditorConfig::default(),
      marks,
      inline_components,
      version: 0,
    }
  }

  /// An empty document under `root_tag` with the built-in marks.
  pub fn with_defaults(root_tag: &str) -> Self {
    Self::new(
      Tree::new(root_tag),
      Arc::new(MarkRegistry::with_defaults()),
      Arc::new(InlineComponentRegistry::new()),
    )
  }

  pub fn with_selection(mut self, selection: Selection) -> Self {
    self.selection = selection;
    self
  }

  pub fn with_config(mut self, config: EditorConfig) -> Self {
    self.config = config;
    self
  }

  pub fn document(&self) -> &Tree {
    &self.document
  }

  pub fn selection(&self) -> &Selection {
    &self.selection
  }

  pub fn config(&self) -> &EditorConfig {
    &self.config
  }

  pub fn marks(&self) -> &Arc<MarkRegistry> {
    &self.marks
  }

  pub fn inline_components(&self) -> &Arc<InlineComponentRegistry> {
    &self.inline_components
  }

  /// Number of commits this state descends from.
  pub fn version(&self) -> u64 {
    self.version
  }

  pub fn transaction(&self) -> Transaction {
    Transaction::new(self)
  }

  /// Runs one command in its own transaction and commits it.
  pub fn execute<C: Command>(&self, command: &C, args: C::Args) -> Result<(State, C::Output)> {
    if !command.can_execute(self, &args) {
      return Err(ModelError::model(format!(
        "{} cannot execute in the current state",
        command.name()
      )));
    }
    let mut transaction = self.transaction();
    let output = command.execute(&mut transaction, args)?;
    Ok((transaction.commit()?, output))
  }
}
