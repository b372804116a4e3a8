use crate::{
  commands::Command,
  error::Result,
  range::Range,
  state::State,
  transaction::Transaction,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertTextArgs {
  pub text:  String,
  /// Where to insert. The selection when absent.
  pub range: Option<Range>,
}

/// Types text over a range and leaves the cursor after it.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertTextCommand;

impl Command for InsertTextCommand {
  type Args = InsertTextArgs;
  type Output = Range;

  fn name(&self) -> &'static str {
    "insert-text"
  }

  fn can_execute(&self, state: &State, args: &Self::Args) -> bool {
    args.range.is_some() || state.selection().single_range().is_ok()
  }

  fn execute(&self, transaction: &mut Transaction, args: Self::Args) -> Result<Range> {
    let range = match args.range {
      Some(range) => range,
      None => transaction.working_copy().selection().single_range()?.clone(),
    };
    let inserted = transaction.insert_text(&range, &args.text, None)?;
    transaction.select_range(inserted.collapse(false));
    Ok(inserted)
  }
}

/// Removes the selected content and collapses the selection where it was.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteSelectionCommand;

impl Command for DeleteSelectionCommand {
  type Args = ();
  type Output = ();

  fn name(&self) -> &'static str {
    "delete-selection"
  }

  fn can_execute(&self, state: &State, _: &()) -> bool {
    state
      .selection()
      .single_range()
      .is_ok_and(|range| !range.is_collapsed())
  }

  fn execute(&self, transaction: &mut Transaction, _: ()) -> Result<()> {
    let range = transaction.working_copy().selection().single_range()?.clone();
    let removed = transaction.delete(&range)?;
    transaction.select_range(removed);
    Ok(())
  }
}
