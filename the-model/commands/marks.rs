use crate::{
  commands::Command,
  error::Result,
  marks::MarkAttributes,
  state::State,
  transaction::Transaction,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkArgs {
  pub name:       String,
  pub attributes: MarkAttributes,
}

impl MarkArgs {
  pub fn named(name: &str) -> Self {
    Self {
      name:       name.to_string(),
      attributes: MarkAttributes::new(),
    }
  }
}

fn selection_and_mark_known(state: &State, args: &MarkArgs) -> bool {
  state.selection().single_range().is_ok() && state.marks().lookup_mark(&args.name).is_some()
}

/// Applies a registered mark to the selection. On a collapsed selection the
/// mark applies to text typed next.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddMarkToSelectionCommand;

impl Command for AddMarkToSelectionCommand {
  type Args = MarkArgs;
  type Output = ();

  fn name(&self) -> &'static str {
    "add-mark-to-selection"
  }

  fn can_execute(&self, state: &State, args: &MarkArgs) -> bool {
    selection_and_mark_known(state, args)
  }

  fn execute(&self, transaction: &mut Transaction, args: MarkArgs) -> Result<()> {
    let range = transaction.working_copy().selection().single_range()?.clone();
    let marked = transaction.add_mark(&range, &args.name, args.attributes)?;
    transaction.select_range(marked);
    Ok(())
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveMarkFromSelectionCommand;

impl Command for RemoveMarkFromSelectionCommand {
  type Args = MarkArgs;
  type Output = ();

  fn name(&self) -> &'static str {
    "remove-mark-from-selection"
  }

  fn can_execute(&self, state: &State, args: &MarkArgs) -> bool {
    selection_and_mark_known(state, args)
  }

  fn execute(&self, transaction: &mut Transaction, args: MarkArgs) -> Result<()> {
    let range = transaction.working_copy().selection().single_range()?.clone();
    let unmarked = transaction.remove_mark(&range, &args.name)?;
    transaction.select_range(unmarked);
    Ok(())
  }
}
