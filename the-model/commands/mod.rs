//! Editing commands.
//!
//! A command reads the working copy of a transaction and issues edits
//! through it. [`crate::state::State::execute`] runs one command in its own
//! transaction.

mod list;
mod marks;
mod text;

pub use list::{
  IndentListCommand,
  UnindentListCommand,
};
pub use marks::{
  AddMarkToSelectionCommand,
  MarkArgs,
  RemoveMarkFromSelectionCommand,
};
pub use text::{
  DeleteSelectionCommand,
  InsertTextArgs,
  InsertTextCommand,
};

use crate::{
  error::Result,
  state::State,
  transaction::Transaction,
};

pub trait Command {
  type Args;
  type Output;

  fn name(&self) -> &'static str;

  /// Whether the command applies to `state`. Defaults to always.
  fn can_execute(&self, state: &State, args: &Self::Args) -> bool {
    let _ = (state, args);
    true
  }

  fn execute(&self, transaction: &mut Transaction, args: Self::Args) -> Result<Self::Output>;
}
