use crate::{
  commands::Command,
  error::{
    ModelError,
    Result,
  },
  mapper::Bias,
  position::Position,
  range::Range,
  state::State,
  transaction::Transaction,
  tree::{
    NodeId,
    Tree,
  },
};

const LIST_TAGS: &[&str] = &["ul", "ol"];
const LIST_ITEM_TAG: &str = "li";

fn is_list(tree: &Tree, node: NodeId) -> bool {
  tree
    .get(node)
    .and_then(|node| node.tag())
    .is_some_and(|tag| LIST_TAGS.contains(&tag))
}

fn is_list_item(tree: &Tree, node: NodeId) -> bool {
  tree.get(node).is_some_and(|node| node.has_tag(LIST_ITEM_TAG))
}

fn closest_item(tree: &Tree, position: &Position) -> Result<NodeId> {
  let parent = position.parent(tree)?;
  std::iter::once(parent)
    .chain(tree.ancestors(parent))
    .find(|node| is_list_item(tree, *node))
    .ok_or_else(|| ModelError::type_assertion(parent, "position is not inside a list item"))
}

/// Lifts `item` to the enclosing list item that is a child of `list`.
fn item_in(tree: &Tree, item: NodeId, list: NodeId) -> Option<NodeId> {
  std::iter::once(item)
    .chain(tree.ancestors(item))
    .find(|node| is_list_item(tree, *node) && tree.parent(*node) == Some(list))
}

/// The list holding the items a range touches, and those items in order.
fn selected_items(tree: &Tree, range: &Range) -> Result<(NodeId, Vec<NodeId>)> {
  let mut start = closest_item(tree, range.start())?;
  let mut end = closest_item(tree, range.end())?;
  let start_list = tree
    .parent(start)
    .ok_or_else(|| ModelError::illegal("list item without a parent"))?;
  let end_list = tree
    .parent(end)
    .ok_or_else(|| ModelError::illegal("list item without a parent"))?;

  if start_list != end_list {
    if let Some(lifted) = item_in(tree, end, start_list) {
      end = lifted;
    } else if let Some(lifted) = item_in(tree, start, end_list) {
      start = lifted;
    } else {
      return Err(ModelError::model("selection spans unrelated lists"));
    }
  }

  let list = tree
    .parent(start)
    .ok_or_else(|| ModelError::illegal("list item without a parent"))?;
  let children = tree.children(list)?;
  let from = tree.index_in_parent(start)?.unwrap_or_default();
  let to = tree.index_in_parent(end)?.unwrap_or_default();
  let items = children[from..=to.max(from)]
    .iter()
    .copied()
    .filter(|child| is_list_item(tree, *child))
    .collect();
  Ok((list, items))
}

fn item_span(tree: &Tree, items: &[NodeId]) -> Result<Range> {
  let (Some(first), Some(last)) = (items.first(), items.last()) else {
    return Err(ModelError::model("no list items selected"));
  };
  Range::new(
    Position::from_before_node(tree, *first)?,
    Position::from_after_node(tree, *last)?,
  )
}

fn previous_item(tree: &Tree, list: NodeId, item: NodeId) -> Result<Option<NodeId>> {
  let index = tree.index_in_parent(item)?.unwrap_or_default();
  Ok(
    tree.children(list)?[..index]
      .iter()
      .rev()
      .copied()
      .find(|child| is_list_item(tree, *child)),
  )
}

/// Keeps the selection on the content it covered before an edit.
fn remap_selection(transaction: &mut Transaction, checkpoint: usize) {
  let selection = transaction.working_copy().selection().map(
    &transaction.mapper_since(checkpoint),
    Bias::Right,
    Bias::Left,
  );
  transaction.set_selection(selection);
}

/// Nests the selected list items under the item before them, reusing a list
/// that already ends that item.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndentListCommand;

impl Command for IndentListCommand {
  type Args = ();
  type Output = ();

  fn name(&self) -> &'static str {
    "indent-list"
  }

  fn can_execute(&self, state: &State, _: &()) -> bool {
    let tree = state.document();
    let Ok(range) = state.selection().single_range() else {
      return false;
    };
    let Ok((list, items)) = selected_items(tree, range) else {
      return false;
    };
    items
      .first()
      .is_some_and(|first| matches!(previous_item(tree, list, *first), Ok(Some(_))))
  }

  fn execute(&self, transaction: &mut Transaction, _: ()) -> Result<()> {
    let checkpoint = transaction.steps().len();
    let range = transaction.working_copy().selection().single_range()?.clone();
    let tree = transaction.document();
    let (list, items) = selected_items(tree, &range)?;
    let Some(first) = items.first().copied() else {
      return Err(ModelError::model("no list items selected"));
    };
    let previous = previous_item(tree, list, first)?.ok_or_else(|| {
      ModelError::type_assertion(first, "first indented item has no list item before it")
    })?;
    let tag = tree.node(list)?.tag().unwrap_or("ul").to_string();
    let nested = tree
      .children(previous)?
      .last()
      .copied()
      .filter(|child| is_list(tree, *child));

    let target = match nested {
      Some(nested) => {
        let tree = transaction.document();
        Position::from_in_element(tree, nested, tree.max_offset(nested)?)?
      },
      None => {
        let end = {
          let tree = transaction.document();
          Position::from_in_element(tree, previous, tree.max_offset(previous)?)?
        };
        let nested = transaction.create_element(&tag);
        transaction.insert_at_position(&end, vec![nested])?;
        Position::from_in_element(transaction.document(), nested, 0)?
      },
    };

    let moved = item_span(transaction.document(), &items)?;
    transaction.move_to_position(&moved, &target)?;
    tracing::debug!(items = items.len(), "indented list items");
    remap_selection(transaction, checkpoint);
    Ok(())
  }
}

/// Moves the selected items of a nested list out to the list holding it,
/// right after the item they were nested in.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnindentListCommand;

impl UnindentListCommand {
  /// The selected items and the list holding the item they are nested in.
  fn target(tree: &Tree, range: &Range) -> Result<(Vec<NodeId>, NodeId)> {
    let (list, items) = selected_items(tree, range)?;
    let outer_item = tree
      .parent(list)
      .filter(|parent| is_list_item(tree, *parent))
      .ok_or_else(|| ModelError::type_assertion(list, "list is not nested in a list item"))?;
    let outer_list = tree
      .parent(outer_item)
      .filter(|parent| is_list(tree, *parent))
      .ok_or_else(|| ModelError::type_assertion(outer_item, "list item is not inside a list"))?;
    Ok((items, outer_list))
  }
}

impl Command for UnindentListCommand {
  type Args = ();
  type Output = ();

  fn name(&self) -> &'static str {
    "unindent-list"
  }

  fn can_execute(&self, state: &State, _: &()) -> bool {
    state
      .selection()
      .single_range()
      .is_ok_and(|range| Self::target(state.document(), range).is_ok())
  }

  fn execute(&self, transaction: &mut Transaction, _: ()) -> Result<()> {
    let checkpoint = transaction.steps().len();
    let range = transaction.working_copy().selection().single_range()?.clone();
    let (items, outer_list) = Self::target(transaction.document(), &range)?;
    let moved = item_span(transaction.document(), &items)?;

    // Cut the nested list and its item around the selected items so they
    // end up alone in an item of the outer list.
    let split = transaction.split_range_until_elements(&moved, outer_list, outer_list, false)?;
    let tree = transaction.document();
    let holder = split
      .start()
      .node_after(tree)?
      .ok_or_else(|| ModelError::illegal("split left nothing after its start"))?;
    let inner = tree
      .children(holder)?
      .iter()
      .copied()
      .find(|child| is_list(tree, *child))
      .ok_or_else(|| ModelError::type_assertion(holder, "split item holds no list"))?;

    transaction.unwrap(inner, false)?;
    transaction.unwrap(holder, false)?;
    tracing::debug!(items = items.len(), "unindented list items");
    remap_selection(transaction, checkpoint);
    Ok(())
  }
}
