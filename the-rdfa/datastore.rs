//! Queryable index of the quads a document asserts.
//!
//! A [`Datastore`] pairs a dataset with the node mapping tables produced by
//! [`parse`]. Transformers return a new store over the same tables with a
//! filtered dataset, so lookups of a filtered-out quad's nodes still work.
//! Consumers project only the live dataset.

use std::sync::Arc;

use indexmap::IndexSet;
use the_model::{
  range::{
    ContextStrategy,
    Range,
  },
  tree::{
    NodeId,
    Tree,
  },
};

use crate::{
  config::DatastoreConfig,
  error::Result,
  parse::{
    NodeMapping,
    ParsedDocument,
    QuadNodes,
    parse,
  },
  term::{
    Quad,
    Term,
    TermPattern,
  },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuadResult {
  pub quad:  Quad,
  pub nodes: QuadNodes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
  Subject,
  Predicate,
  Object,
}

#[derive(Debug, Clone)]
pub struct Datastore {
  parsed:  Arc<ParsedDocument>,
  dataset: IndexSet<Quad>,
  config:  Arc<DatastoreConfig>,
}

impl Datastore {
  pub fn from_parse(tree: &Tree, config: impl Into<Arc<DatastoreConfig>>) -> Result<Self> {
    let config = config.into();
    let parsed = parse(tree, &config)?;
    let dataset = parsed.quads.keys().cloned().collect();
    let store = Self {
      parsed: Arc::new(parsed),
      dataset,
      config,
    };
    tracing::debug!(quads = store.size(), "built datastore");
    Ok(store)
  }

  pub fn config(&self) -> &DatastoreConfig {
    &self.config
  }

  pub fn size(&self) -> usize {
    self.dataset.len()
  }

  pub fn is_empty(&self) -> bool {
    self.dataset.is_empty()
  }

  pub fn as_quads(&self) -> impl Iterator<Item = &Quad> {
    self.dataset.iter()
  }

  pub fn contains(&self, quad: &Quad) -> bool {
    self.dataset.contains(quad)
  }

  /// Nodes asserting `quad`, also for quads filtered out of this store.
  pub fn quad_nodes(&self, quad: &Quad) -> Option<&QuadNodes> {
    self.parsed.quads.get(quad)
  }

  fn with_dataset(&self, dataset: IndexSet<Quad>) -> Self {
    Self {
      parsed: Arc::clone(&self.parsed),
      dataset,
      config: Arc::clone(&self.config),
    }
  }

  /// Quads matching every given term. [`TermPattern::Any`] matches all.
  pub fn match_pattern(
    &self,
    subject: impl Into<TermPattern>,
    predicate: impl Into<TermPattern>,
    object: impl Into<TermPattern>,
  ) -> Result<Self> {
    let subject = subject.into().resolve(&self.config)?;
    let predicate = predicate.into().resolve(&self.config)?;
    let object = object.into().resolve(&self.config)?;
    let matches = |pattern: &Option<Term>, term: &Term| pattern.as_ref().is_none_or(|p| p == term);
    Ok(self.with_dataset(
      self
        .dataset
        .iter()
        .filter(|quad| {
          matches(&subject, &quad.subject)
            && matches(&predicate, &quad.predicate)
            && matches(&object, &quad.object)
        })
        .cloned()
        .collect(),
    ))
  }

  /// Quads whose subject, predicate and object nodes all belong to the
  /// context of `range`.
  pub fn limit_to_range(
    &self,
    tree: &Tree,
    range: &Range,
    strategy: ContextStrategy,
  ) -> Result<Self> {
    let context: IndexSet<NodeId> = range.context_nodes(tree, strategy)?.into_iter().collect();
    Ok(self.with_dataset(
      self
        .dataset
        .iter()
        .filter(|quad| {
          self.quad_nodes(quad).is_some_and(|nodes| {
            context.contains(&nodes.subject)
              && context.contains(&nodes.predicate)
              && context.contains(&nodes.object)
          })
        })
        .cloned()
        .collect(),
    ))
  }

  /// Replaces the dataset with `transform` of it. Quads the document never
  /// asserted have no nodes and are dropped.
  pub fn transform_dataset(&self, transform: impl FnOnce(IndexSet<Quad>) -> IndexSet<Quad>) -> Self {
    let mut dataset = transform(self.dataset.clone());
    let before = dataset.len();
    dataset.retain(|quad| self.parsed.quads.contains_key(quad));
    if dataset.len() < before {
      tracing::warn!(
        dropped = before - dataset.len(),
        "dropped quads without nodes from transformed dataset"
      );
    }
    self.with_dataset(dataset)
  }

  fn live_mapping(&self, table: &NodeMapping, role: Role) -> NodeMapping {
    let live: IndexSet<(&Term, NodeId)> = self
      .dataset
      .iter()
      .filter_map(|quad| {
        let nodes = self.quad_nodes(quad)?;
        Some(match role {
          Role::Subject => (&quad.subject, nodes.subject),
          Role::Predicate => (&quad.predicate, nodes.predicate),
          Role::Object => (&quad.object, nodes.object),
        })
      })
      .collect();

    table
      .iter()
      .filter_map(|(term, nodes)| {
        let nodes: IndexSet<NodeId> = nodes
          .iter()
          .copied()
          .filter(|node| live.contains(&(term, *node)))
          .collect();
        (!nodes.is_empty()).then(|| (term.clone(), nodes))
      })
      .collect()
  }

  pub fn as_subject_node_mapping(&self) -> NodeMapping {
    self.live_mapping(&self.parsed.subjects, Role::Subject)
  }

  pub fn as_predicate_node_mapping(&self) -> NodeMapping {
    self.live_mapping(&self.parsed.predicates, Role::Predicate)
  }

  pub fn as_object_node_mapping(&self) -> NodeMapping {
    self.live_mapping(&self.parsed.objects, Role::Object)
  }

  pub fn as_quad_result_set(&self) -> Vec<QuadResult> {
    self
      .dataset
      .iter()
      .filter_map(|quad| {
        self.quad_nodes(quad).map(|nodes| {
          QuadResult {
            quad:  quad.clone(),
            nodes: *nodes,
          }
        })
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use quickcheck::{
    Arbitrary,
    Gen,
  };
  use the_model::position::Position;

  use super::*;

  const CONFIG: &str = r#"
[prefixes]
ex = "http://example.org/"
"#;

  struct Document {
    tree:   Tree,
    knows:  NodeId,
    friend: NodeId,
    store:  Datastore,
  }

  // <div about="ex:me" rel="ex:knows">
  //   <p about="ex:you" property="ex:name">You</p>
  // </div>
  // <p about="ex:me" property="ex:name">Me</p>
  fn document() -> Document {
    let mut tree = Tree::new("body");
    let root = tree.root();
    let knows = tree.append_element(root, "div").unwrap();
    tree.set_attribute(knows, "about", "ex:me").unwrap();
    tree.set_attribute(knows, "rel", "ex:knows").unwrap();
    let friend = tree.append_element(knows, "p").unwrap();
    tree.set_attribute(friend, "about", "ex:you").unwrap();
    tree.set_attribute(friend, "property", "ex:name").unwrap();
    tree.append_text(friend, "You").unwrap();
    let me = tree.append_element(root, "p").unwrap();
    tree.set_attribute(me, "about", "ex:me").unwrap();
    tree.set_attribute(me, "property", "ex:name").unwrap();
    tree.append_text(me, "Me").unwrap();

    let config = DatastoreConfig::from_toml(CONFIG).unwrap();
    let store = Datastore::from_parse(&tree, config).unwrap();
    Document {
      tree,
      knows,
      friend,
      store,
    }
  }

  #[derive(Debug, Clone)]
  struct Pattern(Option<&'static str>, Option<&'static str>, Option<&'static str>);

  impl Arbitrary for Pattern {
    fn arbitrary(g: &mut Gen) -> Self {
      let subject = g.choose(&[None, Some("ex:me"), Some("ex:you")]).copied().flatten();
      let predicate = g
        .choose(&[None, Some("ex:name"), Some("ex:knows")])
        .copied()
        .flatten();
      let object = g.choose(&[None, Some("ex:you"), Some("\"Me\"")]).copied().flatten();
      Pattern(subject, predicate, object)
    }
  }

  fn apply(store: &Datastore, pattern: &Pattern) -> Datastore {
    store
      .match_pattern(pattern.0, pattern.1, pattern.2)
      .unwrap()
  }

  quickcheck::quickcheck! {
    fn matching_only_narrows(first: Pattern, second: Pattern) -> bool {
      let store = document().store;
      let once = apply(&store, &first);
      let twice = apply(&once, &second);
      twice.size() <= once.size() && once.size() <= store.size()
    }

    fn matching_is_idempotent(pattern: Pattern) -> bool {
      let store = document().store;
      let once = apply(&store, &pattern);
      let twice = apply(&once, &pattern);
      once.as_quads().eq(twice.as_quads())
    }
  }

  #[test]
  fn concise_matching() {
    let store = document().store;
    assert_eq!(store.size(), 3);
    let names = store
      .match_pattern(TermPattern::Any, "ex:name", TermPattern::Any)
      .unwrap();
    assert_eq!(names.size(), 2);
    let mine = names.match_pattern("ex:me", None::<&str>, None::<&str>).unwrap();
    assert_eq!(mine.size(), 1);
    assert!(store.match_pattern("nope:x", TermPattern::Any, TermPattern::Any).is_err());
  }

  #[test]
  fn limiting_to_a_range_requires_every_node() {
    let document = document();
    let range = Range::from_around_node(&document.tree, document.friend).unwrap();
    let limited = document
      .store
      .limit_to_range(&document.tree, &range, ContextStrategy::RangeContains)
      .unwrap();

    // The relation has its object inside the range but its subject outside.
    let quads: Vec<String> = limited.as_quads().map(ToString::to_string).collect();
    assert_eq!(quads, vec![
      "<http://example.org/you> <http://example.org/name> \"You\" .".to_string()
    ]);

    let knows = document
      .store
      .match_pattern(TermPattern::Any, "ex:knows", TermPattern::Any)
      .unwrap();
    let relation = knows.as_quads().next().unwrap().clone();
    assert!(!limited.contains(&relation));
    assert_eq!(limited.quad_nodes(&relation).unwrap().subject, document.knows);
  }

  #[test]
  fn touching_context_includes_ancestors() {
    let document = document();
    let inside = Position::from_in_element(&document.tree, document.friend, 1).unwrap();
    let range = Range::collapsed(inside);
    let touched = document
      .store
      .limit_to_range(&document.tree, &range, ContextStrategy::RangeTouches)
      .unwrap();
    assert_eq!(touched.size(), 2);
    assert!(touched.as_quads().all(|quad| quad.to_string().contains("/you>")));
  }

  #[test]
  fn consumers_follow_the_live_dataset() {
    let document = document();
    let store = document.store;
    let subjects = store.as_subject_node_mapping();
    let me = Term::named("http://example.org/me");
    assert_eq!(subjects[&me].len(), 2);

    let relations_only = store.transform_dataset(|dataset| {
      dataset
        .into_iter()
        .filter(|quad| quad.predicate == Term::named("http://example.org/knows"))
        .collect()
    });
    let subjects = relations_only.as_subject_node_mapping();
    assert_eq!(subjects.len(), 1);
    assert_eq!(subjects[&me].iter().copied().collect::<Vec<_>>(), vec![document.knows]);
    assert_eq!(
      relations_only.as_object_node_mapping()[&Term::named("http://example.org/you")]
        .first(),
      Some(&document.friend)
    );
    assert_eq!(relations_only.as_predicate_node_mapping().len(), 1);
    assert_eq!(relations_only.as_quad_result_set().len(), 1);
    // The receiver is untouched.
    assert_eq!(store.size(), 3);

    let invented = store.transform_dataset(|mut dataset| {
      dataset.insert(Quad::new(me.clone(), me.clone(), me.clone()));
      dataset
    });
    assert_eq!(invented.size(), 3);
  }
}
