//! RDFa processing over a document tree.
//!
//! Walks the tree in document order with an evaluation context, recording
//! every quad together with the nodes that assert its subject, predicate and
//! object. Supported: `about`, `resource`/`href`/`src`, `typeof` (with typed
//! blank resources), `property` with `content`/`datatype`/language, and
//! `rel`/`rev` including hanging relations completed by descendants.
//! `prefix` and `vocab` attributes are not read; the [`DatastoreConfig`]
//! is authoritative.

use indexmap::{
  IndexMap,
  IndexSet,
};
use the_model::{
  rdfa::RdfaAttributes,
  tree::{
    NodeId,
    Tree,
  },
};

use crate::{
  config::DatastoreConfig,
  error::Result,
  term::{
    Literal,
    Quad,
    RDF_TYPE,
    Term,
  },
};

/// Nodes asserting each part of a quad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuadNodes {
  pub subject:   NodeId,
  pub predicate: NodeId,
  pub object:    NodeId,
}

/// Term to the nodes asserting it, in document order.
pub type NodeMapping = IndexMap<Term, IndexSet<NodeId>>;

#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
  /// Every quad found, with the nodes of its first occurrence.
  pub quads:      IndexMap<Quad, QuadNodes>,
  pub subjects:   NodeMapping,
  pub predicates: NodeMapping,
  pub objects:    NodeMapping,
}

impl ParsedDocument {
  fn record(&mut self, quad: Quad, nodes: QuadNodes) {
    self
      .subjects
      .entry(quad.subject.clone())
      .or_default()
      .insert(nodes.subject);
    self
      .predicates
      .entry(quad.predicate.clone())
      .or_default()
      .insert(nodes.predicate);
    self
      .objects
      .entry(quad.object.clone())
      .or_default()
      .insert(nodes.object);
    self.quads.entry(quad).or_insert(nodes);
  }
}

/// A term and the node it was established on.
type Anchored = (Term, NodeId);

#[derive(Debug, Clone)]
struct Incomplete {
  predicate: Term,
  reverse:   bool,
  node:      NodeId,
}

#[derive(Debug, Clone)]
struct Context {
  subject:    Option<Anchored>,
  object:     Option<Anchored>,
  incomplete: Vec<Incomplete>,
  language:   Option<String>,
}

pub fn parse(tree: &Tree, config: &DatastoreConfig) -> Result<ParsedDocument> {
  let root = tree.root();
  let base = Term::named(config.base.clone().unwrap_or_default());
  let mut processor = Processor {
    tree,
    config,
    blank_nodes: 0,
    parsed: ParsedDocument::default(),
  };
  processor.walk(root, Context {
    subject:    Some((base.clone(), root)),
    object:     Some((base, root)),
    incomplete: Vec::new(),
    language:   None,
  })?;
  Ok(processor.parsed)
}

struct Processor<'a> {
  tree:        &'a Tree,
  config:      &'a DatastoreConfig,
  blank_nodes: usize,
  parsed:      ParsedDocument,
}

impl Processor<'_> {
  fn fresh_blank(&mut self) -> Term {
    let label = format!("genid{}", self.blank_nodes);
    self.blank_nodes += 1;
    Term::blank(label)
  }

  fn predicates(&self, values: &[String]) -> Vec<Term> {
    values
      .iter()
      .filter_map(|value| self.config.resolve_predicate(value))
      .map(Term::named)
      .collect()
  }

  fn object_resource(&self, rdfa: &RdfaAttributes) -> Option<Term> {
    if let Some(resource) = &rdfa.resource {
      return self.config.resolve_resource(resource);
    }
    rdfa
      .href
      .as_deref()
      .or(rdfa.src.as_deref())
      .map(|iri| Term::named(self.config.resolve_iri(iri)))
  }

  /// The subject a node without its own takes from its context. Under a
  /// hanging relation it gets a fresh blank node, which completes the
  /// relation.
  fn inherited_subject(&mut self, node: NodeId, context: &Context) -> Option<Anchored> {
    if context.object.is_none() && !context.incomplete.is_empty() {
      return Some((self.fresh_blank(), node));
    }
    context.object.clone().or_else(|| context.subject.clone())
  }

  fn walk(&mut self, node: NodeId, context: Context) -> Result<()> {
    let tree = self.tree;
    let current = tree.node(node)?;
    if current.is_text() {
      return Ok(());
    }

    let rdfa = current.rdfa();
    let language = rdfa.language.clone().or_else(|| context.language.clone());
    if rdfa.is_empty() {
      let children = Context {
        language,
        ..context
      };
      for child in current.children() {
        self.walk(*child, children.clone())?;
      }
      return Ok(());
    }

    let about = rdfa
      .about
      .as_deref()
      .and_then(|about| self.config.resolve_resource(about));
    let object_resource = self.object_resource(&rdfa);
    let types = self.predicates(&rdfa.type_of);
    let properties = self.predicates(&rdfa.property);
    let rels = self.predicates(&rdfa.rel);
    let revs = self.predicates(&rdfa.rev);
    let has_relation = !rels.is_empty() || !revs.is_empty();
    let literal_property = rdfa.content.is_some() || rdfa.datatype.is_some();

    let new_subject: Option<Anchored>;
    let mut current_object: Option<Anchored> = None;
    let mut typed_resource: Option<Anchored> = None;

    if has_relation {
      new_subject = match about {
        Some(about) => Some((about, node)),
        None => self.inherited_subject(node, &context),
      };
      current_object = object_resource.clone().map(|resource| (resource, node));
      if !types.is_empty() {
        if rdfa.about.is_some() {
          typed_resource = new_subject.clone();
        } else {
          let resource = current_object
            .clone()
            .unwrap_or_else(|| (self.fresh_blank(), node));
          current_object = Some(resource.clone());
          typed_resource = Some(resource);
        }
      }
    } else if !properties.is_empty() && !literal_property {
      new_subject = match about {
        Some(about) => Some((about, node)),
        None => self.inherited_subject(node, &context),
      };
      if !types.is_empty() {
        if rdfa.about.is_some() {
          typed_resource = new_subject.clone();
        } else {
          let resource = object_resource
            .clone()
            .unwrap_or_else(|| self.fresh_blank());
          typed_resource = Some((resource.clone(), node));
          current_object = Some((resource, node));
        }
      }
    } else {
      new_subject = match about.or_else(|| {
        properties
          .is_empty()
          .then(|| object_resource.clone())
          .flatten()
      }) {
        Some(subject) => Some((subject, node)),
        None if !types.is_empty() => Some((self.fresh_blank(), node)),
        None => self.inherited_subject(node, &context),
      };
      if !types.is_empty() {
        typed_resource = new_subject.clone();
      }
    }

    let established = new_subject
      .as_ref()
      .is_some_and(|(_, anchor)| *anchor == node);

    if let Some((resource, anchor)) = &typed_resource {
      for class in &types {
        self.parsed.record(
          Quad::new(resource.clone(), Term::named(RDF_TYPE), class.clone()),
          QuadNodes {
            subject:   *anchor,
            predicate: node,
            object:    node,
          },
        );
      }
    }

    if established
      && let (Some((subject, subject_node)), Some((parent, parent_node))) =
        (&new_subject, &context.subject)
    {
      for incomplete in &context.incomplete {
        let (quad, nodes) = if incomplete.reverse {
          (
            Quad::new(subject.clone(), incomplete.predicate.clone(), parent.clone()),
            QuadNodes {
              subject:   *subject_node,
              predicate: incomplete.node,
              object:    *parent_node,
            },
          )
        } else {
          (
            Quad::new(parent.clone(), incomplete.predicate.clone(), subject.clone()),
            QuadNodes {
              subject:   *parent_node,
              predicate: incomplete.node,
              object:    *subject_node,
            },
          )
        };
        self.parsed.record(quad, nodes);
      }
    }

    let mut local_incomplete = Vec::new();
    if let Some((subject, subject_node)) = &new_subject {
      match &current_object {
        Some((object, object_node)) => {
          for rel in &rels {
            self.parsed.record(
              Quad::new(subject.clone(), rel.clone(), object.clone()),
              QuadNodes {
                subject:   *subject_node,
                predicate: node,
                object:    *object_node,
              },
            );
          }
          for rev in &revs {
            self.parsed.record(
              Quad::new(object.clone(), rev.clone(), subject.clone()),
              QuadNodes {
                subject:   *object_node,
                predicate: node,
                object:    *subject_node,
              },
            );
          }
        },
        None => {
          let forward = rels.iter().map(|rel| (rel, false));
          let reverse = revs.iter().map(|rev| (rev, true));
          local_incomplete = forward
            .chain(reverse)
            .map(|(predicate, reverse)| {
              Incomplete {
                predicate: predicate.clone(),
                reverse,
                node,
              }
            })
            .collect();
        },
      }

      for property in &properties {
        let object = self.property_value(
          node,
          &rdfa,
          language.as_deref(),
          object_resource.as_ref(),
          has_relation,
          typed_resource.as_ref(),
        )?;
        self.parsed.record(
          Quad::new(subject.clone(), property.clone(), object),
          QuadNodes {
            subject:   *subject_node,
            predicate: node,
            object:    node,
          },
        );
      }
    }

    let hanging = has_relation && current_object.is_none();
    let children = Context {
      subject: new_subject.clone().or(context.subject),
      object: if hanging {
        None
      } else {
        current_object.or(new_subject).or(context.object)
      },
      incomplete: if !local_incomplete.is_empty() {
        local_incomplete
      } else if established {
        Vec::new()
      } else {
        context.incomplete
      },
      language,
    };
    for child in current.children() {
      self.walk(*child, children.clone())?;
    }
    Ok(())
  }

  fn property_value(
    &self,
    node: NodeId,
    rdfa: &RdfaAttributes,
    language: Option<&str>,
    object_resource: Option<&Term>,
    has_relation: bool,
    typed_resource: Option<&Anchored>,
  ) -> Result<Term> {
    let datatype = rdfa
      .datatype
      .as_deref()
      .filter(|datatype| !datatype.is_empty())
      .and_then(|datatype| self.config.resolve_predicate(datatype));
    let literal = |value: String| {
      Term::Literal(Literal {
        value,
        language: language
          .filter(|_| datatype.is_none())
          .map(str::to_string),
        datatype: datatype.clone(),
      })
    };

    if let Some(content) = &rdfa.content {
      return Ok(literal(content.clone()));
    }
    if rdfa.datatype.is_none() && !has_relation {
      if let Some((resource, _)) = typed_resource.filter(|_| rdfa.about.is_none()) {
        return Ok(resource.clone());
      }
      if let Some(resource) = object_resource {
        return Ok(resource.clone());
      }
    }
    Ok(literal(self.tree.text_content(node)?))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const EX: &str = "http://example.org/";

  fn config() -> DatastoreConfig {
    DatastoreConfig::from_toml(
      r#"
base = "http://example.org/doc"

[prefixes]
ex = "http://example.org/"
"#,
    )
    .unwrap()
  }

  fn element(tree: &mut Tree, parent: NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
    let node = tree.append_element(parent, tag).unwrap();
    for (key, value) in attributes {
      tree.set_attribute(node, key, value).unwrap();
    }
    node
  }

  fn ex(local: &str) -> Term {
    Term::named(format!("{EX}{local}"))
  }

  #[test]
  fn literal_properties_of_an_explicit_subject() {
    let mut tree = Tree::new("div");
    let root = tree.root();
    let person = element(&mut tree, root, "div", &[("about", "ex:me")]);
    let name = element(&mut tree, person, "span", &[("property", "ex:name"), ("lang", "en")]);
    tree.append_text(name, "Bob").unwrap();

    let parsed = parse(&tree, &config()).unwrap();
    let quad = Quad::new(
      ex("me"),
      ex("name"),
      Term::Literal(Literal {
        value:    "Bob".into(),
        language: Some("en".into()),
        datatype: None,
      }),
    );
    assert_eq!(parsed.quads.len(), 1);
    assert_eq!(parsed.quads[&quad], QuadNodes {
      subject:   person,
      predicate: name,
      object:    name,
    });
    assert!(parsed.subjects[&ex("me")].contains(&person));
  }

  #[test]
  fn typeof_creates_a_typed_blank_subject() {
    let mut tree = Tree::new("div");
    let root = tree.root();
    let person = element(&mut tree, root, "div", &[("typeof", "schema:Person")]);
    let name = element(&mut tree, person, "span", &[("property", "schema:name")]);
    tree.append_text(name, "Ann").unwrap();

    let parsed = parse(&tree, &config()).unwrap();
    let quads: Vec<String> = parsed.quads.keys().map(ToString::to_string).collect();
    assert_eq!(quads, vec![
      "_:genid0 <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://schema.org/Person> ."
        .to_string(),
      "_:genid0 <http://schema.org/name> \"Ann\" .".to_string(),
    ]);
  }

  #[test]
  fn relations_to_resources_and_back() {
    let mut tree = Tree::new("div");
    let root = tree.root();
    let link = element(&mut tree, root, "a", &[
      ("about", "#me"),
      ("rel", "ex:knows"),
      ("rev", "ex:knownBy"),
      ("href", "#you"),
    ]);

    let parsed = parse(&tree, &config()).unwrap();
    let me = Term::named("http://example.org/doc#me");
    let you = Term::named("http://example.org/doc#you");
    assert!(
      parsed
        .quads
        .contains_key(&Quad::new(me.clone(), ex("knows"), you.clone()))
    );
    let back = Quad::new(you, ex("knownBy"), me);
    assert_eq!(parsed.quads[&back].predicate, link);
  }

  #[test]
  fn relation_and_property_on_one_element() {
    let mut tree = Tree::new("div");
    let root = tree.root();
    let link = element(&mut tree, root, "a", &[
      ("about", "ex:me"),
      ("rel", "ex:knows"),
      ("resource", "ex:you"),
      ("property", "ex:nick"),
    ]);
    tree.append_text(link, "buddy").unwrap();

    let parsed = parse(&tree, &config()).unwrap();
    assert!(
      parsed
        .quads
        .contains_key(&Quad::new(ex("me"), ex("knows"), ex("you")))
    );
    let nick = Quad::new(ex("me"), ex("nick"), Term::literal("buddy"));
    assert_eq!(parsed.quads[&nick].object, link);
  }

  #[test]
  fn hanging_relations_complete_on_descendants() {
    let mut tree = Tree::new("div");
    let root = tree.root();
    let list = element(&mut tree, root, "ul", &[("about", "ex:me"), ("rel", "ex:knows")]);
    let first = element(&mut tree, list, "li", &[("about", "ex:you")]);
    let second = element(&mut tree, list, "li", &[("about", "ex:them")]);
    let anonymous = element(&mut tree, root, "div", &[("about", "ex:me"), ("rel", "ex:likes")]);
    let name = element(&mut tree, anonymous, "span", &[("property", "ex:name")]);
    tree.append_text(name, "Cy").unwrap();

    let parsed = parse(&tree, &config()).unwrap();
    let knows_you = Quad::new(ex("me"), ex("knows"), ex("you"));
    assert_eq!(parsed.quads[&knows_you], QuadNodes {
      subject:   list,
      predicate: list,
      object:    first,
    });
    assert!(
      parsed
        .quads
        .contains_key(&Quad::new(ex("me"), ex("knows"), ex("them")))
    );
    assert_eq!(parsed.objects[&ex("them")].first(), Some(&second));

    let blank = Term::blank("genid0");
    assert!(
      parsed
        .quads
        .contains_key(&Quad::new(ex("me"), ex("likes"), blank.clone()))
    );
    assert!(
      parsed
        .quads
        .contains_key(&Quad::new(blank, ex("name"), Term::literal("Cy")))
    );
  }

  #[test]
  fn content_and_datatype_override_text() {
    let mut tree = Tree::new("div");
    let root = tree.root();
    let age = element(&mut tree, root, "span", &[
      ("about", "ex:me"),
      ("property", "ex:age"),
      ("content", "42"),
      ("datatype", "xsd:integer"),
    ]);
    tree.append_text(age, "forty-two").unwrap();
    element(&mut tree, root, "a", &[("property", "ex:page"), ("href", "http://other.org/")]);

    let parsed = parse(&tree, &config()).unwrap();
    let typed = Term::Literal(Literal {
      value:    "42".into(),
      language: None,
      datatype: Some("http://www.w3.org/2001/XMLSchema#integer".into()),
    });
    assert!(
      parsed
        .quads
        .contains_key(&Quad::new(ex("me"), ex("age"), typed))
    );
    // Without a subject of its own, the link describes the document.
    assert!(parsed.quads.contains_key(&Quad::new(
      Term::named("http://example.org/doc"),
      ex("page"),
      Term::named("http://other.org/"),
    )));
  }
}
