//! RDF terms and quads.

use std::fmt;

use crate::{
  config::DatastoreConfig,
  error::{
    DatastoreError,
    Result,
  },
};

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
  pub value:    String,
  pub language: Option<String>,
  pub datatype: Option<String>,
}

impl Literal {
  pub fn plain(value: impl Into<String>) -> Self {
    Self {
      value:    value.into(),
      language: None,
      datatype: None,
    }
  }

  /// The datatype IRI, implied by the language tag when not given.
  pub fn datatype_iri(&self) -> &str {
    match (&self.datatype, &self.language) {
      (Some(datatype), _) => datatype,
      (None, Some(_)) => RDF_LANG_STRING,
      (None, None) => XSD_STRING,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
  NamedNode(String),
  BlankNode(String),
  Literal(Literal),
  DefaultGraph,
}

impl Term {
  pub fn named(iri: impl Into<String>) -> Self {
    Self::NamedNode(iri.into())
  }

  pub fn blank(label: impl Into<String>) -> Self {
    Self::BlankNode(label.into())
  }

  pub fn literal(value: impl Into<String>) -> Self {
    Self::Literal(Literal::plain(value))
  }

  pub fn is_resource(&self) -> bool {
    matches!(self, Self::NamedNode(_) | Self::BlankNode(_))
  }

  /// Parses the concise notation used in queries:
  ///
  /// - `<http://example.org/a>` or `http://example.org/a` for named nodes
  /// - `ex:a` for prefixed names, `a` for `rdf:type`
  /// - `_:b0` for blank nodes
  /// - `"text"`, `"text"@en` and `"text"^^xsd:string` for literals
  pub fn parse_concise(concise: &str, config: &DatastoreConfig) -> Result<Self> {
    let concise = concise.trim();
    let invalid = || DatastoreError::InvalidTerm {
      term: concise.to_string(),
    };

    if concise == "a" {
      return Ok(Self::named(RDF_TYPE));
    }
    if let Some(label) = concise.strip_prefix("_:") {
      return if label.is_empty() {
        Err(invalid())
      } else {
        Ok(Self::blank(label))
      };
    }
    if let Some(rest) = concise.strip_prefix('"') {
      let close = rest.rfind('"').ok_or_else(invalid)?;
      let (value, suffix) = (&rest[..close], &rest[close + 1..]);
      let mut literal = Literal::plain(value);
      if let Some(language) = suffix.strip_prefix('@') {
        literal.language = Some(language.to_string());
      } else if let Some(datatype) = suffix.strip_prefix("^^") {
        match Self::parse_concise(datatype, config)? {
          Self::NamedNode(iri) => literal.datatype = Some(iri),
          _ => return Err(invalid()),
        }
      } else if !suffix.is_empty() {
        return Err(invalid());
      }
      return Ok(Self::Literal(literal));
    }
    if let Some(iri) = concise
      .strip_prefix('<')
      .and_then(|rest| rest.strip_suffix('>'))
    {
      return Ok(Self::named(iri));
    }
    if concise.contains("://") {
      return Ok(Self::named(concise));
    }
    match concise.split_once(':') {
      Some((prefix, local)) => {
        let namespace = config
          .prefix(prefix)
          .ok_or_else(|| DatastoreError::UnknownPrefix {
            prefix: prefix.to_string(),
          })?;
        Ok(Self::named(format!("{namespace}{local}")))
      },
      None => {
        match &config.vocab {
          Some(vocab) if !concise.is_empty() => Ok(Self::named(format!("{vocab}{concise}"))),
          _ => Err(invalid()),
        }
      },
    }
  }
}

impl fmt::Display for Term {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::NamedNode(iri) => write!(f, "<{iri}>"),
      Self::BlankNode(label) => write!(f, "_:{label}"),
      Self::Literal(literal) => {
        write!(f, "{:?}", literal.value)?;
        match (&literal.language, &literal.datatype) {
          (Some(language), _) => write!(f, "@{language}"),
          (None, Some(datatype)) => write!(f, "^^<{datatype}>"),
          (None, None) => Ok(()),
        }
      },
      Self::DefaultGraph => Ok(()),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quad {
  pub subject:   Term,
  pub predicate: Term,
  pub object:    Term,
  pub graph:     Term,
}

impl Quad {
  /// A quad in the default graph.
  pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
    Self {
      subject,
      predicate,
      object,
      graph: Term::DefaultGraph,
    }
  }
}

impl fmt::Display for Quad {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
    if self.graph != Term::DefaultGraph {
      write!(f, " {}", self.graph)?;
    }
    f.write_str(" .")
  }
}

/// One position of a quad pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TermPattern {
  #[default]
  Any,
  Concise(String),
  Term(Term),
}

impl TermPattern {
  pub fn resolve(&self, config: &DatastoreConfig) -> Result<Option<Term>> {
    Ok(match self {
      Self::Any => None,
      Self::Concise(concise) => Some(Term::parse_concise(concise, config)?),
      Self::Term(term) => Some(term.clone()),
    })
  }
}

impl From<&str> for TermPattern {
  fn from(concise: &str) -> Self {
    Self::Concise(concise.to_string())
  }
}

impl From<Term> for TermPattern {
  fn from(term: Term) -> Self {
    Self::Term(term)
  }
}

impl<T: Into<TermPattern>> From<Option<T>> for TermPattern {
  fn from(pattern: Option<T>) -> Self {
    pattern.map_or(Self::Any, Into::into)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_concise_terms() {
    let config = DatastoreConfig::default();
    let parse = |concise| Term::parse_concise(concise, &config).unwrap();

    assert_eq!(parse("schema:name"), Term::named("http://schema.org/name"));
    assert_eq!(parse("<http://ex.org/a>"), Term::named("http://ex.org/a"));
    assert_eq!(parse("http://ex.org/a"), Term::named("http://ex.org/a"));
    assert_eq!(parse("a"), Term::named(RDF_TYPE));
    assert_eq!(parse("_:b3"), Term::blank("b3"));
    assert_eq!(parse("\"hi\""), Term::literal("hi"));

    let Term::Literal(tagged) = parse("\"hallo\"@nl") else {
      panic!("expected a literal");
    };
    assert_eq!(tagged.language.as_deref(), Some("nl"));
    assert_eq!(tagged.datatype_iri(), RDF_LANG_STRING);

    let Term::Literal(typed) = parse("\"3\"^^xsd:integer") else {
      panic!("expected a literal");
    };
    assert_eq!(
      typed.datatype.as_deref(),
      Some("http://www.w3.org/2001/XMLSchema#integer")
    );
  }

  #[test]
  fn rejects_unknown_prefixes_and_bare_words() {
    let config = DatastoreConfig::default();
    assert!(matches!(
      Term::parse_concise("ex:a", &config),
      Err(DatastoreError::UnknownPrefix { prefix }) if prefix == "ex"
    ));
    assert!(matches!(
      Term::parse_concise("name", &config),
      Err(DatastoreError::InvalidTerm { .. })
    ));

    let config = DatastoreConfig {
      vocab: Some("http://schema.org/".into()),
      ..DatastoreConfig::default()
    };
    assert_eq!(
      Term::parse_concise("name", &config).unwrap(),
      Term::named("http://schema.org/name")
    );
  }

  #[test]
  fn displays_as_n_quads() {
    let quad = Quad::new(
      Term::named("http://ex.org/a"),
      Term::named(RDF_TYPE),
      Term::blank("b0"),
    );
    assert_eq!(
      quad.to_string(),
      "<http://ex.org/a> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> _:b0 ."
    );
  }
}
