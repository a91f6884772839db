//! sophia パーサーとのブリッジ
//!
//! Serialized RDF is turned into owned [`RawTriple`]s here; both the graph
//! loader and the rule source loader build on top of this.

use sophia::api::prelude::*;
use sophia::api::term::TermKind;
use std::path::Path;
use thiserror::Error;

/// Serialization formats recognized by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    Turtle,
    NTriples,
    RdfXml,
}

impl RdfFormat {
    /// Extensions recognized as graph sources
    pub const EXTENSIONS: &'static [&'static str] = &["ttl", "nt", "rdf"];

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "ttl" | "turtle" => Some(RdfFormat::Turtle),
            "nt" => Some(RdfFormat::NTriples),
            "rdf" | "owl" | "xml" => Some(RdfFormat::RdfXml),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ParseError(pub String);

/// Owned RDF term
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawTerm {
    Iri(String),
    Blank(String),
    Literal {
        lexical: String,
        datatype: String,
        language: Option<String>,
    },
}

impl RawTerm {
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            RawTerm::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            RawTerm::Literal { lexical, .. } => Some(lexical),
            _ => None,
        }
    }

    pub fn is_resource(&self) -> bool {
        matches!(self, RawTerm::Iri(_) | RawTerm::Blank(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawTriple {
    pub subject: RawTerm,
    pub predicate: String,
    pub object: RawTerm,
}

/// Parse `text` into triples, in document order
pub fn parse_triples(text: &str, format: RdfFormat) -> Result<Vec<RawTriple>, ParseError> {
    match format {
        RdfFormat::Turtle => collect(sophia::turtle::parser::turtle::parse_str(text)),
        RdfFormat::NTriples => collect(sophia::turtle::parser::nt::parse_str(text)),
        RdfFormat::RdfXml => collect(sophia::xml::parser::parse_str(text)),
    }
}

fn collect<S>(mut source: S) -> Result<Vec<RawTriple>, ParseError>
where
    S: TripleSource,
    S::Error: std::fmt::Display,
{
    let mut triples = Vec::new();
    let mut unsupported = None;

    source
        .for_each_triple(|t| {
            let predicate = t.p().iri().map(|iri| iri.as_str().to_string());
            match (raw_term(t.s()), predicate, raw_term(t.o())) {
                (Some(subject), Some(predicate), Some(object)) => triples.push(RawTriple {
                    subject,
                    predicate,
                    object,
                }),
                _ => {
                    unsupported.get_or_insert_with(|| "unsupported term kind (quoted triple or variable)".to_string());
                }
            }
        })
        .map_err(|e| ParseError(e.to_string()))?;

    match unsupported {
        Some(reason) => Err(ParseError(reason)),
        None => Ok(triples),
    }
}

fn raw_term<T: Term>(term: T) -> Option<RawTerm> {
    match term.kind() {
        TermKind::Iri => term.iri().map(|iri| RawTerm::Iri(iri.as_str().to_string())),
        TermKind::BlankNode => term.bnode_id().map(|id| RawTerm::Blank(id.as_str().to_string())),
        TermKind::Literal => Some(RawTerm::Literal {
            lexical: (*term.lexical_form()?).to_owned(),
            datatype: term.datatype()?.as_str().to_string(),
            language: term.language_tag().map(|tag| tag.as_str().to_string()),
        }),
        _ => None,
    }
}
