//! Structured identifiers (namespace + local name)

use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Identifier validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IriError {
    #[error("invalid IRI '{iri}': {reason}")]
    Invalid { iri: String, reason: String },

    #[error("IRI '{0}' has no local name")]
    MissingLocalName(String),
}

/// Absolute IRI split once into namespace and local name.
///
/// The split point is the position right after the last `#`, `/` or `:`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Iri {
    value: Arc<str>,
    split: usize,
}

impl Iri {
    /// Validate `s` as an absolute IRI.
    pub fn parse(s: &str) -> Result<Self, IriError> {
        iri_string::types::IriStr::new(s).map_err(|e| IriError::Invalid {
            iri: s.to_string(),
            reason: e.to_string(),
        })?;

        let split = s
            .rfind(|c| c == '#' || c == '/' || c == ':')
            .map(|pos| pos + 1)
            .unwrap_or(0);

        Ok(Self {
            value: Arc::from(s),
            split,
        })
    }

    /// Like [`Iri::parse`], but also requires a non-empty local name.
    /// Used for anything a rule source declares (types, relations, shapes).
    pub fn parse_named(s: &str) -> Result<Self, IriError> {
        let iri = Self::parse(s)?;
        if iri.local_name().is_empty() {
            return Err(IriError::MissingLocalName(s.to_string()));
        }
        Ok(iri)
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn namespace(&self) -> &str {
        &self.value[..self.split]
    }

    pub fn local_name(&self) -> &str {
        &self.value[self.split..]
    }

    /// True if this IRI lives in the given namespace.
    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.namespace() == namespace
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl fmt::Debug for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.value)
    }
}

impl AsRef<str> for Iri {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Serialize for Iri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl TryFrom<&str> for Iri {
    type Error = IriError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Iri::parse(s)
    }
}
