//! Graph names for topics, namespaces, and frames
//!
//! Names follow the usual robotics conventions: `/robot/goal` is global,
//! `goal` is relative to the owning namespace, and `~goal` is private to the
//! node that resolves it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphNameError {
    #[error("Graph name is empty")]
    Empty,
    #[error("Invalid character {ch:?} at position {position} in graph name {name:?}")]
    InvalidCharacter {
        name: String,
        ch: char,
        position: usize,
    },
    #[error("Empty segment in graph name {0:?}")]
    EmptySegment(String),
}

/// A validated, canonical graph name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GraphName(String);

impl GraphName {
    pub const ROOT: &'static str = "/";

    /// Parse and canonicalize a graph name
    pub fn new(name: &str) -> Result<Self, GraphNameError> {
        if name.is_empty() {
            return Err(GraphNameError::Empty);
        }
        if name == Self::ROOT {
            return Ok(Self::root());
        }

        // Trailing slashes carry no meaning
        let trimmed = name.trim_end_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        for (position, ch) in trimmed.chars().enumerate() {
            let valid = if position == 0 {
                ch.is_ascii_alphabetic() || ch == '/' || ch == '~'
            } else {
                ch.is_ascii_alphanumeric() || ch == '_' || ch == '/'
            };
            if !valid {
                return Err(GraphNameError::InvalidCharacter {
                    name: name.to_string(),
                    ch,
                    position,
                });
            }
        }

        if trimmed.contains("//") || trimmed == "~" {
            return Err(GraphNameError::EmptySegment(name.to_string()));
        }

        // `~/goal` and `~goal` name the same private name
        let canonical = match trimmed.strip_prefix("~/") {
            Some(rest) => format!("~{rest}"),
            None => trimmed.to_string(),
        };
        Ok(Self(canonical))
    }

    /// The root namespace `/`
    pub fn root() -> Self {
        Self(Self::ROOT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }

    pub fn is_global(&self) -> bool {
        self.0.starts_with('/')
    }

    pub fn is_private(&self) -> bool {
        self.0.starts_with('~')
    }

    pub fn is_relative(&self) -> bool {
        !self.is_global() && !self.is_private()
    }

    /// Last segment of the name (`goal` for `/robot/goal`)
    pub fn basename(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Enclosing namespace, or `None` for the root and for single-segment
    /// relative names
    pub fn parent(&self) -> Option<GraphName> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Append `other` to this namespace. Global names are returned unchanged.
    pub fn join(&self, other: &GraphName) -> GraphName {
        if other.is_global() {
            return other.clone();
        }
        let tail = other.0.trim_start_matches('~').trim_start_matches('/');
        if self.is_root() {
            Self(format!("/{}", tail))
        } else {
            Self(format!("{}/{}", self.0, tail))
        }
    }

    /// Make this name global within `namespace`; private names resolve
    /// under `node_name`
    pub fn resolve(&self, namespace: &GraphName, node_name: &GraphName) -> GraphName {
        if self.is_global() {
            self.clone()
        } else if self.is_private() {
            node_name.join(self)
        } else {
            namespace.join(self)
        }
    }
}

impl fmt::Display for GraphName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GraphName {
    type Err = GraphNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for GraphName {
    type Error = GraphNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl TryFrom<&str> for GraphName {
    type Error = GraphNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GraphName> for String {
    fn from(name: GraphName) -> Self {
        name.0
    }
}

impl AsRef<str> for GraphName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
