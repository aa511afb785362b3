//! Qualified names used by node tests, variables and functions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A name with an optional namespace prefix.
///
/// A local name of `*` acts as a wildcard when the name is used in a node test.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    prefix: Option<String>,
    name: String,
}

impl QName {
    pub fn new(prefix: Option<impl Into<String>>, name: impl Into<String>) -> Self {
        Self {
            prefix: prefix.map(Into::into),
            name: name.into(),
        }
    }

    /// A name without a prefix.
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            prefix: None,
            name: name.into(),
        }
    }

    /// Splits `prefix:name` at the first colon. A string without a colon has no prefix.
    pub fn parse(qualified: &str) -> Self {
        match qualified.split_once(':') {
            Some((prefix, name)) => Self::new(Some(prefix), name),
            None => Self::local(qualified),
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_wildcard(&self) -> bool {
        self.name == "*"
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl From<&str> for QName {
    fn from(s: &str) -> Self {
        QName::parse(s)
    }
}
