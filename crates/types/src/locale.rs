//! Language tags attached to pointers and contexts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A language tag such as `en` or `en-US`. Underscores are accepted as separators.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Locale(Arc<str>);

impl Locale {
    pub fn new(tag: impl Into<Arc<str>>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if this locale is `lang` or a sub-language of it, ignoring case.
    pub fn is_language(&self, lang: &str) -> bool {
        let name = self.0.replace('_', "-").to_uppercase();
        name.starts_with(&lang.to_uppercase())
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::new("en")
    }
}

impl From<&str> for Locale {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Locale {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.0.to_string()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_language() {
        let locale = Locale::new("en_US");
        assert!(locale.is_language("en"));
        assert!(locale.is_language("EN-us"));
        assert!(!locale.is_language("de"));
    }

    #[test]
    fn test_serializes_as_its_tag() {
        let locale = Locale::new("nb-NO");
        let json = serde_json::to_string(&locale).unwrap();
        assert_eq!(json, "\"nb-NO\"");
        assert_eq!(serde_json::from_str::<Locale>(&json).unwrap(), locale);
    }
}
