use std::fmt;

/// A BCP-47-ish language tag attached to a [`crate::Value::Text`] literal.
///
/// `Locale::ROOT` is the sentinel for "no particular language" (encoded
/// without a trailing `@lang`, per §3 of the spec).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Locale(String);

impl Locale {
    /// The root locale: encodes without `@lang` and matches the `*`
    /// `languageIn` wildcard used by validation and ordering.
    pub fn root() -> Locale {
        Locale(String::new())
    }

    pub fn new(tag: impl Into<String>) -> Locale {
        Locale(tag.into())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locale {
    fn from(s: &str) -> Self {
        Locale::new(s)
    }
}
