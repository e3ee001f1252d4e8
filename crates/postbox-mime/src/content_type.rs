//! MIME content type rendering.

use std::fmt;

/// Characters that force a parameter value to be quoted (RFC 2045 tspecials).
const TSPECIALS: &str = "()<>@,;:\\\"/[]?=";

/// MIME content type with ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Full media type (e.g., `text/plain`, `image/jpeg`).
    pub media_type: String,
    /// Parameters in rendering order: name, value, and whether to always quote.
    parameters: Vec<(String, String, bool)>,
}

impl ContentType {
    /// Creates a content type from a `type/subtype` string.
    #[must_use]
    pub fn new(media_type: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            parameters: Vec::new(),
        }
    }

    /// Creates a `text/plain; charset=utf-8` content type.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text/plain").with_parameter("charset", "utf-8")
    }

    /// Creates a `multipart/mixed` content type with boundary.
    #[must_use]
    pub fn multipart_mixed(boundary: impl Into<String>) -> Self {
        Self::new("multipart/mixed").with_parameter("boundary", boundary)
    }

    /// Creates the content type of an attachment part, `<type>; name="<name>"`.
    #[must_use]
    pub fn attachment(media_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(media_type).with_quoted_parameter("name", name)
    }

    /// Adds a parameter, quoted only when the value needs it.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((key.into(), value.into(), false));
        self
    }

    /// Adds a parameter that is always quoted.
    #[must_use]
    pub fn with_quoted_parameter(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.parameters.push((key.into(), value.into(), true));
        self
    }

    #[cfg(test)]
    fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(name, _, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value, _)| value.as_str())
    }

    #[cfg(test)]
    fn boundary(&self) -> Option<&str> {
        self.parameter("boundary")
    }

    #[cfg(test)]
    fn is_multipart(&self) -> bool {
        self.media_type
            .get(..10)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("multipart/"))
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.media_type)?;

        for (key, value, always_quote) in &self.parameters {
            let needs_quotes = *always_quote
                || value.is_empty()
                || value.contains(|c: char| c.is_whitespace() || TSPECIALS.contains(c));
            if needs_quotes {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "; {key}=\"{escaped}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }

        Ok(())
    }
}
