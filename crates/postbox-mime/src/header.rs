//! Ordered header block rendering.

use crate::address::validate_header;
use crate::error::Result;

/// An ordered collection of header fields.
///
/// Fields are rendered in insertion order, one `Name: value` line each.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    fields: Vec<(&'static str, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header field.
    ///
    /// # Errors
    ///
    /// Returns an error if the value contains CR or LF.
    pub fn add(&mut self, name: &'static str, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        validate_header(name, &value)?;
        self.fields.push((name, value));
        Ok(())
    }

    /// Gets the first value for a header (case-insensitive).
    #[cfg(test)]
    pub(crate) fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Writes every field as a CRLF-terminated line.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        for (name, value) in &self.fields {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
    }
}
