//! Base64 transfer encoding with RFC 2045 line folding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Maximum encoded line length for Base64 bodies (RFC 2045 §6.8).
pub const MAX_LINE_LENGTH: usize = 76;

/// Encodes data as Base64 without line breaks.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data, ignoring CR and LF.
#[cfg(test)]
pub(crate) fn decode_base64(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let cleaned: String = data.chars().filter(|c| *c != '\r' && *c != '\n').collect();
    STANDARD.decode(cleaned)
}

/// Appends `data` to `out` as Base64 folded into CRLF-terminated lines.
///
/// Every line holds exactly [`MAX_LINE_LENGTH`] characters except the last,
/// which may be shorter. Empty input writes nothing.
pub fn write_folded_base64(out: &mut Vec<u8>, data: &[u8]) {
    let encoded = encode_base64(data);
    out.reserve(encoded.len() + (encoded.len() / MAX_LINE_LENGTH + 1) * 2);
    for line in encoded.as_bytes().chunks(MAX_LINE_LENGTH) {
        out.extend_from_slice(line);
        out.extend_from_slice(b"\r\n");
    }
}
