//! AAS Part 2 encoding rules.
//!
//! Two distinct encodings apply when identifiers travel in API paths:
//!
//! - Identifiers of Identifiables are base64url-encoded, no padding
//! - idShortPaths are percent-encoded, with `[]` preserved for list
//!   index notation
//!
//! The provider uses these when building callback URLs and event
//! topics.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters percent-encoded inside an idShortPath segment.
/// Square brackets stay literal for list element addressing.
const IDSHORT_PATH_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'\\');

/// Encode an AAS identifier as base64url without padding.
///
/// # Examples
///
/// ```
/// use aas_shellhost_core::encode_id_base64url;
///
/// let encoded = encode_id_base64url("urn:example:sm:machine1");
/// assert!(!encoded.contains('='));
/// assert!(!encoded.contains('/'));
/// ```
#[must_use]
pub fn encode_id_base64url(id: &str) -> String {
    URL_SAFE_NO_PAD.encode(id.as_bytes())
}

/// Decode a base64url-encoded AAS identifier.
///
/// # Errors
///
/// Returns an error if the input is not valid unpadded base64url or
/// does not decode to UTF-8.
pub fn decode_id_base64url(encoded: &str) -> Result<String, EncodingError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| EncodingError::Base64Decode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| EncodingError::Utf8Decode(e.to_string()))
}

/// Percent-encode an idShortPath for use in a URL.
///
/// # Examples
///
/// ```
/// use aas_shellhost_core::encode_idshort_path;
///
/// assert_eq!(encode_idshort_path("Motor/Rpm"), "Motor%2FRpm");
/// assert_eq!(encode_idshort_path("Components[0]"), "Components[0]");
/// ```
#[must_use]
pub fn encode_idshort_path(path: &str) -> String {
    utf8_percent_encode(path, IDSHORT_PATH_ESCAPE).to_string()
}

/// Decode a percent-encoded idShortPath.
///
/// # Errors
///
/// Returns an error if the input decodes to invalid UTF-8.
pub fn decode_idshort_path(encoded: &str) -> Result<String, EncodingError> {
    percent_decode_str(encoded)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| EncodingError::Utf8Decode(e.to_string()))
}

/// Errors from identifier and path encoding.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EncodingError {
    /// Base64 decoding failed
    #[error("base64 decode error: {0}")]
    Base64Decode(String),
    /// UTF-8 decoding failed
    #[error("UTF-8 decode error: {0}")]
    Utf8Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_roundtrip() {
        for id in [
            "urn:example:sm:operationaldata",
            "https://admin-shell.io/idta/nameplate/3/0/Nameplate",
            "urn:example:sm:设备1",
        ] {
            let encoded = encode_id_base64url(id);
            assert_eq!(decode_id_base64url(&encoded).unwrap(), id);
        }
    }

    #[test]
    fn identifier_never_padded() {
        for id in ["a", "ab", "abc", "abcd", "urn:example:sm:x"] {
            let encoded = encode_id_base64url(id);
            assert!(!encoded.contains('='), "padding in `{encoded}`");
        }
    }

    #[test]
    fn identifier_is_url_safe() {
        let encoded = encode_id_base64url("urn:with+plus/and/slash?query");
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
    }

    #[test]
    fn idshort_path_plain_passthrough() {
        assert_eq!(
            encode_idshort_path("OperationalData.MaxTemperature"),
            "OperationalData.MaxTemperature"
        );
    }

    #[test]
    fn idshort_path_escapes_separators_and_spaces() {
        let path = "Technical Data/Max<Temp>";
        let encoded = encode_idshort_path(path);
        assert!(encoded.contains("%20"));
        assert!(!encoded.contains('/'));
        assert!(!encoded.contains('<'));
        assert_eq!(decode_idshort_path(&encoded).unwrap(), path);
    }

    #[test]
    fn idshort_path_keeps_brackets() {
        let path = "Phases[0].Voltage[1]";
        let encoded = encode_idshort_path(path);
        assert!(encoded.contains('[') && encoded.contains(']'));
        assert_eq!(decode_idshort_path(&encoded).unwrap(), path);
    }

    #[test]
    fn bad_base64_is_rejected() {
        assert!(matches!(
            decode_id_base64url("!!not-base64!!"),
            Err(EncodingError::Base64Decode(_))
        ));
    }
}
