//! Part records: the flattened view of a message's MIME tree.

use serde::{Deserialize, Serialize};

use crate::parser::charset;

/// Payload of a single MIME leaf.
///
/// Text parts arrive already charset-decoded by the MIME parser; binary
/// parts keep their raw transfer-decoded bytes. The explicit union replaces
/// runtime type inspection at the payload boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartPayload {
    /// Decoded text content.
    Text(String),
    /// Raw transfer-decoded bytes.
    Bytes(Vec<u8>),
    /// No payload at all (degenerate parts).
    Empty,
}

impl PartPayload {
    /// The payload as bytes; text is viewed as UTF-8.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Bytes(b) => b,
            Self::Empty => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Decode the payload to text using the given charset name.
    ///
    /// Already-decoded text passes through. Raw bytes are decoded strictly
    /// with the resolved charset, then retried with forced lossy UTF-8.
    /// Never fails; an absent payload is the empty string.
    pub fn decode(&self, charset_name: Option<&str>) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Bytes(bytes) => {
                let encoding = charset::resolve(charset_name.unwrap_or("utf-8"));
                charset::decode_strict(bytes, encoding)
                    .unwrap_or_else(|| charset::decode_lossy(bytes, encoding_rs::UTF_8))
            }
            Self::Empty => String::new(),
        }
    }
}

/// One MIME leaf, in depth-first traversal order of the original tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartRecord {
    /// Transfer-decoded content.
    pub payload: PartPayload,

    /// Content-addressed identifier derived from (bytes, length, MIME type).
    pub file_id: String,

    /// Filename from the Content-Disposition header; empty when the header
    /// is absent. Body parts have no filename.
    pub filename: String,

    /// Decoded length in bytes.
    pub length: usize,

    /// Hex MD5 of the decoded content.
    pub content_digest: String,

    /// Resolved charset name; only meaningful for `text/*` parts.
    pub charset: Option<String>,

    /// MIME main type (e.g. `"text"`), lower-cased.
    pub main_type: String,

    /// MIME subtype (e.g. `"plain"`), lower-cased.
    pub sub_type: String,

    /// Full MIME type (`"main/sub"`).
    pub mime_type: String,

    /// The Content-ID header value, empty when absent.
    pub content_id: String,
}

impl PartRecord {
    /// Whether this part is a candidate for the canonical plain body.
    pub fn is_body_candidate(&self) -> bool {
        self.filename.is_empty() && self.sub_type != "html"
    }

    /// Whether this part is a candidate for the canonical HTML body.
    pub fn is_html_candidate(&self) -> bool {
        self.filename.is_empty() && self.sub_type == "html"
    }

    /// Whether this part counts as an attachment surfaced to callers.
    pub fn is_attachment(&self) -> bool {
        !self.filename.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_decode_text_passthrough() {
        let p = PartPayload::Text("violence".into());
        assert_eq!(p.decode(Some("utf-8")), "violence");
    }

    #[test]
    fn test_payload_decode_bytes_with_charset() {
        let p = PartPayload::Bytes(vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(p.decode(Some("iso-8859-1")), "café");
    }

    #[test]
    fn test_payload_decode_bad_bytes_never_fails() {
        let p = PartPayload::Bytes(vec![0xFF, 0xFE, b'a']);
        let decoded = p.decode(Some("utf-8"));
        assert!(decoded.contains('a'));
    }

    #[test]
    fn test_payload_decode_empty() {
        assert_eq!(PartPayload::Empty.decode(None), "");
        assert!(PartPayload::Empty.is_empty());
    }
}
