//! MIME tree flattening: depth-first traversal of a parsed message's part
//! tree into a flat, ordered list of [`PartRecord`]s.
//!
//! The traversal is permissive. Malformed or missing headers never abort
//! it; they degrade to documented defaults (empty filename, UTF-8 charset,
//! `text/plain`). Transfer decoding is done by `mail-parser`, which takes
//! parts declaring an 8-bit transfer encoding as raw bytes and decodes
//! base64/quoted-printable otherwise, reproducing what a mail client would
//! render.

use encoding_rs::Encoding;
use mail_parser::{Message, MessagePart, MessagePartId, MimeHeaders, PartType};

use crate::ident;
use crate::model::part::{PartPayload, PartRecord};
use crate::parser::{charset, header};

/// Maximum depth for recursive multipart descent. Adversarial messages can
/// nest multiparts arbitrarily deep; below this limit a container is taken
/// as an opaque leaf instead of recursing.
pub const MAX_DEPTH: usize = 10;

/// Flatten a parsed message into part records, one per MIME leaf, in
/// depth-first order.
///
/// The result is never empty: a message without any leaf parts yields a
/// single empty body record.
pub fn flatten(message: &Message<'_>, default_encoding: &'static Encoding) -> Vec<PartRecord> {
    let mut out = Vec::new();
    walk(message, 0, 0, default_encoding, &mut out);
    if out.is_empty() {
        out.push(empty_body_record(default_encoding));
    }
    out
}

fn walk(
    message: &Message<'_>,
    part_id: MessagePartId,
    depth: usize,
    default_encoding: &'static Encoding,
    out: &mut Vec<PartRecord>,
) {
    let Some(part) = message.parts.get(part_id) else {
        return;
    };
    match &part.body {
        PartType::Multipart(children) => {
            if depth >= MAX_DEPTH {
                out.push(leaf_record(
                    part,
                    PartPayload::Bytes(raw_slice(message, part).to_vec()),
                    ("multipart", "mixed"),
                    default_encoding,
                ));
            } else {
                for &child in children {
                    walk(message, child, depth + 1, default_encoding, out);
                }
            }
        }
        PartType::Message(inner) => {
            if depth >= MAX_DEPTH {
                out.push(leaf_record(
                    part,
                    PartPayload::Bytes(raw_slice(message, part).to_vec()),
                    ("message", "rfc822"),
                    default_encoding,
                ));
            } else {
                walk(inner, 0, depth + 1, default_encoding, out);
            }
        }
        PartType::Text(text) => out.push(leaf_record(
            part,
            PartPayload::Text(text.to_string()),
            ("text", "plain"),
            default_encoding,
        )),
        PartType::Html(text) => out.push(leaf_record(
            part,
            PartPayload::Text(text.to_string()),
            ("text", "html"),
            default_encoding,
        )),
        PartType::Binary(bytes) | PartType::InlineBinary(bytes) => out.push(leaf_record(
            part,
            PartPayload::Bytes(bytes.to_vec()),
            ("application", "octet-stream"),
            default_encoding,
        )),
    }
}

/// The raw (still transfer-encoded) bytes of a part, for containers taken
/// as opaque leaves at the depth limit.
fn raw_slice<'a>(message: &'a Message<'_>, part: &MessagePart<'_>) -> &'a [u8] {
    message
        .raw_message
        .get(part.offset_body..part.offset_end)
        .unwrap_or(&[])
}

/// Build the record for one leaf.
fn leaf_record(
    part: &MessagePart<'_>,
    payload: PartPayload,
    default_type: (&str, &str),
    default_encoding: &'static Encoding,
) -> PartRecord {
    let (main_type, sub_type) = match part.content_type() {
        Some(ct) => (
            ct.ctype().to_ascii_lowercase(),
            ct.subtype().unwrap_or(default_type.1).to_ascii_lowercase(),
        ),
        None => (default_type.0.to_string(), default_type.1.to_string()),
    };
    let mime_type = format!("{main_type}/{sub_type}");

    // Charset only carries meaning for text parts. The declared parameter
    // is repaired through the resolver; absent or the literal "None" falls
    // back to the message's own encoding.
    let charset_name = if main_type == "text" {
        let declared = part
            .content_type()
            .and_then(|ct| ct.attribute("charset"))
            .map(str::trim)
            .filter(|cs| !cs.is_empty() && *cs != "None");
        Some(match declared {
            Some(cs) => charset::resolve_name(cs).to_string(),
            None => default_encoding.name().to_string(),
        })
    } else {
        None
    };

    // A filename comes from the Content-Disposition header and nowhere
    // else; CID references and Content-Type naming conventions are not
    // filenames.
    let filename = part
        .content_disposition()
        .and_then(|cd| cd.attribute("filename"))
        .map(header::decode_header)
        .unwrap_or_default();

    let content_id = part.content_id().unwrap_or("").to_string();

    let (file_id, length, content_digest) = ident::file_id(payload.as_bytes(), &mime_type);

    PartRecord {
        payload,
        file_id,
        filename,
        length,
        content_digest,
        charset: charset_name,
        main_type,
        sub_type,
        mime_type,
        content_id,
    }
}

/// A body record synthesized from bare text, for messages the MIME parser
/// rejects outright or degenerate part trees without leaves.
pub fn fallback_record(body: &str, default_encoding: &'static Encoding) -> PartRecord {
    let payload = if body.is_empty() {
        PartPayload::Empty
    } else {
        PartPayload::Text(body.to_string())
    };
    let (file_id, length, content_digest) = ident::file_id(payload.as_bytes(), "text/plain");
    PartRecord {
        payload,
        file_id,
        filename: String::new(),
        length,
        content_digest,
        charset: Some(default_encoding.name().to_string()),
        main_type: "text".to_string(),
        sub_type: "plain".to_string(),
        mime_type: "text/plain".to_string(),
        content_id: String::new(),
    }
}

fn empty_body_record(default_encoding: &'static Encoding) -> PartRecord {
    fallback_record("", default_encoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mail_parser::MessageParser;

    fn parse_and_flatten(raw: &[u8]) -> Vec<PartRecord> {
        let parsed = MessageParser::default().parse(raw).expect("parseable");
        flatten(&parsed, encoding_rs::UTF_8)
    }

    #[test]
    fn test_flatten_single_part() {
        let raw = b"From: a@b.com\nSubject: Violence\n\nTonight on Ethyl the Frog.\n";
        let parts = parse_and_flatten(raw);
        assert_eq!(parts.len(), 1);
        let body = &parts[0];
        assert_eq!(body.main_type, "text");
        assert_eq!(body.sub_type, "plain");
        assert_eq!(body.mime_type, "text/plain");
        assert_eq!(body.filename, "");
        assert!(body.payload.decode(None).contains("Ethyl the Frog"));
    }

    #[test]
    fn test_flatten_multipart_order_and_count() {
        let raw = concat!(
            "From: a@b.com\n",
            "Subject: Violence\n",
            "MIME-Version: 1.0\n",
            "Content-Type: multipart/mixed; boundary=\"XX\"\n",
            "\n",
            "--XX\n",
            "Content-Type: text/plain; charset=\"utf-8\"\n",
            "\n",
            "The body.\n",
            "--XX\n",
            "Content-Type: text/html; charset=\"utf-8\"\n",
            "\n",
            "<p>The body.</p>\n",
            "--XX\n",
            "Content-Type: image/png\n",
            "Content-Disposition: attachment; filename=\"frog.png\"\n",
            "Content-Transfer-Encoding: base64\n",
            "\n",
            "iVBORw0KGgo=\n",
            "--XX--\n"
        );
        let parts = parse_and_flatten(raw.as_bytes());
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].sub_type, "plain");
        assert_eq!(parts[1].sub_type, "html");
        assert_eq!(parts[2].mime_type, "image/png");
        assert_eq!(parts[2].filename, "frog.png");
        assert!(parts[2].charset.is_none());
        // Transfer decoding happened: the payload is the raw PNG magic.
        assert_eq!(
            parts[2].payload.as_bytes(),
            &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n']
        );
    }

    #[test]
    fn test_flatten_filename_only_from_disposition() {
        // Content-Type name= is a naming convention, not a disposition.
        let raw = concat!(
            "From: a@b.com\n",
            "Content-Type: multipart/mixed; boundary=\"XX\"\n",
            "\n",
            "--XX\n",
            "Content-Type: application/pdf; name=\"doc.pdf\"\n",
            "\n",
            "not really a pdf\n",
            "--XX--\n"
        );
        let parts = parse_and_flatten(raw.as_bytes());
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].filename, "");
    }

    #[test]
    fn test_flatten_encoded_word_filename() {
        let raw = concat!(
            "From: a@b.com\n",
            "Content-Type: multipart/mixed; boundary=\"XX\"\n",
            "\n",
            "--XX\n",
            "Content-Type: application/octet-stream\n",
            "Content-Disposition: attachment; filename=\"=?UTF-8?B?ZnJvZy5wbmc=?=\"\n",
            "\n",
            "x\n",
            "--XX--\n"
        );
        let parts = parse_and_flatten(raw.as_bytes());
        assert_eq!(parts[0].filename, "frog.png");
    }

    #[test]
    fn test_flatten_charset_defaults() {
        let raw = concat!(
            "From: a@b.com\n",
            "Content-Type: multipart/mixed; boundary=\"XX\"\n",
            "\n",
            "--XX\n",
            "Content-Type: text/plain\n",
            "\n",
            "no charset declared\n",
            "--XX--\n"
        );
        let parts = parse_and_flatten(raw.as_bytes());
        assert_eq!(parts[0].charset.as_deref(), Some("UTF-8"));
    }

    #[test]
    fn test_flatten_lying_charset_repaired() {
        let raw = concat!(
            "From: a@b.com\n",
            "Content-Type: text/plain; charset=\"wierd\"\n",
            "\n",
            "still readable\n"
        );
        let parts = parse_and_flatten(raw.as_bytes());
        assert_eq!(parts[0].charset.as_deref(), Some("UTF-8"));
        assert!(parts[0].payload.decode(parts[0].charset.as_deref()).contains("readable"));
    }

    #[test]
    fn test_flatten_nested_multipart_depth_first() {
        let raw = concat!(
            "From: a@b.com\n",
            "Content-Type: multipart/mixed; boundary=\"OUTER\"\n",
            "\n",
            "--OUTER\n",
            "Content-Type: multipart/alternative; boundary=\"INNER\"\n",
            "\n",
            "--INNER\n",
            "Content-Type: text/plain\n",
            "\n",
            "plain\n",
            "--INNER\n",
            "Content-Type: text/html\n",
            "\n",
            "<p>html</p>\n",
            "--INNER--\n",
            "--OUTER\n",
            "Content-Type: application/octet-stream\n",
            "Content-Disposition: attachment; filename=\"a.bin\"\n",
            "\n",
            "bytes\n",
            "--OUTER--\n"
        );
        let parts = parse_and_flatten(raw.as_bytes());
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].sub_type, "plain");
        assert_eq!(parts[1].sub_type, "html");
        assert_eq!(parts[2].filename, "a.bin");
    }

    #[test]
    fn test_flatten_identical_bytes_share_file_id() {
        let raw = concat!(
            "From: a@b.com\n",
            "Content-Type: multipart/mixed; boundary=\"XX\"\n",
            "\n",
            "--XX\n",
            "Content-Type: text/plain\n",
            "\n",
            "same\n",
            "--XX\n",
            "Content-Type: text/plain\n",
            "\n",
            "same\n",
            "--XX--\n"
        );
        let parts = parse_and_flatten(raw.as_bytes());
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].file_id, parts[1].file_id);
        assert_eq!(parts[0].content_digest, parts[1].content_digest);
    }

    #[test]
    fn test_fallback_record_is_valid_body() {
        let record = fallback_record("", encoding_rs::UTF_8);
        assert!(record.is_body_candidate());
        assert_eq!(record.length, 0);
        assert_eq!(record.payload, PartPayload::Empty);
        assert!(!record.file_id.is_empty());
    }
}
