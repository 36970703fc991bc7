//! Deterministic content identifiers for files, topics, and posts.
//!
//! Every identifier is a 128-bit MD5 digest interpreted as an unsigned
//! big-endian integer and rendered in base 62. Collisions are intentional
//! where the inputs are identical (that is what makes them usable for
//! deduplication) and overwhelmingly unlikely otherwise.

use md5::{Digest, Md5};

const BASE62_DIGITS: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Render a 128-bit value in base 62 using `[0-9][A-Z][a-z]` digit order.
///
/// Zero encodes as `"0"`, never an empty string.
pub fn base62(mut n: u128) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE62_DIGITS[(n % 62) as usize]);
        n /= 62;
    }
    digits.reverse();
    // Digits are drawn from an ASCII table.
    String::from_utf8(digits).unwrap_or_default()
}

fn digest_to_u128(digest: [u8; 16]) -> u128 {
    u128::from_be_bytes(digest)
}

fn hex(digest: &[u8; 16]) -> String {
    let mut out = String::with_capacity(32);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Generate a new identifier for a file.
///
/// Returns `(identifier, length, content_digest_hex)`.
///
/// Two files will have the same identifier if
/// * they have the same MD5 sum, *and*
/// * they have the same length, *and*
/// * they have the same MIME type.
pub fn file_id(file_body: &[u8], mime_type: &str) -> (String, usize, String) {
    let length = file_body.len();

    let mut hasher = Md5::new();
    hasher.update(file_body);
    let content_digest: [u8; 16] = hasher.clone().finalize().into();

    // Extend the running digest with the contextual metadata.
    hasher.update(format!(":{length}:{mime_type}"));
    let combined: [u8; 16] = hasher.finalize().into();

    (
        base62(digest_to_u128(combined)),
        length,
        hex(&content_digest),
    )
}

/// Identifier for a topic (a logical conversation thread).
///
/// Two posts share a topic if their compressed subject, group, and site
/// are all identical, so replies with `Re:` variations collapse together.
pub fn topic_id(compressed_subject: &str, group_id: &str, site_id: &str) -> String {
    let items = format!("{compressed_subject}:{group_id}:{site_id}");
    let digest: [u8; 16] = Md5::digest(items.as_bytes()).into();
    base62(digest_to_u128(digest))
}

/// Identifier for a post.
///
/// Two posts clash only if the topic, raw subject, body digest, sender,
/// in-reply-to reference, and total attachment length all match. This is a
/// best-effort heuristic, not a cryptographic uniqueness guarantee.
pub fn post_id(
    topic_id: &str,
    subject: &str,
    body_digest_hex: &str,
    sender: &str,
    in_reply_to: &str,
    total_attachment_length: usize,
) -> String {
    let items = format!(
        "{topic_id}:{subject}:{body_digest_hex}:{sender}:{in_reply_to}:{total_attachment_length}"
    );
    let digest: [u8; 16] = Md5::digest(items.as_bytes()).into();
    base62(digest_to_u128(digest))
}

/// Hex MD5 of a plain-text body, as used in the post-id derivation.
pub fn body_digest(body: &str) -> String {
    let digest: [u8; 16] = Md5::digest(body.as_bytes()).into();
    hex(&digest)
}
