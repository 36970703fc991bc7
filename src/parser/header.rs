//! Raw header handling: RFC 2047 encoded-words, header-block extraction,
//! and unfolding.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;

use crate::parser::charset;

/// Decode a raw header value into a single normalized string.
///
/// A header value may be composed of multiple encoded words, each tagged
/// with its own charset (`=?charset?B|Q?text?=`), interleaved with plain
/// segments. Each word is decoded with its claimed charset (via the charset
/// resolver); words whose bytes do not validate fall back to permissive
/// ASCII with invalid bytes dropped. Untagged words are assumed UTF-8 (the
/// input is already a `&str`). All words are joined with a single space, so
/// folding whitespace and encoded-word boundaries collapse to one space
/// each.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= mundo"` → `"Hola mundo"`.
pub fn decode_header(raw: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut plain = String::new();
    let mut rest = raw;

    loop {
        match rest.find("=?") {
            None => {
                plain.push_str(rest);
                break;
            }
            Some(start) => {
                plain.push_str(&rest[..start]);
                match parse_encoded_word(&rest[start..]) {
                    Some((decoded, consumed)) => {
                        flush_plain(&mut plain, &mut words);
                        words.push(decoded);
                        rest = &rest[start + consumed..];
                    }
                    None => {
                        // Not a valid encoded word; keep the marker as text.
                        plain.push_str("=?");
                        rest = &rest[start + 2..];
                    }
                }
            }
        }
    }
    flush_plain(&mut plain, &mut words);

    words.join(" ")
}

fn flush_plain(plain: &mut String, words: &mut Vec<String>) {
    let trimmed = plain.trim();
    if !trimmed.is_empty() {
        words.push(trimmed.to_string());
    }
    plain.clear();
}

/// Parse one `=?charset?encoding?text?=` token at the start of `s`.
///
/// Returns the decoded text and the number of bytes consumed, or `None`
/// if the token is malformed.
fn parse_encoded_word(s: &str) -> Option<(String, usize)> {
    let inner = s.strip_prefix("=?")?;
    let first_q = inner.find('?')?;
    let charset_name = &inner[..first_q];

    let rest = &inner[first_q + 1..];
    let second_q = rest.find('?')?;
    let encoding = &rest[..second_q];

    let rest2 = &rest[second_q + 1..];
    let end = rest2.find("?=")?;
    let encoded_text = &rest2[..end];

    let consumed = 2 + first_q + 1 + second_q + 1 + end + 2;

    let bytes = match encoding {
        "B" | "b" => decode_b64(encoded_text)?,
        "Q" | "q" => decode_q(encoded_text),
        _ => return None,
    };

    let resolved = charset::resolve(charset_name);
    let text = charset::decode_strict(&bytes, resolved)
        .unwrap_or_else(|| charset::decode_ascii_dropping(&bytes));

    Some((text, consumed))
}

/// Base64 decode tolerating embedded whitespace and missing padding.
fn decode_b64(input: &str) -> Option<Vec<u8>> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(&cleaned)
        .or_else(|_| STANDARD_NO_PAD.decode(cleaned.trim_end_matches('=')))
        .ok()
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                match u8::from_str_radix(
                    std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("zz"),
                    16,
                ) {
                    Ok(byte) => {
                        result.push(byte);
                        i += 3;
                    }
                    Err(_) => {
                        result.push(b'=');
                        i += 1;
                    }
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

/// The raw header block: everything before the first blank line.
pub fn raw_header_block(data: &[u8]) -> &[u8] {
    match find_header_end(data) {
        Some(pos) => &data[..pos],
        None => data,
    }
}

/// The raw body: everything after the first blank line, empty if there is
/// no header/body separator.
pub fn raw_body(data: &[u8]) -> &[u8] {
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return &data[i + 2..];
        }
        if i + 3 < data.len() && &data[i..i + 4] == b"\r\n\r\n" {
            return &data[i + 4..];
        }
    }
    &[]
}

fn find_header_end(data: &[u8]) -> Option<usize> {
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some(i);
        }
        if i + 3 < data.len() && &data[i..i + 4] == b"\r\n\r\n" {
            return Some(i);
        }
    }
    None
}

/// Decode raw header bytes to text: UTF-8 first, then the message's own
/// declared encoding, strictly and then lossily.
pub fn decode_header_block(bytes: &[u8], encoding: &'static encoding_rs::Encoding) -> String {
    if let Some(text) = charset::decode_strict(bytes, encoding_rs::UTF_8) {
        return text;
    }
    charset::decode_strict(bytes, encoding)
        .unwrap_or_else(|| charset::decode_lossy(bytes, encoding))
}

/// Unfold headers: join continuation lines (starting with space or tab)
/// with the previous header value.
///
/// Returns `(name, raw_value)` pairs with original casing, original order,
/// and duplicates preserved, as repeated headers are legal in mail.
pub fn unfold(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_string();
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name, value));
        }
        // Lines without a colon that are not continuations are skipped.
    }

    result
}

/// First value for a header name, case-insensitive.
pub fn get<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
