//! Charset resolution: turning a claimed (and possibly lying) encoding name
//! into something the codec registry actually recognizes.

use encoding_rs::Encoding;
use tracing::warn;

/// Resolve a claimed encoding name to a registered encoding.
///
/// The name is matched case-insensitively against the WHATWG label table.
/// `"macintosh"` is a common historical mislabel and is resolved to the
/// Mac Roman encoding explicitly, along with the `"mac_roman"` spelling
/// that older software emits (it is not a WHATWG label).
///
/// Unknown or empty names fall back to UTF-8: we are going to be ignoring
/// errors in the encoding anyway, and UTF-8 is going to be right more of
/// the time in the rare case that we have to force this.
pub fn resolve(name: &str) -> &'static Encoding {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return encoding_rs::UTF_8;
    }
    if trimmed.eq_ignore_ascii_case("macintosh")
        || trimmed.eq_ignore_ascii_case("mac_roman")
        || trimmed.eq_ignore_ascii_case("mac-roman")
    {
        return encoding_rs::MACINTOSH;
    }
    match Encoding::for_label(trimmed.as_bytes()) {
        Some(encoding) => encoding,
        None => {
            warn!(charset = trimmed, "unknown charset, falling back to UTF-8");
            encoding_rs::UTF_8
        }
    }
}

/// Resolve a claimed encoding name to its canonical registry name.
pub fn resolve_name(name: &str) -> &'static str {
    resolve(name).name()
}

/// Strict decode: `None` if the bytes are not valid in the encoding.
pub fn decode_strict(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|cow| cow.into_owned())
}

/// Lossy decode: malformed sequences become replacement characters.
pub fn decode_lossy(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (decoded, _, _) = encoding.decode(bytes);
    decoded.into_owned()
}

/// Permissive ASCII decode: every non-ASCII byte is dropped.
///
/// Last-resort fallback when bytes do not validate against their claimed
/// charset.
pub fn decode_ascii_dropping(bytes: &[u8]) -> String {
    bytes
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| b as char)
        .collect()
}
