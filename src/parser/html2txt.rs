//! HTML-to-plain-text conversion for messages that arrive without a
//! `text/plain` alternative.
//!
//! The converter keeps the text of every element, joined with single
//! spaces; empty element data becomes a line break. The `href` of an
//! anchor is shown in angle brackets after the link text, unless it is the
//! same as the link text. Duplicate blank lines are collapsed.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{PostError, Result};

static DUPE_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\n\n+").expect("newline pattern"));

/// Convert an HTML document or fragment to plain text.
///
/// Empty input is a caller error: a message with no HTML body has nothing
/// to convert, and silently returning an empty string would hide the bug.
pub fn convert_to_txt(html: &str) -> Result<String> {
    if html.is_empty() {
        return Err(PostError::EmptyHtml);
    }
    let mut converter = HtmlConverter::default();
    converter.feed(html);
    Ok(converter.into_text())
}

#[derive(Default)]
struct HtmlConverter {
    out: String,
    href_stack: Vec<String>,
    last_data: String,
}

impl HtmlConverter {
    fn feed(&mut self, html: &str) {
        let mut rest = html;
        loop {
            match rest.find('<') {
                None => {
                    self.handle_data(rest);
                    break;
                }
                Some(lt) => {
                    self.handle_data(&rest[..lt]);
                    let after = &rest[lt + 1..];
                    match after.find('>') {
                        Some(gt) => {
                            self.handle_tag(&after[..gt]);
                            rest = &after[gt + 1..];
                        }
                        None => break, // Unterminated tag; drop the tail.
                    }
                }
            }
        }
    }

    fn into_text(self) -> String {
        DUPE_NEWLINES.replace_all(&self.out, "\n\n").into_owned()
    }

    fn handle_tag(&mut self, tag: &str) {
        let tag = tag.trim();
        if let Some(rest) = tag.strip_prefix('/') {
            self.handle_end_tag(rest.trim());
        } else if !tag.starts_with('!') && !tag.starts_with('?') {
            self.handle_start_tag(tag.trim_end_matches('/').trim());
        }
    }

    fn handle_start_tag(&mut self, tag: &str) {
        let (name, attrs) = match tag.split_once(char::is_whitespace) {
            Some((name, attrs)) => (name, attrs),
            None => (tag, ""),
        };
        // Remember the href of the anchor; it is displayed after the link
        // text. The attribute may be absent when the anchor is a target.
        if name.eq_ignore_ascii_case("a") {
            self.href_stack
                .push(attr_value(attrs, "href").unwrap_or_default());
        }
    }

    fn handle_end_tag(&mut self, tag: &str) {
        if tag.eq_ignore_ascii_case("a") {
            if let Some(href) = self.href_stack.pop() {
                if !href.is_empty() && href != self.last_data.trim() {
                    self.out.push_str(&format!(" <{href}> "));
                }
            }
        }
    }

    fn handle_data(&mut self, data: &str) {
        if data.is_empty() {
            return;
        }
        let decoded = decode_entities(data);
        let trimmed = decoded.trim();
        let d = if trimmed.is_empty() {
            "\n".to_string()
        } else {
            format!("{trimmed} ")
        };
        self.last_data = trimmed.to_string();
        self.out.push_str(&d);
    }
}

/// Value of a named attribute inside a start tag, unquoted.
fn attr_value(attrs: &str, name: &str) -> Option<String> {
    let mut rest = attrs;
    loop {
        let eq = rest.find('=')?;
        let key = rest[..eq].trim();
        let mut value_part = rest[eq + 1..].trim_start();
        let value;
        if let Some(stripped) = value_part.strip_prefix('"') {
            let end = stripped.find('"')?;
            value = &stripped[..end];
            value_part = &stripped[end + 1..];
        } else if let Some(stripped) = value_part.strip_prefix('\'') {
            let end = stripped.find('\'')?;
            value = &stripped[..end];
            value_part = &stripped[end + 1..];
        } else {
            let end = value_part
                .find(char::is_whitespace)
                .unwrap_or(value_part.len());
            value = &value_part[..end];
            value_part = &value_part[end..];
        }
        if key.eq_ignore_ascii_case(name) {
            return Some(value.to_string());
        }
        rest = value_part;
    }
}

/// Decode character and entity references.
///
/// Numeric charrefs (`&#8230;`, `&#x2026;`) and the common named entities
/// are resolved; unrecognized named entities are removed.
fn decode_entities(data: &str) -> String {
    let mut out = String::with_capacity(data.len());
    let mut rest = data;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        match after.find(';') {
            Some(semi) if semi <= 32 => {
                let entity = &after[..semi];
                if let Some(c) = resolve_entity(entity) {
                    out.push_str(&c);
                }
                rest = &after[semi + 1..];
            }
            _ => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn resolve_entity(entity: &str) -> Option<String> {
    if let Some(num) = entity.strip_prefix('#') {
        let code = if let Some(hex) = num.strip_prefix(['x', 'X']) {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            num.parse::<u32>().ok()?
        };
        return char::from_u32(code).map(String::from);
    }
    let c = match entity {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ccedil" => 'ç',
        "eacute" => 'é',
        "egrave" => 'è',
        "agrave" => 'à',
        "uuml" => 'ü',
        "ouml" => 'ö',
        "auml" => 'ä',
        "szlig" => 'ß',
        "ntilde" => 'ñ',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        "rsquo" => '\u{2019}',
        "lsquo" => '\u{2018}',
        "rdquo" => '\u{201D}',
        "ldquo" => '\u{201C}',
        _ => return None, // Broken or exotic entity: drop it.
    };
    Some(c.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple() {
        let html = "<p>Tonight on Ethyl the Frog we look at violence.</p>";
        let r = convert_to_txt(html).unwrap();
        assert_eq!(r.trim(), "Tonight on Ethyl the Frog we look at violence.");
    }

    #[test]
    fn test_charref() {
        let html = "<p>Tonight on Ethyl the Frog&#8230; we look at violence.</p>";
        let r = convert_to_txt(html).unwrap();
        assert_eq!(
            r.trim(),
            "Tonight on Ethyl the Frog\u{2026} we look at violence."
        );
    }

    #[test]
    fn test_hex_charref() {
        let r = convert_to_txt("<p>a&#x2026;b</p>").unwrap();
        assert_eq!(r.trim(), "a\u{2026}b");
    }

    #[test]
    fn test_entityref() {
        let html = "<p>Je ne ecrit pas fran&ccedil;ais.</p>";
        let r = convert_to_txt(html).unwrap();
        assert_eq!(r.trim(), "Je ne ecrit pas français.");
    }

    #[test]
    fn test_broken_entityref_dropped() {
        let html = "<p>Je ne ecrit pas fran&piranha;ais.</p>";
        let r = convert_to_txt(html).unwrap();
        assert_eq!(r.trim(), "Je ne ecrit pas franais.");
    }

    #[test]
    fn test_anchor_href_shown() {
        let html = r#"<p><a href="http://example.com/">A frog</a></p>"#;
        let r = convert_to_txt(html).unwrap();
        assert!(r.contains("A frog"));
        assert!(r.contains("<http://example.com/>"));
    }

    #[test]
    fn test_anchor_href_same_as_text_hidden() {
        let html = r#"<a href="http://example.com/">http://example.com/</a>"#;
        let r = convert_to_txt(html).unwrap();
        assert_eq!(r.matches("http://example.com/").count(), 1);
    }

    #[test]
    fn test_anchor_target_without_href() {
        let html = r#"<a name="top">Top</a> of the page"#;
        let r = convert_to_txt(html).unwrap();
        assert_eq!(r.trim(), "Top of the page");
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(matches!(convert_to_txt(""), Err(PostError::EmptyHtml)));
    }

    #[test]
    fn test_duplicate_blank_lines_collapsed() {
        let html = "<div>one</div>\n\n\n\n<div>two</div>";
        let r = convert_to_txt(html).unwrap();
        assert!(!r.contains("\n\n\n"));
    }
}
