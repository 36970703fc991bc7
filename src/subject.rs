//! Subject-line normalization: stripping list titles, reply and forward
//! prefixes, and bracket wrappers, plus the compressed comparison form used
//! for topic grouping.

use std::sync::LazyLock;

use regex::Regex;

// See <http://www.w3.org/TR/unicode-xml/#Suitable>
static PARA_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[\u{2028}\u{2029}]+").expect("paragraph separator pattern"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));
static RE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("(?i)^re:").expect("re prefix pattern"));
static FWD_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("(?i)^fwd?:").expect("fwd prefix pattern"));

// Interlinear annotation anchors, the object-replacement character, and the
// zero-width no-break space are never wanted at the ends of a subject.
const ANNOYING: [char; 5] = ['\u{FFF9}', '\u{FFFA}', '\u{FFFB}', '\u{FFFC}', '\u{FEFF}'];
// Directional embedding/override marks, split by the edge they cling to.
const ANNOYING_LEFT: [char; 2] = ['\u{202A}', '\u{202D}'];
const ANNOYING_RIGHT: [char; 2] = ['\u{202B}', '\u{202E}'];

fn annoying_left(c: char) -> bool {
    c.is_whitespace() || ANNOYING.contains(&c) || ANNOYING_LEFT.contains(&c)
}

fn annoying_right(c: char) -> bool {
    c.is_whitespace() || ANNOYING.contains(&c) || ANNOYING_RIGHT.contains(&c)
}

fn trim_annoying(s: &str) -> &str {
    s.trim_start_matches(annoying_left)
        .trim_end_matches(annoying_right)
}

/// `Some(inner)` if the whole string is wrapped in one matching pair of
/// square brackets (`"[Fwd: ...]"`-style wrapping).
fn unwrap_brackets(s: &str) -> Option<&str> {
    if s.len() < 2 || !s.starts_with('[') || !s.ends_with(']') {
        return None;
    }
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
                // The opening bracket must not close before the end.
                if depth == 0 && i != s.len() - 1 {
                    return None;
                }
            }
            _ => {}
        }
    }
    if depth == 0 {
        Some(&s[1..s.len() - 1])
    } else {
        None
    }
}

/// Tidy a subject line for display and identifier derivation.
///
/// In order:
/// 1. remove an exact bracketed occurrence of `list_title` anywhere in the
///    subject (literal, case-sensitive match);
/// 2. replace Unicode paragraph/line separators with a space;
/// 3. when `remove_reply_prefix`: strip one whole-subject `[...]` wrapper,
///    one leading `Re:`, and one leading `Fw:`/`Fwd:` (case-insensitive),
///    trimming directional and invisible control characters throughout;
/// 4. collapse internal whitespace runs to single spaces and trim;
/// 5. substitute `"No subject"` when nothing is left.
pub fn strip_subject(subject: &str, list_title: &str, remove_reply_prefix: bool) -> String {
    let mut s = subject.to_string();

    if !list_title.is_empty() {
        let pattern = format!(r"\[{}\]", regex::escape(list_title));
        if let Ok(title_re) = Regex::new(&pattern) {
            s = title_re.replace_all(&s, "").trim().to_string();
        }
    }

    s = PARA_SEPARATORS.replace_all(&s, " ").into_owned();

    if remove_reply_prefix {
        let mut t = trim_annoying(&s).to_string();
        if let Some(inner) = unwrap_brackets(&t) {
            t = trim_annoying(inner).to_string();
        }
        t = RE_PREFIX.replace(&t, "").into_owned();
        t = trim_annoying(&t).to_string();
        t = FWD_PREFIX.replace(&t, "").into_owned();
        s = trim_annoying(&t).to_string();
    } else {
        s = trim_annoying(&s).to_string();
    }

    let s = WHITESPACE_RUN.replace_all(&s, " ").trim().to_string();
    if s.is_empty() {
        "No subject".to_string()
    } else {
        s
    }
}

/// Compress a subject for equality comparison: remove all whitespace and
/// lower-case the remainder. Never shown to a user.
pub fn compress_subject(subject: &str) -> String {
    WHITESPACE_RUN.replace_all(subject, "").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_list_title() {
        let r = strip_subject("[Ethyl the Frog] Violence", "Ethyl the Frog", true);
        assert_eq!(r, "Violence");
    }

    #[test]
    fn test_strip_reply_prefix_and_title() {
        let r = strip_subject("Re: [Ethyl the Frog] Violence", "Ethyl the Frog", true);
        assert_eq!(r, "Violence");
    }

    #[test]
    fn test_strip_empty_subject() {
        assert_eq!(strip_subject("", "Ethyl the Frog", true), "No subject");
    }

    #[test]
    fn test_strip_whitespace_only_subject() {
        assert_eq!(strip_subject("  \t ", "", true), "No subject");
    }

    #[test]
    fn test_strip_fwd_bracket_wrapper() {
        assert_eq!(strip_subject("[Fwd: Violence]", "G", true), "Violence");
    }

    #[test]
    fn test_strip_fw_prefix() {
        assert_eq!(strip_subject("Fw: Violence", "", true), "Violence");
    }

    #[test]
    fn test_strip_keeps_non_wrapping_brackets() {
        assert_eq!(strip_subject("[PATCH] Violence", "", true), "[PATCH] Violence");
    }

    #[test]
    fn test_strip_keeps_prefix_when_disabled() {
        assert_eq!(strip_subject("Re: Violence", "", false), "Re: Violence");
    }

    #[test]
    fn test_strip_paragraph_separators() {
        let r = strip_subject("The\u{2028}Violence", "", true);
        assert_eq!(r, "The Violence");
    }

    #[test]
    fn test_strip_directional_controls() {
        let r = strip_subject("\u{202A}Violence\u{202E}", "", true);
        assert_eq!(r, "Violence");
    }

    #[test]
    fn test_strip_collapses_whitespace() {
        assert_eq!(strip_subject("The  Violence\tOf", "", true), "The Violence Of");
    }

    #[test]
    fn test_strip_idempotent_on_clean_subjects() {
        for s in ["Violence", "The Violence Of British Gangland", "No subject"] {
            let once = strip_subject(s, "Ethyl the Frog", true);
            let twice = strip_subject(&once, "Ethyl the Frog", true);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_strip_title_requires_exact_case() {
        let r = strip_subject("[ethyl the frog] Violence", "Ethyl the Frog", true);
        assert_eq!(r, "[ethyl the frog] Violence");
    }

    #[test]
    fn test_compress_subject() {
        assert_eq!(
            compress_subject("The Violence Of British Gangland"),
            "theviolenceofbritishgangland"
        );
    }

    #[test]
    fn test_compress_empty() {
        assert_eq!(compress_subject(""), "");
    }

    #[test]
    fn test_unwrap_brackets_matched_only() {
        assert_eq!(unwrap_brackets("[abc]"), Some("abc"));
        assert_eq!(unwrap_brackets("[a] b [c]"), None);
        assert_eq!(unwrap_brackets("[abc"), None);
        assert_eq!(unwrap_brackets("abc]"), None);
        assert_eq!(unwrap_brackets("[a [b] c]"), Some("a [b] c"));
    }
}
