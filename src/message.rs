//! The normalized view of one posted email message.
//!
//! An [`EmailMessage`] owns the raw message bytes and the list parameters
//! it was posted under. Everything else — part records, canonical bodies,
//! normalized subject, identifiers — is derived on first access and cached
//! for the life of the value. The derivation is pure and in-memory; after
//! it has run once the message can be shared read-only.

use std::fmt;
use std::sync::{LazyLock, OnceLock};

use chrono::{DateTime, Utc};
use encoding_rs::Encoding;
use mail_parser::{MessageParser, MimeHeaders};
use regex::Regex;
use tracing::warn;

use crate::config::ListConfig;
use crate::ident;
use crate::model::address::EmailAddress;
use crate::model::part::PartRecord;
use crate::parser::{charset, flatten, header, html2txt};
use crate::subject;

// Comments like "(NZDT)" after the timezone offset break RFC 2822 parsing.
static DATE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)").expect("date comment pattern"));

/// Maps a sender email address to an internal identifier.
///
/// The group/site membership lookup lives outside this crate; hosts inject
/// an implementation, tests inject a fake.
pub trait SenderResolver {
    fn resolve(&self, email_address: &str) -> String;
}

/// A raw email message plus the list context it was posted to, with lazily
/// derived, cached normalized fields.
pub struct EmailMessage {
    raw: Vec<u8>,
    config: ListConfig,
    sender_resolver: Option<Box<dyn SenderResolver>>,
    received: DateTime<Utc>,
    derived: OnceLock<Derived>,
    sender_id: OnceLock<String>,
}

/// Everything computed from one parse of the raw message.
struct Derived {
    encoding: &'static Encoding,
    parts: Vec<PartRecord>,
    headers: String,
    header_list: Vec<(String, String)>,
    subject: String,
    compressed_subject: String,
    sender: String,
    sender_name: String,
    to: String,
    in_reply_to: String,
    body: String,
    html_body: String,
    body_digest: String,
    topic_id: String,
    post_id: String,
    date: DateTime<Utc>,
}

impl EmailMessage {
    /// Wrap a raw RFC 5322 message.
    ///
    /// Construction never fails; unparsable input degrades to a bare
    /// header-block/body split with safe defaults everywhere.
    pub fn new(raw: impl Into<Vec<u8>>, config: ListConfig) -> Self {
        Self {
            raw: raw.into(),
            config,
            sender_resolver: None,
            received: Utc::now(),
            derived: OnceLock::new(),
            sender_id: OnceLock::new(),
        }
    }

    /// Attach the sender-identity lookup capability.
    pub fn with_sender_resolver(mut self, resolver: Box<dyn SenderResolver>) -> Self {
        self.sender_resolver = Some(resolver);
        self
    }

    /// Replace the underlying message wholesale (test/administrative use).
    /// Every derived value is invalidated and recomputed on next access.
    pub fn replace_raw(&mut self, raw: impl Into<Vec<u8>>) {
        self.raw = raw.into();
        self.derived.take();
        self.sender_id.take();
    }

    /// The raw message bytes.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    fn derived(&self) -> &Derived {
        self.derived.get_or_init(|| self.compute())
    }

    /// Subject, decoded and stripped of the list title and reply prefixes.
    /// `"No subject"` when nothing remains.
    pub fn subject(&self) -> &str {
        &self.derived().subject
    }

    /// Whitespace-free, lower-cased subject, used only for topic grouping.
    pub fn compressed_subject(&self) -> &str {
        &self.derived().compressed_subject
    }

    /// The canonical plain-text body: the first part with an empty filename
    /// and a non-HTML subtype, or the HTML body converted to text when no
    /// plain part exists. Empty when the message has neither.
    pub fn body(&self) -> &str {
        &self.derived().body
    }

    /// The canonical HTML body: the first part with an empty filename and
    /// an HTML subtype. Empty when none exists.
    pub fn html_body(&self) -> &str {
        &self.derived().html_body
    }

    /// Flattened `Name: Value` header block, one per line, in original
    /// order, duplicates preserved.
    pub fn headers(&self) -> &str {
        &self.derived().headers
    }

    /// Lower-cased email address from the From header.
    pub fn sender(&self) -> &str {
        &self.derived().sender
    }

    /// Display name from the From header.
    pub fn sender_name(&self) -> &str {
        &self.derived().sender_name
    }

    /// Lower-cased email address from the To header.
    pub fn to(&self) -> &str {
        &self.derived().to
    }

    /// The In-Reply-To header, decoded; empty when absent.
    pub fn in_reply_to(&self) -> &str {
        &self.derived().in_reply_to
    }

    /// A display title for the post.
    pub fn title(&self) -> String {
        format!("{} / {}", self.subject(), self.sender())
    }

    /// Hex MD5 of the plain-text body.
    pub fn body_digest(&self) -> &str {
        &self.derived().body_digest
    }

    /// Topic identifier: posts sharing a compressed subject, group, and
    /// site collapse to one topic.
    pub fn topic_id(&self) -> &str {
        &self.derived().topic_id
    }

    /// Post identifier, derived from topic, subject, body digest, sender,
    /// in-reply-to, and total attachment length.
    pub fn post_id(&self) -> &str {
        &self.derived().post_id
    }

    /// Canonical name of the message's own declared charset.
    pub fn encoding(&self) -> &'static str {
        self.derived().encoding.name()
    }

    /// All flattened part records, body included, in depth-first order.
    pub fn parts(&self) -> &[PartRecord] {
        &self.derived().parts
    }

    /// Part records surfaced to callers as attachments: those with a
    /// non-empty filename.
    pub fn attachments(&self) -> Vec<&PartRecord> {
        self.derived()
            .parts
            .iter()
            .filter(|p| p.is_attachment())
            .collect()
    }

    /// Count of parts with a non-empty filename.
    pub fn attachment_count(&self) -> usize {
        self.derived()
            .parts
            .iter()
            .filter(|p| p.is_attachment())
            .count()
    }

    /// Fixed locale tag; real language detection is a non-goal.
    pub fn language(&self) -> &'static str {
        "en"
    }

    /// When the message was sent. By default the receipt time is used, as
    /// client-supplied dates are routinely wrong; with
    /// `replace_mail_date = false` the Date header is parsed, falling back
    /// to the receipt time.
    pub fn date(&self) -> DateTime<Utc> {
        self.derived().date
    }

    /// Internal identifier of the sender, via the injected resolver.
    /// Empty when no resolver was supplied.
    pub fn sender_id(&self) -> &str {
        self.sender_id.get_or_init(|| {
            self.sender_resolver
                .as_ref()
                .map(|r| r.resolve(self.sender()))
                .unwrap_or_default()
        })
    }

    /// Decoded value of an arbitrary header, empty when absent.
    pub fn get(&self, name: &str) -> String {
        header::get(&self.derived().header_list, name)
            .map(header::decode_header)
            .unwrap_or_default()
    }

    fn compute(&self) -> Derived {
        let parsed = MessageParser::default().parse(self.raw.as_slice());

        let encoding = parsed
            .as_ref()
            .and_then(|m| m.parts.first())
            .and_then(|p| p.content_type())
            .and_then(|ct| ct.attribute("charset"))
            .map(charset::resolve)
            .unwrap_or(encoding_rs::UTF_8);

        let header_text =
            header::decode_header_block(header::raw_header_block(&self.raw), encoding);
        let header_list = header::unfold(&header_text);
        let headers = header_list
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join("\n");

        let parts = match &parsed {
            Some(message) => flatten::flatten(message, encoding),
            None => {
                warn!("message did not parse; falling back to bare body extraction");
                let body_text = charset::decode_lossy(header::raw_body(&self.raw), encoding);
                vec![flatten::fallback_record(&body_text, encoding)]
            }
        };
        assert!(
            !parts.is_empty(),
            "flattened message must contain at least one part record"
        );

        let raw_subject = header::get(&header_list, "Subject")
            .map(header::decode_header)
            .unwrap_or_default();
        let subject = subject::strip_subject(&raw_subject, &self.config.list_title, true);
        let compressed_subject = subject::compress_subject(&subject);

        let from_addr = EmailAddress::parse(
            &header::get(&header_list, "From")
                .map(header::decode_header)
                .unwrap_or_default(),
        );
        let sender = from_addr.address_lowercase();
        let sender_name = from_addr.display_name;

        let to = header::get(&header_list, "To")
            .map(header::decode_header)
            .map(|value| EmailAddress::parse(&value).address_lowercase())
            .unwrap_or_default();

        let in_reply_to = header::get(&header_list, "In-Reply-To")
            .map(header::decode_header)
            .unwrap_or_default();

        let html_body = parts
            .iter()
            .find(|p| p.is_html_candidate())
            .map(|p| p.payload.decode(p.charset.as_deref()))
            .unwrap_or_default();
        let mut body = parts
            .iter()
            .find(|p| p.is_body_candidate())
            .map(|p| p.payload.decode(p.charset.as_deref()))
            .unwrap_or_default();
        if body.is_empty() && !html_body.is_empty() {
            body = match html2txt::convert_to_txt(&html_body) {
                Ok(text) => text.trim().to_string(),
                Err(_) => String::new(),
            };
        }

        let body_digest = ident::body_digest(&body);
        let topic_id = ident::topic_id(
            &compressed_subject,
            &self.config.group_id,
            &self.config.site_id,
        );
        let total_length: usize = parts.iter().map(|p| p.length).sum();
        let post_id = ident::post_id(
            &topic_id,
            &subject,
            &body_digest,
            &sender,
            &in_reply_to,
            total_length,
        );

        let date = if self.config.replace_mail_date {
            self.received
        } else {
            header::get(&header_list, "Date")
                .and_then(parse_date)
                .unwrap_or(self.received)
        };

        Derived {
            encoding,
            parts,
            headers,
            header_list,
            subject,
            compressed_subject,
            sender,
            sender_name,
            to,
            in_reply_to,
            body,
            html_body,
            body_digest,
            topic_id,
            post_id,
            date,
        }
    }
}

impl fmt::Debug for EmailMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailMessage")
            .field("raw_len", &self.raw.len())
            .field("config", &self.config)
            .field("received", &self.received)
            .finish_non_exhaustive()
    }
}

/// Parse a Date header value: RFC 2822 with trailing comments stripped,
/// RFC 3339 as a fallback.
fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let cleaned = DATE_COMMENT.replace_all(value.trim(), "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(cleaned)
        .or_else(|_| DateTime::parse_from_rfc3339(cleaned))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
