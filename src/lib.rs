//! `grouppost` — normalized post extraction from raw email messages.
//!
//! This crate turns a raw RFC 5322 message into the structured view a
//! mailing-list/group service needs to display, thread, and deduplicate
//! posts: a flattened list of MIME parts, canonical plain-text and HTML
//! bodies, a normalized subject, and deterministic content-addressed
//! identifiers for files, topics, and posts.
//!
//! The pipeline is permissive by design. Wrong or missing charsets,
//! malformed transfer encodings, and absent headers degrade to documented
//! defaults; callers only ever see well-formed strings and records,
//! possibly with lossy characters when the source encoding is
//! unrecoverable.
//!
//! ```
//! use grouppost::{EmailMessage, ListConfig};
//!
//! let raw = "From: Me <a.member@example.com>\n\
//!            Subject: Re: [Ethyl the Frog] Violence\n\
//!            \n\
//!            Tonight we look at violence.\n";
//! let config = ListConfig::new("Ethyl the Frog", "ethyl", "example.com");
//! let message = EmailMessage::new(raw, config);
//!
//! assert_eq!(message.subject(), "Violence");
//! assert_eq!(message.sender(), "a.member@example.com");
//! assert!(!message.topic_id().is_empty());
//! ```

pub mod config;
pub mod error;
pub mod ident;
pub mod message;
pub mod model;
pub mod parser;
pub mod subject;

pub use config::ListConfig;
pub use error::{PostError, Result};
pub use message::{EmailMessage, SenderResolver};
pub use model::address::EmailAddress;
pub use model::part::{PartPayload, PartRecord};
