//! Construction parameters for a message.
//!
//! These come from the host application (the list-management layer knows
//! which group and site a message was posted to); there is no file-based
//! configuration in this crate.

use serde::{Deserialize, Serialize};

/// Per-list parameters used when normalizing a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Title of the mailing list, stripped from subject lines
    /// (e.g. `"Ethyl the Frog"` removes `"[Ethyl the Frog]"`).
    pub list_title: String,

    /// Identifier of the group the message was posted to.
    /// Part of the topic-id derivation.
    pub group_id: String,

    /// Identifier of the site hosting the group.
    /// Part of the topic-id derivation.
    pub site_id: String,

    /// Use the time the message was received rather than the `Date:`
    /// header. Mail dates are client-supplied and routinely wrong, so
    /// this is on by default.
    pub replace_mail_date: bool,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            list_title: String::new(),
            group_id: String::new(),
            site_id: String::new(),
            replace_mail_date: true,
        }
    }
}

impl ListConfig {
    /// Config for a named list, group, and site.
    pub fn new(
        list_title: impl Into<String>,
        group_id: impl Into<String>,
        site_id: impl Into<String>,
    ) -> Self {
        Self {
            list_title: list_title.into(),
            group_id: group_id.into(),
            site_id: site_id.into(),
            ..Self::default()
        }
    }
}
