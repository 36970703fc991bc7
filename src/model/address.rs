//! Email address parsing (RFC 5322 §3.4).

use serde::{Deserialize, Serialize};

/// A parsed email address.
///
/// # Examples
/// - `"Me <a.member@example.com>"` → `display_name = "Me"`, `address = "a.member@example.com"`
/// - `"user@example.com"` → `display_name = ""`, `address = "user@example.com"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`).
    pub address: String,
}

impl EmailAddress {
    /// Parse a single email address from a (decoded) header value.
    ///
    /// Supported formats:
    /// - `"user@domain.com"`
    /// - `"<user@domain.com>"`
    /// - `"Display Name <user@domain.com>"`
    /// - `"\"Display, Name\" <user@domain.com>"`
    ///
    /// If parsing fails, the raw string is stored as `address`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self {
                display_name: String::new(),
                address: String::new(),
            };
        }

        if let Some(angle_start) = trimmed.rfind('<') {
            if let Some(angle_end) = trimmed.rfind('>') {
                if angle_end > angle_start {
                    let address = trimmed[angle_start + 1..angle_end].trim().to_string();
                    let display_name = strip_quotes(&trimmed[..angle_start]);
                    return Self {
                        display_name,
                        address,
                    };
                }
            }
        }

        Self {
            display_name: String::new(),
            address: trimmed.to_string(),
        }
    }

    /// The address lower-cased, the comparison form used across the crate.
    pub fn address_lowercase(&self) -> String {
        self.address.to_lowercase()
    }
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.display_name.is_empty() {
            write!(f, "{}", self.address)
        } else {
            write!(f, "{} <{}>", self.display_name, self.address)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_address() {
        let addr = EmailAddress::parse("user@example.com");
        assert_eq!(addr.address, "user@example.com");
        assert_eq!(addr.display_name, "");
    }

    #[test]
    fn test_parse_angle_address() {
        let addr = EmailAddress::parse("<user@example.com>");
        assert_eq!(addr.address, "user@example.com");
        assert_eq!(addr.display_name, "");
    }

    #[test]
    fn test_parse_name_and_address() {
        let addr = EmailAddress::parse("Me <a.member@example.com>");
        assert_eq!(addr.address, "a.member@example.com");
        assert_eq!(addr.display_name, "Me");
    }

    #[test]
    fn test_parse_quoted_name() {
        let addr = EmailAddress::parse("\"Member, A\" <a.member@example.com>");
        assert_eq!(addr.display_name, "Member, A");
        assert_eq!(addr.address, "a.member@example.com");
    }

    #[test]
    fn test_parse_empty() {
        let addr = EmailAddress::parse("");
        assert_eq!(addr.address, "");
        assert_eq!(addr.display_name, "");
    }

    #[test]
    fn test_address_lowercase() {
        let addr = EmailAddress::parse("Me <A.Member@EXAMPLE.com>");
        assert_eq!(addr.address_lowercase(), "a.member@example.com");
    }

    #[test]
    fn test_display() {
        let addr = EmailAddress::parse("Me <a@b.com>");
        assert_eq!(addr.to_string(), "Me <a@b.com>");
    }
}
