//! Email address types.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::EmailAddressId;

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input string is empty.
    #[error("email cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("email must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input is not of the form `local@domain`.
    #[error("email must have the form local@domain")]
    Malformed,
}

/// An email address as reported by the identity provider.
///
/// The provider has already verified these addresses, so parsing only checks
/// the outer shape: non-empty, at most 254 characters (RFC 5321), and a
/// non-empty local part and domain around a single `@`.
///
/// ## Examples
///
/// ```
/// use alexandria_core::Email;
///
/// assert!(Email::parse("ada@example.com").is_ok());
/// assert!(Email::parse("ada").is_err());
/// assert!(Email::parse("@example.com").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an `Email` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, or not of the form
    /// `local@domain`.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        if s.is_empty() {
            return Err(EmailError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        match s.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(Self(s.to_owned()))
            }
            _ => Err(EmailError::Malformed),
        }
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One of a user's registered email addresses.
///
/// Mirrors the provider's `{id, email_address}` object. Tokens that carry an
/// email claim have no address ID, so `id` is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    /// Provider ID of the address, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EmailAddressId>,
    /// The address itself.
    pub email_address: Email,
}

impl EmailAddress {
    /// Create an address entry without a provider ID.
    #[must_use]
    pub const fn new(email_address: Email) -> Self {
        Self {
            id: None,
            email_address,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_emails() {
        assert!(Email::parse("user@example.com").is_ok());
        assert!(Email::parse("user+tag@sub.example.co.uk").is_ok());
        assert!(Email::parse("a@b").is_ok());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(Email::parse(""), Err(EmailError::Empty));
        assert_eq!(Email::parse("no-at-symbol"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("@example.com"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("user@"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("a@b@c"), Err(EmailError::Malformed));
    }

    #[test]
    fn test_parse_too_long() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            Email::parse(&long),
            Err(EmailError::TooLong { max: 254 })
        ));
    }

    #[test]
    fn test_email_address_deserializes_provider_shape() {
        let json = r#"{"id":"idn_2abc","email_address":"ada@example.com"}"#;
        let address: EmailAddress = serde_json::from_str(json).unwrap();
        assert_eq!(address.email_address.as_str(), "ada@example.com");
        assert_eq!(address.id.unwrap().as_str(), "idn_2abc");
    }

    #[test]
    fn test_email_address_without_id() {
        let address = EmailAddress::new(Email::parse("ada@example.com").unwrap());
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, r#"{"email_address":"ada@example.com"}"#);
    }
}
