//! Email address type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
///
/// Messages are shown to visitors as-is, hence French.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input string is empty.
    #[error("l'adresse email est obligatoire")]
    Empty,
    /// The input string is too long.
    #[error("l'adresse email doit contenir au plus {max} caractères")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input does not contain exactly one @ symbol.
    #[error("l'adresse email doit contenir un seul @")]
    InvalidAtSymbol,
    /// The local part (before @) is empty.
    #[error("l'adresse email doit avoir un identifiant avant le @")]
    EmptyLocalPart,
    /// The domain part (after @) is empty or has no dot.
    #[error("le domaine de l'adresse email est invalide")]
    InvalidDomain,
    /// The input contains whitespace.
    #[error("l'adresse email ne doit pas contenir d'espace")]
    Whitespace,
}

/// A normalized email address.
///
/// Login forms are typed by hand, so parsing trims surrounding whitespace and
/// lowercases the address before validating it. Two addresses that differ
/// only in case compare equal once parsed.
///
/// ## Constraints
///
/// - Length: 1-254 characters (RFC 5321 limit)
/// - Exactly one @ symbol, no inner whitespace
/// - Non-empty local part
/// - Domain containing at least one dot, not at either end
///
/// ## Examples
///
/// ```
/// use comptoir_core::Email;
///
/// let email = Email::parse("  Jean.Dupont@Plomberie.FR ").unwrap();
/// assert_eq!(email.as_str(), "jean.dupont@plomberie.fr");
///
/// assert!(Email::parse("").is_err());
/// assert!(Email::parse("pas-d-arobase").is_err());
/// assert!(Email::parse("jean@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse and normalize an `Email` from user input.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] describing the first violated constraint.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let Some((local, domain)) = s.split_once('@') else {
            return Err(EmailError::InvalidAtSymbol);
        };
        if domain.contains('@') {
            return Err(EmailError::InvalidAtSymbol);
        }
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(EmailError::InvalidDomain);
        }

        Ok(Self(s.to_lowercase()))
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Email` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns the domain part of the email (after the @).
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, domain)| domain)
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_emails() {
        assert!(Email::parse("artisan@example.com").is_ok());
        assert!(Email::parse("jean.dupont@example.fr").is_ok());
        assert!(Email::parse("devis+chantier@example.com").is_ok());
        assert!(Email::parse("a@b.co").is_ok());
    }

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let email = Email::parse("  Contact@Chauffage-Martin.FR\n").unwrap();
        assert_eq!(email.as_str(), "contact@chauffage-martin.fr");
        assert_eq!(email, Email::parse("contact@chauffage-martin.fr").unwrap());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("sans-arobase"), Err(EmailError::InvalidAtSymbol));
        assert_eq!(Email::parse("a@b@c.fr"), Err(EmailError::InvalidAtSymbol));
        assert_eq!(Email::parse("@example.fr"), Err(EmailError::EmptyLocalPart));
        assert_eq!(Email::parse("jean@"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("jean@localhost"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("jean@.fr"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("jean dupont@x.fr"), Err(EmailError::Whitespace));
    }

    #[test]
    fn test_parse_too_long() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            Email::parse(&long),
            Err(EmailError::TooLong { .. })
        ));
    }

    #[test]
    fn test_domain() {
        let email = Email::parse("user@example.com").unwrap();
        assert_eq!(email.domain(), "example.com");
    }

    #[test]
    fn test_serde_transparent() {
        let email = Email::parse("user@example.com").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"user@example.com\"");
    }

    #[test]
    fn test_error_messages_are_french() {
        assert_eq!(
            EmailError::Empty.to_string(),
            "l'adresse email est obligatoire"
        );
    }
}
