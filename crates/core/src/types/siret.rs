//! SIRET (French establishment identifier) type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Siret`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SiretError {
    #[error("le numéro SIRET doit comporter 14 chiffres")]
    Length,
    #[error("le numéro SIRET ne doit contenir que des chiffres")]
    NotNumeric,
    #[error("le numéro SIRET est invalide")]
    Checksum,
}

/// A 14-digit SIRET number.
///
/// Spaces are accepted in input (`732 829 320 00074`) and dropped. The number
/// must pass the Luhn check, except for La Poste establishments (SIREN
/// `356000000`) whose digit sum must be a multiple of 5.
///
/// ```
/// use comptoir_core::Siret;
///
/// let siret = Siret::parse("732 829 320 00074").unwrap();
/// assert_eq!(siret.as_str(), "73282932000074");
/// assert_eq!(siret.siren(), "732829320");
///
/// assert!(Siret::parse("73282932000075").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Siret(String);

impl Siret {
    pub const LENGTH: usize = 14;

    const LA_POSTE_SIREN: &'static str = "356000000";

    /// Parse a SIRET from user input.
    ///
    /// # Errors
    ///
    /// Returns a [`SiretError`] for a wrong length, non-digit characters or a
    /// failed checksum.
    pub fn parse(input: &str) -> Result<Self, SiretError> {
        let digits: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(SiretError::NotNumeric);
        }
        if digits.len() != Self::LENGTH {
            return Err(SiretError::Length);
        }

        let valid = if digits.starts_with(Self::LA_POSTE_SIREN) {
            digit_sum(&digits) % 5 == 0
        } else {
            luhn_valid(&digits)
        };
        if !valid {
            return Err(SiretError::Checksum);
        }
        Ok(Self(digits))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The company part (first nine digits).
    #[must_use]
    pub fn siren(&self) -> &str {
        &self.0[..9]
    }
}

fn digits(s: &str) -> impl DoubleEndedIterator<Item = u32> + '_ {
    s.chars().filter_map(|c| c.to_digit(10))
}

fn digit_sum(s: &str) -> u32 {
    digits(s).sum()
}

fn luhn_valid(s: &str) -> bool {
    let sum: u32 = digits(s)
        .rev()
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

impl fmt::Display for Siret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Siret {
    type Err = SiretError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_siret() {
        assert!(Siret::parse("44306184100047").is_ok());
        assert_eq!(
            Siret::parse(" 732 829 320 00074 ").map(|s| s.to_string()),
            Ok("73282932000074".to_string())
        );
    }

    #[test]
    fn test_invalid_siret() {
        assert_eq!(Siret::parse("7328293200007"), Err(SiretError::Length));
        assert_eq!(Siret::parse("7328293200007A"), Err(SiretError::NotNumeric));
        assert_eq!(Siret::parse("73282932000075"), Err(SiretError::Checksum));
        assert_eq!(Siret::parse(""), Err(SiretError::Length));
    }

    #[test]
    fn test_la_poste_exception() {
        // Fails Luhn but its digit sum is a multiple of 5
        assert!(Siret::parse("35600000049837").is_ok());
        assert_eq!(Siret::parse("35600000049838"), Err(SiretError::Checksum));
    }
}
