//! Session-related types.
//!
//! Types stored in the session for authentication state.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use comptoir_core::{AccountType, Email, UserId};

use crate::backend::{AuthResponse, User};

/// Session-stored customer identity and backend tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub account_type: AccountType,
    /// Bearer token for backend calls.
    #[serde(with = "secret")]
    pub access_token: SecretString,
    #[serde(default, with = "optional_secret")]
    pub refresh_token: Option<SecretString>,
}

impl CurrentUser {
    #[must_use]
    pub fn from_auth(auth: AuthResponse) -> Self {
        let AuthResponse {
            access_token,
            refresh_token,
            user,
        } = auth;
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            account_type: user.account_type,
            access_token: SecretString::from(access_token),
            refresh_token: refresh_token.map(SecretString::from),
        }
    }

    /// Copy editable profile fields from a fresh backend user.
    pub fn refresh_profile(&mut self, user: &User) {
        self.first_name.clone_from(&user.first_name);
        self.last_name.clone_from(&user.last_name);
        self.account_type = user.account_type;
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.to_string()
        } else {
            name.to_string()
        }
    }

    #[must_use]
    pub const fn is_professional(&self) -> bool {
        self.account_type.is_professional()
    }
}

/// Session keys for per-visitor state.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the cart lines.
    pub const CART: &str = "cart";

    /// Key for the cached favorites list.
    pub const FAVORITES: &str = "favorites";

    /// Key for search state (last saved query, guest history).
    pub const SEARCH: &str = "search";
}

mod secret {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.expose_secret())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
        String::deserialize(deserializer).map(SecretString::from)
    }
}

mod optional_secret {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<SecretString>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(secret) => serializer.serialize_some(secret.expose_secret()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<SecretString>, D::Error> {
        Option::<String>::deserialize(deserializer).map(|value| value.map(SecretString::from))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn user() -> CurrentUser {
        CurrentUser {
            id: UserId::new(42),
            email: Email::parse("marie@plomberie-dupont.fr").unwrap(),
            first_name: "Marie".to_string(),
            last_name: "Dupont".to_string(),
            account_type: AccountType::Professionnel,
            access_token: SecretString::from("access-abc"),
            refresh_token: Some(SecretString::from("refresh-xyz")),
        }
    }

    #[test]
    fn test_tokens_survive_session_serialization() {
        let json = serde_json::to_value(user()).unwrap();
        let back: CurrentUser = serde_json::from_value(json).unwrap();
        assert_eq!(back.access_token.expose_secret(), "access-abc");
        assert_eq!(
            back.refresh_token.as_ref().map(ExposeSecret::expose_secret),
            Some("refresh-xyz")
        );
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let debug = format!("{:?}", user());
        assert!(!debug.contains("access-abc"));
        assert!(!debug.contains("refresh-xyz"));
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut current = user();
        assert_eq!(current.display_name(), "Marie Dupont");
        current.first_name.clear();
        current.last_name.clear();
        assert_eq!(current.display_name(), "marie@plomberie-dupont.fr");
    }
}
