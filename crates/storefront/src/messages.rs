//! French banners shown after a redirect.
//!
//! Form handlers redirect with `?error=<code>` or `?success=<code>`; pages turn
//! the code into text here so templates never see raw codes.

use serde::Deserialize;

/// Query parameters for error/success display.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Banner texts resolved from a [`MessageQuery`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flash {
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
}

impl MessageQuery {
    #[must_use]
    pub fn flash(&self) -> Flash {
        Flash {
            error: self.error.as_deref().map(error_message),
            success: self.success.as_deref().and_then(success_message),
        }
    }
}

impl Flash {
    #[must_use]
    pub const fn error(message: &'static str) -> Self {
        Self {
            error: Some(message),
            success: None,
        }
    }
}

/// Text for an error code. Unknown codes get a generic message.
#[must_use]
pub fn error_message(code: &str) -> &'static str {
    match code {
        "credentials" => "Email ou mot de passe incorrect",
        "email" => "Adresse email invalide",
        "email_taken" => "Un compte existe déjà avec cette adresse email",
        "weak_password" => {
            "Le mot de passe doit contenir au moins 8 caractères, dont une lettre et un chiffre"
        }
        "password_mismatch" => "Les mots de passe ne correspondent pas",
        "missing_field" => "Veuillez remplir tous les champs obligatoires",
        "wrong_password" => "Le mot de passe actuel est incorrect",
        "invalid_token" => "Ce lien de réinitialisation est invalide ou a expiré",
        "rate_limited" => "Trop de tentatives, veuillez réessayer dans quelques instants",
        "session_expired" => "Votre session a expiré, veuillez vous reconnecter",
        "session" => "Impossible d'enregistrer votre session, veuillez réessayer",
        "login_required" => "Connectez-vous pour accéder à cette page",
        "empty_cart" => "Votre panier est vide",
        "quote_failed" => "Votre demande de devis n'a pas pu être envoyée",
        "address_invalid" => "Certains champs de l'adresse sont invalides",
        "siret" => "Le numéro SIRET doit comporter 14 chiffres valides",
        "already_applied" => "Une demande est déjà en cours pour votre compte",
        "not_found" => "Élément introuvable",
        _ => "Le service est momentanément indisponible",
    }
}

/// Text for a success code. Unknown codes show nothing.
#[must_use]
pub fn success_message(code: &str) -> Option<&'static str> {
    let message = match code {
        "registered" => "Votre compte a été créé, vous pouvez vous connecter",
        "logged_out" => "Vous êtes déconnecté",
        "reset_sent" => {
            "Si un compte existe pour cette adresse, un email de réinitialisation a été envoyé"
        }
        "password_reset" => "Votre mot de passe a été modifié, vous pouvez vous connecter",
        "password_changed" => "Votre mot de passe a été modifié",
        "profile_updated" => "Vos informations ont été mises à jour",
        "address_saved" => "Adresse enregistrée",
        "address_deleted" => "Adresse supprimée",
        "address_default" => "Adresse par défaut mise à jour",
        "quote_sent" => "Votre demande de devis a été envoyée",
        "postulation_sent" => "Votre demande de compte professionnel a été envoyée",
        _ => return None,
    };
    Some(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_banner() {
        let query = MessageQuery {
            error: Some("credentials".to_string()),
            success: None,
        };
        assert_eq!(
            query.flash().error,
            Some("Email ou mot de passe incorrect")
        );
    }

    #[test]
    fn test_unknown_codes() {
        assert_eq!(
            error_message("???"),
            "Le service est momentanément indisponible"
        );
        assert_eq!(success_message("???"), None);
    }
}
