//! Authentication and profile endpoints.

use reqwest::Method;
use secrecy::SecretString;
use serde_json::json;
use tracing::instrument;

use comptoir_core::{Email, UserId};

use super::types::{
    AuthResponse, ChangePasswordRequest, LoginRequest, ProfileUpdate, RegisterRequest,
    ResetPasswordRequest, User,
};
use super::{ApiError, BackendClient};

impl BackendClient {
    /// Exchange credentials for tokens.
    ///
    /// # Errors
    ///
    /// The backend answers 401 (or 400 for malformed input) on bad credentials.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &Email, password: &str) -> Result<AuthResponse, ApiError> {
        let path = "/auth/regular-login";
        let builder = self.request(Method::POST, path, None)?.json(&LoginRequest {
            email: email.as_str(),
            password,
        });
        self.send_json(builder, path).await
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Conflict` when the email is already registered.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        let path = "/auth/register";
        let builder = self.request(Method::POST, path, None)?.json(request);
        self.send_json(builder, path).await
    }

    /// Trade a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` once the refresh token has expired.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<AuthResponse, ApiError> {
        use secrecy::ExposeSecret;

        let path = "/auth/refresh";
        let builder = self
            .request(Method::POST, path, None)?
            .json(&json!({ "refreshToken": refresh_token.expose_secret() }));
        self.send_json(builder, path).await
    }

    /// Revoke the access token server-side.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all)]
    pub async fn logout(&self, token: &SecretString) -> Result<(), ApiError> {
        let path = "/auth/logout";
        let builder = self.request(Method::POST, path, Some(token))?;
        self.send_empty(builder, path).await
    }

    /// Fetch the account behind a token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for invalid tokens.
    #[instrument(skip_all)]
    pub async fn me(&self, token: &SecretString) -> Result<User, ApiError> {
        let path = "/auth/me";
        let builder = self.request(Method::GET, path, Some(token))?;
        self.send_json(builder, path).await
    }

    /// Ask the backend to email a password-reset link.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn forgot_password(&self, email: &Email) -> Result<(), ApiError> {
        let path = "/auth/forgot-password";
        let builder = self
            .request(Method::POST, path, None)?
            .json(&json!({ "email": email.as_str() }));
        self.send_empty(builder, path).await
    }

    /// Set a new password using the token from the reset email.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` for expired or unknown tokens.
    #[instrument(skip_all)]
    pub async fn reset_password(&self, reset_token: &str, password: &str) -> Result<(), ApiError> {
        let path = "/auth/reset-password";
        let builder = self.request(Method::POST, path, None)?.json(&ResetPasswordRequest {
            token: reset_token,
            password,
        });
        self.send_empty(builder, path).await
    }

    /// Change the password of the logged-in customer.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` when the current password is wrong.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        token: &SecretString,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let path = "/auth/change-password";
        let builder = self
            .request(Method::POST, path, Some(token))?
            .json(&ChangePasswordRequest {
                current_password,
                new_password,
            });
        self.send_empty(builder, path).await
    }

    /// Update profile fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, token, update), fields(user_id = %user_id))]
    pub async fn update_profile(
        &self,
        token: &SecretString,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, ApiError> {
        let path = format!("/users/{user_id}");
        let builder = self.request(Method::PUT, &path, Some(token))?.json(update);
        self.send_json(builder, &path).await
    }
}
