//! Identity provider client
//!
//! Email/password and Google-token sign-in against an identity-toolkit
//! style REST API. Unverified accounts are rejected at sign-in with a
//! distinct verification-required failure and the session is cleared, so
//! the reconciler never sees an unverified user.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::AuthFailure;
use crate::model::UserProfile;
use crate::{Error, Result};

/// An authenticated session: the profile plus the token the document store
/// client needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub profile: UserProfile,
    pub id_token: String,
}

/// Client for the identity provider
pub struct IdentityClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    session: Mutex<Option<AuthSession>>,
    state_tx: watch::Sender<Option<UserProfile>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    id_token: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    #[serde(default)]
    email_verified: bool,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl IdentityClient {
    /// Create a client for the given identity endpoint
    #[must_use]
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let (state_tx, _) = watch::channel(None);
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: reqwest::Client::new(),
            session: Mutex::new(None),
            state_tx,
        }
    }

    /// Subscribe to auth-state changes; receives `None` when signed out
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<UserProfile>> {
        self.state_tx.subscribe()
    }

    /// Currently signed-in session, if any
    #[must_use]
    pub fn session(&self) -> Option<AuthSession> {
        self.session.lock().map(|s| (*s).clone()).unwrap_or_default()
    }

    /// Sign in with email and password
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` on a bad email/password pair, `EmailNotVerified`
    /// when the account exists but was never verified (the session is
    /// cleared before returning).
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserProfile> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        let response: SignInResponse = self.post("accounts:signInWithPassword", &body).await?;

        self.establish_verified_session(response).await
    }

    /// Sign in with a Google OAuth id token
    ///
    /// # Errors
    ///
    /// Returns an auth failure if the token is rejected or the account is
    /// unverified.
    pub async fn sign_in_with_google(&self, google_id_token: &str) -> Result<UserProfile> {
        let body = serde_json::json!({
            "postBody": format!("id_token={google_id_token}&providerId=google.com"),
            "requestUri": "http://localhost",
            "returnSecureToken": true,
        });
        let response: SignInResponse = self.post("accounts:signInWithIdp", &body).await?;

        self.establish_verified_session(response).await
    }

    /// Create an account, set the display name and send the verification
    /// email. The account is signed out before returning; the user must
    /// verify and sign in.
    ///
    /// # Errors
    ///
    /// `EmailInUse` if an account already exists for the email.
    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<()> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        let response: SignInResponse = self.post("accounts:signUp", &body).await?;

        self.update_profile(&response.id_token, name).await?;
        self.send_verification_email(&response.id_token).await?;

        // Freshly created accounts are unverified; force sign-out
        self.sign_out();
        tracing::info!(email, "account created, verification email sent");
        Ok(())
    }

    /// Set the account's display name
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the update.
    pub async fn update_profile(&self, id_token: &str, name: &str) -> Result<()> {
        let body = serde_json::json!({
            "idToken": id_token,
            "displayName": name,
            "returnSecureToken": false,
        });
        let _: serde_json::Value = self.post("accounts:update", &body).await?;
        Ok(())
    }

    /// Send the verification email for the given session token
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the request.
    pub async fn send_verification_email(&self, id_token: &str) -> Result<()> {
        let body = serde_json::json!({
            "requestType": "VERIFY_EMAIL",
            "idToken": id_token,
        });
        let _: serde_json::Value = self.post("accounts:sendOobCode", &body).await?;
        Ok(())
    }

    /// Clear the current session and notify subscribers
    pub fn sign_out(&self) {
        if let Ok(mut session) = self.session.lock() {
            *session = None;
        }
        let _ = self.state_tx.send(None);
    }

    async fn establish_verified_session(&self, response: SignInResponse) -> Result<UserProfile> {
        if !self.is_verified(&response.id_token).await? {
            self.sign_out();
            return Err(AuthFailure::EmailNotVerified.into());
        }

        let profile = UserProfile {
            uid: response.local_id,
            email: response.email,
            display_name: response.display_name,
        };

        if let Ok(mut session) = self.session.lock() {
            *session = Some(AuthSession {
                profile: profile.clone(),
                id_token: response.id_token,
            });
        }
        let _ = self.state_tx.send(Some(profile.clone()));

        tracing::info!(uid = %profile.uid, "signed in");
        Ok(profile)
    }

    async fn is_verified(&self, id_token: &str) -> Result<bool> {
        let body = serde_json::json!({ "idToken": id_token });
        let response: LookupResponse = self.post("accounts:lookup", &body).await?;
        Ok(response.users.first().is_some_and(|u| u.email_verified))
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}/v1/{operation}?key={}", self.base_url, self.api_key);
        let response = self.client.post(&url).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(map_provider_error(status, &text));
        }

        let body = response.text().await?;
        parse_body(&body)
    }
}

/// Decode a success body; a malformed one is a provider configuration
/// problem, not a credential failure
fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| Error::Config(format!("identity provider returned malformed body: {e}")))
}

/// Map a provider error body onto the auth failure taxonomy
fn map_provider_error(status: reqwest::StatusCode, body: &str) -> Error {
    let code = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_default();

    match code.as_str() {
        s if s.starts_with("EMAIL_NOT_FOUND")
            || s.starts_with("INVALID_PASSWORD")
            || s.starts_with("INVALID_LOGIN_CREDENTIALS") =>
        {
            AuthFailure::InvalidCredentials.into()
        }
        s if s.starts_with("EMAIL_EXISTS") => AuthFailure::EmailInUse.into(),
        _ => Error::Config(format!("identity provider error {status}: {code}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_body(code: &str) -> String {
        format!(r#"{{"error":{{"message":"{code}"}}}}"#)
    }

    #[test]
    fn credential_errors_map_to_invalid_credentials() {
        for code in ["EMAIL_NOT_FOUND", "INVALID_PASSWORD", "INVALID_LOGIN_CREDENTIALS"] {
            let err = map_provider_error(reqwest::StatusCode::BAD_REQUEST, &provider_body(code));
            assert!(matches!(err, Error::Auth(AuthFailure::InvalidCredentials)), "{code}");
        }
    }

    #[test]
    fn existing_email_maps_to_email_in_use() {
        let err =
            map_provider_error(reqwest::StatusCode::BAD_REQUEST, &provider_body("EMAIL_EXISTS"));
        assert!(matches!(err, Error::Auth(AuthFailure::EmailInUse)));
    }

    #[test]
    fn unknown_codes_stay_unclassified() {
        let err = map_provider_error(
            reqwest::StatusCode::BAD_REQUEST,
            &provider_body("TOO_MANY_ATTEMPTS_TRY_LATER"),
        );
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn malformed_success_body_is_a_config_error() {
        let err = parse_body::<SignInResponse>("<html>Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn sign_out_notifies_subscribers() {
        let client = IdentityClient::new("http://localhost", "key");
        let rx = client.subscribe();
        client.sign_out();
        assert!(rx.borrow().is_none());
        assert!(client.session().is_none());
    }
}
