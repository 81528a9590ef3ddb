// src/auth.rs
//! Authentication collaborator: a thin client for the hosted identity
//! service plus the injectable `AuthContext` seam the rest of the crate
//! depends on.

use anyhow::{Context, Result};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tracing::{info, warn};

use crate::error::AnalysisError;

/// The identity the store namespaces records under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

/// Ambient "current authenticated user", made explicit so the
/// orchestration and profile paths can be driven with fake identities.
pub trait AuthContext: Send + Sync {
    fn current_user(&self) -> Option<AuthUser>;
}

/// A signed-in session as returned by the identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub uid: String,
    pub email: String,
    pub id_token: String,
}

/// Claims we read from the ID token. Verifying the signature is the
/// server's concern; client-side we only consult the expiry.
#[derive(Debug, Deserialize)]
struct SessionClaims {
    #[allow(dead_code)]
    exp: usize,
}

#[derive(Debug, Serialize)]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(rename = "returnSecureToken")]
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(rename = "localId")]
    local_id: String,
    email: String,
    #[serde(rename = "idToken")]
    id_token: String,
}

const SIGN_UP_ENDPOINT: &str = "/v1/accounts:signUp";
const SIGN_IN_ENDPOINT: &str = "/v1/accounts:signInWithPassword";

pub struct AuthClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    session: RwLock<Option<Session>>,
}

impl AuthClient {
    pub fn new(base_url: String, api_key: String, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            api_key,
            session: RwLock::new(None),
        })
    }

    /// Create an account and sign the new user in. Exactly one success
    /// or one failure per call.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AnalysisError> {
        self.credentials_call(SIGN_UP_ENDPOINT, email, password, "Sign up failed")
            .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AnalysisError> {
        self.credentials_call(SIGN_IN_ENDPOINT, email, password, "Log in failed")
            .await
    }

    pub fn sign_out(&self) {
        let mut session = self.session.write().expect("auth session lock");
        if session.take().is_some() {
            info!("Signed out");
        }
    }

    /// Re-adopt a session persisted by an earlier process, e.g. the
    /// CLI's token file. Expired tokens read back as signed-out.
    pub fn restore_session(&self, session: Session) {
        *self.session.write().expect("auth session lock") = Some(session);
    }

    pub fn session_snapshot(&self) -> Option<Session> {
        self.session.read().expect("auth session lock").clone()
    }

    async fn credentials_call(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
        fallback: &str,
    ) -> Result<AuthUser, AnalysisError> {
        let url = format!("{}{}?key={}", self.base_url, endpoint, self.api_key);
        let request = CredentialsRequest {
            email,
            password,
            return_secure_token: true,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Identity service rejected request ({}): {}", status, body);
            return Err(AnalysisError::RemoteRejected(auth_rejection_detail(
                &body, fallback,
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|_| AnalysisError::MalformedResponse)?;

        let user = AuthUser {
            uid: token.local_id.clone(),
            email: token.email.clone(),
        };

        *self.session.write().expect("auth session lock") = Some(Session {
            uid: token.local_id,
            email: token.email,
            id_token: token.id_token,
        });

        info!("Signed in as {}", user.email);
        Ok(user)
    }
}

impl AuthContext for AuthClient {
    fn current_user(&self) -> Option<AuthUser> {
        let session = self.session.read().expect("auth session lock");
        let session = session.as_ref()?;
        if !token_is_live(&session.id_token) {
            return None;
        }
        Some(AuthUser {
            uid: session.uid.clone(),
            email: session.email.clone(),
        })
    }
}

/// Decode the ID token's claims without verifying the signature and
/// check it has not expired.
fn token_is_live(token: &str) -> bool {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_aud = false;
    decode::<SessionClaims>(token, &DecodingKey::from_secret(&[]), &validation).is_ok()
}

/// Identity-service error bodies nest the message under `error.message`.
fn auth_rejection_detail(body: &str, fallback: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(|m| m.to_string())
        })
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_rejection_prefers_service_message() {
        let body = r#"{"error": {"message": "EMAIL_EXISTS", "code": 400}}"#;
        assert_eq!(auth_rejection_detail(body, "Sign up failed"), "EMAIL_EXISTS");
    }

    #[test]
    fn auth_rejection_falls_back_on_garbage() {
        assert_eq!(auth_rejection_detail("<html>", "Log in failed"), "Log in failed");
        assert_eq!(auth_rejection_detail("", "Log in failed"), "Log in failed");
    }

    #[test]
    fn garbage_token_reads_as_signed_out() {
        assert!(!token_is_live("not-a-jwt"));
    }

    #[tokio::test]
    async fn restored_session_with_dead_token_yields_no_user() {
        let client = AuthClient::new("https://auth.invalid".to_string(), String::new(), 5).unwrap();
        client.restore_session(Session {
            uid: "u1".to_string(),
            email: "u1@example.com".to_string(),
            id_token: "expired-or-garbage".to_string(),
        });
        assert!(client.current_user().is_none());
    }

    #[test]
    fn sign_out_clears_the_session() {
        let client = AuthClient::new("https://auth.invalid".to_string(), String::new(), 5).unwrap();
        client.restore_session(Session {
            uid: "u1".to_string(),
            email: "u1@example.com".to_string(),
            id_token: "token".to_string(),
        });
        assert!(client.session_snapshot().is_some());
        client.sign_out();
        assert!(client.session_snapshot().is_none());
    }
}
