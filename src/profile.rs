// src/profile.rs
//! User profile documents, stored beside the analysis history.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::auth::AuthContext;
use crate::error::AnalysisError;
use crate::store::AnalysisStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
}

impl UserProfile {
    fn from_document(doc: &Value) -> Self {
        Self {
            name: string_field(doc, "name"),
            email: string_field(doc, "email"),
            username: string_field(doc, "username"),
        }
    }
}

fn string_field(doc: &Value, key: &str) -> Option<String> {
    doc.get(key).and_then(Value::as_str).map(|s| s.to_string())
}

pub struct ProfileService {
    store: AnalysisStore,
    auth: Arc<dyn AuthContext>,
}

impl ProfileService {
    pub fn new(store: AnalysisStore, auth: Arc<dyn AuthContext>) -> Self {
        Self { store, auth }
    }

    /// Load the signed-in user's profile. A missing document or a
    /// missing `email` field falls back to the auth provider's email.
    pub async fn load(&self) -> Result<UserProfile, AnalysisError> {
        let user = self
            .auth
            .current_user()
            .ok_or(AnalysisError::Unauthenticated)?;

        let mut profile = match self.store.get_user_profile(&user.uid).await? {
            Some(doc) => UserProfile::from_document(&doc),
            None => UserProfile::default(),
        };

        if profile.email.is_none() {
            profile.email = Some(user.email);
        }
        Ok(profile)
    }

    pub async fn save(&self, profile: &UserProfile) -> Result<(), AnalysisError> {
        let user = self
            .auth
            .current_user()
            .ok_or(AnalysisError::Unauthenticated)?;

        let doc = serde_json::to_value(profile)
            .map_err(|e| AnalysisError::Unknown(format!("Failed to encode profile: {}", e)))?;
        self.store.save_user_profile(&user.uid, &doc).await
    }
}
