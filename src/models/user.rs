use serde::{Deserialize, Serialize};

/// Token pair returned by a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub token_type: String,
}

/// Registration confirmation. Registering does not log the user in;
/// the backend only acknowledges account creation.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    #[serde(default)]
    pub uid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<i64>,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl UserProfile {
    /// Name to show in headers and tables, falling back to the email.
    pub fn display(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

/// Partial profile update; only the provided fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}
