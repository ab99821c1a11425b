use serde::{Deserialize, Serialize};

/// The signed-in user, cached next to the credentials for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
}

/// Access + refresh credential pair. Both are opaque strings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access: String,
    pub refresh: String,
}

impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// `POST /auth/signin/` body. No `Debug`: it carries the password.
#[derive(Clone, Serialize)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

/// `POST /auth/signup/` body.
#[derive(Clone, Serialize)]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Successful sign-in / sign-up response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: Identity,
    pub tokens: CredentialPair,
}

/// `POST /auth/token/refresh/` body.
#[derive(Serialize)]
pub(crate) struct RenewalRequest<'a> {
    pub refresh: &'a str,
}

/// Successful renewal. `refresh` is only present when the provider rotates it.
#[derive(Deserialize)]
pub(crate) struct RenewalResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}
