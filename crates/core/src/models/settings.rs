use serde::Deserialize;
use std::time::Duration;

/// Client settings. Loaded by the embedding application (file + env),
/// every field has a usable default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Provider base URL, path included (e.g. `http://127.0.0.1:8000/api`).
    pub base_url: String,

    /// Timeout for a single HTTP request.
    pub request_timeout_secs: u64,

    /// Upper bound on one renewal exchange, shared by every waiting caller.
    pub renewal_timeout_secs: u64,

    /// Where the credential slots are persisted.
    pub credentials_path: String,

    /// When set, the credential file is sealed with this passphrase.
    pub credentials_passphrase: Option<String>,

    /// `tracing` level for the embedding application.
    pub log_level: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/api".to_string(),
            request_timeout_secs: 30,
            renewal_timeout_secs: 15,
            credentials_path: "config/credentials.json".to_string(),
            credentials_passphrase: None,
            log_level: "warn".to_string(),
        }
    }
}

impl ClientSettings {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    #[must_use]
    pub fn renewal_timeout(&self) -> Duration {
        Duration::from_secs(self.renewal_timeout_secs.max(1))
    }
}
