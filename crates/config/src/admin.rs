use secrecy::SecretString;
use serde::Deserialize;

/// The administrative credential bootstrapped into the store on first start.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdminConfig {
    pub username: String,
    /// Plain text password, usually `{{ env.ADMIN_PASSWORD }}`. Only its hash is stored.
    pub password: Option<SecretString>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: None,
        }
    }
}
