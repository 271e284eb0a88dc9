//! Authentication configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Authentication configuration (hosted Supabase auth)
///
/// Session tokens are HS256 JWTs minted by the hosting project's auth
/// service and validated locally against the shared project secret.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared JWT secret of the hosting project
    pub jwt_secret: String,

    /// Expected token issuer, e.g. `https://<project>.supabase.co/auth/v1`
    pub issuer: String,

    /// Expected token audience
    #[serde(default = "default_audience")]
    pub audience: String,
}

impl AuthConfig {
    /// Validate authentication configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.jwt_secret.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH_JWT_SECRET"));
        }
        if self.issuer.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH_ISSUER"));
        }
        if !self.issuer.starts_with("https://") && !self.issuer.starts_with("http://") {
            return Err(ValidationError::InvalidIssuerUrl);
        }
        if self.audience.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH_AUDIENCE"));
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: String::new(),
            audience: default_audience(),
        }
    }
}

fn default_audience() -> String {
    "authenticated".to_string()
}
