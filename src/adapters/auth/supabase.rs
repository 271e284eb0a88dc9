//! Supabase JWT adapter for access token validation.
//!
//! This adapter implements the `SessionValidator` port for the hosted
//! Supabase auth service. Supabase signs access tokens with the project's
//! shared JWT secret (HS256), so validation happens entirely locally:
//!
//! 1. Verify the HMAC signature against the configured secret
//! 2. Validate issuer, audience, and expiry claims
//! 3. Map claims to the domain `AuthenticatedUser` type
//!
//! No network call is involved; an unreachable auth service only affects
//! sign-in, never validation of already-issued tokens.
//!
//! # Example
//!
//! ```ignore
//! use campus_chat::adapters::auth::{SupabaseJwtConfig, SupabaseSessionValidator};
//! use campus_chat::ports::SessionValidator;
//!
//! let config = SupabaseJwtConfig::new(
//!     jwt_secret,
//!     "https://myproject.supabase.co/auth/v1",
//!     "authenticated",
//! );
//!
//! let validator = SupabaseSessionValidator::new(config);
//! let user = validator.validate("eyJ...").await?;
//! ```

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::ports::SessionValidator;

/// Configuration for the Supabase JWT adapter.
#[derive(Debug, Clone)]
pub struct SupabaseJwtConfig {
    /// The project JWT secret used to sign access tokens.
    pub jwt_secret: SecretString,

    /// Expected issuer claim, e.g. "https://myproject.supabase.co/auth/v1".
    pub issuer: String,

    /// Expected audience claim. Supabase issues "authenticated" for
    /// signed-in users.
    pub audience: String,
}

impl SupabaseJwtConfig {
    /// Create a new configuration with required fields.
    pub fn new(
        jwt_secret: SecretString,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            jwt_secret,
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }
}

/// JWT claims structure for Supabase access tokens.
#[derive(Debug, Serialize, Deserialize)]
struct SupabaseClaims {
    /// Subject - the user ID issued by the auth service
    sub: String,

    /// Expiry timestamp (Unix epoch seconds)
    exp: i64,

    /// User's email address
    #[serde(default)]
    email: Option<String>,

    /// Profile fields the user set at sign-up
    #[serde(default)]
    user_metadata: UserMetadata,
}

/// The slice of Supabase `user_metadata` this core reads.
#[derive(Debug, Default, Serialize, Deserialize)]
struct UserMetadata {
    #[serde(default)]
    full_name: Option<String>,

    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    email_verified: Option<bool>,
}

/// Supabase session validator.
///
/// Validates access tokens against the project JWT secret and extracts
/// user identity. This is the production implementation of
/// `SessionValidator`.
pub struct SupabaseSessionValidator {
    config: SupabaseJwtConfig,
    decoding_key: DecodingKey,
}

impl SupabaseSessionValidator {
    /// Create a new Supabase validator.
    ///
    /// The decoding key is derived from the secret once and reused for
    /// every validation.
    pub fn new(config: SupabaseJwtConfig) -> Self {
        let decoding_key =
            DecodingKey::from_secret(config.jwt_secret.expose_secret().as_bytes());

        Self {
            config,
            decoding_key,
        }
    }

    /// Validate a token's signature and claims.
    fn validate_token(&self, token: &str) -> Result<TokenData<SupabaseClaims>, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        decode::<SupabaseClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Token expired");
                    AuthError::TokenExpired
                }
                ErrorKind::InvalidIssuer => {
                    tracing::warn!("Invalid issuer in token");
                    AuthError::InvalidToken
                }
                ErrorKind::InvalidAudience => {
                    tracing::warn!("Invalid audience in token");
                    AuthError::InvalidToken
                }
                _ => {
                    tracing::debug!("Token validation failed: {}", e);
                    AuthError::InvalidToken
                }
            }
        })
    }
}

#[async_trait]
impl SessionValidator for SupabaseSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let token_data = self.validate_token(token)?;
        let claims = token_data.claims;

        // The subject must be a UUID; it becomes the caller's identity for
        // every authorization check downstream
        let user_id = claims.sub.parse().map_err(|_| {
            tracing::warn!("Invalid user ID in token subject: {}", claims.sub);
            AuthError::InvalidToken
        })?;

        let email = claims.email.ok_or_else(|| {
            tracing::warn!("Token missing email claim");
            AuthError::InvalidToken
        })?;

        Ok(AuthenticatedUser::new(
            user_id,
            email,
            claims.user_metadata.full_name.or(claims.user_metadata.name),
            claims.user_metadata.email_verified.unwrap_or(false),
        ))
    }
}

impl std::fmt::Debug for SupabaseSessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseSessionValidator")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .finish_non_exhaustive()
    }
}
