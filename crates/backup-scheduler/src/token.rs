/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs Ltd <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Bearer tokens for the volume API.
//!
//! The volume API accepts a JWT self-signed by a service account whose key is
//! kept in Secret Manager. The key is read once per invocation and the token
//! is reused for every volume.

use crate::{
    credentials::AccessTokenSource,
    error::{Result, SchedulerError},
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{debug, info};

/// Secret Manager v1 endpoint
pub const SECRET_MANAGER_URL: &str = "https://secretmanager.googleapis.com";

/// Audience the volume API expects in the token
pub const API_AUDIENCE: &str = "https://cloudvolumesgcp-api.netapp.com";

/// Lifetime of a signed token in seconds
pub const TOKEN_LIFETIME_SECS: i64 = 3600;

/// Bearer credential presented on every API call
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Produces the bearer token for an invocation
#[async_trait]
pub trait TokenProvider: Send + Sync + fmt::Debug {
    async fn get_token(&self) -> Result<BearerToken>;
}

/// Location of the service account key in Secret Manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretCoordinate {
    pub project: String,
    pub name: String,
    pub version: String,
}

impl SecretCoordinate {
    pub fn latest(project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
            version: "latest".to_string(),
        }
    }

    pub fn resource_name(&self) -> String {
        format!(
            "projects/{}/secrets/{}/versions/{}",
            self.project, self.name, self.version
        )
    }
}

/// The fields of a service account JSON key used for signing
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl ServiceAccountKey {
    /// Sign a token for `audience`, valid from `issued_at` (unix seconds)
    pub fn sign(&self, audience: &str, issued_at: i64) -> Result<BearerToken> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let claims = Claims {
            iss: self.client_email.clone(),
            sub: self.client_email.clone(),
            aud: audience.to_string(),
            iat: issued_at,
            exp: issued_at + TOKEN_LIFETIME_SECS,
        };

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())?;
        Ok(BearerToken::new(jsonwebtoken::encode(&header, &claims, &key)?))
    }
}

#[derive(Debug, Deserialize)]
struct AccessSecretVersionResponse {
    payload: SecretPayload,
}

#[derive(Debug, Deserialize)]
struct SecretPayload {
    data: String,
}

/// [`TokenProvider`] that signs with a key stored in Secret Manager
#[derive(Debug, Clone)]
pub struct SecretManagerTokenProvider {
    client: reqwest::Client,
    base_url: String,
    secret: SecretCoordinate,
    credentials: Arc<dyn AccessTokenSource>,
}

impl SecretManagerTokenProvider {
    pub fn new(secret: SecretCoordinate, credentials: Arc<dyn AccessTokenSource>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: SECRET_MANAGER_URL.to_string(),
            secret,
            credentials,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Read and decode the service account key
    pub async fn service_account_key(&self) -> Result<ServiceAccountKey> {
        let url = format!("{}/v1/{}:access", self.base_url, self.secret.resource_name());
        debug!("Accessing secret {}", self.secret.resource_name());

        let access_token = self.credentials.access_token().await?;
        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SchedulerError::auth(format!("Secret Manager unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(SchedulerError::auth(format!(
                "Cannot access secret {}: {}",
                self.secret.resource_name(),
                response.status()
            )));
        }

        let secret = response.json::<AccessSecretVersionResponse>().await?;
        let decoded = STANDARD.decode(secret.payload.data.as_bytes())?;

        Ok(serde_json::from_slice(&decoded)?)
    }
}

#[async_trait]
impl TokenProvider for SecretManagerTokenProvider {
    async fn get_token(&self) -> Result<BearerToken> {
        let key = self.service_account_key().await?;
        let token = key.sign(API_AUDIENCE, chrono::Utc::now().timestamp())?;
        info!("Obtained API token for {}", key.client_email);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation};

    const PRIVATE_KEY: &str = include_str!("../tests/fixtures/service_account_key.pem");
    const PUBLIC_KEY: &str = include_str!("../tests/fixtures/service_account_key.pub.pem");

    fn key() -> ServiceAccountKey {
        ServiceAccountKey {
            client_email: "scheduler@cvs-lab.iam.gserviceaccount.com".to_string(),
            private_key: PRIVATE_KEY.to_string(),
            private_key_id: Some("key-1".to_string()),
        }
    }

    #[test]
    fn test_sign_claims() {
        let now = chrono::Utc::now().timestamp();
        let token = key().sign(API_AUDIENCE, now).unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[API_AUDIENCE]);
        let decoded = jsonwebtoken::decode::<Claims>(
            token.secret(),
            &DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.header.kid.as_deref(), Some("key-1"));
        assert_eq!(decoded.claims.iss, "scheduler@cvs-lab.iam.gserviceaccount.com");
        assert_eq!(decoded.claims.sub, decoded.claims.iss);
        assert_eq!(decoded.claims.exp - decoded.claims.iat, TOKEN_LIFETIME_SECS);
    }

    #[test]
    fn test_sign_rejects_bad_key() {
        let mut key = key();
        key.private_key = "not a key".to_string();
        assert!(key.sign(API_AUDIENCE, 0).is_err());
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = BearerToken::new("eyJsecret");
        assert!(!format!("{:?}", token).contains("eyJsecret"));
        assert!(!format!("{:?}", key()).contains("PRIVATE KEY"));
    }

    #[test]
    fn test_secret_resource_name() {
        let secret = SecretCoordinate::latest("cv-solution-architect-lab", "cvs-backup-scheduler");
        assert_eq!(
            secret.resource_name(),
            "projects/cv-solution-architect-lab/secrets/cvs-backup-scheduler/versions/latest"
        );
    }
}
