/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs Ltd <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Ambient credentials of the runtime service account

use crate::error::{Result, SchedulerError};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Token endpoint of the compute metadata server
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Source of OAuth access tokens for the platform's own APIs
#[async_trait]
pub trait AccessTokenSource: Send + Sync + std::fmt::Debug {
    async fn access_token(&self) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
}

/// Fetches the default service account's token from the metadata server
#[derive(Debug, Clone)]
pub struct MetadataServerCredentials {
    client: reqwest::Client,
    token_url: String,
}

impl MetadataServerCredentials {
    pub fn new() -> Self {
        Self::with_token_url(METADATA_TOKEN_URL)
    }

    pub fn with_token_url(token_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token_url: token_url.into(),
        }
    }
}

impl Default for MetadataServerCredentials {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccessTokenSource for MetadataServerCredentials {
    async fn access_token(&self) -> Result<String> {
        debug!("Requesting ambient access token");

        let response = self
            .client
            .get(&self.token_url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| SchedulerError::auth(format!("Metadata server unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(SchedulerError::auth(format!(
                "Metadata server answered {}",
                response.status()
            )));
        }

        let token = response.json::<MetadataToken>().await?;
        Ok(token.access_token)
    }
}

/// A fixed access token, for local runs and tests
#[derive(Debug, Clone)]
pub struct StaticAccessToken(pub String);

#[async_trait]
impl AccessTokenSource for StaticAccessToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
