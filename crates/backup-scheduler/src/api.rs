/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs Ltd <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Cloud Volumes Service REST client

use crate::{
    error::{Result, SchedulerError},
    identity::ProjectNumber,
    label::{ActiveLabel, BackupLabel},
    naming::BackupName,
    retention::{plan_rotation, RotationPlan},
    token::BearerToken,
};
use chrono::NaiveDateTime;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// Production endpoint of the volume-management API
pub const DEFAULT_API_URL: &str = "https://cloudvolumesgcp-api.netapp.com";

/// User agent sent with every request
pub const USER_AGENT: &str = "cvs-backup-scheduler";

/// Only software-defined volumes support backups
pub const SUPPORTED_STORAGE_CLASS: &str = "software";

/// A volume as returned by the volume listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub volume_id: String,
    pub name: String,
    pub region: String,
    pub storage_class: String,
}

impl Volume {
    pub fn is_supported(&self) -> bool {
        self.storage_class == SUPPORTED_STORAGE_CLASS
    }
}

/// A backup as returned by the backup listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub backup_id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
struct CreateBackupRequest<'a> {
    name: &'a str,
}

/// Result of rotating one volume's backups
#[derive(Debug, Clone)]
pub struct RotationOutcome {
    pub plan: RotationPlan,
    /// Backup id deleted to make room
    pub evicted: Option<String>,
    /// Set when the eviction was attempted but failed
    pub delete_error: Option<String>,
}

/// Authenticated client for one project
#[derive(Debug, Clone)]
pub struct CloudVolumesApi {
    client: reqwest::Client,
    base_url: String,
    project_number: ProjectNumber,
    token: BearerToken,
}

impl CloudVolumesApi {
    pub fn new(base_url: &str, project_number: ProjectNumber, token: BearerToken) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| SchedulerError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_number,
            token,
        })
    }

    pub fn project_number(&self) -> &ProjectNumber {
        &self.project_number
    }

    /// List the volumes of every region
    pub async fn list_volumes(&self) -> Result<Vec<Volume>> {
        let url = format!(
            "{}/v2/projects/{}/locations/-/Volumes",
            self.base_url, self.project_number
        );
        debug!("Getting all volumes from all regions");

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.token.secret())
            .send()
            .await
            .map_err(|e| SchedulerError::transport("GET", &url, e))?;

        if response.status() != StatusCode::OK {
            return Err(SchedulerError::transport(
                "GET",
                &url,
                format!("unexpected status {}", response.status()),
            ));
        }

        let volumes = response
            .json::<Vec<Volume>>()
            .await
            .map_err(|e| SchedulerError::transport("GET", &url, e))?;
        debug!("Correct response to GET request: {}", url);

        Ok(volumes)
    }

    /// Backup client bound to `volume`
    pub fn volume(&self, volume: &Volume) -> VolumeBackupClient<'_> {
        VolumeBackupClient {
            api: self,
            region: volume.region.clone(),
            volume_id: volume.volume_id.clone(),
            volume_name: volume.name.clone(),
        }
    }
}

/// Backup operations for a single volume
#[derive(Debug)]
pub struct VolumeBackupClient<'a> {
    api: &'a CloudVolumesApi,
    region: String,
    volume_id: String,
    volume_name: String,
}

impl VolumeBackupClient<'_> {
    pub fn volume_id(&self) -> &str {
        &self.volume_id
    }

    pub fn volume_name(&self) -> &str {
        &self.volume_name
    }

    fn backups_url(&self) -> String {
        format!(
            "{}/v2/projects/{}/locations/{}/Volumes/{}/Backups",
            self.api.base_url, self.api.project_number, self.region, self.volume_id
        )
    }

    /// List every backup of the volume, scheduled or not
    pub async fn list_backups(&self) -> Result<Vec<Backup>> {
        let url = self.backups_url();

        let response = self
            .api
            .client
            .get(&url)
            .bearer_auth(self.api.token.secret())
            .header("cache-control", "no-cache")
            .send()
            .await
            .map_err(|e| SchedulerError::transport("GET", &url, e))?;

        if response.status() != StatusCode::OK {
            return Err(SchedulerError::transport(
                "GET",
                &url,
                format!("unexpected status {}", response.status()),
            ));
        }

        let backups = response
            .json::<Vec<Backup>>()
            .await
            .map_err(|e| SchedulerError::transport("GET", &url, e))?;
        debug!("Correct response to GET request: {}", url);

        Ok(backups)
    }

    /// Work out which backup would be evicted, without deleting anything
    pub async fn plan_rotation(&self, active: ActiveLabel) -> Result<RotationPlan> {
        let backups = self.list_backups().await?;
        Ok(plan_rotation(&backups, active.label, active.cap))
    }

    /// Delete the oldest backup carrying the active label when the cap is reached.
    ///
    /// Listing failures abort; a failed deletion is recorded in the outcome.
    pub async fn rotate(&self, active: ActiveLabel) -> Result<RotationOutcome> {
        let plan = self.plan_rotation(active).await?;

        let mut outcome = RotationOutcome {
            evicted: None,
            delete_error: None,
            plan,
        };

        if let Some(backup_id) = outcome.plan.evict_id().map(str::to_string) {
            match self.delete_backup(&backup_id).await {
                Ok(()) => outcome.evicted = Some(backup_id),
                Err(err) if !err.is_fatal() => outcome.delete_error = Some(err.to_string()),
                Err(err) => return Err(err),
            }
        }

        Ok(outcome)
    }

    /// Create a backup named after the volume, `label` and `at`.
    ///
    /// The service answers 202 and completes the backup asynchronously.
    pub async fn create_backup(&self, label: BackupLabel, at: NaiveDateTime) -> Result<String> {
        let url = self.backups_url();
        let name = BackupName::format(&self.volume_name, label, at);
        debug!("Creating the backup {}", name);

        let response = self
            .api
            .client
            .post(&url)
            .bearer_auth(self.api.token.secret())
            .json(&CreateBackupRequest { name: &name })
            .send()
            .await
            .map_err(|e| SchedulerError::transport("POST", &url, e))?;

        if response.status() != StatusCode::ACCEPTED {
            return Err(SchedulerError::transport(
                "POST",
                &url,
                format!("unexpected status {}", response.status()),
            ));
        }

        debug!("Correct response to POST request: {}", url);
        info!("Backup {} was successfully created", name);

        Ok(name)
    }

    /// Delete a backup by id.
    ///
    /// Errors are logged here and returned as [`SchedulerError::Delete`],
    /// which callers treat as recoverable.
    pub async fn delete_backup(&self, backup_id: &str) -> Result<()> {
        let url = format!("{}/{}", self.backups_url(), backup_id);
        info!("Deleting the backup {}", backup_id);

        let result = self
            .api
            .client
            .delete(&url)
            .bearer_auth(self.api.token.secret())
            .send()
            .await;

        let reason = match result {
            Ok(response) if response.status() == StatusCode::ACCEPTED => {
                debug!("Correct response to DELETE request: {}", url);
                return Ok(());
            }
            Ok(response) => format!("unexpected status {}", response.status()),
            Err(e) => e.to_string(),
        };

        error!("There was an error in the DELETE call {}: {}", url, reason);
        Err(SchedulerError::Delete { url, reason })
    }
}
