/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs Ltd <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! Backup scheduling: one invocation over every selected volume

use crate::{
    api::{CloudVolumesApi, Volume},
    config::SchedulerConfig,
    error::Result,
    identity::{resolve_project, ProjectResolver},
    label::ActiveLabel,
    report::{InvocationReport, VolumeReport, VolumeStatus},
    token::TokenProvider,
};
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Drives label selection, rotation and creation for one invocation
#[derive(Debug)]
pub struct BackupScheduler {
    config: SchedulerConfig,
    resolver: Arc<dyn ProjectResolver>,
    tokens: Arc<dyn TokenProvider>,
}

impl BackupScheduler {
    pub fn new(
        config: SchedulerConfig,
        resolver: Arc<dyn ProjectResolver>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            config,
            resolver,
            tokens,
        }
    }

    /// Run the invocation as of `now` (local time).
    ///
    /// The project is resolved before the label is selected, so a broken
    /// project identifier fails every invocation. Errors returned here
    /// happened before any volume was processed. A fatal error while
    /// processing a volume stops the remaining volumes and is recorded in
    /// [`InvocationReport::aborted`].
    pub async fn run(&self, now: NaiveDateTime) -> Result<InvocationReport> {
        let project_number = resolve_project(&self.config.project, self.resolver.as_ref()).await?;

        let active = self.config.caps.select(now.date());
        let mut report = InvocationReport::new(now, active, self.config.dry_run);

        let Some(active) = active else {
            warn!("A backup is not going to be invoked");
            return Ok(report);
        };
        info!("Today's backup label is {} (keeping {})", active.label, active.cap);

        let token = self.tokens.get_token().await?;
        let api = CloudVolumesApi::new(&self.config.api_url, project_number, token)?;

        for volume in api.list_volumes().await? {
            if !self.config.volumes.matches(&volume.volume_id) {
                debug!("Volume {} is not selected for backup", volume.volume_id);
                continue;
            }

            if !volume.is_supported() {
                error!(
                    "Backing up the volume {} is not supported because it's not a CVS Software service type",
                    volume.name
                );
                report.record(VolumeReport {
                    volume_id: volume.volume_id.clone(),
                    volume_name: volume.name.clone(),
                    matching_backups: 0,
                    status: VolumeStatus::Unsupported {
                        storage_class: volume.storage_class.clone(),
                    },
                });
                continue;
            }

            info!("Backing up the volume {} is in progress", volume.name);
            match self.backup_volume(&api, &volume, active, now).await {
                Ok(volume_report) => report.record(volume_report),
                Err(err) => {
                    error!("Backup of volume {} failed, stopping: {}", volume.name, err);
                    report.record(VolumeReport {
                        volume_id: volume.volume_id.clone(),
                        volume_name: volume.name.clone(),
                        matching_backups: 0,
                        status: VolumeStatus::Failed {
                            error: err.to_string(),
                        },
                    });
                    report.aborted = Some(err.to_string());
                    break;
                }
            }
            info!("---");
        }

        info!(
            "Created {} backups, evicted {}, {} failed deletions",
            report.backups_created(),
            report.backups_evicted(),
            report.delete_failures()
        );
        Ok(report)
    }

    /// Evict if the cap is reached, then create the new backup
    async fn backup_volume(
        &self,
        api: &CloudVolumesApi,
        volume: &Volume,
        active: ActiveLabel,
        now: NaiveDateTime,
    ) -> Result<VolumeReport> {
        let client = api.volume(volume);

        if self.config.dry_run {
            let plan = client.plan_rotation(active).await?;
            let would_evict = plan.eviction().map(|candidate| candidate.name.clone());
            match &would_evict {
                Some(name) => info!("Dry run: would delete the backup {}", name),
                None => info!("Dry run: no backup needs to be deleted"),
            }
            info!("Dry run: would create a {} backup of {}", active.label, volume.name);

            return Ok(VolumeReport {
                volume_id: volume.volume_id.clone(),
                volume_name: volume.name.clone(),
                matching_backups: plan.matching,
                status: VolumeStatus::Planned { would_evict },
            });
        }

        let rotation = client.rotate(active).await?;
        let created = client.create_backup(active.label, now).await?;

        Ok(VolumeReport {
            volume_id: volume.volume_id.clone(),
            volume_name: volume.name.clone(),
            matching_backups: rotation.plan.matching,
            status: VolumeStatus::BackedUp {
                created,
                evicted: rotation.evicted,
                delete_error: rotation.delete_error,
            },
        })
    }
}
