/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs Ltd <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

//! # CVS Backup Scheduler
//!
//! Scheduled backup rotation for Cloud Volumes Service volumes:
//!
//! - Date-based selection of a daily, weekly, monthly or yearly label
//! - Oldest-first eviction once a label's retention cap is reached
//! - Backup creation through the volume-management REST API
//! - Service-account tokens signed from a key held in Secret Manager
//! - Structured JSON logging for the platform's log collector

pub mod api;
pub mod config;
pub mod credentials;
pub mod entry;
pub mod error;
pub mod identity;
pub mod label;
pub mod logging;
pub mod naming;
pub mod report;
pub mod retention;
pub mod scheduler;
pub mod token;

pub use api::{Backup, CloudVolumesApi, Volume, VolumeBackupClient};
pub use config::{SchedulerConfig, VolumeSelector};
pub use entry::{cvs_backup_scheduler, FAILURE, SUCCESS};
pub use error::{Result, SchedulerError};
pub use identity::{resolve_project, ProjectNumber, ProjectResolver};
pub use label::{ActiveLabel, BackupLabel, RetentionCaps, MAX_RETAINED_BACKUPS};
pub use naming::BackupName;
pub use report::{InvocationReport, VolumeReport, VolumeStatus};
pub use retention::{plan_rotation, RotationPlan};
pub use scheduler::BackupScheduler;
pub use token::{BearerToken, TokenProvider};
