/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs Ltd <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use anyhow::{anyhow, Context};
use clap::Parser;
use cvs_backup_scheduler::{config::SchedulerConfig, entry, logging};
use serde_json::Value;
use std::process::ExitCode;
use tracing::debug;

/// Create and rotate scheduled backups of Cloud Volumes Service volumes
#[derive(Parser, Debug)]
#[command(name = "cvs-backup-scheduler", version, about)]
struct Cli {
    /// Event payload delivered by the scheduler, as JSON
    #[arg(long, default_value = "null")]
    event: String,

    /// Only log which backups would be deleted and created
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    logging::init().map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    let event: Value = serde_json::from_str(&cli.event).context("--event is not valid JSON")?;
    debug!(event = %event, "Invocation received");

    let config = SchedulerConfig::from_env().map(|mut config| {
        config.dry_run |= cli.dry_run;
        config
    });

    match entry::handle(config).await {
        entry::SUCCESS => Ok(ExitCode::SUCCESS),
        _ => Ok(ExitCode::FAILURE),
    }
}
