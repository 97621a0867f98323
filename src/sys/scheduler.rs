// src/sys/scheduler.rs

use crate::error::{PanelError, Result};
use crate::sys::files::{ensure_dir, write_atomic};
use crate::sys::traits::{BackupTarget, Cadence, ScheduleEntry, ScheduleRegistrar};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

// ==============================================================================
// 1. Concrete Implementation (cron.d)
// ==============================================================================

/// One cron.d file per (cadence, subject). The file existing is the schedule
/// being on; there is no other state.
pub struct CronScheduleRegistrar {
    cron_dir: PathBuf,  // Injected via PanelConfig, e.g. "/etc/cron.d"
    binary: String,     // Absolute path cron uses to re-invoke us
    target: BackupTarget,
}

impl CronScheduleRegistrar {
    pub fn new(cron_dir: PathBuf, binary: String, target: BackupTarget) -> Self {
        Self {
            cron_dir,
            binary,
            target,
        }
    }

    /// cron skips file names containing dots, so domains are flattened.
    pub fn entry_path(&self, subject: &str, cadence: Cadence) -> PathBuf {
        self.cron_dir.join(format!(
            "webpanel-{}-backup-{}-{}",
            self.target.tag(),
            cadence,
            subject.replace('.', "_")
        ))
    }

    fn command(&self, subject: &str, cadence: Cadence) -> String {
        format!("{} {} run {} {}", self.binary, self.target.command(), cadence, subject)
    }
}

#[async_trait]
impl ScheduleRegistrar for CronScheduleRegistrar {
    async fn enable(&self, subject: &str, cadence: Cadence) -> Result<ScheduleEntry> {
        if self.is_scheduled(subject, cadence).await? {
            return Err(PanelError::AlreadyScheduled {
                subject: subject.to_string(),
                cadence: cadence.to_string(),
            });
        }

        let command = self.command(subject, cadence);

        // cron.d lines carry a user field, unlike per-user crontabs.
        let content = format!(
            r#"# Managed by webpanel: {cadence} backup of {subject}
SHELL=/bin/sh
PATH=/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin
{schedule} root {command}
"#,
            cadence = cadence,
            subject = subject,
            schedule = cadence.cron_expression(),
            command = command
        );

        ensure_dir(&self.cron_dir).await?;
        let path = self.entry_path(subject, cadence);
        write_atomic(&path, &content, 0o644).await?;

        info!("⏰ Scheduled {} backup of {} ({})", cadence, subject, path.display());
        Ok(ScheduleEntry {
            subject: subject.to_string(),
            cadence,
            command,
        })
    }

    async fn disable(&self, subject: &str, cadence: Cadence) -> Result<()> {
        let path = self.entry_path(subject, cadence);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("⏰ Unscheduled {} backup of {}", cadence, subject);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PanelError::io(
                format!("failed to remove schedule entry {}", path.display()),
                e,
            )),
        }
    }

    async fn is_scheduled(&self, subject: &str, cadence: Cadence) -> Result<bool> {
        let path = self.entry_path(subject, cadence);
        fs::try_exists(&path)
            .await
            .map_err(|e| PanelError::io(format!("failed to inspect {}", path.display()), e))
    }
}
