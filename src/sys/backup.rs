// src/sys/backup.rs

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

use crate::error::{PanelError, Result};
use crate::sys::files::ensure_dir;
use crate::sys::traits::{ArchiveTool, ArtifactPruner, BackupArtifact, BackupManager, Cadence, Clock};

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Writes `<backup_root>/<cadence>/<subject>/<YYYY-MM-DD>[-full].<ext>` and then
/// sweeps that directory for stale artifacts.
pub struct BackupArchiver {
    backup_root: PathBuf,
    tool: Box<dyn ArchiveTool>,
    pruner: Box<dyn ArtifactPruner>,
    clock: Arc<dyn Clock>,
}

impl BackupArchiver {
    pub fn new(
        backup_root: PathBuf,
        tool: Box<dyn ArchiveTool>,
        pruner: Box<dyn ArtifactPruner>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backup_root,
            tool,
            pruner,
            clock,
        }
    }

    pub fn destination_dir(&self, subject: &str, cadence: Cadence) -> PathBuf {
        self.backup_root.join(cadence.as_str()).join(subject)
    }
}

#[async_trait]
impl BackupManager for BackupArchiver {
    async fn run(&self, subject: &str, cadence: Cadence, source: &Path) -> Result<BackupArtifact> {
        match fs::try_exists(source).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(PanelError::SourceMissing {
                    path: source.to_path_buf(),
                });
            }
            Err(e) => {
                return Err(PanelError::io(
                    format!("failed to inspect {}", source.display()),
                    e,
                ));
            }
        }

        let dest_dir = self.destination_dir(subject, cadence);
        ensure_dir(&dest_dir).await?;

        let created_at = self.clock.now();
        let filename = cadence.artifact_name(created_at.date_naive(), self.tool.extension());
        let dest = dest_dir.join(&filename);

        // Hidden staging file in the same directory; dropped (and deleted) on failure.
        let staging = tempfile::Builder::new()
            .prefix(".")
            .suffix(".partial")
            .tempfile_in(&dest_dir)
            .map_err(|e| PanelError::io(format!("failed to stage archive in {}", dest_dir.display()), e))?
            .into_temp_path();

        self.tool.create_archive(source, &staging).await?;

        staging
            .persist(&dest)
            .map_err(|e| PanelError::io(format!("failed to publish {}", dest.display()), e.error))?;

        info!("💾 {} backup of {} written to {}", cadence, subject, dest.display());

        // A stale artifact that refuses to go must not cost us the fresh one.
        match self.pruner.prune(&dest_dir, cadence).await {
            Ok(deleted) if deleted > 0 => info!("🧹 Pruned {} expired {} backup(s) of {}", deleted, cadence, subject),
            Err(e) => warn!("⚠️ Retention sweep failed for {}: {}", dest_dir.display(), e),
            _ => {}
        }

        Ok(BackupArtifact {
            subject: subject.to_string(),
            cadence,
            created_at,
            path: dest,
        })
    }

    async fn list_artifacts(&self, subject: &str, cadence: Cadence) -> Result<Vec<String>> {
        let dir = self.destination_dir(subject, cadence);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PanelError::io(format!("failed to read {}", dir.display()), e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PanelError::io(format!("failed to read {}", dir.display()), e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if is_file && !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}
