// src/sys/cleanup.rs

use crate::error::{PanelError, Result};
use crate::sys::traits::{ArtifactPruner, Cadence, Clock, FileRemover};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

pub struct SystemRemover;

#[async_trait]
impl FileRemover for SystemRemover {
    async fn remove(&self, path: &Path) -> std::io::Result<()> {
        fs::remove_file(path).await
    }
}

/// Age-based eviction: anything strictly older than the cadence's retention goes.
pub struct RetentionPolicy {
    clock: Arc<dyn Clock>,
    remover: Box<dyn FileRemover>,
}

impl RetentionPolicy {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_remover(clock, Box::new(SystemRemover))
    }

    pub fn with_remover(clock: Arc<dyn Clock>, remover: Box<dyn FileRemover>) -> Self {
        Self { clock, remover }
    }
}

#[async_trait]
impl ArtifactPruner for RetentionPolicy {
    async fn prune(&self, dir: &Path, cadence: Cadence) -> Result<usize> {
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| PanelError::io(format!("failed to read backup directory {}", dir.display()), e))?;

        let now = self.clock.now();
        let max_age = cadence.retention();
        let mut deleted = 0;

        // 1. Walk plain files only; nested directories are not ours to judge.
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PanelError::io(format!("failed to read backup directory {}", dir.display()), e))?
        {
            let path = entry.path();
            let modified = match entry.metadata().await.and_then(|m| {
                if m.is_dir() { Ok(None) } else { m.modified().map(Some) }
            }) {
                Ok(Some(modified)) => modified,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Cannot stat backup {:?}: {}", path, e);
                    continue;
                }
            };

            // 2. Compare against the threshold; equal age is kept.
            let age = now.signed_duration_since(DateTime::<Local>::from(modified));
            if age <= max_age {
                continue;
            }

            // 3. Best effort: one stubborn file must not stop the sweep.
            if let Err(e) = self.remover.remove(&path).await {
                warn!("Failed to delete expired backup {:?}: {}", path, e);
            } else {
                debug!("Deleted expired backup {:?} (age {} days)", path, age.num_days());
                deleted += 1;
            }
        }

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::fs::File;
    use std::time::SystemTime;
    use tempfile::TempDir;

    struct FixedClock(DateTime<Local>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Local> {
            self.0
        }
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn policy() -> RetentionPolicy {
        RetentionPolicy::new(Arc::new(FixedClock(now())))
    }

    fn artifact(dir: &Path, name: &str, age: Duration) {
        let file = File::create(dir.join(name)).unwrap();
        file.set_modified(SystemTime::from(now() - age)).unwrap();
    }

    fn remaining(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn daily_sweep_removes_everything_past_a_week() {
        let dir = TempDir::new().unwrap();
        for days in [1, 6, 8, 29, 31] {
            artifact(dir.path(), &format!("{:02}d.tar.gz", days), Duration::days(days));
        }

        let deleted = policy().prune(dir.path(), Cadence::Daily).await.unwrap();

        assert_eq!(deleted, 3);
        assert_eq!(remaining(dir.path()), vec!["01d.tar.gz", "06d.tar.gz"]);
    }

    #[tokio::test]
    async fn weekly_sweep_uses_thirty_day_threshold() {
        let dir = TempDir::new().unwrap();
        for days in [1, 6, 8, 29, 31] {
            artifact(dir.path(), &format!("{:02}d-full.tar.gz", days), Duration::days(days));
        }

        let deleted = policy().prune(dir.path(), Cadence::Weekly).await.unwrap();

        assert_eq!(deleted, 1);
        assert!(!remaining(dir.path()).contains(&"31d-full.tar.gz".to_string()));
    }

    #[tokio::test]
    async fn age_exactly_at_threshold_is_kept() {
        let dir = TempDir::new().unwrap();
        artifact(dir.path(), "at.tar.gz", Duration::days(7));
        artifact(dir.path(), "past.tar.gz", Duration::days(7) + Duration::seconds(1));

        let deleted = policy().prune(dir.path(), Cadence::Daily).await.unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(remaining(dir.path()), vec!["at.tar.gz"]);
    }

    #[tokio::test]
    async fn directories_are_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        artifact(dir.path(), "old.tar.gz", Duration::days(40));

        let deleted = policy().prune(dir.path(), Cadence::Daily).await.unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(remaining(dir.path()), vec!["nested"]);
    }

    /// Refuses one file name and deletes everything else.
    struct StubbornRemover(&'static str);

    #[async_trait]
    impl FileRemover for StubbornRemover {
        async fn remove(&self, path: &Path) -> std::io::Result<()> {
            if path.file_name().is_some_and(|n| n == self.0) {
                return Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "immutable"));
            }
            fs::remove_file(path).await
        }
    }

    #[tokio::test]
    async fn failed_deletion_does_not_stop_the_sweep() {
        let dir = TempDir::new().unwrap();
        artifact(dir.path(), "08d.tar.gz", Duration::days(8));
        artifact(dir.path(), "31d.tar.gz", Duration::days(31));
        artifact(dir.path(), "01d.tar.gz", Duration::days(1));

        let policy = RetentionPolicy::with_remover(
            Arc::new(FixedClock(now())),
            Box::new(StubbornRemover("08d.tar.gz")),
        );
        let deleted = policy.prune(dir.path(), Cadence::Daily).await.unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(remaining(dir.path()), vec!["01d.tar.gz", "08d.tar.gz"]);
    }

    #[tokio::test]
    async fn unreadable_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = policy()
            .prune(&dir.path().join("missing"), Cadence::Daily)
            .await
            .unwrap_err();
        assert!(matches!(err, PanelError::Io { .. }));
    }
}
