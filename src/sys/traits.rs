use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDate};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;

// ==============================================================================
// 1. Backup Vocabulary
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Daily,
    Weekly,
}

impl Cadence {
    pub fn as_str(self) -> &'static str {
        match self {
            Cadence::Daily => "daily",
            Cadence::Weekly => "weekly",
        }
    }

    /// Artifacts strictly older than this are evicted.
    pub fn retention(self) -> Duration {
        match self {
            Cadence::Daily => Duration::days(7),
            Cadence::Weekly => Duration::days(30),
        }
    }

    /// Cron recurrence: 01:00 every day, or 02:00 every Sunday.
    pub fn cron_expression(self) -> &'static str {
        match self {
            Cadence::Daily => "0 1 * * *",
            Cadence::Weekly => "0 2 * * 0",
        }
    }

    /// One artifact per calendar day; weekly runs are tagged as full archives.
    pub fn artifact_name(self, date: NaiveDate, extension: &str) -> String {
        let day = date.format("%Y-%m-%d");
        match self {
            Cadence::Daily => format!("{}.{}", day, extension),
            Cadence::Weekly => format!("{}-full.{}", day, extension),
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of subject a backup job protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupTarget {
    Site,
    Database,
}

impl BackupTarget {
    /// Short tag used in schedule file names.
    pub fn tag(self) -> &'static str {
        match self {
            BackupTarget::Site => "site",
            BackupTarget::Database => "db",
        }
    }

    /// CLI subcommand that re-runs a backup of this kind.
    pub fn command(self) -> &'static str {
        match self {
            BackupTarget::Site => "backup",
            BackupTarget::Database => "dbbackup",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupArtifact {
    pub subject: String,
    pub cadence: Cadence,
    pub created_at: DateTime<Local>,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleEntry {
    pub subject: String,
    pub cadence: Cadence,
    pub command: String,
}

// ==============================================================================
// 2. Host Collaborators
// ==============================================================================

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[async_trait]
pub trait FileRemover: Send + Sync {
    async fn remove(&self, path: &Path) -> std::io::Result<()>;
}

/// Produces one compressed archive of `source` at `dest`.
#[async_trait]
pub trait ArchiveTool: Send + Sync {
    /// File suffix of the produced archive, without the leading dot.
    fn extension(&self) -> &'static str;

    async fn create_archive(&self, source: &Path, dest: &Path) -> Result<()>;
}

// ==============================================================================
// 3. Module Composition
// ==============================================================================

#[async_trait]
pub trait ModuleManager: Send + Sync {
    async fn enable(&self, domain: &str, module: &str, params: &[String]) -> Result<()>;

    async fn disable(&self, domain: &str, module: &str) -> Result<()>;

    /// Enabled module names in file order.
    async fn list_enabled(&self, domain: &str) -> Result<Vec<String>>;
}

// ==============================================================================
// 4. Site Lifecycle
// ==============================================================================

#[async_trait]
pub trait SiteManager: Send + Sync {
    /// Provisions directories and the initial proxy configuration, returning its path.
    async fn add(&self, domain: &str) -> Result<PathBuf>;

    async fn remove(&self, domain: &str) -> Result<()>;

    async fn list(&self) -> Result<Vec<String>>;
}

// ==============================================================================
// 5. Backups & Retention
// ==============================================================================

#[async_trait]
pub trait BackupManager: Send + Sync {
    async fn run(&self, subject: &str, cadence: Cadence, source: &Path) -> Result<BackupArtifact>;

    async fn list_artifacts(&self, subject: &str, cadence: Cadence) -> Result<Vec<String>>;
}

#[async_trait]
pub trait ArtifactPruner: Send + Sync {
    /// Removes stale artifacts from `dir`, returning how many were deleted.
    async fn prune(&self, dir: &Path, cadence: Cadence) -> Result<usize>;
}

// ==============================================================================
// 6. Recurring Jobs
// ==============================================================================

#[async_trait]
pub trait ScheduleRegistrar: Send + Sync {
    async fn enable(&self, subject: &str, cadence: Cadence) -> Result<ScheduleEntry>;

    /// Idempotent: a missing entry is not an error.
    async fn disable(&self, subject: &str, cadence: Cadence) -> Result<()>;

    async fn is_scheduled(&self, subject: &str, cadence: Cadence) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_names_encode_day_and_cadence() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert_eq!(Cadence::Daily.artifact_name(day, "tar.gz"), "2024-03-10.tar.gz");
        assert_eq!(Cadence::Weekly.artifact_name(day, "tar.gz"), "2024-03-10-full.tar.gz");
        assert_eq!(Cadence::Weekly.artifact_name(day, "sql.gz"), "2024-03-10-full.sql.gz");
    }

    #[test]
    fn retention_thresholds_per_cadence() {
        assert_eq!(Cadence::Daily.retention(), Duration::days(7));
        assert_eq!(Cadence::Weekly.retention(), Duration::days(30));
    }

    #[test]
    fn cron_expressions_run_at_night() {
        assert_eq!(Cadence::Daily.cron_expression(), "0 1 * * *");
        assert_eq!(Cadence::Weekly.cron_expression(), "0 2 * * 0");
    }
}
