// src/sys/archive.rs

use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;
use tokio::process::Command;

use crate::error::{PanelError, Result};
use crate::sys::traits::ArchiveTool;

static DATABASE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{1,64}$").expect("static pattern"));

/// MySQL identifiers we are willing to hand to `mysqldump` and to join onto paths.
pub fn validate_database_name(name: &str) -> Result<()> {
    if DATABASE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(PanelError::InvalidName {
            what: "database name",
            name: name.to_string(),
            reason: "expected 1-64 ASCII letters, digits or underscores".to_string(),
        })
    }
}

fn archive_failed(dest: &Path, reason: String) -> PanelError {
    PanelError::ArchiveFailed {
        path: dest.to_path_buf(),
        reason,
    }
}

// ==============================================================================
// 1. Site Directories (tar + gzip)
// ==============================================================================

pub struct TarArchiver;

#[async_trait]
impl ArchiveTool for TarArchiver {
    fn extension(&self) -> &'static str {
        "tar.gz"
    }

    async fn create_archive(&self, source: &Path, dest: &Path) -> Result<()> {
        let (parent, base) = match (source.parent(), source.file_name()) {
            (Some(parent), Some(base)) => (parent, base),
            _ => return Err(archive_failed(dest, format!("cannot archive {}", source.display()))),
        };

        // Relative member names: the archive unpacks as `<domain>/...`.
        let output = Command::new("tar")
            .arg("-czf")
            .arg(dest)
            .arg("-C")
            .arg(parent)
            .arg(base)
            .output()
            .await
            .map_err(|e| archive_failed(dest, format!("failed to spawn tar: {}", e)))?;

        if !output.status.success() {
            return Err(archive_failed(
                dest,
                format!(
                    "tar exited with {}: {}",
                    output.status.code().unwrap_or(-1),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        Ok(())
    }
}

// ==============================================================================
// 2. Databases (mysqldump | gzip, no shell)
// ==============================================================================

/// Dumps the database whose data directory is `source`; the directory name is
/// the database name.
pub struct MysqlDumpArchiver {
    user: String,
}

impl MysqlDumpArchiver {
    pub fn new(user: impl Into<String>) -> Self {
        Self { user: user.into() }
    }
}

#[async_trait]
impl ArchiveTool for MysqlDumpArchiver {
    fn extension(&self) -> &'static str {
        "sql.gz"
    }

    async fn create_archive(&self, source: &Path, dest: &Path) -> Result<()> {
        let dbname = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| archive_failed(dest, format!("cannot derive database from {}", source.display())))?;
        validate_database_name(dbname)?;

        let out_file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| PanelError::io(format!("failed to create {}", dest.display()), e))?
            .into_std()
            .await;

        let mut dump = Command::new("mysqldump")
            .args(["-u", &self.user, "--single-transaction", dbname])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| archive_failed(dest, format!("failed to spawn mysqldump: {}", e)))?;

        let dump_pipe = dump
            .stdout
            .take()
            .ok_or_else(|| archive_failed(dest, "mysqldump stdout unavailable".to_string()))?;
        let dump_stdout = TryInto::<Stdio>::try_into(dump_pipe)
            .map_err(|e: std::io::Error| archive_failed(dest, format!("failed to pipe mysqldump: {}", e)))?;

        let gzip = Command::new("gzip")
            .arg("-c")
            .stdin(dump_stdout)
            .stdout(Stdio::from(out_file))
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| archive_failed(dest, format!("failed to spawn gzip: {}", e)))?;

        let dump_out = dump
            .wait_with_output()
            .await
            .map_err(|e| archive_failed(dest, format!("mysqldump did not finish: {}", e)))?;
        let gzip_out = gzip
            .wait_with_output()
            .await
            .map_err(|e| archive_failed(dest, format!("gzip did not finish: {}", e)))?;

        if !dump_out.status.success() {
            return Err(archive_failed(
                dest,
                format!("mysqldump failed: {}", String::from_utf8_lossy(&dump_out.stderr).trim()),
            ));
        }
        if !gzip_out.status.success() {
            return Err(archive_failed(
                dest,
                format!("gzip failed: {}", String::from_utf8_lossy(&gzip_out.stderr).trim()),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn database_names_are_plain_identifiers() {
        assert!(validate_database_name("shop").is_ok());
        assert!(validate_database_name("wp_site_01").is_ok());

        assert!(validate_database_name("").is_err());
        assert!(validate_database_name("../mysql").is_err());
        assert!(validate_database_name("shop; DROP").is_err());
        assert!(validate_database_name(&"a".repeat(65)).is_err());
    }

    #[tokio::test]
    async fn tar_archives_directory_with_relative_members() {
        let dir = TempDir::new().unwrap();
        let site = dir.path().join("example.com");
        std::fs::create_dir_all(site.join("public")).unwrap();
        std::fs::write(site.join("public").join("index.html"), "hello").unwrap();
        let dest = dir.path().join("out.tar.gz");

        TarArchiver.create_archive(&site, &dest).await.unwrap();

        let listing = std::process::Command::new("tar").arg("-tzf").arg(&dest).output().unwrap();
        let listing = String::from_utf8_lossy(&listing.stdout);
        assert!(listing.contains("example.com/public/index.html"));
    }

    #[tokio::test]
    async fn tar_failure_is_archive_failed() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.tar.gz");

        let err = TarArchiver
            .create_archive(&dir.path().join("missing"), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, PanelError::ArchiveFailed { .. }));
    }
}
