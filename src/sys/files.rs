// src/sys/files.rs

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{PanelError, Result};

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

async fn write_durable(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(contents.as_bytes()).await?;
    // Flushed to disk before the rename publishes it.
    file.sync_all().await
}

/// Replaces `path` with `contents` via a sibling temp file and a rename, so
/// readers see either the old file or the new one, never a partial write.
pub async fn write_atomic(path: &Path, contents: &str, mode: u32) -> Result<()> {
    let tmp_path = temp_sibling(path);

    if let Err(e) = write_durable(&tmp_path, contents).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(PanelError::io(
            format!("failed to write temp file {}", tmp_path.display()),
            e,
        ));
    }

    if let Err(e) = fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(mode)).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(PanelError::io(
            format!("failed to set permissions on {}", tmp_path.display()),
            e,
        ));
    }

    if let Err(e) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(PanelError::io(
            format!("failed to replace {}", path.display()),
            e,
        ));
    }

    Ok(())
}

/// `create_dir_all` with the failing path in the error.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| PanelError::io(format!("failed to create directory {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn write_atomic_replaces_content_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("example.com.conf");
        std::fs::write(&target, "old").unwrap();

        write_atomic(&target, "new", 0o644).await.unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
        assert!(!dir.path().join("example.com.conf.tmp").exists());
        let mode = std::fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[tokio::test]
    async fn write_atomic_keeps_previous_content_on_failure() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("site.conf");
        std::fs::write(&target, "intact").unwrap();
        // A directory squatting on the temp name makes the first write fail.
        std::fs::create_dir(dir.path().join("site.conf.tmp")).unwrap();

        let err = write_atomic(&target, "clobbered", 0o644).await.unwrap_err();

        assert!(matches!(err, PanelError::Io { .. }));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "intact");
    }

    #[tokio::test]
    async fn write_atomic_creates_missing_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("fresh.conf");

        write_atomic(&target, "example.com {\n}\n", 0o600).await.unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "example.com {\n}\n");
        let mode = std::fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
