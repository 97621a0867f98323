use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::config::PanelConfig;
use crate::error::{PanelError, Result};
use crate::sys::files::{ensure_dir, write_atomic};
use crate::sys::site::SiteDocument;
use crate::sys::traits::SiteManager;

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// A domain ends up as a directory name, a site address, an `import`
/// argument and part of a cron command, so it is held to plain DNS labels.
pub fn validate_domain_format(domain: &str) -> Result<()> {
    let invalid = |reason: String| PanelError::InvalidName {
        what: "domain",
        name: domain.to_string(),
        reason,
    };

    if domain.is_empty() {
        return Err(invalid("must not be empty".to_string()));
    }
    if domain.len() > MAX_DOMAIN_LEN {
        return Err(invalid(format!("longer than {} characters", MAX_DOMAIN_LEN)));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(invalid("empty label (leading, trailing or doubled '.')".to_string()));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(invalid(format!("label '{}' is longer than {} characters", label, MAX_LABEL_LEN)));
        }
        if let Some(bad) = label.chars().find(|c| !is_label_char(*c)) {
            return Err(invalid(format!("character {:?} is not allowed", bad)));
        }
        if label.starts_with('-') {
            return Err(invalid(format!("label '{}' starts with '-'", label)));
        }
    }
    Ok(())
}

/// Modules every new site starts with, in file order.
fn default_directives(domain: &str, public_dir: &Path) -> Vec<String> {
    vec![
        format!("root * {}", public_dir.display()),
        format!("import access_log {}", domain),
        format!("import error_log {}", domain),
        "import header".to_string(),
        "import security".to_string(),
        "import php".to_string(),
    ]
}

fn placeholder_index(domain: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Welcome to {domain}</title>
</head>
<body>
    <h1>Welcome to {domain}</h1>
    <p>Your website is now set up and running!</p>
</body>
</html>
"#,
        domain = domain
    )
}

async fn remove_tree(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(PanelError::io(
            format!("failed to remove {}", path.display()),
            e,
        )),
        _ => Ok(()),
    }
}

// ==============================================================================
// Caddy Implementation
// ==============================================================================

pub struct CaddySiteManager {
    config: PanelConfig,
}

impl CaddySiteManager {
    pub fn new(config: PanelConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SiteManager for CaddySiteManager {
    async fn add(&self, domain: &str) -> Result<PathBuf> {
        validate_domain_format(domain)?;

        let config_path = self.config.site_config_path(domain);
        if fs::try_exists(&config_path).await.unwrap_or(false) {
            return Err(PanelError::AlreadyExists {
                what: "site",
                name: domain.to_string(),
            });
        }

        let public_dir = self.config.site_dir(domain).join("public");
        ensure_dir(&public_dir).await?;
        ensure_dir(&self.config.site_log_dir(domain)).await?;
        ensure_dir(&self.config.sites_config_dir()).await?;

        let index = public_dir.join("index.html");
        if !fs::try_exists(&index).await.unwrap_or(false) {
            write_atomic(&index, &placeholder_index(domain), 0o644).await?;
        }

        let site = SiteDocument::scaffold(
            domain,
            config_path.clone(),
            &default_directives(domain, &public_dir),
        );
        site.save().await?;

        info!("🌐 Provisioned site {} ({})", domain, config_path.display());
        Ok(config_path)
    }

    async fn remove(&self, domain: &str) -> Result<()> {
        validate_domain_format(domain)?;

        let site_dir = self.config.site_dir(domain);
        let config_path = self.config.site_config_path(domain);
        let has_dir = fs::try_exists(&site_dir).await.unwrap_or(false);
        let has_config = fs::try_exists(&config_path).await.unwrap_or(false);
        if !has_dir && !has_config {
            return Err(PanelError::SiteNotFound {
                domain: domain.to_string(),
            });
        }

        remove_tree(&site_dir).await?;
        match fs::remove_file(&config_path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                return Err(PanelError::io(
                    format!("failed to remove {}", config_path.display()),
                    e,
                ));
            }
            _ => {}
        }
        remove_tree(&self.config.site_log_dir(domain)).await?;

        info!("🌐 Removed site {}", domain);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let dir = self.config.sites_config_dir();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PanelError::io(format!("failed to read {}", dir.display()), e)),
        };

        let mut domains = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PanelError::io(format!("failed to read {}", dir.display()), e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(domain) = name.strip_suffix(".conf") {
                domains.push(domain.to_string());
            }
        }
        domains.sort();
        Ok(domains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn plain_hostnames_are_accepted() {
        for domain in ["example.com", "blog.example.co.uk", "staging-2.shop.io", "wp_local.test", "localhost"] {
            assert!(validate_domain_format(domain).is_ok(), "{}", domain);
        }
        let longest_label = format!("{}.com", "a".repeat(63));
        assert!(validate_domain_format(&longest_label).is_ok());
    }

    #[test]
    fn names_that_would_split_an_import_line_are_rejected() {
        // Extra tokens, block delimiters and comments inside `import access_log <domain>`.
        for domain in ["example.com extra", "example.com\timport", "example.com}", "{example.com", "example.com#x"] {
            assert!(validate_domain_format(domain).is_err(), "{:?}", domain);
        }
        // A second line smuggled into the site file.
        assert!(validate_domain_format("example.com\nimport restrict").is_err());
    }

    #[test]
    fn names_that_escape_the_site_directories_are_rejected() {
        for domain in ["..", "../etc", "example.com/..", "sites\\example.com", ".hidden", "example.com."] {
            assert!(validate_domain_format(domain).is_err(), "{:?}", domain);
        }
    }

    #[test]
    fn names_that_look_like_flags_or_overflow_are_rejected() {
        assert!(validate_domain_format("-rf.com").is_err());
        assert!(validate_domain_format(&format!("{}.com", "a".repeat(64))).is_err());
        assert!(validate_domain_format(&"a.".repeat(127)).is_err());

        let err = validate_domain_format("").unwrap_err();
        assert!(matches!(err, PanelError::InvalidName { what: "domain", .. }));
        assert!(err.to_string().starts_with("invalid domain ''"));
    }

    #[tokio::test]
    async fn add_scaffolds_site_with_default_modules() {
        let dir = TempDir::new().unwrap();
        let config = PanelConfig::rooted_at(dir.path());
        let manager = CaddySiteManager::new(config.clone());

        let path = manager.add("example.com").await.unwrap();

        let public = config.site_dir("example.com").join("public");
        let expected = format!(
            "example.com {{\n    root * {}\n    import access_log example.com\n    import error_log example.com\n    import header\n    import security\n    import php\n}}\n",
            public.display()
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), expected);
        assert!(public.join("index.html").is_file());
        assert!(config.site_log_dir("example.com").is_dir());
    }

    #[tokio::test]
    async fn add_twice_is_rejected() {
        let dir = TempDir::new().unwrap();
        let manager = CaddySiteManager::new(PanelConfig::rooted_at(dir.path()));

        manager.add("example.com").await.unwrap();
        let err = manager.add("example.com").await.unwrap_err();
        assert!(matches!(err, PanelError::AlreadyExists { what: "site", .. }));
    }

    #[tokio::test]
    async fn list_and_remove_sites() {
        let dir = TempDir::new().unwrap();
        let config = PanelConfig::rooted_at(dir.path());
        let manager = CaddySiteManager::new(config.clone());
        assert!(manager.list().await.unwrap().is_empty());

        manager.add("b.example.com").await.unwrap();
        manager.add("a.example.com").await.unwrap();
        assert_eq!(manager.list().await.unwrap(), vec!["a.example.com", "b.example.com"]);

        manager.remove("a.example.com").await.unwrap();
        assert_eq!(manager.list().await.unwrap(), vec!["b.example.com"]);
        assert!(!config.site_dir("a.example.com").exists());
        assert!(!config.site_log_dir("a.example.com").exists());

        let err = manager.remove("a.example.com").await.unwrap_err();
        assert!(matches!(err, PanelError::SiteNotFound { .. }));
    }
}
