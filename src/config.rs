// src/config.rs

use std::env;
use std::path::PathBuf;

/// Host paths the panel operates on. Built once in `main` and handed to every
/// component; nothing reads the environment after this point.
#[derive(Clone, Debug)]
pub struct PanelConfig {
    // 📂 Site content & proxy configuration
    pub web_root: PathBuf,
    pub config_dir: PathBuf,
    pub log_root: PathBuf,

    // 💾 Backups & scheduling
    pub backup_dir: PathBuf,
    pub cron_dir: PathBuf,
    pub mysql_data_dir: PathBuf,

    // ⚙️ Collaborators referenced from generated files
    pub php_fpm_socket: String,
    pub binary_path: String,
}

fn path_var(key: &str, default: &str) -> PathBuf {
    PathBuf::from(env::var(key).unwrap_or_else(|_| default.to_string()))
}

impl PanelConfig {
    pub fn load() -> Self {
        Self {
            web_root: path_var("WEBPANEL_WEB_ROOT", "/apps/sites"),
            config_dir: path_var("WEBPANEL_CONFIG_DIR", "/usr/local/webpanel/config"),
            log_root: path_var("WEBPANEL_LOG_ROOT", "/var/log/webpanel/caddy"),
            backup_dir: path_var("WEBPANEL_BACKUP_DIR", "/backup"),
            // cron.d entries carry their own schedule line, unlike cron.daily scripts.
            cron_dir: path_var("WEBPANEL_CRON_DIR", "/etc/cron.d"),
            mysql_data_dir: path_var("WEBPANEL_MYSQL_DATA_DIR", "/var/lib/mysql"),
            php_fpm_socket: env::var("WEBPANEL_PHP_FPM_SOCKET")
                .unwrap_or_else(|_| "/run/php/php8.1-fpm.sock".to_string()),
            binary_path: env::var("WEBPANEL_BIN")
                .unwrap_or_else(|_| "/usr/local/bin/webpanel".to_string()),
        }
    }

    /// Config rooted entirely under `root`; used by tests to sandbox a host.
    #[cfg(test)]
    pub fn rooted_at(root: &std::path::Path) -> Self {
        Self {
            web_root: root.join("sites"),
            config_dir: root.join("config"),
            log_root: root.join("log"),
            backup_dir: root.join("backup"),
            cron_dir: root.join("cron.d"),
            mysql_data_dir: root.join("mysql"),
            php_fpm_socket: "/run/php/php8.1-fpm.sock".to_string(),
            binary_path: "/usr/local/bin/webpanel".to_string(),
        }
    }

    pub fn site_dir(&self, domain: &str) -> PathBuf {
        self.web_root.join(domain)
    }

    pub fn sites_config_dir(&self) -> PathBuf {
        self.config_dir.join("sites")
    }

    pub fn site_config_path(&self, domain: &str) -> PathBuf {
        self.sites_config_dir().join(format!("{}.conf", domain))
    }

    pub fn modules_dir(&self) -> PathBuf {
        self.config_dir.join("modules")
    }

    pub fn site_log_dir(&self, domain: &str) -> PathBuf {
        self.log_root.join(domain)
    }

    pub fn database_dir(&self, dbname: &str) -> PathBuf {
        self.mysql_data_dir.join(dbname)
    }
}
