// src/service.rs

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::PanelConfig;
use crate::error::{PanelError, Result};
use crate::sys::archive::{validate_database_name, MysqlDumpArchiver, TarArchiver};
use crate::sys::backup::{BackupArchiver, SystemClock};
use crate::sys::cleanup::RetentionPolicy;
use crate::sys::composer::SiteModuleComposer;
use crate::sys::modules::{ModuleRegistry, SnippetContext};
use crate::sys::proxy::{validate_domain_format, CaddySiteManager};
use crate::sys::scheduler::CronScheduleRegistrar;
use crate::sys::traits::{
    BackupArtifact, BackupManager, BackupTarget, Cadence, Clock, ModuleManager, ScheduleEntry,
    ScheduleRegistrar, SiteManager,
};

/// Every operation the CLI can reach, wired to its host implementation.
pub struct PanelService {
    config: PanelConfig,
    registry: ModuleRegistry,
    module_mgr: Box<dyn ModuleManager>,
    site_mgr: Box<dyn SiteManager>,
    site_backups: Box<dyn BackupManager>,
    db_backups: Box<dyn BackupManager>,
    site_schedule: Box<dyn ScheduleRegistrar>,
    db_schedule: Box<dyn ScheduleRegistrar>,
}

impl PanelService {
    pub fn new(config: PanelConfig) -> Self {
        let registry = ModuleRegistry::builtin();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        Self {
            module_mgr: Box::new(SiteModuleComposer::new(config.clone(), registry.clone())),
            site_mgr: Box::new(CaddySiteManager::new(config.clone())),
            site_backups: Box::new(BackupArchiver::new(
                config.backup_dir.clone(),
                Box::new(TarArchiver),
                Box::new(RetentionPolicy::new(clock.clone())),
                clock.clone(),
            )),
            db_backups: Box::new(BackupArchiver::new(
                config.backup_dir.clone(),
                Box::new(MysqlDumpArchiver::new("root")),
                Box::new(RetentionPolicy::new(clock.clone())),
                clock,
            )),
            site_schedule: Box::new(CronScheduleRegistrar::new(
                config.cron_dir.clone(),
                config.binary_path.clone(),
                BackupTarget::Site,
            )),
            db_schedule: Box::new(CronScheduleRegistrar::new(
                config.cron_dir.clone(),
                config.binary_path.clone(),
                BackupTarget::Database,
            )),
            registry,
            config,
        }
    }

    // ==========================================================================
    // Sites
    // ==========================================================================

    pub async fn site_add(&self, domain: &str) -> Result<PathBuf> {
        self.site_mgr.add(domain).await
    }

    pub async fn site_remove(&self, domain: &str) -> Result<()> {
        self.site_mgr.remove(domain).await
    }

    /// Every site with its enabled modules; unreadable sites list none.
    pub async fn site_list(&self) -> Result<Vec<(String, Vec<String>)>> {
        let mut sites = Vec::new();
        for domain in self.site_mgr.list().await? {
            let modules = self.module_mgr.list_enabled(&domain).await.unwrap_or_default();
            sites.push((domain, modules));
        }
        Ok(sites)
    }

    // ==========================================================================
    // Modules
    // ==========================================================================

    pub fn module_list_available(&self) -> Vec<&'static str> {
        self.registry.list_names()
    }

    pub async fn module_install(&self) -> Result<Vec<PathBuf>> {
        let ctx = SnippetContext {
            log_root: self.config.log_root.clone(),
            php_fpm_socket: self.config.php_fpm_socket.clone(),
        };
        self.registry.install_snippets(&self.config.modules_dir(), &ctx).await
    }

    pub async fn module_list(&self, domain: &str) -> Result<Vec<String>> {
        validate_domain_format(domain)?;
        self.module_mgr.list_enabled(domain).await
    }

    pub async fn module_add(&self, module: &str, domain: &str, params: &[String]) -> Result<()> {
        validate_domain_format(domain)?;
        self.module_mgr.enable(domain, module, params).await
    }

    pub async fn module_remove(&self, module: &str, domain: &str) -> Result<()> {
        validate_domain_format(domain)?;
        self.module_mgr.disable(domain, module).await
    }

    // ==========================================================================
    // Backups
    // ==========================================================================

    fn validate_subject(target: BackupTarget, subject: &str) -> Result<()> {
        match target {
            BackupTarget::Site => validate_domain_format(subject),
            BackupTarget::Database => validate_database_name(subject),
        }
    }

    fn backups(&self, target: BackupTarget) -> &dyn BackupManager {
        match target {
            BackupTarget::Site => self.site_backups.as_ref(),
            BackupTarget::Database => self.db_backups.as_ref(),
        }
    }

    fn schedule(&self, target: BackupTarget) -> &dyn ScheduleRegistrar {
        match target {
            BackupTarget::Site => self.site_schedule.as_ref(),
            BackupTarget::Database => self.db_schedule.as_ref(),
        }
    }

    pub async fn backup_run(
        &self,
        target: BackupTarget,
        cadence: Cadence,
        subject: &str,
    ) -> Result<BackupArtifact> {
        Self::validate_subject(target, subject)?;
        let source = match target {
            BackupTarget::Site => self.config.site_dir(subject),
            BackupTarget::Database => self.config.database_dir(subject),
        };
        self.backups(target).run(subject, cadence, &source).await
    }

    pub async fn backup_enable(
        &self,
        target: BackupTarget,
        cadence: Cadence,
        subject: &str,
    ) -> Result<ScheduleEntry> {
        Self::validate_subject(target, subject)?;
        self.schedule(target).enable(subject, cadence).await
    }

    /// Unlike the registrar, reports a schedule that was never there.
    pub async fn backup_disable(
        &self,
        target: BackupTarget,
        cadence: Cadence,
        subject: &str,
    ) -> Result<()> {
        Self::validate_subject(target, subject)?;
        let schedule = self.schedule(target);
        if !schedule.is_scheduled(subject, cadence).await? {
            return Err(PanelError::NotScheduled {
                subject: subject.to_string(),
                cadence: cadence.to_string(),
            });
        }
        schedule.disable(subject, cadence).await
    }

    pub async fn backup_list(
        &self,
        target: BackupTarget,
        cadence: Cadence,
        subject: &str,
    ) -> Result<Vec<String>> {
        Self::validate_subject(target, subject)?;
        self.backups(target).list_artifacts(subject, cadence).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> PanelService {
        PanelService::new(PanelConfig::rooted_at(dir.path()))
    }

    #[tokio::test]
    async fn provisioned_site_lists_its_default_modules() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        service.site_add("example.com").await.unwrap();
        service.module_add("spa", "example.com", &[]).await.unwrap();

        let sites = service.site_list().await.unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].0, "example.com");
        assert_eq!(
            sites[0].1,
            vec!["access_log", "error_log", "header", "security", "php", "spa"]
        );
    }

    #[tokio::test]
    async fn invalid_subjects_are_rejected_up_front() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let err = service
            .module_add("php", "../etc", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, PanelError::InvalidName { .. }));

        let err = service
            .backup_run(BackupTarget::Database, Cadence::Daily, "shop;rm")
            .await
            .unwrap_err();
        assert!(matches!(err, PanelError::InvalidName { .. }));
    }

    #[tokio::test]
    async fn site_backup_of_missing_site_reports_source() {
        let dir = TempDir::new().unwrap();
        let err = service(&dir)
            .backup_run(BackupTarget::Site, Cadence::Daily, "ghost.com")
            .await
            .unwrap_err();
        assert!(matches!(err, PanelError::SourceMissing { .. }));
    }

    #[tokio::test]
    async fn disable_reports_missing_schedule() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let err = service
            .backup_disable(BackupTarget::Site, Cadence::Weekly, "example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, PanelError::NotScheduled { .. }));

        service
            .backup_enable(BackupTarget::Site, Cadence::Weekly, "example.com")
            .await
            .unwrap();
        service
            .backup_disable(BackupTarget::Site, Cadence::Weekly, "example.com")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn module_install_writes_into_config_dir() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let written = service.module_install().await.unwrap();
        assert_eq!(written.len(), service.module_list_available().len());
        assert!(dir.path().join("config/modules/php.conf").is_file());
    }
}
