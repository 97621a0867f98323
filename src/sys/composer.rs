// src/sys/composer.rs

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::PanelConfig;
use crate::error::{PanelError, Result};
use crate::sys::files::ensure_dir;
use crate::sys::modules::ModuleRegistry;
use crate::sys::site::SiteDocument;
use crate::sys::traits::ModuleManager;

/// Attaches catalog modules to site files, one import line per module.
pub struct SiteModuleComposer {
    config: PanelConfig,
    registry: ModuleRegistry,
}

impl SiteModuleComposer {
    pub fn new(config: PanelConfig, registry: ModuleRegistry) -> Self {
        Self { config, registry }
    }
}

#[async_trait]
impl ModuleManager for SiteModuleComposer {
    async fn enable(&self, domain: &str, module: &str, params: &[String]) -> Result<()> {
        let definition = self.registry.lookup(module)?;

        let mut site = SiteDocument::load(&self.config, domain).await?;
        if site.is_module_enabled(module) {
            return Err(PanelError::AlreadyEnabled {
                module: module.to_string(),
                domain: domain.to_string(),
            });
        }

        // Lenient: params pass through as positional snippet arguments.
        if params.len() < definition.required_params.len() {
            warn!(
                "Module {} expects [{}] but got {} argument(s)",
                module,
                definition.required_params.join(", "),
                params.len()
            );
        }

        site.insert_import(module, params)?;

        // The log directive points at this directory; it must exist before the import is saved.
        if definition.needs_log_dir {
            ensure_dir(&self.config.site_log_dir(domain)).await?;
        }

        site.save().await?;

        info!("🧩 Enabled module {} for {}", module, site.domain());
        Ok(())
    }

    async fn disable(&self, domain: &str, module: &str) -> Result<()> {
        // Checked even though removal would be a no-op, so typos are reported.
        self.registry.lookup(module)?;

        let mut site = SiteDocument::load(&self.config, domain).await?;
        if !site.is_module_enabled(module) {
            return Err(PanelError::NotEnabled {
                module: module.to_string(),
                domain: domain.to_string(),
            });
        }

        site.remove_import(module);
        site.save().await?;

        info!("🧩 Disabled module {} for {}", module, site.domain());
        Ok(())
    }

    async fn list_enabled(&self, domain: &str) -> Result<Vec<String>> {
        let site = SiteDocument::load(&self.config, domain).await?;
        Ok(site
            .list_enabled_modules()
            .into_iter()
            .map(|reference| reference.name)
            .collect())
    }
}
