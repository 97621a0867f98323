// src/sys/modules.rs
//
// Catalog of reverse-proxy snippets a site may import. Each definition renders
// its own `(<name>) { ... }` block so an `import <name>` line in a site file
// resolves to it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{PanelError, Result};
use crate::sys::files::{ensure_dir, write_atomic};

/// Host facts a snippet may embed.
#[derive(Debug, Clone)]
pub struct SnippetContext {
    pub log_root: PathBuf,
    pub php_fpm_socket: String,
}

#[derive(Clone, Copy)]
pub struct ModuleDefinition {
    pub name: &'static str,
    /// Positional arguments the snippet reads as `{args.N}`. Advisory only;
    /// imports pass whatever they are given through verbatim.
    pub required_params: &'static [&'static str],
    /// The snippet writes under `<log_root>/<domain>`, which must exist first.
    pub needs_log_dir: bool,
    render: fn(&SnippetContext) -> String,
}

impl ModuleDefinition {
    pub const fn new(
        name: &'static str,
        required_params: &'static [&'static str],
        needs_log_dir: bool,
        render: fn(&SnippetContext) -> String,
    ) -> Self {
        Self {
            name,
            required_params,
            needs_log_dir,
            render,
        }
    }

    pub fn render(&self, ctx: &SnippetContext) -> String {
        (self.render)(ctx)
    }
}

impl fmt::Debug for ModuleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDefinition")
            .field("name", &self.name)
            .field("required_params", &self.required_params)
            .field("needs_log_dir", &self.needs_log_dir)
            .finish_non_exhaustive()
    }
}

fn render_php(ctx: &SnippetContext) -> String {
    format!(
        r#"(php) {{
    php_fastcgi unix/{socket}
    encode gzip
    file_server
}}
"#,
        socket = ctx.php_fpm_socket
    )
}

fn render_spa(_: &SnippetContext) -> String {
    r#"(spa) {
    try_files {path} /index.html
    encode gzip
    file_server
}
"#
    .to_string()
}

fn render_security(_: &SnippetContext) -> String {
    r#"(security) {
    header {
        Strict-Transport-Security "max-age=31536000"
        X-Content-Type-Options "nosniff"
        X-Frame-Options "DENY"
        X-XSS-Protection "1; mode=block"
        Content-Security-Policy "default-src 'self'"
        Referrer-Policy "no-referrer-when-downgrade"
    }
}
"#
    .to_string()
}

fn render_header(_: &SnippetContext) -> String {
    r#"(header) {
    header {
        -Server
        X-Powered-By "webpanel"
    }
}
"#
    .to_string()
}

fn render_restrict(_: &SnippetContext) -> String {
    r#"(restrict) {
    @blocked not remote_ip {args.0}
    respond @blocked 403
}
"#
    .to_string()
}

fn render_access_log(ctx: &SnippetContext) -> String {
    format!(
        r#"(access_log) {{
    log access {{
        output file {root}/{{args.0}}/access.log
        format json
    }}
}}
"#,
        root = ctx.log_root.display()
    )
}

fn render_error_log(ctx: &SnippetContext) -> String {
    format!(
        r#"(error_log) {{
    log error {{
        output file {root}/{{args.0}}/error.log
        format json
        level ERROR
    }}
}}
"#,
        root = ctx.log_root.display()
    )
}

pub const BUILTIN_MODULES: &[ModuleDefinition] = &[
    ModuleDefinition::new("php", &[], false, render_php),
    ModuleDefinition::new("spa", &[], false, render_spa),
    ModuleDefinition::new("security", &[], false, render_security),
    ModuleDefinition::new("header", &[], false, render_header),
    ModuleDefinition::new("restrict", &["allowed_range"], false, render_restrict),
    ModuleDefinition::new("access_log", &["domain"], true, render_access_log),
    ModuleDefinition::new("error_log", &["domain"], true, render_error_log),
];

/// Immutable name → definition map, built once at startup.
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    modules: BTreeMap<&'static str, ModuleDefinition>,
}

impl ModuleRegistry {
    pub fn builtin() -> Self {
        Self::from_definitions(BUILTIN_MODULES.iter().copied())
    }

    /// Later definitions with a repeated name replace earlier ones.
    pub fn from_definitions(definitions: impl IntoIterator<Item = ModuleDefinition>) -> Self {
        Self {
            modules: definitions.into_iter().map(|d| (d.name, d)).collect(),
        }
    }

    pub fn lookup(&self, name: &str) -> Result<&ModuleDefinition> {
        self.modules.get(name).ok_or_else(|| PanelError::ModuleNotFound {
            name: name.to_string(),
        })
    }

    /// Sorted.
    pub fn list_names(&self) -> Vec<&'static str> {
        self.modules.keys().copied().collect()
    }

    /// Writes one `<name>.conf` snippet per module into `modules_dir`.
    pub async fn install_snippets(
        &self,
        modules_dir: &Path,
        ctx: &SnippetContext,
    ) -> Result<Vec<PathBuf>> {
        ensure_dir(modules_dir).await?;

        let mut written = Vec::with_capacity(self.modules.len());
        for definition in self.modules.values() {
            let path = modules_dir.join(format!("{}.conf", definition.name));
            write_atomic(&path, &definition.render(ctx), 0o644).await?;
            written.push(path);
        }

        info!("📦 Installed {} module snippet(s) into {}", written.len(), modules_dir.display());
        Ok(written)
    }
}
