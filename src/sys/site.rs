// src/sys/site.rs
//
// One site's proxy configuration, held as lines. The file has a single
// top-level `<domain> {` block closed by a `}` at column zero; module
// references are `    import <name> [param ...]` lines inside that block.

use serde::Serialize;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

use crate::config::PanelConfig;
use crate::error::{PanelError, Result};
use crate::sys::files::write_atomic;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleReference {
    pub name: String,
    pub params: Vec<String>,
}

/// Splits `import <name> [params...]` into tokens. Anything else is `None`.
fn parse_import(line: &str) -> Option<ModuleReference> {
    let mut tokens = line.split_whitespace();
    if tokens.next()? != "import" {
        return None;
    }
    let name = tokens.next()?.to_string();
    Some(ModuleReference {
        name,
        params: tokens.map(str::to_string).collect(),
    })
}

fn is_block_end(line: &str) -> bool {
    line.trim_end() == "}"
}

#[derive(Debug, Clone)]
pub struct SiteDocument {
    domain: String,
    path: PathBuf,
    lines: Vec<String>,
    trailing_newline: bool,
    crlf: bool,
}

impl SiteDocument {
    pub async fn load(config: &PanelConfig, domain: &str) -> Result<Self> {
        Self::load_from(domain, config.site_config_path(domain)).await
    }

    pub async fn load_from(domain: &str, path: PathBuf) -> Result<Self> {
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PanelError::SiteNotFound {
                    domain: domain.to_string(),
                });
            }
            Err(e) => {
                return Err(PanelError::io(
                    format!("failed to read site configuration {}", path.display()),
                    e,
                ));
            }
        };
        Ok(Self::parse(domain, path, &content))
    }

    pub fn parse(domain: &str, path: PathBuf, content: &str) -> Self {
        let (body, trailing_newline) = match content.strip_suffix('\n') {
            Some(body) => (body, true),
            None => (content, false),
        };
        let lines = if body.is_empty() && !trailing_newline {
            Vec::new()
        } else {
            body.split('\n').map(str::to_string).collect()
        };
        Self {
            domain: domain.to_string(),
            path,
            lines,
            trailing_newline,
            crlf: content.contains("\r\n"),
        }
    }

    /// Fresh document with an empty site block.
    pub fn scaffold(domain: &str, path: PathBuf, directives: &[String]) -> Self {
        let mut lines = Vec::with_capacity(directives.len() + 2);
        lines.push(format!("{} {{", domain));
        lines.extend(directives.iter().map(|d| format!("    {}", d)));
        lines.push("}".to_string());
        Self {
            domain: domain.to_string(),
            path,
            lines,
            trailing_newline: true,
            crlf: false,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Lines are split on `\n` only, so a CRLF file keeps its `\r` on every line.
    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    /// Whole-token match: `restrict` is not enabled by an `import restrict-access` line.
    pub fn is_module_enabled(&self, module: &str) -> bool {
        self.lines
            .iter()
            .filter_map(|line| parse_import(line))
            .any(|reference| reference.name == module)
    }

    pub fn list_enabled_modules(&self) -> Vec<ModuleReference> {
        self.lines.iter().filter_map(|line| parse_import(line)).collect()
    }

    /// Inserts `    import <module> [params...]` right before the closing brace.
    /// Returns `false` without touching the document when an equivalent line
    /// is already present.
    pub fn insert_import(&mut self, module: &str, params: &[String]) -> Result<bool> {
        let wanted = ModuleReference {
            name: module.to_string(),
            params: params.to_vec(),
        };
        if self.list_enabled_modules().contains(&wanted) {
            debug!("import {} already present in {}", module, self.path.display());
            return Ok(false);
        }

        let close = self
            .lines
            .iter()
            .position(|line| is_block_end(line))
            .ok_or_else(|| PanelError::MalformedDocument {
                path: self.path.clone(),
                reason: "no closing '}' line for the site block".to_string(),
            })?;

        let mut line = format!("    import {}", module);
        for param in params {
            line.push(' ');
            line.push_str(param);
        }
        if self.crlf {
            line.push('\r');
        }
        self.lines.insert(close, line);
        Ok(true)
    }

    /// Drops every import line for `module`; returns how many were removed.
    pub fn remove_import(&mut self, module: &str) -> usize {
        let before = self.lines.len();
        self.lines
            .retain(|line| parse_import(line).is_none_or(|reference| reference.name != module));
        before - self.lines.len()
    }

    pub async fn save(&self) -> Result<()> {
        write_atomic(&self.path, &self.render(), 0o644).await
    }
}
