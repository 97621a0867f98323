// src/main.rs

use clap::Parser;
use std::io::{self, BufRead, Write};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod error;
mod output;
mod service;
mod sys;

use crate::cli::{BackupCommands, Cli, Commands, ModuleCommands, SiteCommands};
use crate::config::PanelConfig;
use crate::error::Result;
use crate::output::{print_one, print_out};
use crate::service::PanelService;
use crate::sys::traits::BackupTarget;

fn init_logger(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "webpanel=debug" } else { "webpanel=info" })
    });

    // stderr only: stdout belongs to command output.
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(layer.json()).init();
    } else {
        registry.with(layer.compact()).init();
    }
}

fn confirm(prompt: &str) -> bool {
    eprint!("{} [y/N]: ", prompt);
    let _ = io::stderr().flush();
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y")
}

async fn run_backup(
    service: &PanelService,
    target: BackupTarget,
    command: &BackupCommands,
    json: bool,
) -> Result<()> {
    match command {
        BackupCommands::Run { cadence, subject } => {
            let artifact = service.backup_run(target, *cadence, subject).await?;
            print_one(json, artifact, |a| format!("Backup written to {}", a.path.display()))
        }
        BackupCommands::Enable { cadence, subject } => {
            let entry = service.backup_enable(target, *cadence, subject).await?;
            print_one(json, entry, |e| {
                format!("Successfully enabled {} backup for {}", e.cadence, e.subject)
            })
        }
        BackupCommands::Disable { cadence, subject } => {
            service.backup_disable(target, *cadence, subject).await?;
            print_one(json, subject, |s| {
                format!("Successfully disabled {} backup for {}", cadence, s)
            })
        }
        BackupCommands::List { cadence, subject } => {
            let artifacts = service.backup_list(target, *cadence, subject).await?;
            if artifacts.is_empty() && !json {
                println!("No {} backups found for {}", cadence, subject);
                return Ok(());
            }
            print_out(json, &artifacts, |a| format!("- {}", a))
        }
    }
}

async fn run(cli: &Cli, service: &PanelService) -> Result<()> {
    let json = cli.json;
    match &cli.command {
        Commands::Site { command } => match command {
            SiteCommands::Add { domain } => {
                let path = service.site_add(domain).await?;
                print_one(json, path, |p| {
                    format!("Successfully created website for {}\nConfiguration: {}", domain, p.display())
                })
            }
            SiteCommands::Rm { domain, yes } => {
                let prompt = format!("Are you sure you want to remove {}? This action cannot be undone.", domain);
                if !*yes && !confirm(&prompt) {
                    println!("Operation cancelled");
                    return Ok(());
                }
                service.site_remove(domain).await?;
                print_one(json, domain, |d| format!("Successfully removed website {}", d))
            }
            SiteCommands::List => {
                let sites = service.site_list().await?;
                if sites.is_empty() && !json {
                    println!("No websites configured");
                    return Ok(());
                }
                print_out(json, &sites, |(domain, modules)| {
                    if modules.is_empty() {
                        format!("- {}", domain)
                    } else {
                        format!("- {} [{}]", domain, modules.join(", "))
                    }
                })
            }
        },
        Commands::Module { command } => match command {
            ModuleCommands::ListAvailable => {
                print_out(json, &service.module_list_available(), |m| format!("- {}", m))
            }
            ModuleCommands::List { domain } => {
                let modules = service.module_list(domain).await?;
                if modules.is_empty() && !json {
                    println!("No modules enabled for {}", domain);
                    return Ok(());
                }
                print_out(json, &modules, |m| format!("- {}", m))
            }
            ModuleCommands::Add { module, domain, params } => {
                service.module_add(module, domain, params).await?;
                print_one(json, module, |m| {
                    if params.is_empty() {
                        format!("Successfully enabled {} module for {}", m, domain)
                    } else {
                        format!(
                            "Successfully enabled {} module for {}\nParameters: {}",
                            m,
                            domain,
                            params.join(" ")
                        )
                    }
                })
            }
            ModuleCommands::Rm { module, domain } => {
                service.module_remove(module, domain).await?;
                print_one(json, module, |m| format!("Successfully disabled {} module for {}", m, domain))
            }
            ModuleCommands::Install => {
                let written = service.module_install().await?;
                print_out(json, &written, |p| format!("- {}", p.display()))
            }
        },
        Commands::Backup { command } => run_backup(service, BackupTarget::Site, command, json).await,
        Commands::Dbbackup { command } => {
            run_backup(service, BackupTarget::Database, command, json).await
        }
    }
}

// Single invocation, sequential awaits: no work runs concurrently.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // ==============================================================================
    // 1. Configuration & Environment
    // ==============================================================================
    init_logger(cli.verbose, cli.log_json);
    let config = PanelConfig::load();
    tracing::debug!("Loaded configuration: {:?}", config);

    // ==============================================================================
    // 2. Dependency Injection & Dispatch
    // ==============================================================================
    let service = PanelService::new(config);

    if let Err(e) = run(&cli, &service).await {
        tracing::debug!("Command failed: {:?}", e);
        eprintln!("❌ {}", e);
        std::process::exit(e.exit_code());
    }
}
