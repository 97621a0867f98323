use clap::{Parser, Subcommand};

use crate::sys::traits::Cadence;

#[derive(Parser, Debug)]
#[command(name = "webpanel", version, about = "Single-host web panel: sites, modules and backups")]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(short, long, global = true, help = "Enable debug logging")]
    pub verbose: bool,
    #[arg(long, global = true, help = "Emit log lines as JSON")]
    pub log_json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage website configurations
    Site {
        #[command(subcommand)]
        command: SiteCommands,
    },
    /// Manage reverse-proxy modules of a site
    Module {
        #[command(subcommand)]
        command: ModuleCommands,
    },
    /// Site backups
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },
    /// Database backups
    Dbbackup {
        #[command(subcommand)]
        command: BackupCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum SiteCommands {
    Add {
        domain: String,
    },
    Rm {
        domain: String,
        #[arg(long, short = 'y', default_value_t = false, help = "Skip the confirmation prompt")]
        yes: bool,
    },
    List,
}

#[derive(Subcommand, Debug)]
pub enum ModuleCommands {
    ListAvailable,
    List {
        domain: String,
    },
    Add {
        module: String,
        domain: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        params: Vec<String>,
    },
    Rm {
        module: String,
        domain: String,
    },
    /// Write the module snippet files into the config directory
    Install,
}

#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    Run {
        #[arg(value_enum)]
        cadence: Cadence,
        subject: String,
    },
    Enable {
        #[arg(value_enum)]
        cadence: Cadence,
        subject: String,
    },
    Disable {
        #[arg(value_enum)]
        cadence: Cadence,
        subject: String,
    },
    List {
        #[arg(value_enum)]
        cadence: Cadence,
        subject: String,
    },
}
