// Host-facing building blocks. Contracts live in `traits`; one implementation per file.

pub mod traits;     // Global contracts
pub mod files;      // Atomic writes
pub mod modules;    // Snippet catalog
pub mod site;       // Site configuration document
pub mod composer;   // Module enable/disable
pub mod proxy;      // Site provisioning (Caddy)
pub mod archive;    // tar / mysqldump
pub mod backup;     // Archive runs
pub mod cleanup;    // Retention
pub mod scheduler;  // cron.d entries
