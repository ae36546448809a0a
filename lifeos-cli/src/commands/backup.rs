//! Backup command - export and restore encrypted state backups

use std::env;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::{Confirm, Password};

use super::{get_context, get_logger, log_event};
use crate::output;
use lifeos_core::services::LogEvent;
use lifeos_core::{EncryptedBackup, LifeOsContext, OperationResult, Passphrase, Snapshot, VaultError};

/// Environment variable holding the backup passphrase for scripted use
const PASSPHRASE_ENV: &str = "LIFEOS_PASSPHRASE";

/// Interactive restores re-prompt this many times on a wrong passphrase
const MAX_PASSPHRASE_ATTEMPTS: usize = 3;

#[derive(Subcommand)]
pub enum BackupCommands {
    /// Seal the current state into an encrypted backup
    Export {
        /// Write to this file instead of the backups directory
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Passphrase (falls back to LIFEOS_PASSPHRASE, then a prompt)
        #[arg(long, short = 'p')]
        passphrase: Option<String>,
        /// Maximum number of backups to keep (overrides settings)
        #[arg(long, short = 'm')]
        max_backups: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List available backups
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what a backup file contains, without decrypting it
    Inspect {
        /// Backup name or path
        backup: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check that a backup decrypts with a passphrase
    Verify {
        /// Backup name or path
        backup: String,
        #[arg(long, short = 'p')]
        passphrase: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the current state with a backup
    Restore {
        /// Backup name or path
        backup: String,
        #[arg(long, short = 'p')]
        passphrase: Option<String>,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Do not seal the current state before restoring
        #[arg(long)]
        no_safety_backup: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear all backups
    Clear {
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Passphrase supplied without a prompt (--passphrase flag or LIFEOS_PASSPHRASE)
fn non_interactive_passphrase(flag: Option<String>) -> Option<String> {
    flag.or_else(|| env::var(PASSPHRASE_ENV).ok())
}

/// Get the passphrase for sealing, confirming it when prompted
fn passphrase_for_export(flag: Option<String>) -> Result<Passphrase> {
    if let Some(p) = non_interactive_passphrase(flag) {
        return Ok(Passphrase::new(p)?);
    }

    let p1 = Password::new()
        .with_prompt("Backup passphrase")
        .interact()?;
    let p2 = Password::new()
        .with_prompt("Confirm backup passphrase")
        .interact()?;

    if p1 != p2 {
        anyhow::bail!("Passphrases do not match");
    }
    Ok(Passphrase::new(p1)?)
}

fn prompt_passphrase() -> Result<Passphrase> {
    let p = Password::new()
        .with_prompt("Backup passphrase")
        .interact()?;
    Ok(Passphrase::new(p)?)
}

/// Decrypt a parsed backup, re-prompting on a wrong passphrase when the
/// passphrase came from a prompt. The file is not re-read between attempts.
fn open_with_retry(
    ctx: &LifeOsContext,
    sealed: &EncryptedBackup,
    flag: Option<String>,
    json: bool,
) -> Result<(Snapshot, Passphrase)> {
    if let Some(p) = non_interactive_passphrase(flag) {
        let passphrase = Passphrase::new(p)?;
        let snapshot = output::with_spinner("Decrypting backup...", json, || {
            ctx.backup_service.open(sealed, &passphrase)
        })?;
        return Ok((snapshot, passphrase));
    }

    let mut attempt = 1;
    loop {
        let passphrase = prompt_passphrase()?;
        let opened = output::with_spinner("Decrypting backup...", json, || {
            ctx.backup_service.open(sealed, &passphrase)
        });

        match opened {
            Ok(snapshot) => return Ok((snapshot, passphrase)),
            Err(e)
                if attempt < MAX_PASSPHRASE_ATTEMPTS
                    && e.downcast_ref::<VaultError>() == Some(&VaultError::DecryptError) =>
            {
                output::warning(&format!(
                    "{} ({} of {} attempts)",
                    e, attempt, MAX_PASSPHRASE_ATTEMPTS
                ));
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

fn label_json(path: &Path) -> serde_json::Value {
    serde_json::Value::String(backup_label(path))
}

fn backup_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn run(command: BackupCommands) -> Result<()> {
    let logger = get_logger();

    match command {
        BackupCommands::Export {
            output: target,
            passphrase,
            max_backups,
            json,
        } => {
            let ctx = get_context()?;
            let passphrase = passphrase_for_export(passphrase)?;

            let result = output::with_spinner("Encrypting backup...", json, || match &target {
                Some(path) => ctx.backup_service.export_to(path, &passphrase),
                None => ctx
                    .backup_service
                    .export(&passphrase, max_backups.or(ctx.config.max_backups)),
            });
            let metadata = match result {
                Ok(m) => m,
                Err(e) => {
                    log_event(&logger, LogEvent::new("backup_export_failed").with_error(e.to_string()));
                    return Err(e);
                }
            };
            log_event(
                &logger,
                LogEvent::new("backup_exported")
                    .with_command("backup export")
                    .with_backup(&metadata.name),
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&metadata)?);
            } else {
                output::success("Backup created");
                println!("  Name: {}", metadata.name);
                println!("  Path: {}", metadata.path.display());
                println!("  Size: {}", metadata.size_display());
                println!(
                    "  {}",
                    "Keep your passphrase safe: without it this backup cannot be restored."
                        .dimmed()
                );
            }
        }
        BackupCommands::List { json } => {
            let ctx = get_context()?;
            let backups = ctx.backup_service.list()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&backups)?);
                return Ok(());
            }

            if backups.is_empty() {
                println!("No backups found in {}", ctx.backup_service.backups_dir().display());
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Name", "Created", "Size", "Kind"]);

            for backup in &backups {
                let kind = if backup.pre_restore { "pre-restore" } else { "export" };
                table.add_row(vec![
                    backup.name.clone(),
                    backup.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                    backup.size_display(),
                    kind.to_string(),
                ]);
            }

            println!("{}", table);
        }
        BackupCommands::Inspect { backup, json } => {
            let ctx = get_context()?;
            let path = ctx.backup_service.resolve(&backup)?;
            let info = ctx.backup_service.inspect(&path)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("{}", backup_label(&path).bold());
                println!("  Format version: {}", info.version);
                println!("  Construction: {}", info.format);
                println!("  Ciphertext: {}", output::format_size(info.ciphertext_bytes as u64));
                println!("  Payload: {}", output::format_size(info.payload_bytes as u64));
            }
        }
        BackupCommands::Verify {
            backup,
            passphrase,
            json,
        } => {
            let ctx = get_context()?;
            let path = ctx.backup_service.resolve(&backup)?;
            let sealed = ctx.backup_service.read(&path)?;
            let opened = open_with_retry(&ctx, &sealed, passphrase, json);

            if json {
                let outcome: OperationResult<serde_json::Value> = match &opened {
                    Ok((snapshot, _)) => {
                        OperationResult::ok(serde_json::json!({"entries": snapshot.entry_count()}))
                    }
                    Err(e) => OperationResult::fail(e.to_string()),
                };
                println!(
                    "{}",
                    serde_json::to_string_pretty(&outcome.with_context("backup", label_json(&path)))?
                );
                return opened.map(|_| ());
            }

            let (snapshot, _) = opened?;
            output::success("Backup is valid");
            println!("  Entries: {}", snapshot.entry_count());
        }
        BackupCommands::Restore {
            backup,
            passphrase,
            force,
            no_safety_backup,
            json,
        } => {
            let ctx = get_context()?;
            let path = ctx.backup_service.resolve(&backup)?;
            let label = backup_label(&path);
            // Parse before asking anything so a bad file fails fast
            let sealed = ctx.backup_service.read(&path)?;

            if !force && !json {
                output::warning("Restoring replaces all current LifeOS data.");
                if !confirm(&format!("Restore from backup '{}'?", label))? {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let (snapshot, passphrase) = match open_with_retry(&ctx, &sealed, passphrase, json) {
                Ok(opened) => opened,
                Err(e) => {
                    log_event(
                        &logger,
                        LogEvent::new("backup_restore_failed")
                            .with_backup(&label)
                            .with_error(e.to_string()),
                    );
                    return Err(e);
                }
            };

            let safety = ctx.config.safety_backup_on_restore && !no_safety_backup;
            let result = output::with_spinner("Restoring...", json, || {
                ctx.backup_service.restore_snapshot(&snapshot, &passphrase, safety)
            })?;
            log_event(
                &logger,
                LogEvent::new("backup_restored")
                    .with_command("backup restore")
                    .with_backup(&label),
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                output::success(&format!("State restored from backup: {}", label));
                println!("  Keys restored: {}", result.keys_restored);
                if result.keys_removed > 0 {
                    println!("  Keys removed: {}", result.keys_removed);
                }
                if let Some(safety) = &result.safety_backup {
                    output::info(&format!("Previous state saved as {}", safety.name));
                }
            }
        }
        BackupCommands::Clear { force, json } => {
            let ctx = get_context()?;
            if !force && !json && !confirm("Delete all backups?")? {
                println!("Cancelled.");
                return Ok(());
            }
            let result = ctx.backup_service.clear()?;
            log_event(&logger, LogEvent::new("backups_cleared").with_command("backup clear"));
            if json {
                println!("{}", serde_json::json!({"deleted": result.deleted}));
            } else {
                println!("Deleted {} backup(s)", result.deleted);
            }
        }
    }

    Ok(())
}
