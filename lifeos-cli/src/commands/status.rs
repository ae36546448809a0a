//! Status command

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = ctx.status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "LifeOS Status".bold());
    println!("  Stored keys: {}", status.total_keys);
    println!("  Stored data: {}", output::format_size(status.stored_bytes as u64));
    match status.database_bytes {
        Some(bytes) => println!(
            "  Database: {} ({})",
            ctx.store.db_path().display(),
            output::format_size(bytes)
        ),
        None => println!("  Database: {}", ctx.store.db_path().display()),
    }
    println!();
    println!("{}", "Backups".bold());
    println!("  Directory: {}", ctx.backup_service.backups_dir().display());
    println!("  Count: {}", status.total_backups);
    match &status.latest_backup {
        Some(latest) => println!(
            "  Latest: {} ({})",
            latest.name,
            latest.created_at.format("%Y-%m-%d %H:%M:%S")
        ),
        None => output::warning("  No backups yet. Run `lifeos backup export` to create one."),
    }
    println!("  Format: {}", status.backup_format);

    Ok(())
}
