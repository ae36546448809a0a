//! State command - inspect and edit the local key/value state

use anyhow::Result;
use clap::Subcommand;

use super::get_context;
use crate::output;
use lifeos_core::ports::StateStore;

#[derive(Subcommand)]
pub enum StateCommands {
    /// List stored keys
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the value stored under a key
    Get { key: String },
    /// Store a value under a key
    Set { key: String, value: String },
    /// Remove a key
    Remove { key: String },
}

pub fn run(command: StateCommands) -> Result<()> {
    let ctx = get_context()?;
    let store = ctx.store.as_ref();

    match command {
        StateCommands::List { json } => {
            let entries = store.entries()?;

            if json {
                let listing: Vec<_> = entries
                    .iter()
                    .map(|(k, v)| serde_json::json!({"key": k, "bytes": v.len()}))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&listing)?);
                return Ok(());
            }

            if entries.is_empty() {
                println!("No state stored yet.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Key", "Size"]);
            for (key, value) in &entries {
                table.add_row(vec![key.clone(), output::format_size(value.len() as u64)]);
            }
            println!("{}", table);
        }
        StateCommands::Get { key } => match store.get(&key)? {
            Some(value) => println!("{}", value),
            None => anyhow::bail!("Key not found: {}", key),
        },
        StateCommands::Set { key, value } => {
            store.set(&key, &value)?;
            output::success(&format!("Stored {}", key));
        }
        StateCommands::Remove { key } => {
            if store.remove(&key)? {
                output::success(&format!("Removed {}", key));
            } else {
                output::warning(&format!("Key not found: {}", key));
            }
        }
    }

    Ok(())
}
