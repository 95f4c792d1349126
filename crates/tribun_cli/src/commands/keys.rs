//! Key file commands.

use std::fs;
use std::path::Path;
use tracing::info;
use tribun_core::{ConfigStore, ConfigurationKey};
use tribun_store::KvStore;

/// Reads a JSON list of key trees.
pub fn load(path: &Path) -> Result<Vec<ConfigurationKey>, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let keys = serde_json::from_str(&text)
        .map_err(|e| format!("invalid key file {}: {e}", path.display()))?;
    Ok(keys)
}

fn print(keys: &[ConfigurationKey]) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(keys)?);
    Ok(())
}

/// Prints the stored values of the keys in `path`.
pub fn get<S: KvStore>(
    store: &ConfigStore<S>,
    path: &Path,
    strict: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let keys = tribun_core::flatten(&load(path)?);
    let found = if strict {
        store.executor().multi_get_strict(&keys)?
    } else {
        store.executor().multi_get(&keys)?
    };
    print(&found)
}

/// Writes the keys in `path`.
pub fn put<S: KvStore>(
    store: &ConfigStore<S>,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let written = store.put(&load(path)?)?;
    info!(keys = written.len(), "keys written");
    print(&written)
}

/// Deletes the keys in `path`.
pub fn delete<S: KvStore>(
    store: &ConfigStore<S>,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let deleted = store.delete(&load(path)?)?;
    info!(keys = deleted.len(), "keys deleted");
    print(&deleted)
}
