//! CLI command implementations: list, show, sweep.

use std::fs;

use serde_json::json;

use crate::config::SnapshotConfig;
use crate::store::{SnapshotId, SnapshotStore};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Dispatch a parsed `Command`, writing a single JSON response line to
/// stdout. Returns an error only when even the error response could
/// not be written.
pub fn run_command(command: Command) -> CliResult<()> {
    let result = match &command {
        Command::List { config } => list(config),
        Command::Show { config, index, term, position } => show(config, *index, *term, *position),
        Command::Sweep { config } => sweep(config),
    };

    match result {
        Ok(value) => write_response(value),
        Err(e) => write_error(e.code_str(), e.message()),
    }
}

fn load_store(config_path: &std::path::Path) -> CliResult<SnapshotStore> {
    let config = SnapshotConfig::load(config_path)?;
    SnapshotStore::open_with_retention(&config.partition_root, config.retention_enabled).map_err(CliError::from)
}

fn list(config_path: &std::path::Path) -> CliResult<serde_json::Value> {
    let store = load_store(config_path)?;
    let mut snapshots = Vec::new();
    if let Some(latest) = store.latest_snapshot().map_err(CliError::from)? {
        snapshots.push(json!({
            "index": latest.id().index(),
            "term": latest.id().term(),
            "processed_position": latest.id().processed_position(),
            "checksum": format!("{:#x}", latest.checksum()),
            "path": latest.path().display().to_string(),
        }));
    }
    Ok(json!({ "snapshots": snapshots }))
}

fn show(config_path: &std::path::Path, index: u64, term: u64, position: u64) -> CliResult<serde_json::Value> {
    let store = load_store(config_path)?;
    let id = SnapshotId::new(index, term, position);
    if !store.exists(id) {
        return Err(CliError::snapshot_not_found(format!("no committed snapshot {id}")));
    }
    let dir = store.snapshot_directory_for(id);
    let mut files = Vec::new();
    for entry in fs::read_dir(&dir).map_err(|e| CliError::io_error(e.to_string()))? {
        let entry = entry.map_err(|e| CliError::io_error(e.to_string()))?;
        if entry.path().is_file() {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    files.sort();
    Ok(json!({
        "index": index,
        "term": term,
        "processed_position": position,
        "path": dir.display().to_string(),
        "files": files,
    }))
}

fn sweep(config_path: &std::path::Path) -> CliResult<serde_json::Value> {
    // Opening the store already sweeps pending/ unconditionally.
    let _store = load_store(config_path)?;
    Ok(json!({ "swept": true }))
}
