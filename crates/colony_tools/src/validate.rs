//! Combat config validation.

use std::path::{Path, PathBuf};

use colony_core::config::CombatConfig;

use crate::error::{Result, ToolError};

/// Read, parse, and validate one combat config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, does not parse, or has
/// inconsistent tables.
pub fn load_combat_config(path: &Path) -> Result<CombatConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ToolError::io(path, &e))?;
    Ok(CombatConfig::from_ron_str(
        &content,
        &path.display().to_string(),
    )?)
}

/// RON files to check: the path itself, or every `.ron` file directly
/// inside it, in name order.
fn config_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(path)
        .map_err(|e| ToolError::io(path, &e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    files.sort();
    Ok(files)
}

/// Validate a combat config file, or every config in a directory.
///
/// Returns how many files were checked.
///
/// # Errors
///
/// Returns [`ToolError::Invalid`] if any file fails, after logging each
/// failure.
pub fn validate_combat_configs(path: &Path) -> Result<usize> {
    let files = config_files(path)?;
    let mut failed = 0;
    for file in &files {
        match load_combat_config(file) {
            Ok(_) => tracing::info!("OK: {}", file.display()),
            Err(e) => {
                tracing::error!("{e}");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        return Err(ToolError::Invalid {
            checked: files.len(),
            failed,
        });
    }
    Ok(files.len())
}
