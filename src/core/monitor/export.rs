//! JSON export of the reading history.

use std::fs;
use std::path::Path;

use crate::error::Result;

use super::reading::Reading;

/// Pretty-printed JSON array of `readings`, in the order given.
///
/// Encoding failures degrade to an empty array.
pub fn export_json(readings: &[Reading]) -> String {
    serde_json::to_string_pretty(readings).unwrap_or_else(|e| {
        log::warn!("Failed to encode reading history: {}", e);
        "[]".to_string()
    })
}

/// Parse a previously exported history.
pub fn import_json(json: &str) -> Result<Vec<Reading>> {
    Ok(serde_json::from_str(json)?)
}

pub fn write_export(path: &Path, readings: &[Reading]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, export_json(readings))?;
    Ok(())
}
