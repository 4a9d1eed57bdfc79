//! Read/write model JSON files.
//!
//! A model file is the portable result of a run: fitted BG/NBD and
//! Gamma-Gamma parameters, their diagnostics, and the CLV settings used.
//! The schema is defined by `domain::ModelFile`.

use std::fs::{self, File};
use std::path::Path;

use crate::domain::ModelFile;
use crate::error::AppError;

/// Write a model JSON file. The parent directory is created if needed.
pub fn write_model_json(path: &Path, model: &ModelFile) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::input(format!("Failed to create model directory '{}': {e}", parent.display()))
        })?;
    }
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create model JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, model)
        .map_err(|e| AppError::input(format!("Failed to write model JSON: {e}")))?;
    Ok(())
}

/// Read a model JSON file.
pub fn read_model_json(path: &Path) -> Result<ModelFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open model JSON '{}': {e}", path.display())))?;
    let model: ModelFile =
        serde_json::from_reader(file).map_err(|e| AppError::input(format!("Invalid model JSON: {e}")))?;
    Ok(model)
}
