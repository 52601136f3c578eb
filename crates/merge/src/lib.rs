//! Override merge engine
//!
//! Applies a batch of reviewed configuration overrides to per-service XML
//! config files. The overrides document is validated up front and never
//! partially trusted; each service's merge is a pure tree-to-tree
//! transform gated on `FileVersion` equality, and merged output is
//! re-sorted by method name so files stay diff-friendly.

mod document;
mod engine;

pub use document::{OverrideDocument, ServiceOverride};
pub use engine::{
    merge, sort_operations, MergeOutcome, MergeSummary, OverrideEngine, VersionMismatch,
};

use std::fs;
use std::path::Path;

use cmdletgen_common::{ConfigError, Result};

/// Flag file recording the overrides document's validation errors.
pub const VALIDATION_ERRORS_FILE: &str = "buildConfigValidationErrors.txt";

/// Load, validate, and apply an overrides document.
///
/// On validation failure nothing is merged: the error text is persisted
/// to [`VALIDATION_ERRORS_FILE`] in `flag_dir` and the error is returned
/// so the caller halts the build.
pub fn apply_overrides(
    overrides_path: &Path,
    config_dir: &Path,
    flag_dir: &Path,
) -> Result<MergeSummary> {
    let document = match OverrideDocument::load(overrides_path) {
        Ok(document) => document,
        Err(err) => {
            if matches!(err, ConfigError::Validation(_)) {
                let flag_path = flag_dir.join(VALIDATION_ERRORS_FILE);
                fs::write(&flag_path, err.to_string())
                    .map_err(|e| ConfigError::write(flag_path, e))?;
            }
            return Err(err);
        }
    };

    OverrideEngine::new(config_dir).apply(&document)
}
