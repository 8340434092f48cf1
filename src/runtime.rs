//! Runtime helpers shared across binaries.
//!
//! Centralizes environment configuration (where mapping documents live, how
//! much to log) so CLIs resolve it the same way.

use anyhow::{Result, bail};
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Directory of mapping documents used when no source is given explicitly.
pub const MAPPINGS_DIR_ENV: &str = "DATASET_MAPPINGS_DIR";
/// `EnvFilter` directives for the binaries' log output.
pub const LOG_ENV: &str = "DATASET_MAPPINGS_LOG";

const DEFAULT_LOG_FILTER: &str = "warn";

fn dir_from_hint(hint: &str) -> Option<PathBuf> {
    if hint.trim().is_empty() {
        return None;
    }
    let path = Path::new(hint);
    path.is_dir().then(|| path.to_path_buf())
}

/// Locate the default mapping document directory.
///
/// Honors `DATASET_MAPPINGS_DIR` when it names a directory, then falls back to
/// the build-time hint (the crate's `json/` directory unless overridden when
/// building).
pub fn default_mappings_dir() -> Result<PathBuf> {
    if let Ok(env_dir) = env::var(MAPPINGS_DIR_ENV) {
        if let Some(dir) = dir_from_hint(&env_dir) {
            return Ok(dir);
        }
        tracing::warn!(value = %env_dir, "{MAPPINGS_DIR_ENV} is not a directory; ignoring");
    }

    if let Some(hint) = option_env!("DATASET_MAPPINGS_DIR_HINT") {
        if let Some(dir) = dir_from_hint(hint) {
            return Ok(dir);
        }
    }

    bail!("Unable to locate mapping documents. Set {MAPPINGS_DIR_ENV} to the directory holding them.");
}

/// Install a stderr fmt subscriber filtered by `DATASET_MAPPINGS_LOG`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn dir_from_hint_requires_existing_directory() {
        let temp = TempDir::new().expect("temp dir");
        assert_eq!(
            dir_from_hint(&temp.path().display().to_string()),
            Some(temp.path().to_path_buf())
        );
        assert!(dir_from_hint("").is_none());
        assert!(dir_from_hint(&temp.path().join("missing").display().to_string()).is_none());
    }

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
