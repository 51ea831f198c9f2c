//! Rule file loading.
//!
//! The file maps jurisdiction → hazard → `{rule, consequence}`:
//!
//! ```json
//! { "Michigan": { "hardhat": { "rule": "MIOSHA Part 6", "consequence": "Fine" } } }
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use siteguard_compliance::RuleCatalog;

#[derive(Debug, Error)]
pub enum RuleFileError {
    #[error("failed to read rule file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rule file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load the catalog, failing on a missing or malformed file.
pub fn try_load_catalog(path: impl AsRef<Path>) -> Result<RuleCatalog, RuleFileError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| RuleFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    RuleCatalog::from_json_str(&raw).map_err(|source| RuleFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the catalog, degrading to an empty one (every lookup a miss) on error.
pub fn load_catalog(path: impl AsRef<Path>) -> RuleCatalog {
    let path = path.as_ref();
    match try_load_catalog(path) {
        Ok(catalog) => {
            info!(path = %path.display(), rules = catalog.len(), "loaded rule catalog");
            catalog
        }
        Err(err) => {
            warn!(error = %err, "rule catalog unavailable; every lookup will fall back to Unknown");
            RuleCatalog::empty()
        }
    }
}
