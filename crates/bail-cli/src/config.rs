//! CLI configuration file
//!
//! ```toml
//! data_dir = "/var/lib/bail"
//!
//! [orchestrator]
//! max_batch_ops = 100
//! render_cache_capacity = 200
//! ```

use bail_core::OrchestratorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default data directory, relative to the working directory
pub const DEFAULT_DATA_DIR: &str = "bail-data";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Directory holding session records
    pub data_dir: Option<PathBuf>,
    pub orchestrator: OrchestratorConfig,
}

impl CliConfig {
    /// Read a TOML configuration file
    ///
    /// # Errors
    /// Returns error if the file is unreadable or invalid
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Data directory: explicit flag, then config file, then default
    #[must_use]
    pub fn resolve_data_dir(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.data_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_orchestrator_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bail.toml");
        std::fs::write(
            &path,
            "data_dir = \"/srv/bail\"\n\n[orchestrator]\nmax_batch_ops = 7\n",
        )
        .unwrap();

        let config = CliConfig::load(&path).unwrap();
        assert_eq!(config.orchestrator.max_batch_ops, 7);
        assert_eq!(config.resolve_data_dir(None), PathBuf::from("/srv/bail"));
        assert_eq!(
            config.resolve_data_dir(Some(Path::new("here"))),
            PathBuf::from("here")
        );
    }

    #[test]
    fn defaults_and_errors() {
        assert_eq!(
            CliConfig::default().resolve_data_dir(None),
            PathBuf::from(DEFAULT_DATA_DIR)
        );
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            CliConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "colour = 1\n").unwrap();
        assert!(matches!(CliConfig::load(&bad), Err(ConfigError::Parse { .. })));
    }
}
