use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::posterior::UpdateMode;
use crate::space::{GridSpec, HypothesisSpace};

/// Grids and update policy of an analysis.
///
/// ```json
/// {
///   "grids": [
///     { "kind": "range", "start": 0, "stop": 31, "step": 1 },
///     { "kind": "linear", "low": 1, "high": 50, "n": 50 }
///   ],
///   "update_mode": "log_space"
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct EngineConfig {
    pub grids: Vec<GridSpec>,
    #[serde(default)]
    pub update_mode: UpdateMode,
}

impl EngineConfig {
    /// # Errors
    /// [`crate::error::SuiteError::Config`] if `json` does not describe a config.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    /// [`crate::error::SuiteError::Io`] if the file cannot be read, or as
    /// [`EngineConfig::from_json`].
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// # Errors
    /// As [`HypothesisSpace::from_specs`].
    pub fn space(&self) -> Result<HypothesisSpace> {
        HypothesisSpace::from_specs(&self.grids)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::error::SuiteError;
    use crate::posterior::Posterior;

    const PAINTBALL: &str = r#"{
        "grids": [
            { "kind": "range", "start": 0, "stop": 31, "step": 1 },
            { "kind": "linear", "low": 1, "high": 50, "n": 50 }
        ],
        "update_mode": "log_space"
    }"#;

    #[test]
    fn parses_grids_and_mode() {
        let config = EngineConfig::from_json(PAINTBALL).unwrap();
        assert_eq!(config.grids.len(), 2);
        assert_eq!(config.update_mode, UpdateMode::LogSpace);

        let post = Posterior::from_config(&config).unwrap();
        assert_eq!(post.len(), 31 * 50);
        assert_eq!(post.mode(), UpdateMode::LogSpace);
    }

    #[test]
    fn mode_defaults_to_per_observation() {
        let config =
            EngineConfig::from_json(r#"{"grids": [{"kind": "values", "values": [1, 2]}]}"#).unwrap();
        assert_eq!(config.update_mode, UpdateMode::PerObservation);
    }

    #[test]
    fn rejects_unknown_fields_and_bad_grids() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"grids": [], "resolution": 3}"#),
            Err(SuiteError::Config(_))
        ));
        let config = EngineConfig::from_json(r#"{"grids": []}"#).unwrap();
        assert!(matches!(
            Posterior::from_config(&config),
            Err(SuiteError::InvalidGrid { .. })
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PAINTBALL.as_bytes()).unwrap();
        let config = EngineConfig::from_path(file.path()).unwrap();
        assert_eq!(config.space().unwrap().dims(), 2);

        assert!(matches!(
            EngineConfig::from_path(file.path().with_extension("missing")),
            Err(SuiteError::Io(_))
        ));
    }
}
