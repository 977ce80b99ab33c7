//! Shareable sensitivity profiles.
//!
//! Players tune sensitivity on one device and share the result as a
//! small JSON document. Importing a profile overrides the sensitivity
//! fields of the loaded config; everything else stays put.

use std::path::Path;

use airslide_core::BridgeError;
use serde::{Deserialize, Serialize};

use crate::config::BridgeConfig;

/// The portable subset of controller tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityProfile {
    pub air_sensitivity: f32,
    pub slide_sensitivity: f32,
    pub split_ratio: f32,
}

impl SensitivityProfile {
    /// Parse a profile from JSON text.
    pub fn from_json(text: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(text).map_err(|e| BridgeError::Other(format!("bad profile: {e}")))
    }

    /// Load a profile from a JSON file.
    pub fn load(path: &Path) -> Result<Self, BridgeError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Overlay this profile onto a config. Values are clamped by the
    /// core when the sensitivity is actually used.
    pub fn apply(&self, config: &mut BridgeConfig) {
        config.controller.air_sensitivity = self.air_sensitivity;
        config.controller.slide_sensitivity = self.slide_sensitivity;
        config.controller.split_ratio = self.split_ratio;
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_apply() {
        let profile = SensitivityProfile::from_json(
            r#"{"air_sensitivity": 0.3, "slide_sensitivity": 0.05, "split_ratio": 0.6}"#,
        )
        .unwrap();

        let mut config = BridgeConfig::default();
        profile.apply(&mut config);
        assert_eq!(config.controller.air_sensitivity, 0.3);
        assert_eq!(config.controller.slide_sensitivity, 0.05);
        assert_eq!(config.controller.split_ratio, 0.6);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(SensitivityProfile::from_json("{").is_err());
        assert!(SensitivityProfile::from_json(r#"{"air_sensitivity": 0.3}"#).is_err());
    }

    #[test]
    fn out_of_range_values_survive_import_but_clamp_in_use() {
        let profile = SensitivityProfile::from_json(
            r#"{"air_sensitivity": 0.9, "slide_sensitivity": -1.0, "split_ratio": 2.0}"#,
        )
        .unwrap();
        let mut config = BridgeConfig::default();
        profile.apply(&mut config);

        let clamped = config.sensitivity();
        assert_eq!(clamped.air_multiplier, 0.5);
        assert_eq!(clamped.slide_multiplier, 0.0);
        assert_eq!(clamped.split_ratio, 0.9);
    }
}
