//! Bridge host configuration.

use std::path::Path;

use airslide_core::{AirOutput, BridgeError, SensitivityConfig, TransportProtocol};
use serde::{Deserialize, Serialize};

/// Top-level configuration for the bridge host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Target peer settings.
    pub network: NetworkConfig,
    /// Touch surface geometry.
    pub surface: SurfaceConfig,
    /// Zone sensitivity tuning.
    pub controller: ControllerConfig,
    /// Frame pacing.
    pub transport: TransportTuning,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Target peer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Peer address (digits-and-dots IPv4).
    pub address: String,
    /// Peer port, kept as a string so invalid input can be surfaced
    /// instead of failing the whole config load.
    pub port: String,
    /// "udp" or "tcp".
    pub protocol: String,
}

/// Touch surface geometry used by replay and zone computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: f32,
    pub height: f32,
}

/// Zone sensitivity tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Fraction of the surface height given to the air region.
    pub split_ratio: f32,
    /// Air pairing-band multiplier, 0.0..=0.5.
    pub air_sensitivity: f32,
    /// Slide pairing-band multiplier, 0.0..=0.5.
    pub slide_sensitivity: f32,
    /// "bitmask" or "flick".
    pub air_mode: String,
}

/// Frame pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportTuning {
    /// Send rate in Hz (clamped to 1..=8000 by the core).
    pub send_rate_hz: u32,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            surface: SurfaceConfig::default(),
            controller: ControllerConfig::default(),
            transport: TransportTuning::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".into(),
            port: "24864".into(),
            protocol: "udp".into(),
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            split_ratio: 0.5,
            air_sensitivity: 0.15,
            slide_sensitivity: 0.15,
            air_mode: "bitmask".into(),
        }
    }
}

impl Default for TransportTuning {
    fn default() -> Self {
        Self {
            send_rate_hz: airslide_core::DEFAULT_SEND_RATE,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

// ── Derived values ───────────────────────────────────────────────

impl BridgeConfig {
    /// The protocol selector, validated.
    pub fn protocol(&self) -> Result<TransportProtocol, BridgeError> {
        match self.network.protocol.to_ascii_lowercase().as_str() {
            "udp" => Ok(TransportProtocol::Udp),
            "tcp" => Ok(TransportProtocol::Tcp),
            other => Err(BridgeError::Other(format!("unknown protocol: {other}"))),
        }
    }

    /// The air output mode, validated.
    pub fn air_output(&self) -> Result<AirOutput, BridgeError> {
        match self.controller.air_mode.to_ascii_lowercase().as_str() {
            "bitmask" => Ok(AirOutput::Bitmask),
            "flick" => Ok(AirOutput::Flick),
            other => Err(BridgeError::Other(format!("unknown air mode: {other}"))),
        }
    }

    /// Sensitivity parameters, clamped into their documented ranges.
    pub fn sensitivity(&self) -> SensitivityConfig {
        SensitivityConfig::new(
            self.controller.air_sensitivity,
            self.controller.slide_sensitivity,
            self.controller.split_ratio,
        )
    }

    /// Pixel height of the air sub-region.
    pub fn air_height(&self) -> f32 {
        self.surface.height * self.sensitivity().split_ratio
    }

    /// Pixel height of the slide sub-region.
    pub fn slide_height(&self) -> f32 {
        self.surface.height - self.air_height()
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl BridgeConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write default config to a file.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let cfg = Self::default();
        let text = toml::to_string_pretty(&cfg).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = BridgeConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("address"));
        assert!(text.contains("send_rate_hz"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = BridgeConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: BridgeConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network.address, "127.0.0.1");
        assert_eq!(parsed.transport.send_rate_hz, 500);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let parsed: BridgeConfig =
            toml::from_str("[network]\naddress = \"10.1.1.5\"\n").unwrap();
        assert_eq!(parsed.network.address, "10.1.1.5");
        assert_eq!(parsed.network.port, "24864");
        assert_eq!(parsed.controller.air_sensitivity, 0.15);
    }

    #[test]
    fn protocol_parsing() {
        let mut cfg = BridgeConfig::default();
        assert_eq!(cfg.protocol().unwrap(), TransportProtocol::Udp);
        cfg.network.protocol = "TCP".into();
        assert_eq!(cfg.protocol().unwrap(), TransportProtocol::Tcp);
        cfg.network.protocol = "quic".into();
        assert!(cfg.protocol().is_err());
    }

    #[test]
    fn region_split() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.air_height(), 400.0);
        assert_eq!(cfg.slide_height(), 400.0);
    }
}
