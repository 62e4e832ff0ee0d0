//! Configuration and serialization module.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calibration::{CaptureConfig, CorrespondenceDecoder, DecodeOptions, GrayCodeGenerator};
use crate::error::{ConfigurationError, Error, Result};

/// Width and height of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Projector resolution the patterns are generated for.
    pub projector: Resolution,
    /// Camera resolution of the captured frames.
    pub camera: Resolution,
    /// Thresholding parameters.
    pub decode: DecodeOptions,
    /// Capture sequencing.
    pub capture: CaptureConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            projector: Resolution::new(1920, 1080),
            camera: Resolution::new(1920, 1080),
            decode: DecodeOptions::default(),
            capture: CaptureConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration: JSON for `.json` files, XML otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;

        if path.extension().map(|e| e == "json").unwrap_or(false) {
            Ok(serde_json::from_str(&contents)?)
        } else {
            quick_xml::de::from_str(&contents).map_err(|e| Error::Xml(e.to_string()))
        }
    }

    /// Save configuration as pretty JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Save configuration as XML.
    pub fn save_xml(&self, path: &Path) -> Result<()> {
        let xml = quick_xml::se::to_string(self).map_err(|e| Error::Xml(e.to_string()))?;
        std::fs::write(path, xml)?;
        Ok(())
    }

    pub fn encoder(&self) -> std::result::Result<GrayCodeGenerator, ConfigurationError> {
        GrayCodeGenerator::new(self.projector.width, self.projector.height)
    }

    pub fn decoder(&self) -> std::result::Result<CorrespondenceDecoder, ConfigurationError> {
        CorrespondenceDecoder::new(
            self.camera.width,
            self.camera.height,
            self.projector.width,
            self.projector.height,
        )
    }
}
