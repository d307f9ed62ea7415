//! Application configuration.
//!
//! Every field has a default, so an empty TOML file (or no file at all) gives
//! the standard 1280×720 / 53-division / 0.6-threshold setup.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use air_keys::{KeyLayout, PressDetector};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("failed to parse {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub frame:    FrameConfig,
    pub keyboard: KeyboardConfig,
    pub camera:   CameraConfig,
    pub detector: DetectorConfig,
    pub midi:     MidiConfig,
}

/// Resolution every frame is processed at.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FrameConfig {
    pub width:  u32,
    pub height: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        FrameConfig { width: 1280, height: 720 }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct KeyboardConfig {
    pub divisions:    u32,
    /// First top-view row of the key area.
    pub key_area_top: i32,
    /// Front-view push threshold as a fraction of frame height.
    pub press_ratio:  f64,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        KeyboardConfig {
            divisions:    air_keys::layout::DIVISIONS,
            key_area_top: air_keys::press::DEFAULT_KEY_AREA_TOP,
            press_ratio:  air_keys::press::DEFAULT_PRESS_RATIO,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub top_index:    u32,
    pub front_index:  u32,
    pub mirror_top:   bool,
    pub mirror_front: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            top_index:    1,
            front_index:  0,
            mirror_top:   false,
            mirror_front: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Interpreter used to launch the landmark script.
    pub python:                   String,
    pub script:                   PathBuf,
    pub max_hands:                usize,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence:  f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            python:                   "python3".to_string(),
            script:                   PathBuf::from("tools/hand_landmarks.py"),
            max_hands:                2,
            min_detection_confidence: 0.7,
            min_tracking_confidence:  0.5,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MidiConfig {
    /// Case-insensitive substring of the output port name.  Unset picks a
    /// software synth if one is visible, else the first port.
    pub port:        Option<String>,
    pub channel:     u8,
    pub program:     u8,
    /// Discard all MIDI instead of opening a port.
    pub null_output: bool,
}

impl AppConfig {
    /// Parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let cfg: AppConfig = toml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// `load(path)` when given a path, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None    => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        let k = &self.keyboard;
        let f = &self.frame;

        if k.divisions == 0 {
            return invalid("keyboard.divisions must be > 0".into());
        }
        if f.width < k.divisions {
            return invalid(format!(
                "frame.width ({}) must be at least keyboard.divisions ({})",
                f.width, k.divisions
            ));
        }
        if f.height == 0 {
            return invalid("frame.height must be > 0".into());
        }
        if !(k.press_ratio > 0.0 && k.press_ratio < 1.0) {
            return invalid(format!("keyboard.press_ratio ({}) must be in (0, 1)", k.press_ratio));
        }
        if k.key_area_top < 0 || k.key_area_top >= f.height as i32 {
            return invalid(format!(
                "keyboard.key_area_top ({}) must be in [0, frame.height)",
                k.key_area_top
            ));
        }
        if self.midi.channel > 15 {
            return invalid(format!("midi.channel ({}) must be 0–15", self.midi.channel));
        }
        if self.midi.program > 127 {
            return invalid(format!("midi.program ({}) must be 0–127", self.midi.program));
        }
        if self.detector.max_hands == 0 {
            return invalid("detector.max_hands must be >= 1".into());
        }
        Ok(())
    }

    pub fn key_layout(&self) -> KeyLayout {
        KeyLayout::with_divisions(self.frame.width, self.keyboard.divisions)
    }

    pub fn press_detector(&self) -> PressDetector {
        PressDetector::new(
            self.key_layout(),
            self.keyboard.key_area_top,
            self.frame.height,
            self.keyboard.press_ratio,
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
