//! Configuration management

use crate::speech::{utterance, Backend};
use crate::{Result, TtsrecError};
use ini::Ini;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Name of the configuration file in the home directory
pub const CONFIG_FILE_NAME: &str = ".ttsrec.cfg";

/// Persistent settings
///
/// Speech defaults (backend, voice, pitch, rate, volume) and where
/// recordings go.
pub struct Config {
    /// INI configuration storage
    ini: Ini,

    /// Config file path (~/.ttsrec.cfg)
    path: PathBuf,
}

impl Config {
    /// Load configuration from ~/.ttsrec.cfg, creating it with defaults
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from `path`, creating it with defaults when absent
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(&path)
                .map_err(|e| TtsrecError::IniParse(format!("Failed to load config: {}", e)))?
        } else {
            info!("Config file not found, creating default");
            let default = Self::default_config();
            default
                .write_to_file(&path)
                .map_err(|e| TtsrecError::IniParse(format!("Failed to write config: {}", e)))?;
            default
        };

        Ok(Self { ini, path })
    }

    /// Defaults only, nothing read from or written to disk
    pub fn in_memory() -> Self {
        Self {
            ini: Self::default_config(),
            path: Self::config_path(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        debug!("Saving config to {:?}", self.path);
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| TtsrecError::Config(format!("Failed to save config: {}", e)))
    }

    fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn default_config() -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("speech"))
            .set("backend", "auto")
            .set("voice", "")
            .set("pitch", "1.0")
            .set("rate", "1.0")
            .set("volume", "100");

        ini.with_section(Some("recording"))
            .set("enabled", "true")
            .set("output_dir", ".");

        ini
    }

    /// Get a boolean value from config
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Get a string value from config
    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.ini
            .get_from(Some(section), key)
            .unwrap_or(default)
            .to_string()
    }

    /// Get an integer value from config
    pub fn get_int(&self, section: &str, key: &str, default: i32) -> i32 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Get a float value from config
    pub fn get_float(&self, section: &str, key: &str, default: f32) -> f32 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.trim().parse().ok())
            .filter(|v: &f32| v.is_finite())
            .unwrap_or(default)
    }

    /// Set a value in config
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    /// Which speech backend to use; unknown names fall back to `auto`
    pub fn backend(&self) -> Backend {
        let name = self.get_string("speech", "backend", "auto");
        name.parse().unwrap_or_else(|e| {
            warn!("{}; using auto", e);
            Backend::Auto
        })
    }

    /// Default voice name; `None` means the engine default
    pub fn voice(&self) -> Option<String> {
        let voice = self.get_string("speech", "voice", "");
        let voice = voice.trim();
        (!voice.is_empty()).then(|| voice.to_string())
    }

    /// Pitch multiplier, clamped to the supported range
    pub fn pitch(&self) -> f32 {
        utterance::clamp_pitch(self.get_float("speech", "pitch", 1.0))
    }

    /// Rate multiplier, clamped to the supported range
    pub fn rate(&self) -> f32 {
        utterance::clamp_rate(self.get_float("speech", "rate", 1.0))
    }

    /// Speech volume (0-100)
    pub fn volume(&self) -> Option<u8> {
        self.get_int("speech", "volume", -1)
            .try_into()
            .ok()
            .filter(|&v| v <= 100)
    }

    /// Should the microphone be probed at all?
    pub fn recording_enabled(&self) -> bool {
        self.get_bool("recording", "enabled", true)
    }

    /// Directory the finished recording is written to
    pub fn output_dir(&self) -> PathBuf {
        let dir = self.get_string("recording", "output_dir", ".");
        match dir.trim() {
            "" => PathBuf::from("."),
            dir => match dir.strip_prefix("~/") {
                Some(rest) => dirs::home_dir()
                    .map(|home| home.join(rest))
                    .unwrap_or_else(|| PathBuf::from(dir)),
                None => PathBuf::from(dir),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::in_memory();
        assert_eq!(config.backend(), Backend::Auto);
        assert_eq!(config.voice(), None);
        assert_eq!(config.pitch(), 1.0);
        assert_eq!(config.rate(), 1.0);
        assert_eq!(config.volume(), Some(100));
        assert!(config.recording_enabled());
        assert_eq!(config.output_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_out_of_range_values() {
        let mut config = Config::in_memory();
        config.set("speech", "pitch", "7");
        config.set("speech", "rate", "0");
        config.set("speech", "volume", "300");
        config.set("speech", "backend", "festival");

        assert_eq!(config.pitch(), utterance::MAX_PITCH);
        assert_eq!(config.rate(), utterance::MIN_RATE);
        assert_eq!(config.volume(), None);
        assert_eq!(config.backend(), Backend::Auto);
    }
}
