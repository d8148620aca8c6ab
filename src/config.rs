//! Display configuration
//!
//! Stored as TOML. Every field is optional in the file; values that are out
//! of range fall back to the model default with a warning instead of failing.

use cfontz_display::{
    DisplayError, DisplaySettings, DEFAULT_BRIGHTNESS, DEFAULT_CONTRAST, DEFAULT_OFF_BRIGHTNESS,
    MAX_DIMENSION,
};
use cfontz_transport::protocol::{timing, BAUD_RATES};
use cfontz_transport::{ResponseMode, SerialConfig, MAX_DATA_LENGTH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_DEVICE: &str = "/dev/lcd";
pub const DEFAULT_MODEL: u32 = 633;

/// Settings for one attached module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Serial device path
    pub device: PathBuf,
    /// Module number: 533, 631, 633 or 635
    pub model: u32,
    /// "WxH"; the model's size when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub contrast: u16,
    pub brightness: u16,
    pub off_brightness: u16,
    /// Baud rate; the model's rate when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<u32>,
    /// USB-CDC attached module
    pub usb: bool,
    /// CFA-633 firmware 0.6 or older
    pub old_firmware: bool,
    pub reboot: bool,
    /// 0 disables waiting for acknowledgements
    pub response_timeout_ms: u64,
    pub poll_interval_us: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEVICE),
            model: DEFAULT_MODEL,
            size: None,
            contrast: DEFAULT_CONTRAST,
            brightness: DEFAULT_BRIGHTNESS,
            off_brightness: DEFAULT_OFF_BRIGHTNESS,
            speed: None,
            usb: false,
            old_firmware: false,
            reboot: false,
            response_timeout_ms: timing::RESPONSE_TIMEOUT_MS,
            poll_interval_us: timing::POLL_INTERVAL_US,
        }
    }
}

/// Parse "WxH" into a size a row update can carry
fn parse_size(size: &str) -> Option<(usize, usize)> {
    let (w, h) = size.trim().split_once(['x', 'X'])?;
    let w: usize = w.trim().parse().ok()?;
    let h: usize = h.trim().parse().ok()?;
    let fits = (1..=MAX_DATA_LENGTH - 2).contains(&w) && (1..=MAX_DIMENSION).contains(&h);
    fits.then_some((w, h))
}

fn promille_or(name: &str, value: u16, default: u16) -> u16 {
    if value > 1000 {
        warn!(
            "{} must be between 0 and 1000; using default {}",
            name, default
        );
        default
    } else {
        value
    }
}

impl DisplayConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cfontz")
            .join("display.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: DisplayConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve into display settings. Only an unknown model is an error.
    pub fn to_settings(&self) -> Result<DisplaySettings, DisplayError> {
        let mut settings = DisplaySettings::for_model(self.model)?;
        info!("Found configuration for CFA-{}", self.model);
        let model = settings.model;

        if let Some(size) = &self.size {
            match parse_size(size) {
                Some((w, h)) => {
                    settings.width = w;
                    settings.height = h;
                }
                None => warn!(
                    "cannot parse size {:?}; using default {}x{}",
                    size, model.width, model.height
                ),
            }
        }

        settings.contrast = promille_or("contrast", self.contrast, DEFAULT_CONTRAST);
        settings.brightness = promille_or("brightness", self.brightness, DEFAULT_BRIGHTNESS);
        settings.off_brightness =
            promille_or("off_brightness", self.off_brightness, DEFAULT_OFF_BRIGHTNESS);
        settings.old_firmware = self.old_firmware;
        settings.reboot = self.reboot;
        Ok(settings)
    }

    /// Baud rate to open the port with
    pub fn baud_rate(&self) -> Result<u32, DisplayError> {
        let default = DisplaySettings::for_model(self.model)?.model.baud_rate;
        Ok(match self.speed {
            Some(speed) if BAUD_RATES.contains(&speed) => speed,
            Some(speed) => {
                warn!(
                    "speed {} must be one of {:?}; using default {}",
                    speed, BAUD_RATES, default
                );
                default
            }
            None => default,
        })
    }

    pub fn serial_config(&self) -> Result<SerialConfig, DisplayError> {
        if self.usb {
            info!("USB is indicated (in config)");
        }
        Ok(SerialConfig::new(&self.device, self.baud_rate()?).with_usb(self.usb))
    }

    pub fn response_mode(&self) -> ResponseMode {
        ResponseMode::from_config(self.response_timeout_ms, self.poll_interval_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: DisplayConfig = toml::from_str("").unwrap();
        assert_eq!(config, DisplayConfig::default());
        assert_eq!(config.device, PathBuf::from("/dev/lcd"));
        assert_eq!(config.model, 633);
    }

    #[test]
    fn test_partial_file() {
        let config: DisplayConfig = toml::from_str(
            r#"
device = "/dev/ttyUSB0"
model = 635
usb = true
"#,
        )
        .unwrap();
        assert_eq!(config.device, PathBuf::from("/dev/ttyUSB0"));
        assert_eq!(config.model, 635);
        assert!(config.usb);
        assert_eq!(config.contrast, DEFAULT_CONTRAST);
    }

    #[test]
    fn test_roundtrip() {
        let config = DisplayConfig {
            model: 533,
            size: Some("16x2".to_string()),
            speed: Some(115200),
            ..Default::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: DisplayConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_settings_use_model_size() {
        let config = DisplayConfig {
            model: 635,
            ..Default::default()
        };
        let settings = config.to_settings().unwrap();
        assert_eq!((settings.width, settings.height), (20, 4));
    }

    #[test]
    fn test_size_override_and_fallback() {
        let mut config = DisplayConfig {
            size: Some("20x4".to_string()),
            ..Default::default()
        };
        let settings = config.to_settings().unwrap();
        assert_eq!((settings.width, settings.height), (20, 4));

        for bad in ["banana", "0x2", "40x2", "16x"] {
            config.size = Some(bad.to_string());
            let settings = config.to_settings().unwrap();
            assert_eq!((settings.width, settings.height), (16, 2), "{bad}");
        }
    }

    #[test]
    fn test_out_of_range_values_fall_back() {
        let config = DisplayConfig {
            contrast: 1001,
            brightness: 5000,
            off_brightness: 200,
            ..Default::default()
        };
        let settings = config.to_settings().unwrap();
        assert_eq!(settings.contrast, DEFAULT_CONTRAST);
        assert_eq!(settings.brightness, DEFAULT_BRIGHTNESS);
        assert_eq!(settings.off_brightness, 200);
    }

    #[test]
    fn test_unknown_model_is_error() {
        let config = DisplayConfig {
            model: 634,
            ..Default::default()
        };
        assert!(matches!(
            config.to_settings(),
            Err(DisplayError::UnknownModel(634))
        ));
    }

    #[test]
    fn test_baud_rate() {
        let mut config = DisplayConfig::default();
        assert_eq!(config.baud_rate().unwrap(), 19200);
        config.speed = Some(115200);
        assert_eq!(config.baud_rate().unwrap(), 115200);
        config.speed = Some(57600);
        assert_eq!(config.baud_rate().unwrap(), 19200);
    }

    #[test]
    fn test_response_mode() {
        let mut config = DisplayConfig::default();
        assert_eq!(config.response_mode(), ResponseMode::default());
        config.response_timeout_ms = 0;
        assert_eq!(config.response_mode(), ResponseMode::FireAndForget);
    }
}
