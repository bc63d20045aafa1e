use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::SkyError;
use crate::weather::WeatherTable;

/// Longest phase `validate` accepts, in days.
pub const MAX_DAYS_PER_PHASE: u32 = 10_000;

/// Sky construction and behaviour settings, persisted as JSON.
///
/// Every field has a default, so a partial file (or `{}`) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyConfig {
    pub sun_texture: String,
    pub sun_glare_texture: String,
    /// Cloud texture bound before any weather is applied, relative to the
    /// texture directory.
    pub default_cloud_texture: String,
    pub atmosphere_mesh: String,
    pub clouds_mesh: String,
    pub night_dome_mesh: String,
    pub sun_size: f32,
    pub sun_glare_size: f32,
    pub masser_size: f32,
    pub secunda_size: f32,
    pub sun_direction: Vec3,
    pub masser_direction: Vec3,
    pub secunda_direction: Vec3,
    /// Days each of the eight moon phases lasts.
    pub days_per_phase: u32,
    /// Secunda runs this many days ahead of Masser in the phase cycle.
    pub secunda_phase_offset_days: u32,
    /// Initial cloud layer alpha.
    pub clouds_alpha: f32,
    pub glare_fade: f32,
    pub weathers: WeatherTable,
}

impl Default for SkyConfig {
    fn default() -> Self {
        Self {
            sun_texture: "textures/tx_sun_05.dds".into(),
            sun_glare_texture: "textures/tx_sun_flash_grey_05.dds".into(),
            default_cloud_texture: "tx_sky_cloudy.dds".into(),
            atmosphere_mesh: "meshes/sky_atmosphere.nif".into(),
            clouds_mesh: "meshes/sky_clouds_01.nif".into(),
            night_dome_mesh: "meshes/sky_night_01.nif".into(),
            sun_size: 1.0,
            sun_glare_size: 3.0,
            masser_size: 0.75,
            secunda_size: 0.5,
            sun_direction: Vec3::new(0.4, 0.4, 0.4),
            masser_direction: Vec3::new(-0.4, 0.4, 0.5),
            secunda_direction: Vec3::new(-0.4, 0.4, 0.5),
            days_per_phase: 4,
            secunda_phase_offset_days: 0,
            clouds_alpha: 0.75,
            glare_fade: 1.0,
            weathers: WeatherTable::default(),
        }
    }
}

impl SkyConfig {
    /// Load a config from a JSON file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SkyError> {
        let file = std::fs::File::open(path.as_ref())?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        tracing::debug!(
            path = %path.as_ref().display(),
            weathers = config.weathers.len(),
            "sky config loaded"
        );
        Ok(config)
    }

    /// Save the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SkyError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SkyError> {
        let sizes = [
            ("sun_size", self.sun_size),
            ("sun_glare_size", self.sun_glare_size),
            ("masser_size", self.masser_size),
            ("secunda_size", self.secunda_size),
        ];
        for (name, size) in sizes {
            if !(size.is_finite() && size > 0.0) {
                return Err(SkyError::InvalidConfig(format!(
                    "{name} must be positive, got {size}"
                )));
            }
        }
        let directions = [
            ("sun_direction", self.sun_direction),
            ("masser_direction", self.masser_direction),
            ("secunda_direction", self.secunda_direction),
        ];
        for (name, dir) in directions {
            if dir.try_normalize().is_none() {
                return Err(SkyError::InvalidConfig(format!("{name} must be non-zero")));
            }
        }
        if !(1..=MAX_DAYS_PER_PHASE).contains(&self.days_per_phase) {
            return Err(SkyError::InvalidConfig(format!(
                "days_per_phase must be in 1..={MAX_DAYS_PER_PHASE}, got {}",
                self.days_per_phase
            )));
        }
        if !(0.0..=1.0).contains(&self.clouds_alpha) {
            return Err(SkyError::InvalidConfig(format!(
                "clouds_alpha must be in [0, 1], got {}",
                self.clouds_alpha
            )));
        }
        if !(self.glare_fade.is_finite() && self.glare_fade >= 0.0) {
            return Err(SkyError::InvalidConfig(format!(
                "glare_fade must be non-negative, got {}",
                self.glare_fade
            )));
        }
        self.validate_weathers()
    }

    fn validate_weathers(&self) -> Result<(), SkyError> {
        let mut seen = std::collections::BTreeSet::new();
        for weather in self.weathers.iter() {
            if !seen.insert(weather.name.as_str()) {
                return Err(SkyError::InvalidConfig(format!(
                    "duplicate weather '{}'",
                    weather.name
                )));
            }
            let unit = [
                ("clouds_maximum_percent", weather.clouds_maximum_percent),
                ("glare_view", weather.glare_view),
            ];
            for (field, value) in unit {
                if !(0.0..=1.0).contains(&value) {
                    return Err(SkyError::InvalidConfig(format!(
                        "weather '{}': {field} must be in [0, 1], got {value}",
                        weather.name
                    )));
                }
            }
            if !weather.cloud_speed.is_finite() {
                return Err(SkyError::InvalidConfig(format!(
                    "weather '{}': cloud_speed must be finite",
                    weather.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::WeatherSettings;

    #[test]
    fn defaults_are_valid() {
        SkyConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_json_gives_defaults() {
        let config: SkyConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SkyConfig::default());
    }

    #[test]
    fn partial_json_overrides_fields() {
        let config: SkyConfig =
            serde_json::from_str(r#"{"days_per_phase": 3, "sun_direction": [0.0, 1.0, 0.0]}"#)
                .unwrap();
        assert_eq!(config.days_per_phase, 3);
        assert_eq!(config.sun_direction, Vec3::Y);
        assert_eq!(config.masser_size, 0.75);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let zero_size = SkyConfig {
            sun_size: 0.0,
            ..SkyConfig::default()
        };
        assert!(matches!(
            zero_size.validate(),
            Err(SkyError::InvalidConfig(_))
        ));

        let zero_dir = SkyConfig {
            masser_direction: Vec3::ZERO,
            ..SkyConfig::default()
        };
        assert!(zero_dir.validate().is_err());

        let zero_days = SkyConfig {
            days_per_phase: 0,
            ..SkyConfig::default()
        };
        assert!(zero_days.validate().is_err());

        let opaque = SkyConfig {
            clouds_alpha: 1.5,
            ..SkyConfig::default()
        };
        assert!(opaque.validate().is_err());

        let endless = SkyConfig {
            days_per_phase: 600_000_000,
            ..SkyConfig::default()
        };
        assert!(endless.validate().is_err());
        let longest = SkyConfig {
            days_per_phase: MAX_DAYS_PER_PHASE,
            ..SkyConfig::default()
        };
        longest.validate().unwrap();
    }

    #[test]
    fn validate_rejects_duplicate_weather_names() {
        let mut config = SkyConfig::default();
        let json = r#"[{"name": "rain"}, {"name": "rain", "cloud_speed": 4.0}]"#;
        config.weathers = serde_json::from_str(json).unwrap();
        assert!(matches!(
            config.validate(),
            Err(SkyError::InvalidConfig(msg)) if msg.contains("duplicate weather 'rain'")
        ));
    }

    #[test]
    fn validate_rejects_weather_out_of_range() {
        let mut config = SkyConfig::default();
        config.weathers.insert(WeatherSettings {
            name: "murk".into(),
            clouds_maximum_percent: 1.4,
            ..WeatherSettings::default()
        });
        assert!(config.validate().is_err());

        let mut config = SkyConfig::default();
        config.weathers.insert(WeatherSettings {
            name: "glow".into(),
            glare_view: -0.5,
            ..WeatherSettings::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let config = SkyConfig {
            secunda_phase_offset_days: 6,
            ..SkyConfig::default()
        };
        config.save(tmp.path()).unwrap();
        let loaded = SkyConfig::load(tmp.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_rejects_invalid_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), r#"{"sun_size": -1.0}"#).unwrap();
        assert!(matches!(
            SkyConfig::load(tmp.path()),
            Err(SkyError::InvalidConfig(_))
        ));
        std::fs::write(tmp.path(), "not json").unwrap();
        assert!(matches!(SkyConfig::load(tmp.path()), Err(SkyError::Json(_))));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = SkyConfig::load(dir.path().join("missing.json"));
        assert!(matches!(result, Err(SkyError::Io(_))));
    }
}
