use serde::Deserialize;
use tilegfx::{ConfigError, ZoomLevel};

pub(crate) const DEMO_CONFIG_ENV_VAR: &str = "TILEGFX_DEMO_CONFIG";

const MAX_MAP_SIDE: u32 = 1024;
const MAX_VEHICLES: u32 = 4096;

/// Settings read from the optional JSON file named by
/// [`DEMO_CONFIG_ENV_VAR`]. Missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct DemoConfig {
    pub(crate) window_width: u32,
    pub(crate) window_height: u32,
    pub(crate) target_tps: u32,
    pub(crate) max_render_fps: Option<u32>,
    pub(crate) map_width: u32,
    pub(crate) map_height: u32,
    pub(crate) vehicle_count: u32,
    pub(crate) seed: u64,
    pub(crate) initial_zoom: ZoomLevel,
    pub(crate) dirty_overlay: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            target_tps: 30,
            max_render_fps: None,
            map_width: 64,
            map_height: 64,
            vehicle_count: 24,
            seed: 0x5eed,
            initial_zoom: ZoomLevel::Normal,
            dirty_overlay: false,
        }
    }
}

impl DemoConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.window_width == 0 || self.window_height == 0 {
            return Err(ConfigError::Invalid {
                field: "window_width/window_height",
                message: format!("{}x{} has no area", self.window_width, self.window_height),
            });
        }
        if self.target_tps == 0 {
            return Err(ConfigError::Invalid {
                field: "target_tps",
                message: "must be at least 1".to_string(),
            });
        }
        for (field, side) in [("map_width", self.map_width), ("map_height", self.map_height)] {
            if side == 0 || side > MAX_MAP_SIDE {
                return Err(ConfigError::Invalid {
                    field,
                    message: format!("{side} is outside 1..={MAX_MAP_SIDE}"),
                });
            }
        }
        if self.vehicle_count > MAX_VEHICLES {
            return Err(ConfigError::Invalid {
                field: "vehicle_count",
                message: format!("{} exceeds {MAX_VEHICLES}", self.vehicle_count),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tilegfx::parse_json_config;

    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config: DemoConfig = parse_json_config("{}", Path::new("demo.json")).expect("parse");
        assert_eq!(config, DemoConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zoom_is_read_in_snake_case() {
        let config: DemoConfig =
            parse_json_config(r#"{"initial_zoom":"out2x","vehicle_count":3}"#, Path::new("demo.json"))
                .expect("parse");
        assert_eq!(config.initial_zoom, ZoomLevel::Out2x);
        assert_eq!(config.vehicle_count, 3);
        assert_eq!(config.map_width, 64);
    }

    #[test]
    fn unknown_zoom_names_its_field() {
        let error = parse_json_config::<DemoConfig>(r#"{"initial_zoom":"huge"}"#, Path::new("demo.json"))
            .expect_err("bad zoom");
        match error {
            ConfigError::Parse { json_path, .. } => assert_eq!(json_path, "initial_zoom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = parse_json_config::<DemoConfig>(r#"{"vehicles":3}"#, Path::new("demo.json"))
            .expect_err("unknown field");
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn validation_rejects_empty_maps_and_windows() {
        let config = DemoConfig {
            map_height: 0,
            ..DemoConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "map_height", .. })
        ));

        let config = DemoConfig {
            window_width: 0,
            ..DemoConfig::default()
        };
        assert!(config.validate().is_err());

        let config = DemoConfig {
            vehicle_count: MAX_VEHICLES + 1,
            ..DemoConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "vehicle_count", .. })
        ));
    }
}
