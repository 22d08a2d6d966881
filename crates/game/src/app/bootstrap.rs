use std::process::ExitCode;

use tilegfx::{load_json_config_from_env, ConfigError, LoopConfig, Scene};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use super::config::{DemoConfig, DEMO_CONFIG_ENV_VAR};
use super::demo::DemoScene;

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, ExitCode> {
    init_tracing();
    info!("=== tilegfx demo startup ===");

    let demo = load_demo_config().map_err(|err| {
        error!(error = %err, "startup_failed");
        ExitCode::FAILURE
    })?;
    info!(
        map_width = demo.map_width,
        map_height = demo.map_height,
        vehicle_count = demo.vehicle_count,
        seed = demo.seed,
        zoom = ?demo.initial_zoom,
        "demo_config"
    );

    let config = loop_config(&demo);
    Ok(AppWiring {
        config,
        scene: Box::new(DemoScene::new(&demo)),
    })
}

fn load_demo_config() -> Result<DemoConfig, ConfigError> {
    let config: DemoConfig = load_json_config_from_env(DEMO_CONFIG_ENV_VAR)?;
    config.validate()?;
    Ok(config)
}

fn loop_config(demo: &DemoConfig) -> LoopConfig {
    LoopConfig {
        window_title: "tilegfx demo".to_string(),
        window_width: demo.window_width,
        window_height: demo.window_height,
        target_tps: demo.target_tps,
        max_render_fps: demo.max_render_fps,
        ..LoopConfig::default()
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_config_carries_window_and_rate() {
        let demo = DemoConfig {
            window_width: 800,
            window_height: 600,
            target_tps: 20,
            max_render_fps: Some(60),
            ..DemoConfig::default()
        };
        let config = loop_config(&demo);
        assert_eq!((config.window_width, config.window_height), (800, 600));
        assert_eq!(config.target_tps, 20);
        assert_eq!(config.max_render_fps, Some(60));
        assert_eq!(config.max_ticks_per_frame, LoopConfig::default().max_ticks_per_frame);
    }
}
