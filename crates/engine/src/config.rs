//! JSON configuration files, optionally located through an environment
//! variable.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config json in {path} at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Parses `raw` as JSON. Errors name the path of the offending field;
/// `origin` only labels the error.
pub fn parse_json_config<T: DeserializeOwned>(raw: &str, origin: &Path) -> Result<T, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, T>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        ConfigError::Parse {
            path: origin.to_path_buf(),
            json_path,
            source: error.into_inner(),
        }
    })
}

pub fn load_json_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_json_config(&raw, path)?;
    info!(path = %path.display(), "config_loaded");
    Ok(config)
}

/// Loads the file named by `var`, or the defaults when it is unset or
/// empty.
pub fn load_json_config_from_env<T: DeserializeOwned + Default>(var: &'static str) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) if value.trim().is_empty() => Ok(T::default()),
        Ok(value) => load_json_config(Path::new(value.trim())),
        Err(env::VarError::NotPresent) => Ok(T::default()),
        Err(source) => Err(ConfigError::EnvVar { var, source }),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(default, deny_unknown_fields)]
    struct Sample {
        width: u32,
        inner: Inner,
    }

    #[derive(Debug, Deserialize, PartialEq, Default)]
    #[serde(default)]
    struct Inner {
        seed: u64,
    }

    impl Default for Sample {
        fn default() -> Self {
            Self {
                width: 640,
                inner: Inner::default(),
            }
        }
    }

    #[test]
    fn missing_fields_take_defaults() {
        let sample: Sample = parse_json_config(r#"{"inner":{"seed":9}}"#, Path::new("x.json")).expect("parse");
        assert_eq!(sample.width, 640);
        assert_eq!(sample.inner.seed, 9);
    }

    #[test]
    fn bad_field_reports_its_json_path() {
        let error = parse_json_config::<Sample>(r#"{"inner":{"seed":"nine"}}"#, Path::new("x.json"))
            .expect_err("type mismatch");
        match error {
            ConfigError::Parse { json_path, .. } => assert_eq!(json_path, "inner.seed"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn loads_from_a_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"width": 800}}"#).expect("write");
        let sample: Sample = load_json_config(file.path()).expect("load");
        assert_eq!(sample.width, 800);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let error = load_json_config::<Sample>(&dir.path().join("absent.json")).expect_err("missing");
        assert!(matches!(error, ConfigError::Read { .. }));
    }

    #[test]
    fn unset_variable_yields_defaults() {
        let sample: Sample =
            load_json_config_from_env("TILEGFX_TEST_CONFIG_NEVER_SET").expect("defaults");
        assert_eq!(sample, Sample::default());
    }

    #[test]
    fn set_variable_points_at_the_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"width": 321}}"#).expect("write");
        env::set_var("TILEGFX_TEST_CONFIG_FROM_ENV", file.path());
        let sample: Sample = load_json_config_from_env("TILEGFX_TEST_CONFIG_FROM_ENV").expect("load");
        env::remove_var("TILEGFX_TEST_CONFIG_FROM_ENV");
        assert_eq!(sample.width, 321);
    }
}
