use anyhow::{Context, Result};
use ::config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Prefix for environment overrides, e.g. `QRL_CLIENT__NODE=host:port`.
pub const ENV_PREFIX: &str = "QRL";

/// Layers an optional config file under `QRL_*` environment variables.
///
/// Without a file every field falls back to its serde default.
pub fn load_layered_config<T: DeserializeOwned>(path: Option<&Path>) -> Result<T> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        let path_str = path.to_str().context("Invalid config path")?;
        builder = builder.add_source(File::with_name(path_str));
    }

    let settings = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    settings.try_deserialize::<T>().context("Failed to deserialize configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Deserialize, Default)]
    struct Sample {
        #[serde(default)]
        section: SampleSection,
    }

    #[derive(Debug, Deserialize)]
    struct SampleSection {
        #[serde(default = "default_name")]
        name: String,
        #[serde(default)]
        retries: u32,
    }

    impl Default for SampleSection {
        fn default() -> Self {
            Self { name: default_name(), retries: 0 }
        }
    }

    fn default_name() -> String {
        "unnamed".to_string()
    }

    #[test]
    fn test_load_layered_from_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[section]\nname = \"node-a\"\nretries = 4").unwrap();

        let cfg: Sample = load_layered_config(Some(file.path())).unwrap();
        assert_eq!(cfg.section.name, "node-a");
        assert_eq!(cfg.section.retries, 4);
    }

    #[test]
    fn test_load_layered_without_file_uses_defaults() {
        let cfg: Sample = load_layered_config(None).unwrap();
        assert_eq!(cfg.section.name, "unnamed");
        assert_eq!(cfg.section.retries, 0);
    }

    #[test]
    fn test_load_layered_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let res: Result<Sample> = load_layered_config(Some(&path));
        assert!(res.is_err());
    }

    #[derive(Debug, Deserialize)]
    struct EnvSample {
        envlayer: SampleSection,
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[envlayer]\nname = \"from-file\"\nretries = 1").unwrap();

        // key unique to this test, env is process-wide
        std::env::set_var("QRL_ENVLAYER__NAME", "from-env");
        let cfg: Result<EnvSample> = load_layered_config(Some(file.path()));
        std::env::remove_var("QRL_ENVLAYER__NAME");

        let cfg = cfg.unwrap();
        assert_eq!(cfg.envlayer.name, "from-env");
        assert_eq!(cfg.envlayer.retries, 1);
    }
}
