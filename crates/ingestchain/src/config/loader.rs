use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;
use crate::pipeline::InputKind;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match extension.as_str() {
            "json" => Ok(ConfigFormat::Json),
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            _ => Err(ConfigError::UnsupportedFormat(extension)),
        }
    }
}

/// Loads a config file, applies environment overrides and validates the
/// result. The format is chosen by file extension.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config = parse_config(&content, format)?;
    apply_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config)?;

    Ok(config)
}

/// Parses and validates config text without consulting the environment.
pub fn load_config_from_str(content: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    let config = parse_config(content, format)?;
    validate_config(&config)?;
    Ok(config)
}

fn parse_config(content: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
    };

    validate_schema(&json_value)?;

    Ok(serde_json::from_value(json_value)?)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();

    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

/// Applies the deployment environment variables on top of the file config.
pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup("DIR_STORAGE") {
        config.storage_dir = dir;
    }

    if let Some(value) = lookup("MAX_PARALLEL_PROCESSES") {
        config.max_parallel_processes =
            value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: "MAX_PARALLEL_PROCESSES".to_string(),
                value: value.clone(),
            })?;
    }

    if let Some(value) = lookup("CLIPBOARD_COPY") {
        config.clipboard_copy = matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "t");
    }

    if let Some(bucket) = lookup("S3_DATALAKE_BUCKET") {
        config.datalake.bucket = Some(bucket);
    }
    if let Some(prefix) = lookup("S3_DATALAKE_PREFIX") {
        config.datalake.prefix = prefix;
    }
    if let Some(prefix) = lookup("S3_DATALAKE_METADATA_PREFIX") {
        config.datalake.metadata_prefix = prefix;
    }

    if let Some(token) = lookup("WIKI_API_TOKEN") {
        config.wiki.token = Some(token);
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.max_parallel_processes == 0 {
        return Err(ConfigError::Validation {
            message: "max_parallel_processes must be at least 1".to_string(),
        });
    }

    if config.storage_dir.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "storage_dir must not be empty".to_string(),
        });
    }

    for (kind, steps) in &config.chains {
        if kind.parse::<InputKind>().is_err() {
            return Err(ConfigError::Validation {
                message: format!("Chain override for unknown input kind '{}'", kind),
            });
        }
        if steps.is_empty() {
            return Err(ConfigError::Validation {
                message: format!("Chain override for '{}' has no steps", kind),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_load_minimal_config() {
        let config = load_config_from_str(r#"{ "version": "1.0" }"#, ConfigFormat::Json).unwrap();
        assert_eq!(config.storage_dir, "./downloads");
        assert_eq!(config.max_parallel_processes, 1);
        assert!(config.anonymize);
        assert!(!config.clipboard_copy);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_load_yaml_config() {
        let yaml = r#"
version: "1.0"
storage_dir: /var/ingest
max_parallel_processes: 4
logging:
  level: debug
  format: json
chains:
  local-media:
    - transcribe
    - persist-local
"#;
        let config = load_config_from_str(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.storage_dir, "/var/ingest");
        assert_eq!(config.max_parallel_processes, 4);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.chains["local-media"], vec!["transcribe", "persist-local"]);
    }

    #[test]
    fn test_invalid_version() {
        let result = load_config_from_str(r#"{ "version": "2.0" }"#, ConfigFormat::Json);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_schema_rejects_unknown_field() {
        let result = load_config_from_str(
            r#"{ "version": "1.0", "max_paralel_processes": 3 }"#,
            ConfigFormat::Json,
        );
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_schema_rejects_zero_workers() {
        let result = load_config_from_str(
            r#"{ "version": "1.0", "max_parallel_processes": 0 }"#,
            ConfigFormat::Json,
        );
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_chain_override_for_unknown_kind() {
        let result = load_config_from_str(
            r#"{ "version": "1.0", "chains": { "hologram": ["local-read"] } }"#,
            ConfigFormat::Json,
        );
        match result {
            Err(ConfigError::Validation { message }) => assert!(message.contains("hologram")),
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("config.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("config.JSON")).unwrap(),
            ConfigFormat::Json
        );
        assert!(matches!(
            ConfigFormat::from_path(Path::new("config.toml")),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "toml"
        ));
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        apply_overrides(
            &mut config,
            env(&[
                ("DIR_STORAGE", "/tmp/store"),
                ("MAX_PARALLEL_PROCESSES", "8"),
                ("CLIPBOARD_COPY", "T"),
                ("S3_DATALAKE_BUCKET", "lake"),
                ("S3_DATALAKE_PREFIX", "raw"),
            ]),
        )
        .unwrap();

        assert_eq!(config.storage_dir, "/tmp/store");
        assert_eq!(config.max_parallel_processes, 8);
        assert!(config.clipboard_copy);
        assert_eq!(config.datalake.bucket.as_deref(), Some("lake"));
        assert_eq!(config.datalake.prefix, "raw");
        assert_eq!(config.datalake.metadata_prefix, "metadata");
    }

    #[test]
    fn test_clipboard_override_false_values() {
        let mut config = Config {
            clipboard_copy: true,
            ..Config::default()
        };
        apply_overrides(&mut config, env(&[("CLIPBOARD_COPY", "no")])).unwrap();
        assert!(!config.clipboard_copy);
    }

    #[test]
    fn test_invalid_parallelism_override() {
        let mut config = Config::default();
        let result = apply_overrides(&mut config, env(&[("MAX_PARALLEL_PROCESSES", "many")]));
        assert!(matches!(result, Err(ConfigError::InvalidEnv { name, .. }) if name == "MAX_PARALLEL_PROCESSES"));
    }
}
