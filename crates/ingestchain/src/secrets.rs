//! Credential lookup for collaborators that need an API token.
//!
//! A token may be given inline, read from a file (Docker secrets), or taken
//! from a named environment variable, checked in that order.

use secrecy::SecretString;
use std::fs;

use crate::config::WikiConfig;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Failed to read secret from file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

/// Where a token may come from. Empty strings count as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretSource<'a> {
    pub value: Option<&'a str>,
    pub file: Option<&'a str>,
    pub env: Option<&'a str>,
}

impl<'a> SecretSource<'a> {
    pub fn for_wiki(config: &'a WikiConfig) -> Self {
        Self {
            value: config.token.as_deref(),
            file: config.token_file.as_deref(),
            env: config.token_env.as_deref(),
        }
    }

    pub fn is_configured(&self) -> bool {
        [self.value, self.file, self.env]
            .iter()
            .any(|s| s.is_some_and(|s| !s.is_empty()))
    }

    /// `Ok(None)` when no source is configured. A configured source that
    /// cannot be read is an error.
    pub fn resolve(&self) -> Result<Option<SecretString>, SecretError> {
        if let Some(value) = self.value.filter(|v| !v.is_empty()) {
            return Ok(Some(SecretString::from(value.to_string())));
        }

        if let Some(path) = self.file.filter(|p| !p.is_empty()) {
            let expanded = expand_home(path);
            let content = fs::read_to_string(&expanded).map_err(|e| SecretError::FileRead {
                path: expanded.clone(),
                source: e,
            })?;
            return Ok(Some(SecretString::from(content.trim().to_string())));
        }

        if let Some(name) = self.env.filter(|n| !n.is_empty()) {
            return match std::env::var(name) {
                Ok(value) => Ok(Some(SecretString::from(value.trim().to_string()))),
                Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                    name: name.to_string(),
                }),
                Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                    name: name.to_string(),
                }),
            };
        }

        Ok(None)
    }
}

/// Expands a leading `~` using HOME, then USERPROFILE. `~user/` is not
/// supported.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
