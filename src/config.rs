use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::AssemblyLevel;
use crate::error::FetchError;

pub const DEFAULT_CONFIG_FILE: &str = "ncbi-fetch.json";
pub const DEFAULT_RETMAX: usize = 1000;
pub const DEFAULT_DELAY_SECS: u64 = 3;
pub const DEFAULT_DB: &str = "nuccore";
pub const EMAIL_ENV: &str = "NCBI_EMAIL";
pub const API_KEY_ENV: &str = "NCBI_API_KEY";

/// Optional defaults shared by both tools. Every field can be overridden on
/// the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub db: Option<String>,
    #[serde(default)]
    pub retmax: Option<usize>,
    #[serde(default)]
    pub delay: Option<u64>,
    #[serde(default)]
    pub assembly_level: Option<AssemblyLevel>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path` when given. Without a path, `ncbi-fetch.json` in the
    /// working directory is used if it exists; otherwise defaults apply.
    pub fn resolve(path: Option<&str>) -> Result<Settings, FetchError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| FetchError::ConfigRead(config_path.clone()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Settings, FetchError> {
        serde_json::from_str(content).map_err(|err| FetchError::ConfigParse(err.to_string()))
    }
}

impl Settings {
    pub fn retmax(&self, cli: Option<usize>) -> usize {
        cli.or(self.retmax).unwrap_or(DEFAULT_RETMAX)
    }

    pub fn delay(&self, cli: Option<u64>) -> u64 {
        cli.or(self.delay).unwrap_or(DEFAULT_DELAY_SECS)
    }

    pub fn db(&self, cli: Option<String>) -> String {
        cli.or_else(|| self.db.clone())
            .unwrap_or_else(|| DEFAULT_DB.to_string())
    }

    pub fn assembly_level(&self, cli: Option<AssemblyLevel>) -> AssemblyLevel {
        cli.or(self.assembly_level).unwrap_or_default()
    }

    pub fn email(&self, cli: Option<String>) -> Option<String> {
        resolve_credential(cli, self.email.clone(), std::env::var(EMAIL_ENV).ok())
    }

    pub fn api_key(&self, cli: Option<String>) -> Option<String> {
        resolve_credential(cli, self.api_key.clone(), std::env::var(API_KEY_ENV).ok())
    }
}

/// Command line first, then the settings file, then the environment. Blank
/// values count as unset.
pub fn resolve_credential(
    cli: Option<String>,
    file: Option<String>,
    env: Option<String>,
) -> Option<String> {
    [cli, file, env]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}
