//! # Configuration
//!
//! Manages the loading and parsing of the application's configuration file (`config.yaml`).
//! Defines the structs for the Matrix connection, the survey settings and logging,
//! plus the administrator allow-list.

use anyhow::{Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub services: ServicesConfig,
    #[serde(default)]
    pub survey: SurveyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Reads the YAML file and applies environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config: AppConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.survey.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }
}

/// Configuration for the connected chat service.
#[derive(Debug, Deserialize, Clone)]
pub struct ServicesConfig {
    pub matrix: MatrixConfig,
}

/// Specific configuration for the Matrix service.
#[derive(Debug, Deserialize, Clone)]
pub struct MatrixConfig {
    pub username: String,
    pub password: String,
    pub homeserver: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Survey behaviour and persistence.
#[derive(Debug, Deserialize, Clone)]
pub struct SurveyConfig {
    #[serde(default = "default_chats_file")]
    pub chats_file: PathBuf,
    #[serde(default)]
    pub admin_users: AdminList,
    #[serde(default = "default_stats_limit")]
    pub stats_limit: usize,
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            chats_file: default_chats_file(),
            admin_users: AdminList::default(),
            stats_limit: default_stats_limit(),
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

impl SurveyConfig {
    /// `CHATS_FILE` and `ADMIN_USERS` take precedence over the file.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("CHATS_FILE").filter(|p| !p.trim().is_empty()) {
            self.chats_file = PathBuf::from(path);
        }
        if let Some(admins) = lookup("ADMIN_USERS") {
            self.admin_users = AdminList::parse(&admins);
        }
    }

    /// Fixed offset used for answer timestamps. Falls back to UTC on an out-of-range value.
    pub fn timezone(&self) -> FixedOffset {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                tracing::warn!(
                    "utc_offset_hours={} is out of range, using UTC",
                    self.utc_offset_hours
                );
                Utc.fix()
            })
    }
}

fn default_chats_file() -> PathBuf {
    PathBuf::from("data/crmchats.json")
}

fn default_stats_limit() -> usize {
    8
}

fn default_utc_offset_hours() -> i32 {
    3
}

/// Log sinks.
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default = "default_console")]
    pub console: bool,
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            console: default_console(),
            level: default_level(),
        }
    }
}

fn default_console() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

/// Handles allowed to use administrative commands. Matching is case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminList {
    handles: HashSet<String>,
}

impl AdminList {
    /// Builds the list from a whitespace-delimited string, e.g. `"alice Bob"`.
    pub fn parse(raw: &str) -> Self {
        Self::from_handles(raw.split_whitespace())
    }

    pub fn from_handles<'a>(handles: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            handles: handles
                .into_iter()
                .map(|h| h.trim().trim_start_matches('@').to_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    pub fn is_admin(&self, handle: &str) -> bool {
        self.handles.contains(&handle.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }
}

impl<'de> Deserialize<'de> for AdminList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Line(String),
            List(Vec<String>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Line(line) => AdminList::parse(&line),
            Raw::List(list) => AdminList::from_handles(list.iter().map(String::as_str)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
services:
  matrix:
    username: bot
    password: secret
    homeserver: https://matrix.example.org
"#;

    #[test]
    fn test_defaults_applied() {
        let config: AppConfig = serde_yaml::from_str(MINIMAL).unwrap();
        assert_eq!(config.survey.chats_file, PathBuf::from("data/crmchats.json"));
        assert_eq!(config.survey.stats_limit, 8);
        assert_eq!(config.survey.admin_users.len(), 0);
        assert_eq!(config.survey.timezone().local_minus_utc(), 3 * 3600);
        assert!(config.logging.console);
    }

    #[test]
    fn test_admin_users_as_line_or_list() {
        let yaml = format!("{MINIMAL}survey:\n  admin_users: \"Alice  bob\"\n");
        let config: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(config.survey.admin_users.is_admin("alice"));
        assert!(config.survey.admin_users.is_admin("BOB"));
        assert!(!config.survey.admin_users.is_admin("carol"));

        let yaml = format!("{MINIMAL}survey:\n  admin_users: [\"@Carol\"]\n");
        let config: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(config.survey.admin_users.is_admin("carol"));
    }

    #[test]
    fn test_env_overrides() {
        let mut survey = SurveyConfig::default();
        survey.apply_env(|key| match key {
            "CHATS_FILE" => Some("/tmp/chats.json".to_string()),
            "ADMIN_USERS" => Some("root".to_string()),
            _ => None,
        });
        assert_eq!(survey.chats_file, PathBuf::from("/tmp/chats.json"));
        assert!(survey.admin_users.is_admin("Root"));
    }

    #[test]
    fn test_out_of_range_offset_falls_back_to_utc() {
        let survey = SurveyConfig {
            utc_offset_hours: 99,
            ..SurveyConfig::default()
        };
        assert_eq!(survey.timezone().local_minus_utc(), 0);

        let survey = SurveyConfig {
            utc_offset_hours: i32::MAX,
            ..SurveyConfig::default()
        };
        assert_eq!(survey.timezone().local_minus_utc(), 0);
    }
}
