//! RON configuration with environment overrides

use crate::auth::TokenEntry;
use crate::cache::CacheConfig;
use crate::rate_limit::RateLimitConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;
use vetcare_jobs::ClinicInfo;

/// Database path that selects an in-memory store
pub const IN_MEMORY: &str = ":memory:";

/// Root configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Listen address, e.g. "0.0.0.0:8080"
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Database file, or ":memory:"
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub clinic: ClinicInfo,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    /// Limits on the generative routes, per caller
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Report summary cache
    #[serde(default)]
    pub cache: CacheConfig,
    /// Static bearer tokens
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_database() -> String {
    "vetcare.db".to_string()
}

/// Hosted generative model
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AiConfig {
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    /// Usually supplied through `VETCARE_AI_KEY`
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_ai_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_ai_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: default_ai_base_url(),
            model: default_ai_model(),
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// Transactional email provider
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MailConfig {
    #[serde(default = "default_mail_base_url")]
    pub base_url: String,
    #[serde(default = "default_mail_from")]
    pub from: String,
    /// Usually supplied through `VETCARE_MAIL_KEY`; without one, emails are only logged
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_mail_base_url() -> String {
    "https://api.resend.com".to_string()
}

fn default_mail_from() -> String {
    "VetCare+ <no-reply@vetcare.example>".to_string()
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            base_url: default_mail_base_url(),
            from: default_mail_from(),
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct JobsConfig {
    #[serde(default = "default_true")]
    pub reminders: bool,
    /// UTC hour the reminder scan runs
    #[serde(default = "default_reminder_hour")]
    pub reminder_hour_utc: u32,
    #[serde(default = "default_true")]
    pub payment_followup: bool,
}

fn default_true() -> bool {
    true
}

fn default_reminder_hour() -> u32 {
    8
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            reminders: true,
            reminder_hour_utc: default_reminder_hour(),
            payment_followup: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            database: default_database(),
            clinic: ClinicInfo::default(),
            ai: AiConfig::default(),
            mail: MailConfig::default(),
            jobs: JobsConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            tokens: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        ron::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `VETCARE_*` environment variables on top of the file
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(listen) = lookup("VETCARE_LISTEN") {
            self.listen = listen;
        }
        if let Some(database) = lookup("VETCARE_DB") {
            self.database = database;
        }
        if let Some(key) = lookup("VETCARE_AI_KEY") {
            self.ai.api_key = Some(key);
        }
        if let Some(key) = lookup("VETCARE_MAIL_KEY") {
            self.mail.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;
        if self.jobs.reminder_hour_utc > 23 {
            return Err(ConfigError::Validation(format!(
                "reminder_hour_utc must be 0-23, got {}",
                self.jobs.reminder_hour_utc
            )));
        }
        if self.rate_limit.requests == 0 || self.rate_limit.per_secs == 0 {
            return Err(ConfigError::Validation(
                "rate_limit requests and per_secs must be positive".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for entry in &self.tokens {
            if entry.token.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "empty token for uid {}",
                    entry.uid
                )));
            }
            if entry.uid.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "token entries need a non-empty uid".to_string(),
                ));
            }
            if !seen.insert(entry.token.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "token for uid {} is listed twice",
                    entry.uid
                )));
            }
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen
            .parse()
            .map_err(|e| ConfigError::Validation(format!("listen address {}: {e}", self.listen)))
    }

    pub fn in_memory(&self) -> bool {
        self.database == IN_MEMORY
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use std::collections::HashMap;
    use vetcare_core::StaffRole;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = Config::parse("()").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full() {
        let config = Config::parse(
            r#"(
                listen: "0.0.0.0:9000",
                database: ":memory:",
                clinic: (name: "Happy Paws", phone: "555-0199"),
                jobs: (reminder_hour_utc: 6),
                rate_limit: (requests: 5, per_secs: 30),
                tokens: [
                    (token: "front-desk", uid: "staff-1", role: professional(receptionist)),
                    (token: "ana", uid: "tutor-1", role: tutor),
                ],
            )"#,
        )
        .unwrap();
        assert!(config.in_memory());
        assert_eq!(config.clinic.name, "Happy Paws");
        assert_eq!(config.jobs.reminder_hour_utc, 6);
        assert!(config.jobs.payment_followup);
        assert_eq!(config.tokens.len(), 2);
        assert_eq!(
            config.tokens[0].role,
            Role::Professional(StaffRole::Receptionist)
        );
        assert_eq!(config.listen_addr().unwrap().port(), 9000);
    }

    #[test]
    fn test_sample_config_parses() {
        let config = Config::parse(include_str!("../../../config/vetcare.ron")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.tokens.len(), 3);
        assert!(config.ai.api_key.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("VETCARE_LISTEN", "0.0.0.0:7000"),
            ("VETCARE_AI_KEY", "ai-secret"),
            ("VETCARE_MAIL_KEY", "  "),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.listen, "0.0.0.0:7000");
        assert_eq!(config.ai.api_key.as_deref(), Some("ai-secret"));
        assert_eq!(config.mail.api_key, None);
        assert_eq!(config.database, "vetcare.db");
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config {
            listen: "not an address".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        config.listen = default_listen();
        config.jobs.reminder_hour_utc = 24;
        assert!(config.validate().is_err());

        config.jobs.reminder_hour_utc = 8;
        let entry = TokenEntry {
            token: "dup".to_string(),
            uid: "u".to_string(),
            role: Role::Tutor,
        };
        config.tokens = vec![entry.clone(), entry];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_uid_is_rejected() {
        let config = Config {
            tokens: vec![TokenEntry {
                token: "anon".to_string(),
                uid: " ".to_string(),
                role: Role::Tutor,
            }],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }
}
