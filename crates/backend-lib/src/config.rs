// ============================
// backend-lib/src/config.rs
// ============================
//! Configuration management.
//!
//! Layers, lowest precedence first: built-in defaults, a TOML file
//! (`config.toml` unless another path is given), then `ACCOUNTS_`-prefixed
//! environment variables. Nested keys use a double underscore, e.g.
//! `ACCOUNTS_MAIL__FROM_EMAIL`.
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::verification::DEFAULT_CODE_TTL_SECS;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "ACCOUNTS_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("signing_key must be set")]
    MissingSigningKey,

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Load(Box::new(e))
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Application settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level, overridden by `RUST_LOG` when set
    pub log_level: String,
    pub log_format: LogFormat,
    /// HMAC secret for session tokens. Required.
    pub signing_key: Option<String>,
    /// Session token lifetime in minutes
    pub token_ttl_minutes: u32,
    /// Verification code lifetime in seconds
    pub code_ttl_secs: u64,
    pub mail: MailSettings,
}

/// Outbound mail settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MailSettings {
    pub from_email: String,
    pub from_name: String,
    /// Upper bound on a single dispatch
    pub timeout_secs: u64,
    pub transport: MailTransport,
}

/// How mail leaves the process
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MailTransport {
    Smtp {
        host: String,
        port: u16,
        username: String,
        password: String,
        #[serde(default = "default_true")]
        use_tls: bool,
    },
    /// Write `.eml` files into a directory
    File { path: PathBuf },
    /// Only log recipient and subject
    Log,
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 4000)),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            signing_key: None,
            token_ttl_minutes: 30,
            code_ttl_secs: DEFAULT_CODE_TTL_SECS,
            mail: MailSettings::default(),
        }
    }
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            from_email: "no-reply@localhost".to_string(),
            from_name: "Accounts".to_string(),
            timeout_secs: 5,
            transport: MailTransport::Log,
        }
    }
}

impl Settings {
    /// The layered figment, exposed so callers can add providers
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate settings
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings: Settings = Self::figment(path).extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid {
                field: "log_level",
                reason: format!("expected one of {LOG_LEVELS:?}, got {:?}", self.log_level),
            });
        }

        match self.signing_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => return Err(ConfigError::MissingSigningKey),
        }

        if self.token_ttl_minutes == 0 {
            return Err(ConfigError::Invalid {
                field: "token_ttl_minutes",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.code_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "code_ttl_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.mail.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "mail.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.mail.from_email.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "mail.from_email",
                reason: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// The configured signing key, or the error that makes startup fail
    pub fn signing_key(&self) -> Result<&str, ConfigError> {
        self.signing_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingSigningKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn valid() -> Settings {
        Settings {
            signing_key: Some("secret".to_string()),
            ..Settings::default()
        }
    }

    #[test]
    fn test_settings_validation() {
        assert!(valid().validate().is_ok());

        // missing signing key
        assert!(matches!(
            Settings::default().validate(),
            Err(ConfigError::MissingSigningKey)
        ));

        // invalid log level
        let mut invalid = valid();
        invalid.log_level = "invalid".to_string();
        assert!(invalid.validate().is_err());

        // invalid token TTL
        let mut invalid = valid();
        invalid.token_ttl_minutes = 0;
        assert!(invalid.validate().is_err());

        // invalid code TTL
        let mut invalid = valid();
        invalid.code_ttl_secs = 0;
        assert!(invalid.validate().is_err());

        // invalid mail timeout
        let mut invalid = valid();
        invalid.mail.timeout_secs = 0;
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.bind_addr.to_string(), "127.0.0.1:4000");
        assert_eq!(settings.token_ttl_minutes, 30);
        assert_eq!(settings.code_ttl_secs, 600);
        assert_eq!(settings.mail.timeout_secs, 5);
        assert_eq!(settings.mail.transport, MailTransport::Log);
    }

    #[test]
    fn test_load_settings_from_file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                bind_addr = "0.0.0.0:8080"
                log_level = "debug"
                log_format = "json"
                signing_key = "from-file"

                [mail]
                from_email = "codes@example.com"

                [mail.transport]
                kind = "smtp"
                host = "smtp.example.com"
                port = 587
                username = "user"
                password = "pass"
                "#,
            )?;

            // Environment variable takes precedence
            jail.set_env("ACCOUNTS_LOG_LEVEL", "warn");
            jail.set_env("ACCOUNTS_MAIL__FROM_NAME", "Example");

            let settings = Settings::load(None).map_err(|e| e.to_string())?;
            assert_eq!(settings.bind_addr.to_string(), "0.0.0.0:8080");
            assert_eq!(settings.log_level, "warn");
            assert_eq!(settings.log_format, LogFormat::Json);
            assert_eq!(settings.signing_key.as_deref(), Some("from-file"));
            assert_eq!(settings.mail.from_email, "codes@example.com");
            assert_eq!(settings.mail.from_name, "Example");
            assert_eq!(
                settings.mail.transport,
                MailTransport::Smtp {
                    host: "smtp.example.com".to_string(),
                    port: 587,
                    username: "user".to_string(),
                    password: "pass".to_string(),
                    use_tls: true,
                }
            );
            // untouched keys keep their defaults
            assert_eq!(settings.token_ttl_minutes, 30);
            Ok(())
        });
    }

    #[test]
    fn test_load_from_explicit_path() {
        Jail::expect_with(|jail| {
            jail.create_file("accounts.toml", "signing_key = \"k\"\ncode_ttl_secs = 120\n")?;
            let settings = Settings::load(Some(Path::new("accounts.toml"))).map_err(|e| e.to_string())?;
            assert_eq!(settings.code_ttl_secs, 120);
            Ok(())
        });
    }

    #[test]
    fn test_missing_signing_key_fails_load() {
        Jail::expect_with(|_jail| {
            assert!(matches!(Settings::load(None), Err(ConfigError::MissingSigningKey)));
            Ok(())
        });
    }
}
