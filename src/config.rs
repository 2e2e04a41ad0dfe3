use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "RFP Desk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default `EnvFilter` directive when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "rfp_desk=info,tower_http=info";

/// Required variables, in the order they are checked.
const REQUIRED_VARS: &[&str] = &[
    "DATABASE_URL",
    "OPENAI_API_KEY",
    "EMAIL_HOST",
    "EMAIL_USER",
    "EMAIL_PASSWORD",
    "IMAP_HOST",
    "IMAP_USER",
    "IMAP_PASSWORD",
];

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Implicit TLS; STARTTLS otherwise.
    pub secure: bool,
    pub user: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub tls: bool,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp: SmtpConfig,
    pub imap: ImapConfig,
    /// Inbox polling period; 0 disables the background poller.
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub frontend_url: String,
    pub database_url: String,
    pub openai: OpenAiConfig,
    pub email: EmailConfig,
}

impl Config {
    /// Load from the process environment. Call `dotenvy::dotenv()` first to
    /// pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(missing) = REQUIRED_VARS.iter().find(|key| get(**key).is_none()) {
            return Err(ConfigError::MissingVar(missing.to_string()));
        }
        let required = |key: &str| get(key).ok_or_else(|| ConfigError::MissingVar(key.into()));
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let smtp_user = required("EMAIL_USER")?;

        Ok(Self {
            port: parse_or(&get, "PORT", 3000)?,
            environment: or("APP_ENV", "development"),
            frontend_url: or("FRONTEND_URL", "http://localhost:5173"),
            database_url: required("DATABASE_URL")?,
            openai: OpenAiConfig {
                api_key: required("OPENAI_API_KEY")?,
                model: or("OPENAI_MODEL", "gpt-4o-mini"),
                base_url: or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            },
            email: EmailConfig {
                smtp: SmtpConfig {
                    host: required("EMAIL_HOST")?,
                    port: parse_or(&get, "EMAIL_PORT", 587)?,
                    secure: get("EMAIL_SECURE").as_deref() == Some("true"),
                    from: get("EMAIL_FROM").unwrap_or_else(|| smtp_user.clone()),
                    user: smtp_user,
                    password: required("EMAIL_PASSWORD")?,
                },
                imap: ImapConfig {
                    host: required("IMAP_HOST")?,
                    port: parse_or(&get, "IMAP_PORT", 993)?,
                    user: required("IMAP_USER")?,
                    password: required("IMAP_PASSWORD")?,
                    tls: get("IMAP_TLS").as_deref() != Some("false"),
                },
                poll_interval_secs: parse_or(&get, "EMAIL_POLL_INTERVAL_SECS", 0)?,
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Filesystem path of the SQLite database named by `DATABASE_URL`.
    pub fn database_path(&self) -> PathBuf {
        let url = self.database_url.trim();
        let path = ["sqlite://", "sqlite:", "file:"]
            .iter()
            .find_map(|prefix| url.strip_prefix(prefix))
            .unwrap_or(url);
        PathBuf::from(path)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DATABASE_URL", "sqlite://data/rfp.db"),
            ("OPENAI_API_KEY", "sk-test"),
            ("EMAIL_HOST", "smtp.example.test"),
            ("EMAIL_USER", "buyer@example.test"),
            ("EMAIL_PASSWORD", "secret"),
            ("IMAP_HOST", "imap.example.test"),
            ("IMAP_USER", "buyer@example.test"),
            ("IMAP_PASSWORD", "secret"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
        Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_apply_when_optional_vars_absent() {
        let config = load(&base_vars()).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.environment, "development");
        assert_eq!(config.frontend_url, "http://localhost:5173");
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
        assert_eq!(config.email.smtp.port, 587);
        assert!(!config.email.smtp.secure);
        assert_eq!(config.email.smtp.from, "buyer@example.test");
        assert_eq!(config.email.imap.port, 993);
        assert!(config.email.imap.tls);
        assert_eq!(config.email.poll_interval_secs, 0);
        assert!(!config.is_production());
    }

    #[test]
    fn first_missing_required_var_is_reported() {
        let mut vars = base_vars();
        vars.remove("EMAIL_HOST");
        vars.remove("IMAP_PASSWORD");
        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::MissingVar("EMAIL_HOST".into())
        );
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut vars = base_vars();
        vars.insert("OPENAI_API_KEY", "  ");
        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::MissingVar("OPENAI_API_KEY".into())
        );
    }

    #[test]
    fn overrides_are_read() {
        let mut vars = base_vars();
        vars.insert("PORT", "8080");
        vars.insert("APP_ENV", "production");
        vars.insert("EMAIL_SECURE", "true");
        vars.insert("EMAIL_PORT", "465");
        vars.insert("EMAIL_FROM", "Procurement <rfp@example.test>");
        vars.insert("IMAP_TLS", "false");
        vars.insert("EMAIL_POLL_INTERVAL_SECS", "60");

        let config = load(&vars).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.is_production());
        assert!(config.email.smtp.secure);
        assert_eq!(config.email.smtp.port, 465);
        assert_eq!(config.email.smtp.from, "Procurement <rfp@example.test>");
        assert!(!config.email.imap.tls);
        assert_eq!(config.email.poll_interval_secs, 60);
    }

    #[test]
    fn secure_flag_only_accepts_literal_true() {
        let mut vars = base_vars();
        vars.insert("EMAIL_SECURE", "yes");
        assert!(!load(&vars).unwrap().email.smtp.secure);
    }

    #[test]
    fn unparsable_number_is_invalid() {
        let mut vars = base_vars();
        vars.insert("PORT", "eighty");
        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::Invalid {
                key: "PORT".into(),
                value: "eighty".into(),
            }
        );
    }

    #[test]
    fn database_path_strips_url_scheme() {
        let mut vars = base_vars();
        for (url, expected) in [
            ("sqlite://data/rfp.db", "data/rfp.db"),
            ("sqlite:rfp.db", "rfp.db"),
            ("file:/var/lib/rfp.db", "/var/lib/rfp.db"),
            ("/tmp/plain.db", "/tmp/plain.db"),
        ] {
            vars.insert("DATABASE_URL", url);
            assert_eq!(load(&vars).unwrap().database_path(), PathBuf::from(expected));
        }
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
