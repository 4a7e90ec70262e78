use std::{env, path::Path, str::FromStr, time::Duration};

use ini::Ini;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: ini::Error,
    },
    #[error("missing [{section}] {key}")]
    Missing {
        section: &'static str,
        key: &'static str,
    },
    #[error("invalid [{section}] {key}: {value}")]
    Invalid {
        section: &'static str,
        key: &'static str,
        value: String,
    },
    #[error("quote provider {0} needs an API key ([quote] api_key or PRICEWATCH_API_KEY)")]
    MissingApiKey(ProviderKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Yahoo,
    AlphaVantage,
    Finnhub,
}

impl ProviderKind {
    pub fn needs_api_key(&self) -> bool {
        !matches!(self, ProviderKind::Yahoo)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProviderKind::Yahoo => "yahoo",
            ProviderKind::AlphaVantage => "alphavantage",
            ProviderKind::Finnhub => "finnhub",
        };
        f.write_str(name)
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yahoo" => Ok(ProviderKind::Yahoo),
            "alphavantage" | "alpha_vantage" => Ok(ProviderKind::AlphaVantage),
            "finnhub" => Ok(ProviderKind::Finnhub),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub recipient: String,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct QuoteSettings {
    pub provider: ProviderKind,
    pub api_key: String,
    pub suffix: String,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub enabled: bool,
    pub database: String,
    pub history: i64,
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub interval: Duration,
    pub startup_notice: bool,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub smtp: SmtpSettings,
    pub email: EmailSettings,
    pub quote: QuoteSettings,
    pub storage: StorageSettings,
    pub monitor: MonitorSettings,
}

/// Read `path`, then let `PRICEWATCH_*` variables (from the environment or a
/// `.env` file) override secrets.
pub fn load(path: &Path) -> Result<Settings, ConfigError> {
    dotenvy::dotenv().ok();

    let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    from_ini(&ini, |key| env::var(key).ok())
}

pub fn from_ini(ini: &Ini, env: impl Fn(&str) -> Option<String>) -> Result<Settings, ConfigError> {
    let get = |section: &str, key: &str| {
        ini.get_from(Some(section), key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let host = get("smtp", "host").ok_or(ConfigError::Missing {
        section: "smtp",
        key: "host",
    })?;
    let port = parse_or("smtp", "port", get("smtp", "port"), None::<u16>)?;
    let username = get("smtp", "username").unwrap_or_default().to_string();
    let password = env("PRICEWATCH_SMTP_PASSWORD")
        .or_else(|| get("smtp", "password").map(str::to_string))
        .unwrap_or_default();
    let from = get("smtp", "from")
        .map(str::to_string)
        .unwrap_or_else(|| username.clone());
    if from.is_empty() {
        return Err(ConfigError::Missing {
            section: "smtp",
            key: "from",
        });
    }

    let recipient = env("PRICEWATCH_RECIPIENT")
        .or_else(|| get("email", "recipient").map(str::to_string))
        .ok_or(ConfigError::Missing {
            section: "email",
            key: "recipient",
        })?;
    let currency = get("email", "currency").unwrap_or_default().to_string();

    let provider = match get("quote", "provider") {
        Some(raw) => raw.parse::<ProviderKind>().map_err(|value| ConfigError::Invalid {
            section: "quote",
            key: "provider",
            value,
        })?,
        None => ProviderKind::Yahoo,
    };
    let api_key = env("PRICEWATCH_API_KEY")
        .or_else(|| get("quote", "api_key").map(str::to_string))
        .unwrap_or_default();
    if provider.needs_api_key() && api_key.trim().is_empty() {
        return Err(ConfigError::MissingApiKey(provider));
    }
    let timeout_secs = parse_or("quote", "timeout_secs", get("quote", "timeout_secs"), Some(30u64))?;
    if timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            section: "quote",
            key: "timeout_secs",
            value: "0".to_string(),
        });
    }

    let enabled = parse_or("storage", "enabled", get("storage", "enabled"), Some(false))?;
    let history = parse_or("storage", "history", get("storage", "history"), Some(200i64))?;
    if history <= 0 {
        return Err(ConfigError::Invalid {
            section: "storage",
            key: "history",
            value: history.to_string(),
        });
    }

    let interval_secs = parse_or("monitor", "interval_secs", get("monitor", "interval_secs"), Some(60u64))?;
    if interval_secs == 0 {
        return Err(ConfigError::Invalid {
            section: "monitor",
            key: "interval_secs",
            value: "0".to_string(),
        });
    }
    let startup_notice = parse_or(
        "monitor",
        "startup_notice",
        get("monitor", "startup_notice"),
        Some(true),
    )?;

    Ok(Settings {
        smtp: SmtpSettings {
            host: host.to_string(),
            port,
            username,
            password,
            from,
        },
        email: EmailSettings { recipient, currency },
        quote: QuoteSettings {
            provider,
            api_key,
            suffix: get("quote", "suffix").unwrap_or_default().to_string(),
            base_url: get("quote", "base_url").map(str::to_string),
            timeout: Duration::from_secs(timeout_secs),
        },
        storage: StorageSettings {
            enabled,
            database: get("storage", "database")
                .unwrap_or("pricewatch.db")
                .to_string(),
            history,
        },
        monitor: MonitorSettings {
            interval: Duration::from_secs(interval_secs),
            startup_notice,
        },
    })
}

/// Parse `raw`, falling back to `default` when the key is absent. A key with
/// no default is required.
fn parse_or<T: FromStr>(
    section: &'static str,
    key: &'static str,
    raw: Option<&str>,
    default: Option<T>,
) -> Result<T, ConfigError> {
    match raw {
        Some(v) => v.parse::<T>().map_err(|_| ConfigError::Invalid {
            section,
            key,
            value: v.to_string(),
        }),
        None => default.ok_or(ConfigError::Missing { section, key }),
    }
}
