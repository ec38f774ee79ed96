use std::path::PathBuf;

use stash_api::enrich::DEFAULT_SUMMARIZER_URL;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "your-jwt-secret",
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("STASH_JWT_SECRET is unset or still a placeholder")]
    MissingSecret,

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Json,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub store: StoreKind,
    pub host: String,
    pub port: u16,
    pub summarizer_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("STASH_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(ConfigError::MissingSecret);
        }

        let store = match lookup("STASH_STORE").as_deref() {
            None | Some("json") => StoreKind::Json,
            Some("sqlite") => StoreKind::Sqlite,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STASH_STORE",
                    value: other.to_string(),
                });
            }
        };

        let default_db = match store {
            StoreKind::Json => "db.json",
            StoreKind::Sqlite => "stash.db",
        };

        let port = match lookup("STASH_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "STASH_PORT",
                value: raw,
            })?,
            None => 5000,
        };

        Ok(Self {
            jwt_secret,
            db_path: lookup("STASH_DB_PATH").unwrap_or_else(|| default_db.into()).into(),
            store,
            host: lookup("STASH_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            summarizer_url: lookup("STASH_SUMMARIZER_URL")
                .unwrap_or_else(|| DEFAULT_SUMMARIZER_URL.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[("STASH_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.store, StoreKind::Json);
        assert_eq!(cfg.db_path, PathBuf::from("db.json"));
        assert_eq!(cfg.summarizer_url, "https://r.jina.ai/");
    }

    #[test]
    fn secret_is_required() {
        assert_eq!(config(&[]), Err(ConfigError::MissingSecret));
        assert_eq!(
            config(&[("STASH_JWT_SECRET", "dev-secret-change-me")]),
            Err(ConfigError::MissingSecret)
        );
    }

    #[test]
    fn overrides_and_bad_values() {
        let cfg = config(&[
            ("STASH_JWT_SECRET", "s3cret"),
            ("STASH_STORE", "sqlite"),
            ("STASH_PORT", "8080"),
        ])
        .unwrap();
        assert_eq!(cfg.store, StoreKind::Sqlite);
        assert_eq!(cfg.db_path, PathBuf::from("stash.db"));
        assert_eq!(cfg.port, 8080);

        assert!(matches!(
            config(&[("STASH_JWT_SECRET", "s3cret"), ("STASH_PORT", "http")]),
            Err(ConfigError::Invalid { name: "STASH_PORT", .. })
        ));
        assert!(matches!(
            config(&[("STASH_JWT_SECRET", "s3cret"), ("STASH_STORE", "mongo")]),
            Err(ConfigError::Invalid { name: "STASH_STORE", .. })
        ));
    }
}
