use derive_more::Display;
use std::path::PathBuf;

/// Runtime settings read from the environment (and `.env` through dotenv).
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    /// Cookie signing/encryption key material. Must be at least 64 bytes.
    pub secret_key: Option<String>,
    pub cookie_secure: bool,
    pub media_root: PathBuf,
    /// Session lifetime in minutes.
    pub session_time: i64,
    pub posts_per_page: u64,
    pub index_cache_seconds: i64,
}

#[derive(Debug, Display, PartialEq, Eq)]
pub enum ConfigError {
    #[display(fmt = "{} must be set", _0)]
    Missing(&'static str),
    #[display(fmt = "{} has an invalid value: {:?}", key, value)]
    Invalid { key: &'static str, value: String },
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Settings with every default applied. Useful for tests and tooling.
    pub fn with_database(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            bind_address: "127.0.0.1:8080".to_owned(),
            secret_key: None,
            cookie_secure: false,
            media_root: PathBuf::from("./media"),
            session_time: 1440,
            posts_per_page: 10,
            index_cache_seconds: 20,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let mut config = Self::with_database(database_url);

        if let Some(bind) = lookup("BIND_ADDRESS") {
            config.bind_address = bind;
        }

        if let Some(key) = lookup("SECRET_KEY") {
            if key.len() < 64 {
                return Err(ConfigError::Invalid {
                    key: "SECRET_KEY",
                    value: "<fewer than 64 bytes>".to_owned(),
                });
            }
            config.secret_key = Some(key);
        }

        if let Some(secure) = lookup("COOKIE_SECURE") {
            config.cookie_secure = match secure.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "COOKIE_SECURE",
                        value: secure,
                    })
                }
            };
        }

        if let Some(root) = lookup("MEDIA_ROOT") {
            config.media_root = PathBuf::from(root);
        }

        config.session_time = parse_positive(&lookup, "SESSION_TIME", config.session_time)?;
        config.posts_per_page = parse_positive(&lookup, "POSTS_PER_PAGE", config.posts_per_page as i64)? as u64;
        config.index_cache_seconds =
            parse_positive(&lookup, "INDEX_CACHE_SECONDS", config.index_cache_seconds)?;

        Ok(config)
    }
}

fn parse_positive<F>(lookup: &F, key: &'static str, default: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<i64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::Invalid { key, value }),
        },
    }
}
