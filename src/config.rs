use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_ADMIN_TOKEN: &str = "admin";
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, sourced from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub base_url: String,
    pub upload_dir: PathBuf,
    pub admin_token: String,
    pub max_file_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            base_url: DEFAULT_BASE_URL.to_string(),
            upload_dir: PathBuf::from(UPLOAD_DIR),
            admin_token: DEFAULT_ADMIN_TOKEN.to_string(),
            max_file_size: MAX_FILE_SIZE,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match var("PORT") {
            Some(v) => parse("PORT", &v)?,
            None => defaults.port,
        };
        let max_file_size = match var("MAX_FILE_SIZE") {
            Some(v) => parse("MAX_FILE_SIZE", &v)?,
            None => defaults.max_file_size,
        };
        let base_url = var("BASEURL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port,
            base_url,
            upload_dir: var("UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            admin_token: var("ADMIN_TOKEN").unwrap_or(defaults.admin_token),
            max_file_size,
        })
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.admin_token, "admin");
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
    }

    #[test]
    fn reads_overrides_and_trims_base_url() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8081"),
            ("BASEURL", "https://img.example.com/"),
            ("UPLOAD_DIR", "/srv/uploads"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.base_url, "https://img.example.com");
        assert_eq!(config.upload_dir, PathBuf::from("/srv/uploads"));
    }

    #[test]
    fn rejects_bad_port() {
        let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn blank_values_fall_back() {
        let config = Config::from_lookup(lookup(&[("PORT", "  "), ("BASEURL", "")])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.base_url, "http://localhost:3000");
    }
}
