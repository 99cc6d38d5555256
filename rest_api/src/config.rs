// rest_api/src/config.rs

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "rest_api/rest_api_config.yaml";
pub const ENV_PREFIX: &str = "HOSPITAL";

/// Runtime settings for the REST API server.
#[derive(Debug, Clone, Deserialize)]
pub struct RestApiConfig {
    pub host: String,
    pub port: u16,
    pub data_directory: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub notification_webhook_url: Option<String>,
    pub reminder_interval_secs: u64,
    /// When both are set, an admin account with these credentials is created
    /// at startup if the email is not registered yet.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl RestApiConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Layers built-in defaults, the optional YAML file and `HOSPITAL_*`
/// environment variables, in that order.
pub fn load_rest_api_config(config_file: Option<&Path>) -> Result<RestApiConfig> {
    let file = config_file.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
    let settings = Config::builder()
        .set_default("host", "127.0.0.1")?
        .set_default("port", 8082)?
        .set_default("data_directory", "hospital_data")?
        .set_default("token_ttl_hours", 720)?
        .set_default("reminder_interval_secs", 300)?
        .add_source(File::from(file).required(false))
        .add_source(Environment::with_prefix(ENV_PREFIX))
        .build()
        .context("Failed to load REST API configuration")?;

    let config: RestApiConfig = settings
        .try_deserialize()
        .context("Failed to parse REST API configuration (is HOSPITAL_JWT_SECRET set?)")?;
    if config.jwt_secret.trim().is_empty() {
        bail!("jwt_secret must not be empty");
    }
    if config.reminder_interval_secs == 0 {
        bail!("reminder_interval_secs must be greater than zero");
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn yaml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn should_fill_defaults_around_file_values() {
        let file = yaml("jwt_secret: from-file\nport: 9100\n");
        let config = load_rest_api_config(Some(file.path())).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.reminder_interval_secs, 300);
        assert!(config.notification_webhook_url.is_none());
        assert_eq!(config.bind_address(), "127.0.0.1:9100");
    }

    #[test]
    fn should_reject_blank_secret() {
        let file = yaml("jwt_secret: \"  \"\n");
        assert!(load_rest_api_config(Some(file.path())).is_err());
    }
}
