use crate::config::settings::{CredentialsConfig, SettingsConfig};
use anyhow::{bail, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub settings: SettingsConfig,
    pub credentials: Option<CredentialsConfig>,
}

/// Load and validate config from YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServiceConfig> {
    let raw = fs::read_to_string(path)?;
    let mut config: ServiceConfig = serde_yaml::from_str(&raw)?;

    // Apply defaults
    let settings = &mut config.settings;
    if settings.safety_buffer_seconds.is_none() {
        settings.safety_buffer_seconds = Some(300);
    }
    if settings.max_token_age_seconds.is_none() {
        settings.max_token_age_seconds = Some(3600);
    }
    if settings.exchange_timeout_seconds.is_none() {
        settings.exchange_timeout_seconds = Some(30);
    }

    // Validate timing relations
    if settings.max_token_age_seconds == Some(0) {
        bail!("max_token_age_seconds must be greater than zero");
    }
    if let Some(renewal) = &settings.renewal {
        if renewal.renewal_buffer_seconds == Some(0) {
            bail!("renewal_buffer_seconds must be greater than zero");
        }
        if renewal.check_interval_seconds == Some(0) {
            bail!("check_interval_seconds must be greater than zero");
        }
    }
    if let Some(url) = &settings.broker_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("broker_url '{}' is not an http(s) endpoint", url);
        }
    }
    if settings.server.port.parse::<u16>().is_err() {
        bail!("server port '{}' is not a valid port", settings.server.port);
    }

    Ok(config)
}

#[cfg(test)]
mod test {
    use super::*;

    fn write_config(yaml: &str) -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_are_applied() {
        let file = write_config(
            r#"
settings:
  metrics:
    is_enabled: false
  server:
    host: 127.0.0.1
    port: "9100"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.settings.safety_buffer_seconds, Some(300));
        assert_eq!(config.settings.max_token_age_seconds, Some(3600));
        assert_eq!(config.settings.exchange_timeout_seconds, Some(30));
        assert!(config.credentials.is_none());
    }

    #[test]
    fn rejects_bad_broker_url_and_port() {
        let file = write_config(
            r#"
settings:
  broker_url: ftp://broker.internal
  metrics:
    is_enabled: false
  server:
    host: 127.0.0.1
    port: "9100"
"#,
        );
        assert!(load_config(file.path()).is_err());

        let file = write_config(
            r#"
settings:
  metrics:
    is_enabled: false
  server:
    host: 127.0.0.1
    port: "not-a-port"
"#,
        );
        assert!(load_config(file.path()).is_err());
    }
}
