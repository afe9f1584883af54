use paramstore::config::Config as ParamStoreConfig;
use serde::Deserialize;
use std::fs::File;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    ValidationError(String),
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Listener {
    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{name} listener port cannot be 0"
            )));
        }
        Ok(())
    }
}

fn default_listener() -> Listener {
    Listener {
        host: "127.0.0.1".into(),
        port: 3000,
    }
}

fn default_admin_listener() -> Listener {
    Listener {
        host: "127.0.0.1".into(),
        port: 3001,
    }
}

fn default_api_base() -> String {
    "https://api.telegram.org".into()
}

/// Messaging platform section.
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct MessagingConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        MessagingConfig {
            api_base: default_api_base(),
        }
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default = "default_listener")]
    pub listener: Listener,
    #[serde(default = "default_admin_listener")]
    pub admin_listener: Listener,
    pub param_store: ParamStoreConfig,
    #[serde(default)]
    pub messaging: MessagingConfig,
    pub metrics: Option<MetricsConfig>,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: Config = serde_yaml::from_reader(file)?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.listener.validate("main")?;
        self.admin_listener.validate("admin")?;

        if self.param_store.cache_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "param_store.cache_ttl_secs cannot be 0".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
            listener:
                host: 0.0.0.0
                port: 8080
            param_store:
                url: https://params.internal
                auth_token: store-token
                cache_ttl_secs: 120
                parameters:
                    bot_token: courier/bot-token
                    admin_chat_id: courier/admin-chat-id
                    extra_chat_ids: courier/extra-chat-ids
            messaging:
                api_base: https://api.telegram.org
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.admin_listener, default_admin_listener());
        assert_eq!(config.param_store.url, "https://params.internal");
        assert_eq!(config.param_store.cache_ttl_secs, 120);
        assert_eq!(
            config.param_store.parameters.bot_token,
            "courier/bot-token"
        );
        assert_eq!(config.messaging.api_base, "https://api.telegram.org");
        assert_eq!(config.metrics.unwrap().statsd_port, 8125);
    }

    #[test]
    fn test_defaults_applied() {
        let yaml = r#"
            param_store:
                url: https://params.internal
                parameters:
                    bot_token: courier/bot-token
                    admin_chat_id: courier/admin-chat-id
                    extra_chat_ids: courier/extra-chat-ids
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(config.listener, default_listener());
        assert_eq!(config.param_store.cache_ttl_secs, 300);
        assert_eq!(config.messaging.api_base, "https://api.telegram.org");
        assert!(config.metrics.is_none());
    }

    #[test]
    fn test_zero_port_rejected() {
        let yaml = r#"
            listener:
                host: 0.0.0.0
                port: 0
            param_store:
                url: https://params.internal
                parameters:
                    bot_token: a
                    admin_chat_id: b
                    extra_chat_ids: c
            "#;
        let tmp = write_tmp_file(yaml);
        let err = Config::from_file(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
