use config::{Config, ConfigError};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    core: Core,
    location: Location,
    provider: Provider,
    label: Label,
}

impl AppConfig {
    pub fn load() -> Result<Self, AppConfigError> {
        let config = Config::builder()
            .set_default("core.log_level", "info")?
            .set_default("location.enabled", true)?
            .set_default("location.distance_threshold", 0)?
            .set_default("location.image_prefixes", Vec::<String>::new())?
            .set_default("provider.retry_delay", "250ms")?
            .set_default("provider.retry_max_delay", "5s")?
            .set_default("provider.max_attempts", 5)?
            .set_default("label.path", "/etc/metrics/location.conf")?
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::File::with_name("config_local").required(false))
            .add_source(config::Environment::with_prefix("EINS").separator("__").list_separator(",").with_list_parse_key("location.image_prefixes").try_parsing(true))
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.core.log_level()?;
        Ok(app_config)
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn label(&self) -> &Label {
        &self.label
    }
}

#[derive(Error, Debug)]
pub enum AppConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(#[from] ConfigError),
    #[error("invalid log level '{0}'")]
    InvalidLogLevel(String),
}

#[derive(Debug, Deserialize)]
pub struct Core {
    log_level: String,
}

impl Core {
    pub fn log_level(&self) -> Result<Level, AppConfigError> {
        self.log_level.parse().map_err(|_| AppConfigError::InvalidLogLevel(self.log_level.clone()))
    }
}

#[derive(Debug, Deserialize)]
pub struct Location {
    enabled: bool,
    distance_threshold: u32,
    image_version: Option<String>,
    image_prefixes: Vec<String>,
}

impl Location {
    pub fn distance_threshold(&self) -> u32 {
        self.distance_threshold
    }

    /// Location is only wanted on some images. No prefixes means every image.
    pub fn is_wanted(&self) -> bool {
        if !self.enabled {
            return false;
        }

        if self.image_prefixes.is_empty() {
            return true;
        }

        self.image_version
            .as_deref()
            .is_some_and(|version| self.image_prefixes.iter().any(|prefix| version.starts_with(prefix.as_str())))
    }
}

#[derive(Debug, Deserialize)]
pub struct Provider {
    #[serde(with = "humantime_serde")]
    retry_delay: Duration,
    #[serde(with = "humantime_serde")]
    retry_max_delay: Duration,
    max_attempts: usize,
}

impl Provider {
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn retry_max_delay(&self) -> Duration {
        self.retry_max_delay
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }
}

#[derive(Debug, Deserialize)]
pub struct Label {
    path: String,
}

impl Label {
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(test)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn new() -> Self {
        AppConfigBuilder {
            config: AppConfig {
                core: Core { log_level: "info".to_string() },
                location: Location {
                    enabled: true,
                    distance_threshold: 0,
                    image_version: None,
                    image_prefixes: vec![],
                },
                provider: Provider {
                    retry_delay: Duration::from_millis(1),
                    retry_max_delay: Duration::from_millis(5),
                    max_attempts: 3,
                },
                label: Label {
                    path: "location.conf".to_string(),
                },
            },
        }
    }

    pub fn distance_threshold(mut self, meters: u32) -> Self {
        self.config.location.distance_threshold = meters;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.location.enabled = enabled;
        self
    }

    pub fn image(mut self, version: Option<&str>, prefixes: &[&str]) -> Self {
        self.config.location.image_version = version.map(str::to_string);
        self.config.location.image_prefixes = prefixes.iter().map(|prefix| prefix.to_string()).collect();
        self
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.config.provider.max_attempts = attempts;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}
