use crate::retry::RetryConfig;
use crate::url::TrustKind;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// The trust posture a [`Config`] carries, one step richer than
/// [`crate::url::TrustKind`] — this is the type a caller actually builds
/// with [`ConfigBuilder`], since on-first-use trust is a legitimate
/// programmatic choice even though no URL scheme spells it (spec.md §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trust {
    Off,
    CustomCAs(Vec<PathBuf>),
    SystemCAs,
    AcceptAny,
    OnFirstUse(Option<PathBuf>),
}

impl Trust {
    fn from_kind(kind: &TrustKind) -> Self {
        match kind {
            TrustKind::Off => Trust::Off,
            TrustKind::SystemCAs => Trust::SystemCAs,
            TrustKind::AcceptAny => Trust::AcceptAny,
        }
    }
}

/// Everything spec.md §6's driver configuration option table covers,
/// plus the ambient logging section SPEC_FULL §1.2 adds. Built either
/// programmatically via [`ConfigBuilder`] or loaded from TOML via
/// [`Config::from_toml_str`] / [`Config::from_toml_file`] (SPEC_FULL
/// §1.3, mirroring the teacher's raw-then-typed config-loading shape).
#[derive(Debug, Clone)]
pub struct Config {
    pub trust: Trust,
    pub user_agent: String,
    pub max_connection_pool_size: usize,
    pub max_connection_lifetime: Option<Duration>,
    pub connection_timeout: Duration,
    pub retry: RetryConfig,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            trust: Trust::SystemCAs,
            user_agent: format!("bolt-driver/{}", env!("CARGO_PKG_VERSION")),
            max_connection_pool_size: 100,
            max_connection_lifetime: Some(Duration::from_secs(3600)),
            connection_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
            log_level: "info".to_owned(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Start from the trust posture implied by a connection URL's scheme
    /// (spec.md §6), leaving every other option at its default.
    pub fn from_url_trust(kind: &TrustKind) -> Self {
        Config { trust: Trust::from_kind(kind), ..Config::default() }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, crate::Error> {
        let raw: RawConfig = toml::from_str(s).map_err(|e| crate::Error::Configuration(e.to_string()))?;
        raw.into_config()
    }

    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::Error> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| crate::Error::Configuration(format!("{}: {e}", path.as_ref().display())))?;
        Config::from_toml_str(&contents)
    }
}

/// Every field optional — mirrors the teacher's raw/typed split so a
/// partial TOML document only overrides what it mentions, with
/// validation and defaulting happening once in [`RawConfig::into_config`].
#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    trust: Option<String>,
    trusted_certificates: Option<Vec<PathBuf>>,
    known_hosts: Option<PathBuf>,
    user_agent: Option<String>,
    max_connection_pool_size: Option<usize>,
    max_connection_lifetime_ms: Option<u64>,
    connection_timeout_ms: Option<u64>,
    max_retry_time_ms: Option<u64>,
    initial_retry_delay_ms: Option<u64>,
    retry_multiplier: Option<f64>,
    retry_jitter_factor: Option<f64>,
    #[serde(rename = "logging")]
    logging: Option<RawLogging>,
}

#[derive(Debug, Deserialize, Default)]
struct RawLogging {
    level: Option<String>,
}

impl RawConfig {
    fn into_config(self) -> Result<Config, crate::Error> {
        let mut config = Config::default();

        if let Some(trust) = self.trust {
            config.trust = match trust.as_str() {
                "off" => Trust::Off,
                "system" => Trust::SystemCAs,
                "accept_any" => Trust::AcceptAny,
                "on_first_use" => Trust::OnFirstUse(self.known_hosts.clone()),
                "custom" => Trust::CustomCAs(self.trusted_certificates.clone().ok_or_else(|| {
                    crate::Error::Configuration("trust = \"custom\" requires trusted_certificates".to_owned())
                })?),
                other => {
                    return Err(crate::Error::Configuration(format!(
                        "unrecognised trust strategy '{other}'"
                    )))
                }
            };
        }
        if let Some(user_agent) = self.user_agent {
            config.user_agent = user_agent;
        }
        if let Some(n) = self.max_connection_pool_size {
            config.max_connection_pool_size = n;
        }
        if let Some(ms) = self.max_connection_lifetime_ms {
            config.max_connection_lifetime = if ms == 0 { None } else { Some(Duration::from_millis(ms)) };
        }
        if let Some(ms) = self.connection_timeout_ms {
            config.connection_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.max_retry_time_ms {
            config.retry.max_retry_time = Duration::from_millis(ms);
        }
        if let Some(ms) = self.initial_retry_delay_ms {
            config.retry.initial_delay = Duration::from_millis(ms);
        }
        if let Some(m) = self.retry_multiplier {
            config.retry.multiplier = m;
        }
        if let Some(j) = self.retry_jitter_factor {
            config.retry.jitter_factor = j;
        }
        if let Some(logging) = self.logging {
            if let Some(level) = logging.level {
                config.log_level = level;
            }
        }
        Ok(config)
    }
}

/// Programmatic alternative to [`Config::from_toml_str`] — every setter
/// returns `Self` for chaining, matching the teacher's builder shape.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: ConfigOverrides,
}

#[derive(Debug, Default)]
struct ConfigOverrides {
    trust: Option<Trust>,
    user_agent: Option<String>,
    max_connection_pool_size: Option<usize>,
    max_connection_lifetime: Option<Option<Duration>>,
    connection_timeout: Option<Duration>,
    retry: Option<RetryConfig>,
    log_level: Option<String>,
}

impl ConfigBuilder {
    pub fn trust(mut self, trust: Trust) -> Self {
        self.config.trust = Some(trust);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    pub fn max_connection_pool_size(mut self, size: usize) -> Self {
        self.config.max_connection_pool_size = Some(size);
        self
    }

    pub fn max_connection_lifetime(mut self, lifetime: Option<Duration>) -> Self {
        self.config.max_connection_lifetime = Some(lifetime);
        self
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = Some(timeout);
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = Some(retry);
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = Some(level.into());
        self
    }

    pub fn build(self) -> Config {
        let defaults = Config::default();
        Config {
            trust: self.config.trust.unwrap_or(defaults.trust),
            user_agent: self.config.user_agent.unwrap_or(defaults.user_agent),
            max_connection_pool_size: self.config.max_connection_pool_size.unwrap_or(defaults.max_connection_pool_size),
            max_connection_lifetime: self.config.max_connection_lifetime.unwrap_or(defaults.max_connection_lifetime),
            connection_timeout: self.config.connection_timeout.unwrap_or(defaults.connection_timeout),
            retry: self.config.retry.unwrap_or(defaults.retry),
            log_level: self.config.log_level.unwrap_or(defaults.log_level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_only_what_it_sets() {
        let config = Config::builder().max_connection_pool_size(5).build();
        assert_eq!(config.max_connection_pool_size, 5);
        assert_eq!(config.user_agent, Config::default().user_agent);
    }

    #[test]
    fn toml_parses_partial_document() {
        let config = Config::from_toml_str(
            r#"
            trust = "system"
            max_connection_pool_size = 42

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.trust, Trust::SystemCAs);
        assert_eq!(config.max_connection_pool_size, 42);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn toml_custom_trust_requires_certificates() {
        let result = Config::from_toml_str("trust = \"custom\"");
        assert!(result.is_err());
    }

    #[test]
    fn zero_max_lifetime_means_unbounded() {
        let config = Config::from_toml_str("max_connection_lifetime_ms = 0").unwrap();
        assert_eq!(config.max_connection_lifetime, None);
    }
}
