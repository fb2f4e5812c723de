use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::{ConfigError, Endpoint};

const DEFAULT_LISTEN: &str = "127.0.0.1:9200";
const DEFAULT_REFRESH_SECS: f64 = 120.0;

/// Raw settings as found in the config file or on the command line.
/// Every field is optional so the two sources can be layered.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct Settings {
    pub(crate) endpoint: Option<String>,
    pub(crate) listen: Option<String>,
    pub(crate) verbose: Option<bool>,
    pub(crate) pretty: Option<bool>,
    pub(crate) refresh: Option<f64>,
    pub(crate) metrics_port: Option<u16>,
}

impl Settings {
    pub(crate) fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }

    /// Values present in `other` win.
    pub(crate) fn overlay(self, other: Settings) -> Settings {
        Settings {
            endpoint: other.endpoint.or(self.endpoint),
            listen: other.listen.or(self.listen),
            verbose: other.verbose.or(self.verbose),
            pretty: other.pretty.or(self.pretty),
            refresh: other.refresh.or(self.refresh),
            metrics_port: other.metrics_port.or(self.metrics_port),
        }
    }
}

/// Fixed for the lifetime of the process once built.
#[derive(Clone, Debug)]
pub(crate) struct ProxyConfig {
    pub(crate) endpoint: Endpoint,
    pub(crate) listen: String,
    pub(crate) verbose: bool,
    pub(crate) prettify: bool,
    pub(crate) refresh_interval: Duration,
    pub(crate) metrics_port: Option<u16>,
}

impl TryFrom<Settings> for ProxyConfig {
    type Error = ConfigError;

    fn try_from(settings: Settings) -> Result<Self, Self::Error> {
        let endpoint = match settings.endpoint.as_deref() {
            Some(endpoint) if !endpoint.is_empty() => Endpoint::resolve(endpoint)?,
            _ => return Err(ConfigError::MissingEndpoint),
        };

        let refresh = settings.refresh.unwrap_or(DEFAULT_REFRESH_SECS);
        let refresh_interval = Duration::try_from_secs_f64(refresh)
            .map_err(|_| ConfigError::InvalidRefreshInterval(refresh))?;

        let prettify = settings.pretty.unwrap_or(false);

        Ok(ProxyConfig {
            endpoint,
            listen: settings.listen.unwrap_or_else(|| DEFAULT_LISTEN.to_string()),
            // Pretty output is a flavour of verbose output.
            verbose: settings.verbose.unwrap_or(false) || prettify,
            prettify,
            refresh_interval,
            metrics_port: settings.metrics_port,
        })
    }
}
