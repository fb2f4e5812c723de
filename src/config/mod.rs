#[allow(clippy::module_inception)]
mod config;
mod endpoint;
mod errors;

pub(crate) use config::{ProxyConfig, Settings};
pub(crate) use endpoint::Endpoint;
pub(crate) use errors::ConfigError;
