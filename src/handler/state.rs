use std::sync::Arc;

use super::credentials::CredentialCache;
use crate::config::ProxyConfig;

#[derive(Clone)]
pub(crate) struct ProxyState {
    pub(crate) config: Arc<ProxyConfig>,
    pub(crate) credentials: Arc<CredentialCache>,
    pub(crate) http_client: reqwest::Client,
}
