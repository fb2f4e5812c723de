use aws_config::default_provider::credentials::DefaultCredentialsChain;
use aws_config::Region;
use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::signer::RequestSigner;
use crate::metrics::consts as crate_metrics;

struct CachedCredentials {
    credentials: Credentials,
    refreshed_at: Instant,
}

/// Lazily loads credentials from the ambient provider and reloads them once
/// they are older than the refresh interval. Only one load runs at a time and
/// readers always see a complete (credentials, timestamp) pair.
pub(crate) struct CredentialCache {
    provider: SharedCredentialsProvider,
    refresh_interval: Duration,
    cached: RwLock<Option<CachedCredentials>>,
}

impl CredentialCache {
    pub(crate) fn new(provider: SharedCredentialsProvider, refresh_interval: Duration) -> Self {
        CredentialCache {
            provider,
            refresh_interval,
            cached: RwLock::new(None),
        }
    }

    /// Environment, shared config/credentials files, web identity, ECS and
    /// EC2 instance metadata, in the SDK's order.
    pub(crate) async fn from_environment(region: &str, refresh_interval: Duration) -> Self {
        let chain = DefaultCredentialsChain::builder()
            .region(Region::new(region.to_string()))
            .build()
            .await;
        Self::new(SharedCredentialsProvider::new(chain), refresh_interval)
    }

    pub(crate) async fn signer_for(&self, now: Instant) -> Result<RequestSigner, CredentialsError> {
        {
            let cached = self.cached.read().await;
            if let Some(cached) = cached.as_ref().filter(|c| self.is_fresh(c, now)) {
                return Ok(RequestSigner::new(cached.credentials.clone()));
            }
        }

        self.refresh(now).await
    }

    fn is_fresh(&self, cached: &CachedCredentials, now: Instant) -> bool {
        now.saturating_duration_since(cached.refreshed_at) <= self.refresh_interval
    }

    async fn refresh(&self, now: Instant) -> Result<RequestSigner, CredentialsError> {
        let mut cached = self.cached.write().await;

        // Whoever held the lock before us may already have refreshed.
        if let Some(cached) = cached.as_ref().filter(|c| self.is_fresh(c, now)) {
            return Ok(RequestSigner::new(cached.credentials.clone()));
        }

        let credentials = self.provider.provide_credentials().await?;
        metrics::counter!(crate_metrics::CREDENTIAL_REFRESH_TOTAL).increment(1);
        tracing::info!(
            access_key_id = credentials.access_key_id(),
            "Generated fresh AWS credentials"
        );

        *cached = Some(CachedCredentials {
            credentials: credentials.clone(),
            refreshed_at: now,
        });

        Ok(RequestSigner::new(credentials))
    }
}
