// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Behaviour
//!
//! - Keys are indexed by key ID so the broker can rotate keys
//! - The index is refreshed on TTL expiry or when a key ID is unknown
//! - Fetches are bounded by a timeout; a timeout is a verification failure
//! - Concurrent refreshes may run redundantly, the last write wins
//!
//! The fetch itself sits behind [`KeySource`] so tests can supply keys
//! without a network.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::RwLock;

use super::error::AuthError;

/// Default JWKS cache TTL (5 minutes).
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Upper bound on a single key fetch.
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Future returned by [`KeySource::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<JwkSet, AuthError>> + Send + 'a>>;

/// Somewhere published signing keys can be loaded from.
pub trait KeySource: Send + Sync {
    fn fetch(&self) -> FetchFuture<'_>;
}

/// Loads a key set from an HTTPS endpoint.
pub struct HttpKeySource {
    url: String,
    client: reqwest::Client,
}

impl HttpKeySource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl KeySource for HttpKeySource {
    fn fetch(&self) -> FetchFuture<'_> {
        Box::pin(async move {
            let response = self
                .client
                .get(&self.url)
                .send()
                .await
                .map_err(|e| AuthError::KeyRetrieval(e.to_string()))?;

            if !response.status().is_success() {
                return Err(AuthError::KeyRetrieval(format!(
                    "HTTP {} from JWKS endpoint",
                    response.status()
                )));
            }

            response
                .json::<JwkSet>()
                .await
                .map_err(|e| AuthError::KeyRetrieval(e.to_string()))
        })
    }
}

/// Key usable for verification.
#[derive(Clone)]
pub struct VerifyingKey {
    pub key: DecodingKey,
    pub algorithm: Algorithm,
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifyingKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Cache entry.
struct CacheEntry {
    by_kid: HashMap<String, VerifyingKey>,
    /// Keys published without a kid, tried for tokens that carry none.
    unnamed: Vec<VerifyingKey>,
    fetched_at: Instant,
}

/// Signing-key cache with a TTL and a key-id index.
#[derive(Clone)]
pub struct SigningKeyCache {
    source: Arc<dyn KeySource>,
    cache_ttl: Duration,
    fetch_timeout: Duration,
    cache: Arc<RwLock<Option<CacheEntry>>>,
}

impl SigningKeyCache {
    pub fn new(source: Arc<dyn KeySource>) -> Self {
        Self {
            source,
            cache_ttl: DEFAULT_CACHE_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Cache backed by an HTTPS key endpoint.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self::new(Arc::new(HttpKeySource::new(url)))
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Create with custom fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Look up a key, refreshing once if the cache is stale or lacks `kid`.
    pub async fn get(&self, kid: Option<&str>) -> Result<VerifyingKey, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                if entry.fetched_at.elapsed() < self.cache_ttl {
                    if let Some(key) = lookup(entry, kid) {
                        return Ok(key);
                    }
                }
            }
        }

        tracing::debug!(kid = ?kid, "Refreshing signing key cache");
        self.refresh().await?;

        let cache = self.cache.read().await;
        cache
            .as_ref()
            .and_then(|entry| lookup(entry, kid))
            .ok_or(AuthError::NoMatchingKey)
    }

    /// Force refresh the cache.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let jwks = tokio::time::timeout(self.fetch_timeout, self.source.fetch())
            .await
            .map_err(|_| AuthError::KeyRetrieval("timed out fetching JWKS".to_string()))??;

        let entry = index_keys(&jwks);
        let mut cache = self.cache.write().await;
        *cache = Some(entry);
        Ok(())
    }

    /// Check if keys are currently cached and fresh.
    pub async fn is_cached(&self) -> bool {
        let cache = self.cache.read().await;
        if let Some(entry) = &*cache {
            entry.fetched_at.elapsed() < self.cache_ttl
        } else {
            false
        }
    }
}

fn lookup(entry: &CacheEntry, kid: Option<&str>) -> Option<VerifyingKey> {
    match kid {
        Some(kid) => entry.by_kid.get(kid).cloned(),
        None => entry
            .unnamed
            .first()
            .or_else(|| entry.by_kid.values().next())
            .cloned(),
    }
}

fn index_keys(jwks: &JwkSet) -> CacheEntry {
    let mut by_kid = HashMap::new();
    let mut unnamed = Vec::new();

    for jwk in &jwks.keys {
        let key = match jwk_to_verifying_key(jwk) {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!(error = %e, kid = ?jwk.common.key_id, "Skipping unusable JWK");
                continue;
            }
        };
        match &jwk.common.key_id {
            Some(kid) => {
                by_kid.insert(kid.clone(), key);
            }
            None => unnamed.push(key),
        }
    }

    CacheEntry {
        by_kid,
        unnamed,
        fetched_at: Instant::now(),
    }
}

/// Convert a JWK to a verifying key.
fn jwk_to_verifying_key(jwk: &Jwk) -> Result<VerifyingKey, AuthError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| AuthError::InternalError(format!("Failed to create RSA key: {e}")))?;

            let algorithm = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                _ => Algorithm::RS256,
            };

            Ok(VerifyingKey { key, algorithm })
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| AuthError::InternalError(format!("Failed to create EC key: {e}")))?;

            let algorithm = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::ES384) => Algorithm::ES384,
                _ => Algorithm::ES256,
            };

            Ok(VerifyingKey { key, algorithm })
        }
        _ => Err(AuthError::InternalError(
            "Unsupported key type in JWKS".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::{test_jwks, StaticKeySource, TEST_KID};

    #[tokio::test]
    async fn cache_initially_empty() {
        let cache = SigningKeyCache::new(Arc::new(StaticKeySource::new(test_jwks())));
        assert!(!cache.is_cached().await);
    }

    #[tokio::test]
    async fn miss_triggers_refresh() {
        let source = Arc::new(StaticKeySource::new(test_jwks()));
        let cache = SigningKeyCache::new(source.clone());

        let key = cache.get(Some(TEST_KID)).await.unwrap();
        assert_eq!(key.algorithm, Algorithm::RS256);
        assert_eq!(source.fetch_count(), 1);
        assert!(cache.is_cached().await);

        cache.get(Some(TEST_KID)).await.unwrap();
        assert_eq!(source.fetch_count(), 1, "fresh hit must not refetch");
    }

    #[tokio::test]
    async fn unknown_kid_refreshes_then_fails() {
        let source = Arc::new(StaticKeySource::new(test_jwks()));
        let cache = SigningKeyCache::new(source.clone());
        cache.refresh().await.unwrap();

        let result = cache.get(Some("rotated-away")).await;
        assert!(matches!(result, Err(AuthError::NoMatchingKey)));
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn expired_ttl_refetches() {
        let source = Arc::new(StaticKeySource::new(test_jwks()));
        let cache = SigningKeyCache::new(source.clone()).with_cache_ttl(Duration::ZERO);

        cache.get(Some(TEST_KID)).await.unwrap();
        cache.get(Some(TEST_KID)).await.unwrap();
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_is_key_retrieval_error() {
        let cache = SigningKeyCache::new(Arc::new(StaticKeySource::failing()));
        let result = cache.get(Some(TEST_KID)).await;
        assert!(matches!(result, Err(e) if e.is_key_retrieval()));
    }

    #[tokio::test]
    async fn slow_fetch_times_out() {
        let source = StaticKeySource::new(test_jwks()).with_delay(Duration::from_millis(200));
        let cache = SigningKeyCache::new(Arc::new(source))
            .with_fetch_timeout(Duration::from_millis(10));
        let result = cache.get(Some(TEST_KID)).await;
        assert!(matches!(result, Err(e) if e.is_key_retrieval()));
    }

    #[tokio::test]
    async fn token_without_kid_uses_any_key() {
        let cache = SigningKeyCache::new(Arc::new(StaticKeySource::new(test_jwks())));
        assert!(cache.get(None).await.is_ok());
    }

    #[tokio::test]
    async fn debug_output_names_algorithm_only() {
        let cache = SigningKeyCache::new(Arc::new(StaticKeySource::new(test_jwks())));
        let key = cache.get(Some(TEST_KID)).await.unwrap();
        let rendered = format!("{key:?}");
        assert!(rendered.contains("RS256"));
        assert!(!rendered.contains("key:"));
    }

    #[test]
    fn http_source_keeps_url() {
        let source = HttpKeySource::new("https://acme.cloudflareaccess.com/cdn-cgi/access/certs");
        assert_eq!(
            source.url(),
            "https://acme.cloudflareaccess.com/cdn-cgi/access/certs"
        );
    }
}
