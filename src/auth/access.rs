// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Perimeter (Cloudflare Access) token verification.

use jsonwebtoken::{decode, decode_header, Validation};

use super::claims::{AccessClaims, ResolvedIdentity};
use super::error::AuthError;
use super::jwks::SigningKeyCache;
use crate::config::BrokerSettings;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Verifies broker-issued tokens against the team's published keys.
#[derive(Clone)]
pub struct AccessVerifier {
    issuer: String,
    audience: String,
    keys: SigningKeyCache,
}

impl AccessVerifier {
    pub fn new(settings: &BrokerSettings, keys: SigningKeyCache) -> Self {
        Self {
            issuer: settings.issuer(),
            audience: settings.audience.clone(),
            keys,
        }
    }

    /// Verifier fetching keys from the team's certs endpoint.
    pub fn from_settings(settings: &BrokerSettings) -> Self {
        Self::new(settings, SigningKeyCache::from_url(settings.certs_url()))
    }

    pub fn keys(&self) -> &SigningKeyCache {
        &self.keys
    }

    /// Verify signature, expiry, audience and issuer.
    pub async fn verify(&self, token: &str) -> Result<ResolvedIdentity, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;

        let key = self.keys.get(header.kid.as_deref()).await?;

        let mut validation = Validation::new(key.algorithm);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        let token_data = decode::<AccessClaims>(token, &key.key, &validation)?;

        ResolvedIdentity::from_access_claims(token_data.claims).ok_or(AuthError::MalformedToken)
    }
}
