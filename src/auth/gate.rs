// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication decision state machine.
//!
//! Conditions are evaluated strictly in order and the first one satisfied
//! is terminal:
//!
//! 1. Bypass mode → [`Decision::Bypassed`]
//! 2. No method configured → [`Decision::NoMethodConfigured`]
//! 3. Wallet token for the configured owner → [`Decision::WalletAuthenticated`]
//! 4. Broker-sourced token that verifies → [`Decision::BrokerAuthenticated`]
//! 5. Nothing extracted → [`Decision::CredentialMissing`]
//! 6. Otherwise → [`Decision::CredentialInvalid`]
//!
//! A valid wallet token for any other actor is logged and falls through to
//! step 4 instead of failing the request outright.

use std::sync::Arc;

use axum::http::HeaderMap;

use super::access::AccessVerifier;
use super::claims::ResolvedIdentity;
use super::credential::{extract_credential, Credential, CredentialSource};
use super::wallet::WalletAuthority;
use crate::config::{AuthMode, DeploymentConfig};

/// Terminal state of one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Bypassed(ResolvedIdentity),
    NoMethodConfigured,
    WalletAuthenticated(ResolvedIdentity),
    BrokerAuthenticated(ResolvedIdentity),
    CredentialMissing,
    CredentialInvalid,
}

impl Decision {
    /// The identity to attach, present only for admitting states.
    pub fn identity(&self) -> Option<&ResolvedIdentity> {
        match self {
            Decision::Bypassed(identity)
            | Decision::WalletAuthenticated(identity)
            | Decision::BrokerAuthenticated(identity) => Some(identity),
            Decision::NoMethodConfigured
            | Decision::CredentialMissing
            | Decision::CredentialInvalid => None,
        }
    }

    pub fn into_identity(self) -> Option<ResolvedIdentity> {
        match self {
            Decision::Bypassed(identity)
            | Decision::WalletAuthenticated(identity)
            | Decision::BrokerAuthenticated(identity) => Some(identity),
            _ => None,
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Bypassed(_) => "bypassed",
            Decision::NoMethodConfigured => "no_method_configured",
            Decision::WalletAuthenticated(_) => "wallet_authenticated",
            Decision::BrokerAuthenticated(_) => "broker_authenticated",
            Decision::CredentialMissing => "credential_missing",
            Decision::CredentialInvalid => "credential_invalid",
        }
    }
}

/// Runs the resolution policy for a deployment.
#[derive(Clone)]
pub struct Gate {
    config: Arc<DeploymentConfig>,
    wallet: Option<WalletAuthority>,
    access: Option<AccessVerifier>,
}

impl Gate {
    /// Build verifiers for every path the configuration enables.
    pub fn from_config(config: Arc<DeploymentConfig>) -> Self {
        let wallet = config.wallet.as_ref().map(WalletAuthority::new);
        let access = config.broker.as_ref().map(AccessVerifier::from_settings);
        Self {
            config,
            wallet,
            access,
        }
    }

    /// Replace the broker verifier, e.g. one backed by a fixed key set.
    pub fn with_access_verifier(mut self, verifier: AccessVerifier) -> Self {
        self.access = Some(verifier);
        self
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    pub fn wallet(&self) -> Option<&WalletAuthority> {
        self.wallet.as_ref()
    }

    pub fn access(&self) -> Option<&AccessVerifier> {
        self.access.as_ref()
    }

    /// Evaluate a request's headers.
    pub async fn evaluate(&self, headers: &HeaderMap) -> Decision {
        let mode = self.config.auth_mode();
        if mode == AuthMode::Bypass {
            return self.resolve(mode, None).await;
        }
        self.resolve(mode, extract_credential(headers)).await
    }

    /// Resolve an already-extracted credential.
    pub async fn resolve(&self, mode: AuthMode, credential: Option<Credential>) -> Decision {
        if mode == AuthMode::Bypass {
            return Decision::Bypassed(ResolvedIdentity::synthetic());
        }

        if !self.config.wallet_enabled() && !self.config.broker_enabled() {
            tracing::error!("Request rejected: no authentication method is configured");
            return Decision::NoMethodConfigured;
        }

        let Some(credential) = credential else {
            return Decision::CredentialMissing;
        };

        if let Some(wallet) = &self.wallet {
            if let Some(claims) = wallet.verify_token(&credential.token) {
                if claims.actor == wallet.owner() {
                    tracing::info!(actor = %claims.actor, "Authenticated via wallet session");
                    return Decision::WalletAuthenticated(ResolvedIdentity::for_wallet(
                        &claims.actor,
                    ));
                }
                tracing::warn!(
                    actor = %claims.actor,
                    "Wallet session for non-owner actor denied"
                );
            }
        }

        if credential.source == CredentialSource::Broker {
            if let Some(access) = &self.access {
                match access.verify(&credential.token).await {
                    Ok(identity) => {
                        tracing::info!(email = %identity.email, "Authenticated via Cloudflare Access");
                        return Decision::BrokerAuthenticated(identity);
                    }
                    Err(e) if e.is_key_retrieval() => {
                        tracing::error!(error = %e, error_code = e.error_code(), "Signing key retrieval failed");
                    }
                    Err(e) => {
                        tracing::info!(error_code = e.error_code(), "Access token rejected");
                    }
                }
            }
        }

        Decision::CredentialInvalid
    }
}
