// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet proof verification and session token issuance.
//!
//! ## Login Flow
//!
//! 1. Client asks for a challenge (nonce + timestamp)
//! 2. Wallet signs the canonical challenge text with `personal_sign` (EIP-191)
//! 3. Server recovers the signer, checks freshness, and mints a session token
//! 4. Client presents the token in the `wallet_session` cookie
//!
//! Session tokens are HS256 JWTs holding `{sub, iat, exp}`. Nothing is stored
//! server-side: a token stays valid until it expires.

use std::time::Duration;

use alloy::primitives::{Address, Signature};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::AuthError;
use crate::config::WalletSettings;

/// Accepted distance between the proof timestamp and now (5 minutes).
const PROOF_FRESHNESS_WINDOW: Duration = Duration::from_secs(300);

const NONCE_MIN_LEN: usize = 8;
const NONCE_MAX_LEN: usize = 128;

/// First line of every challenge the wallet is asked to sign.
pub const CHALLENGE_STATEMENT: &str = "Sign in to Edge Auth Gate with your wallet.";

/// Signed login proof submitted by a client wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletProof {
    /// Address that signed the challenge (0x-prefixed hex)
    pub actor: String,
    /// 65-byte `personal_sign` signature (hex)
    pub signature: String,
    /// Unix timestamp embedded in the challenge
    pub timestamp: i64,
    /// Challenge nonce
    pub nonce: String,
}

/// Decoded wallet session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(rename = "sub")]
    pub actor: String,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

/// A freshly minted session token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub claims: SessionClaims,
}

/// Reasons a wallet proof is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletProofError {
    #[error("actor is not a valid address")]
    InvalidActor,

    #[error("nonce has an unexpected shape")]
    InvalidNonce,

    #[error("proof timestamp is outside the freshness window")]
    Stale,

    #[error("signature is malformed")]
    MalformedSignature,

    #[error("signature was not produced by the actor")]
    SignerMismatch,
}

/// Canonical challenge text for a login attempt.
pub fn challenge_message(actor: &str, nonce: &str, timestamp: i64) -> String {
    format!("{CHALLENGE_STATEMENT}\n\nAddress: {actor}\nNonce: {nonce}\nIssued At: {timestamp}")
}

fn nonce_is_well_formed(nonce: &str) -> bool {
    (NONCE_MIN_LEN..=NONCE_MAX_LEN).contains(&nonce.len())
        && nonce
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Verifies wallet proofs and mints/validates session tokens for one owner.
#[derive(Clone)]
pub struct WalletAuthority {
    owner: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_ttl: Duration,
    proof_window: Duration,
}

impl WalletAuthority {
    pub fn new(settings: &WalletSettings) -> Self {
        Self {
            owner: settings.owner.clone(),
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            session_ttl: settings.session_ttl,
            proof_window: PROOF_FRESHNESS_WINDOW,
        }
    }

    /// Configured owner, exactly as configured.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Whether `address` is the configured owner (address comparison, so
    /// checksum casing does not matter).
    pub fn is_owner(&self, address: &Address) -> bool {
        self.owner
            .parse::<Address>()
            .map(|owner| &owner == address)
            .unwrap_or(false)
    }

    /// Verify a proof against the current time.
    pub fn verify_proof(&self, proof: &WalletProof) -> Result<Address, WalletProofError> {
        self.verify_proof_at(proof, chrono::Utc::now().timestamp())
    }

    /// Verify a proof, returning the recovered signer on success.
    pub fn verify_proof_at(&self, proof: &WalletProof, now: i64) -> Result<Address, WalletProofError> {
        let actor_text = proof.actor.trim();
        let actor: Address = actor_text
            .parse()
            .map_err(|_| WalletProofError::InvalidActor)?;

        if !nonce_is_well_formed(&proof.nonce) {
            return Err(WalletProofError::InvalidNonce);
        }

        if now.abs_diff(proof.timestamp) > self.proof_window.as_secs() {
            return Err(WalletProofError::Stale);
        }

        let bytes = alloy::hex::decode(proof.signature.trim())
            .map_err(|_| WalletProofError::MalformedSignature)?;
        let signature = Signature::try_from(bytes.as_slice())
            .map_err(|_| WalletProofError::MalformedSignature)?;

        let message = challenge_message(actor_text, &proof.nonce, proof.timestamp);
        let recovered = signature
            .recover_address_from_msg(message.as_bytes())
            .map_err(|_| WalletProofError::SignerMismatch)?;

        if recovered != actor {
            return Err(WalletProofError::SignerMismatch);
        }

        Ok(recovered)
    }

    /// Mint a session token for `actor`.
    pub fn issue_token(&self, actor: &str) -> Result<IssuedSession, AuthError> {
        self.issue_token_at(actor, chrono::Utc::now().timestamp())
    }

    /// Mint a session token as if issued at `issued_at`.
    pub fn issue_token_at(&self, actor: &str, issued_at: i64) -> Result<IssuedSession, AuthError> {
        let expires_at = i64::try_from(self.session_ttl.as_secs())
            .ok()
            .and_then(|ttl| issued_at.checked_add(ttl))
            .ok_or_else(|| AuthError::InternalError("Session lifetime overflows".to_string()))?;
        let claims = SessionClaims {
            actor: actor.to_string(),
            issued_at,
            expires_at,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(format!("Failed to sign session token: {e}")))?;
        Ok(IssuedSession { token, claims })
    }

    /// Check signature and expiry. Any failure yields `None`.
    pub fn verify_token(&self, token: &str) -> Option<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        match decode::<SessionClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error_code = AuthError::from(e).error_code(), "Wallet session token rejected");
                None
            }
        }
    }
}
