// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Admits requests through one of two independent trust paths.
//!
//! ## Broker Path (Cloudflare Access)
//!
//! 1. Cloudflare Access authenticates the user at the perimeter
//! 2. Requests carry `Cf-Access-Jwt-Assertion` or the `CF_Authorization` cookie
//! 3. The gate:
//!    - Fetches the team's signing keys via HTTPS (cached, indexed by `kid`)
//!    - Verifies JWT signature, expiry, issuer, audience
//!    - Extracts `email` and `name`
//!
//! ## Wallet Path
//!
//! 1. The owner signs a challenge with their wallet (`personal_sign`)
//! 2. `/auth/wallet/login` verifies the proof and mints a session token
//! 3. The token comes back in the `wallet_session` cookie and is checked
//!    for signature, expiry, and that its actor is the configured owner
//!
//! ## Security
//!
//! - No server-side sessions; tokens expire, nothing is revoked
//! - Denials expose only "unauthorized" or "service unavailable"
//! - Clock skew tolerance for broker tokens is 60 seconds

pub mod access;
pub mod claims;
pub mod credential;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod jwks;
pub mod middleware;
pub mod response;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use access::AccessVerifier;
pub use claims::ResolvedIdentity;
pub use credential::{extract_credential, Credential, CredentialSource};
pub use error::AuthError;
pub use extractor::Auth;
pub use gate::{Decision, Gate};
pub use jwks::{KeySource, SigningKeyCache};
pub use middleware::require_auth;
pub use response::{denial_response, ResponseShape};
pub use wallet::{SessionClaims, WalletAuthority, WalletProof, WalletProofError};
