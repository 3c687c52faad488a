// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Broker JWT claims and the resolved identity handed to downstream code.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims extracted from a Cloudflare Access JWT.
///
/// `exp`, `iss` and `aud` are checked by `jsonwebtoken` during decoding.
/// Fields must exist for serde JWT deserialization even though only the
/// identity fields are read afterwards.
#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct AccessClaims {
    /// User email (identity claim for user-facing applications)
    #[serde(default)]
    pub email: Option<String>,

    /// Display name, when the identity provider forwards one
    #[serde(default)]
    pub name: Option<String>,

    /// Subject (Access user ID)
    #[serde(default)]
    pub sub: Option<String>,

    /// Issuer (the team domain URL)
    pub iss: String,

    /// Expiration timestamp
    pub exp: i64,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: Option<i64>,

    /// Service tokens carry a common name instead of an email
    #[serde(default)]
    pub common_name: Option<String>,
}

/// Identity attached to a request once the gate admits it.
///
/// Lives only in request extensions; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResolvedIdentity {
    pub email: String,
    pub name: String,
}

impl ResolvedIdentity {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }

    /// Fixed identity used when verification is bypassed.
    pub fn synthetic() -> Self {
        Self::new("dev@localhost", "Developer")
    }

    /// Identity for the wallet owner. Wallets have no email, so the address
    /// stands in for both fields.
    pub fn for_wallet(actor: &str) -> Self {
        Self::new(format!("{actor}@wallet"), actor)
    }

    /// Build from verified broker claims. Service tokens fall back to their
    /// common name; a missing display name falls back to the email.
    pub fn from_access_claims(claims: AccessClaims) -> Option<Self> {
        let email = claims.email.or(claims.common_name)?;
        let name = claims.name.unwrap_or_else(|| email.clone());
        Some(Self { email, name })
    }
}
