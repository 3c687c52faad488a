// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer credential extraction.
//!
//! Sources are checked in a fixed order and the first hit wins:
//!
//! 1. `Cf-Access-Jwt-Assertion` header
//! 2. `CF_Authorization` cookie
//! 3. `Authorization: Bearer <token>` header
//! 4. `wallet_session` cookie

use axum::http::{
    header::{AUTHORIZATION, COOKIE},
    HeaderMap,
};

/// Header set by the perimeter broker in front of the service.
pub const BROKER_ASSERTION_HEADER: &str = "cf-access-jwt-assertion";
/// Cookie set by the perimeter broker after login.
pub const BROKER_COOKIE: &str = "CF_Authorization";
/// Cookie holding a wallet-issued session token.
pub const WALLET_SESSION_COOKIE: &str = "wallet_session";

/// Where a credential was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Broker,
    Wallet,
}

/// A bearer value pulled from a request, tagged with its origin.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub source: CredentialSource,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

impl Credential {
    fn new(token: &str, source: CredentialSource) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        Some(Self {
            token: token.to_string(),
            source,
        })
    }
}

/// Extract at most one credential from request headers.
pub fn extract_credential(headers: &HeaderMap) -> Option<Credential> {
    let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let cookie_line = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");

    extract_from(
        header_str(BROKER_ASSERTION_HEADER),
        header_str(AUTHORIZATION.as_str()),
        Some(cookie_line.as_str()).filter(|line| !line.is_empty()),
    )
}

/// Extract a credential from raw header values.
pub fn extract_from(
    broker_assertion: Option<&str>,
    authorization: Option<&str>,
    cookie_line: Option<&str>,
) -> Option<Credential> {
    if let Some(credential) =
        broker_assertion.and_then(|v| Credential::new(v, CredentialSource::Broker))
    {
        return Some(credential);
    }

    if let Some(credential) = cookie_line
        .and_then(|line| cookie_value(line, BROKER_COOKIE))
        .and_then(|v| Credential::new(v, CredentialSource::Broker))
    {
        return Some(credential);
    }

    if let Some(credential) = authorization
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|v| Credential::new(v, CredentialSource::Broker))
    {
        return Some(credential);
    }

    cookie_line
        .and_then(|line| cookie_value(line, WALLET_SESSION_COOKIE))
        .and_then(|v| Credential::new(v, CredentialSource::Wallet))
}

/// Find a cookie by exact name in a `;`-delimited cookie line.
///
/// Empty values are skipped so a later duplicate can still match.
pub fn cookie_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    line.split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, value)| key.trim() == name && !value.trim().is_empty())
        .map(|(_, value)| value.trim())
}
