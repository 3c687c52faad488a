// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet login and session endpoints.

use alloy::primitives::Address;
use axum::{
    extract::{Query, State},
    http::{header::SET_COOKIE, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{
    credential::WALLET_SESSION_COOKIE, wallet::challenge_message, Auth, ResolvedIdentity,
    WalletAuthority, WalletProof,
};
use crate::error::ApiError;
use crate::state::AppState;

/// Query for GET /auth/wallet/challenge
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChallengeQuery {
    /// Address that will sign the challenge
    pub address: String,
}

/// Challenge the wallet must sign with `personal_sign`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChallengeResponse {
    pub nonce: String,
    pub timestamp: i64,
    /// Exact text to sign
    pub message: String,
}

/// Response for POST /auth/wallet/login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Session token (also set as the `wallet_session` cookie)
    pub token: String,
    /// Unix timestamp after which the token is rejected
    pub expires_at: i64,
}

fn wallet_authority(state: &AppState) -> Result<&WalletAuthority, ApiError> {
    state
        .gate
        .wallet()
        .ok_or_else(|| ApiError::service_unavailable("Wallet authentication is not configured"))
}

fn session_cookie(token: &str, max_age_secs: u64) -> String {
    format!(
        "{WALLET_SESSION_COOKIE}={token}; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age={max_age_secs}"
    )
}

/// Issue a login challenge.
///
/// Nothing is stored; the proof's timestamp bounds how long it can be used.
#[utoipa::path(
    get,
    path = "/auth/wallet/challenge",
    tag = "Session",
    params(ChallengeQuery),
    responses(
        (status = 200, description = "Challenge to sign", body = ChallengeResponse),
        (status = 400, description = "Address is invalid"),
        (status = 503, description = "Wallet authentication is not configured"),
    )
)]
pub async fn challenge(
    State(state): State<AppState>,
    Query(query): Query<ChallengeQuery>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    wallet_authority(&state)?;

    let address = query.address.trim();
    address
        .parse::<Address>()
        .map_err(|_| ApiError::bad_request("Invalid wallet address"))?;

    let nonce = Uuid::new_v4().simple().to_string();
    let timestamp = chrono::Utc::now().timestamp();
    let message = challenge_message(address, &nonce, timestamp);

    Ok(Json(ChallengeResponse {
        nonce,
        timestamp,
        message,
    }))
}

/// Exchange a signed wallet proof for a session token.
#[utoipa::path(
    post,
    path = "/auth/wallet/login",
    tag = "Session",
    request_body = WalletProof,
    responses(
        (status = 200, description = "Session issued", body = LoginResponse),
        (status = 401, description = "Proof is invalid or stale"),
        (status = 403, description = "Wallet is not authorized"),
        (status = 503, description = "Wallet authentication is not configured"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(proof): Json<WalletProof>,
) -> Result<impl IntoResponse, ApiError> {
    let wallet = wallet_authority(&state)?;

    let signer = wallet.verify_proof(&proof).map_err(|e| {
        tracing::warn!(error = %e, actor = %proof.actor, "Wallet proof rejected");
        ApiError::unauthorized("Invalid wallet proof")
    })?;

    if !wallet.is_owner(&signer) {
        tracing::warn!(actor = %signer, "Wallet login attempted by non-owner");
        return Err(ApiError::forbidden("Wallet is not authorized"));
    }

    // Tokens carry the owner string exactly as configured so the gate can
    // compare it verbatim.
    let issued = wallet.issue_token(wallet.owner()).map_err(|e| {
        tracing::error!(error = %e, "Failed to issue wallet session");
        ApiError::internal("Failed to issue session")
    })?;

    tracing::info!(actor = %issued.claims.actor, expires_at = issued.claims.expires_at, "Wallet session issued");

    let cookie = session_cookie(&issued.token, wallet.session_ttl().as_secs());
    Ok((
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            token: issued.token,
            expires_at: issued.claims.expires_at,
        }),
    ))
}

/// Clear the wallet session cookie.
///
/// Tokens are stateless, so one that was copied elsewhere stays valid until
/// it expires.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Session",
    responses(
        (status = 204, description = "Cookie cleared"),
    )
)]
pub async fn logout() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, [(SET_COOKIE, session_cookie("", 0))])
}

/// Get the identity the gate resolved for this request.
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Session",
    responses(
        (status = 200, description = "Resolved identity", body = ResolvedIdentity),
        (status = 401, description = "Unauthorized - invalid or missing credential"),
        (status = 503, description = "No authentication method configured"),
    )
)]
pub async fn me(Auth(identity): Auth) -> Json<ResolvedIdentity> {
    Json(identity)
}
