// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{require_auth, response::DenialBody, ResolvedIdentity, WalletProof},
    state::AppState,
};

pub mod health;
pub mod session;

/// Put `routes` behind the authentication gate.
///
/// Downstream tools mount their routers through this so every handler can
/// rely on the `Auth` extractor.
pub fn protect(routes: Router<AppState>, state: &AppState) -> Router<AppState> {
    routes.route_layer(axum::middleware::from_fn_with_state(
        state.clone(),
        require_auth,
    ))
}

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/auth/wallet/challenge", get(session::challenge))
        .route("/auth/wallet/login", post(session::login))
        .route("/auth/logout", post(session::logout));

    let protected = protect(Router::new().route("/auth/me", get(session::me)), &state);

    Router::new()
        .merge(public)
        .merge(protected)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        session::challenge,
        session::login,
        session::logout,
        session::me
    ),
    components(
        schemas(
            ResolvedIdentity,
            WalletProof,
            DenialBody,
            session::ChallengeResponse,
            session::LoginResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Session", description = "Wallet login and resolved identity")
    )
)]
struct ApiDoc;
