// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Apply to a router subtree with:
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/auth/me", get(me))
//!     .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth));
//! ```
//!
//! On success the [`ResolvedIdentity`](super::ResolvedIdentity) is inserted
//! into request extensions and the raw token goes no further.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::response::{denial_response, ResponseShape};
use crate::state::AppState;

/// Authentication middleware function.
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let decision = state.gate.evaluate(request.headers()).await;
    let shape = ResponseShape::negotiate(request.headers());

    if let Some(denial) = denial_response(&decision, shape, state.gate.config()) {
        tracing::debug!(
            decision = decision.label(),
            path = %request.uri().path(),
            "Request denied"
        );
        return denial;
    }

    if let Some(identity) = decision.into_identity() {
        request.extensions_mut().insert(identity);
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Auth, ResolvedIdentity};
    use crate::config::{DeploymentConfig, WalletSettings};
    use axum::{
        body::{to_bytes, Body},
        http::{header::COOKIE, Request as HttpRequest, StatusCode},
        routing::get,
        Json, Router,
    };
    use std::time::Duration;
    use tower::ServiceExt;

    const OWNER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    async fn whoami(Auth(identity): Auth) -> Json<ResolvedIdentity> {
        Json(identity)
    }

    fn app(config: DeploymentConfig) -> (Router, AppState) {
        let state = AppState::new(config);
        let router = Router::new()
            .route("/whoami", get(whoami))
            .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth))
            .with_state(state.clone());
        (router, state)
    }

    fn wallet_config() -> DeploymentConfig {
        DeploymentConfig {
            wallet: Some(WalletSettings {
                owner: OWNER.to_string(),
                secret: "middleware-secret".to_string(),
                session_ttl: Duration::from_secs(600),
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn admitted_request_sees_identity() {
        let (router, state) = app(wallet_config());
        let token = state.gate.wallet().unwrap().issue_token(OWNER).unwrap().token;

        let response = router
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header(COOKIE, format!("wallet_session={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let identity: ResolvedIdentity = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(identity, ResolvedIdentity::for_wallet(OWNER));
    }

    #[tokio::test]
    async fn denied_request_never_reaches_handler() {
        let (router, _) = app(wallet_config());
        let response = router
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header("accept", "application/json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn dev_bypass_admits_everything() {
        let (router, _) = app(DeploymentConfig {
            dev_bypass: true,
            ..Default::default()
        });
        let response = router
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header("authorization", "Bearer whatever")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let identity: ResolvedIdentity = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(identity, ResolvedIdentity::synthetic());
    }

    #[tokio::test]
    async fn unconfigured_deployment_returns_503() {
        let (router, _) = app(DeploymentConfig::default());
        let response = router
            .oneshot(HttpRequest::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
