// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Denial responses for each terminal [`Decision`].
//!
//! The state machine decides *what* happened; this module decides how it is
//! presented to a structured (API) or rendered (page) caller. Bodies only
//! disclose the coarse outcome, never which claim failed.

use axum::{
    http::{
        header::{ACCEPT, LOCATION},
        HeaderMap, StatusCode,
    },
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use super::gate::Decision;
use crate::config::{
    DeploymentConfig, ACCESS_AUD_ENV, ACCESS_DOMAIN_ENV, WALLET_OWNER_ENV, WALLET_SECRET_ENV,
};

/// Representation the caller expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Machine clients: JSON bodies
    Structured,
    /// Browsers navigating to a page: HTML, redirects, login signals
    Rendered,
}

impl ResponseShape {
    /// Page requests advertise `text/html`; everything else is structured.
    pub fn negotiate(headers: &HeaderMap) -> Self {
        let wants_html = headers
            .get_all(ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.contains("text/html"));
        if wants_html {
            ResponseShape::Rendered
        } else {
            ResponseShape::Structured
        }
    }
}

/// JSON body for structured denials.
#[derive(Debug, Serialize, ToSchema)]
pub struct DenialBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Which method a denial should point the caller at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActiveMethod {
    Wallet,
    Broker,
}

fn active_method(config: &DeploymentConfig) -> Option<ActiveMethod> {
    if config.wallet_enabled() {
        Some(ActiveMethod::Wallet)
    } else if config.broker_enabled() {
        Some(ActiveMethod::Broker)
    } else {
        None
    }
}

/// Build the response for a denying decision; `None` when the decision admits.
pub fn denial_response(
    decision: &Decision,
    shape: ResponseShape,
    config: &DeploymentConfig,
) -> Option<Response> {
    let response = match decision {
        Decision::Bypassed(_)
        | Decision::WalletAuthenticated(_)
        | Decision::BrokerAuthenticated(_) => return None,
        Decision::NoMethodConfigured => not_configured(shape),
        Decision::CredentialMissing => credential_missing(shape, config),
        Decision::CredentialInvalid => credential_invalid(shape, config),
    };
    Some(response)
}

fn not_configured_hint() -> String {
    format!(
        "Configure wallet auth ({WALLET_OWNER_ENV} and {WALLET_SECRET_ENV}) \
         or Cloudflare Access ({ACCESS_DOMAIN_ENV} and {ACCESS_AUD_ENV})"
    )
}

fn not_configured(shape: ResponseShape) -> Response {
    let hint = not_configured_hint();
    match shape {
        ResponseShape::Structured => structured(
            StatusCode::SERVICE_UNAVAILABLE,
            "Authentication is not configured",
            Some(hint),
            None,
        ),
        ResponseShape::Rendered => (
            StatusCode::SERVICE_UNAVAILABLE,
            Html(format!(
                "<h1>Service unavailable</h1><p>Authentication is not configured.</p><p>{}</p>",
                escape_html(&hint)
            )),
        )
            .into_response(),
    }
}

fn credential_missing(shape: ResponseShape, config: &DeploymentConfig) -> Response {
    if let Some(response) = rendered_login(shape, config) {
        return response;
    }

    match shape {
        ResponseShape::Structured => structured(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            Some(missing_hint(active_method(config)).to_string()),
            None,
        ),
        ResponseShape::Rendered => (
            StatusCode::UNAUTHORIZED,
            Html("<h1>Unauthorized</h1>".to_string()),
        )
            .into_response(),
    }
}

fn credential_invalid(shape: ResponseShape, config: &DeploymentConfig) -> Response {
    if let Some(response) = rendered_login(shape, config) {
        return response;
    }

    let relogin = match (active_method(config), &config.broker) {
        (Some(ActiveMethod::Broker), Some(broker)) => Some(broker.login_url()),
        _ => None,
    };

    match shape {
        ResponseShape::Structured => structured(
            StatusCode::UNAUTHORIZED,
            "Invalid or expired session",
            Some("Sign in again to obtain a new session".to_string()),
            relogin.map(|url| format!("Re-authenticate at {url}")),
        ),
        ResponseShape::Rendered => {
            let link = relogin
                .map(|url| {
                    format!(
                        "<p><a href=\"{}\">Sign in again</a></p>",
                        escape_html(&url)
                    )
                })
                .unwrap_or_default();
            (
                StatusCode::UNAUTHORIZED,
                Html(format!(
                    "<h1>Session invalid</h1><p>Your session is invalid or has expired.</p>{link}"
                )),
            )
                .into_response()
        }
    }
}

/// Login prompts for rendered callers, shared by missing and invalid
/// credentials so the two cases look identical.
fn rendered_login(shape: ResponseShape, config: &DeploymentConfig) -> Option<Response> {
    if shape != ResponseShape::Rendered {
        return None;
    }
    if config.wallet_enabled() {
        return Some(wallet_login_required());
    }
    match &config.broker {
        Some(broker) if broker.redirect_to_login => Some(redirect(&broker.login_url())),
        _ => None,
    }
}

/// `{"_walletLoginRequired":true}` with 401, telling the page to render its
/// wallet login UI.
pub fn wallet_login_required() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "_walletLoginRequired": true })),
    )
        .into_response()
}

fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

fn missing_hint(method: Option<ActiveMethod>) -> &'static str {
    match method {
        Some(ActiveMethod::Wallet) => {
            "Sign in with the owner wallet to obtain a wallet_session cookie"
        }
        Some(ActiveMethod::Broker) => {
            "Provide a Cloudflare Access token in the Cf-Access-Jwt-Assertion header \
             or the CF_Authorization cookie"
        }
        None => "No authentication method is available",
    }
}

fn structured(
    status: StatusCode,
    error: &str,
    hint: Option<String>,
    details: Option<String>,
) -> Response {
    let body = Json(DenialBody {
        error: error.to_string(),
        hint,
        details,
    });
    (status, body).into_response()
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
