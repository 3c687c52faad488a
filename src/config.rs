// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Deployment Configuration
//!
//! This module defines environment variable names and the process-wide
//! [`DeploymentConfig`]. Configuration is loaded from the environment once
//! at startup and is read-only afterwards.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `AUTH_DEV_BYPASS` | Skip verification (development only) | `false` |
//! | `AUTH_E2E_BYPASS` | Skip verification (end-to-end tests only) | `false` |
//! | `WALLET_OWNER_ADDRESS` | Only address allowed through the wallet path | Required for wallet auth |
//! | `WALLET_SESSION_SECRET` | HS256 secret for wallet session tokens | Required for wallet auth |
//! | `WALLET_SESSION_TTL_SECS` | Wallet session lifetime | `86400` |
//! | `ACCESS_TEAM_DOMAIN` | Cloudflare Access team domain (token issuer) | Required for broker auth |
//! | `ACCESS_AUD` | Cloudflare Access application audience tag | Required for broker auth |
//! | `ACCESS_LOGIN_REDIRECT` | Redirect page requests to the Access login | `false` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::time::Duration;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DEV_BYPASS_ENV: &str = "AUTH_DEV_BYPASS";
pub const E2E_BYPASS_ENV: &str = "AUTH_E2E_BYPASS";
pub const WALLET_OWNER_ENV: &str = "WALLET_OWNER_ADDRESS";
pub const WALLET_SECRET_ENV: &str = "WALLET_SESSION_SECRET";
pub const WALLET_TTL_ENV: &str = "WALLET_SESSION_TTL_SECS";
pub const ACCESS_DOMAIN_ENV: &str = "ACCESS_TEAM_DOMAIN";
pub const ACCESS_AUD_ENV: &str = "ACCESS_AUD";
pub const ACCESS_REDIRECT_ENV: &str = "ACCESS_LOGIN_REDIRECT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default wallet session lifetime (24 hours).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(86_400);
/// Longest accepted wallet session lifetime (one year).
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(365 * 86_400);

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Errors raised while reading the environment at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{name} must not be zero")]
    ZeroDuration { name: &'static str },

    #[error("{name} must be at most {max}")]
    OutOfRange { name: &'static str, max: u64 },
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match get(PORT_ENV) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber {
                name: PORT_ENV,
                value: raw.clone(),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
        })
    }

    /// `host:port` string for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Wallet path settings. Both fields are required for the path to be enabled.
#[derive(Debug, Clone)]
pub struct WalletSettings {
    /// Owner address exactly as configured; session tokens carry this string.
    pub owner: String,
    pub secret: String,
    pub session_ttl: Duration,
}

/// Broker (Cloudflare Access) path settings.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    /// Team domain without scheme, e.g. `acme.cloudflareaccess.com`.
    pub team_domain: String,
    pub audience: String,
    /// Send page requests without a usable token to the hosted login.
    pub redirect_to_login: bool,
}

impl BrokerSettings {
    /// Expected `iss` claim.
    pub fn issuer(&self) -> String {
        format!("https://{}", self.team_domain)
    }

    /// Published signing keys for the team.
    pub fn certs_url(&self) -> String {
        format!("https://{}/cdn-cgi/access/certs", self.team_domain)
    }

    /// Hosted login page that page requests are redirected to.
    pub fn login_url(&self) -> String {
        match url::Url::parse(&self.issuer()) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}/", self.issuer()),
        }
    }
}

/// Process-wide deployment configuration.
#[derive(Debug, Clone, Default)]
pub struct DeploymentConfig {
    pub dev_bypass: bool,
    pub e2e_bypass: bool,
    pub wallet: Option<WalletSettings>,
    pub broker: Option<BrokerSettings>,
}

/// Whether verification runs for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Development or end-to-end test execution; no verification.
    Bypass,
    Enforce,
}

impl DeploymentConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let flag = |name: &str| get(name).map(|v| parse_flag(&v)).unwrap_or(false);

        let session_ttl = match get(WALLET_TTL_ENV) {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidNumber {
                    name: WALLET_TTL_ENV,
                    value: raw.clone(),
                })?;
                if secs == 0 {
                    return Err(ConfigError::ZeroDuration {
                        name: WALLET_TTL_ENV,
                    });
                }
                if secs > MAX_SESSION_TTL.as_secs() {
                    return Err(ConfigError::OutOfRange {
                        name: WALLET_TTL_ENV,
                        max: MAX_SESSION_TTL.as_secs(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_SESSION_TTL,
        };

        let wallet = match (get(WALLET_OWNER_ENV), get(WALLET_SECRET_ENV)) {
            (Some(owner), Some(secret)) => Some(WalletSettings {
                owner,
                secret,
                session_ttl,
            }),
            _ => None,
        };

        let broker = match (get(ACCESS_DOMAIN_ENV), get(ACCESS_AUD_ENV)) {
            (Some(domain), Some(audience)) => Some(BrokerSettings {
                team_domain: normalize_domain(&domain),
                audience,
                redirect_to_login: flag(ACCESS_REDIRECT_ENV),
            }),
            _ => None,
        };

        Ok(Self {
            dev_bypass: flag(DEV_BYPASS_ENV),
            e2e_bypass: flag(E2E_BYPASS_ENV),
            wallet,
            broker,
        })
    }

    /// Resolve the bypass flags into a single mode.
    pub fn auth_mode(&self) -> AuthMode {
        if self.dev_bypass || self.e2e_bypass {
            AuthMode::Bypass
        } else {
            AuthMode::Enforce
        }
    }

    pub fn wallet_enabled(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn broker_enabled(&self) -> bool {
        self.broker.is_some()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Strip any scheme and trailing slash so the domain can be templated.
fn normalize_domain(raw: &str) -> String {
    let without_scheme = raw
        .strip_prefix("https://")
        .or_else(|| raw.strip_prefix("http://"))
        .unwrap_or(raw);
    without_scheme.trim_end_matches('/').to_string()
}
