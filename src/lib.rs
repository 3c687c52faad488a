// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Edge Auth Gate - Dual-Path Request Authentication
//!
//! This crate admits requests to an edge-hosted service through either a
//! perimeter identity broker (Cloudflare Access) or a wallet-signed proof
//! exchanged for a stateless session token.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Credential extraction, verification, and the decision gate
//! - `config` - Deployment configuration from the environment

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
