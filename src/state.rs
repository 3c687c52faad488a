// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::Gate;
use crate::config::DeploymentConfig;

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<Gate>,
}

impl AppState {
    pub fn new(config: DeploymentConfig) -> Self {
        Self::from_gate(Gate::from_config(Arc::new(config)))
    }

    pub fn from_gate(gate: Gate) -> Self {
        Self {
            gate: Arc::new(gate),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DeploymentConfig::default())
    }
}
