// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use axum::extract::State;
use serde::Serialize;

use crate::envelope::ApiResponse;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub gateway: ComponentHealth,
    pub connectivity: String,
}

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub is_up: bool,
    pub message: String,
}

/// GET /api/v1/health
///
/// Always answers 200; a down gateway is reported in the payload.
pub async fn health(State(state): State<AppState>) -> ApiResponse {
    let gateway = match state.gateway.ping().await {
        Ok(()) => ComponentHealth {
            is_up: true,
            message: "gateway reachable".to_string(),
        },
        Err(e) => ComponentHealth {
            is_up: false,
            message: e.to_string(),
        },
    };

    ApiResponse::with_data(
        "Health check successful",
        HealthResponse {
            service: "lumi",
            version: env!("CARGO_PKG_VERSION"),
            gateway,
            connectivity: state.orchestrator.status(),
        },
    )
}
