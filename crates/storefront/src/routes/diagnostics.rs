//! Health checks and database diagnostics.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{instrument, warn};

use crate::db::ProductRepository;
use crate::models::ProductSummary;
use crate::state::AppState;

const SAMPLE_PRODUCTS: i64 = 2;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Success,
    Failed,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub timestamp: String,
    pub environment: String,
    pub database_configured: bool,
    pub database_url_prefix: String,
    pub connection_status: ConnectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_count: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sample_products: Vec<ProductSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_status: Option<ConnectionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DiagnosticsResponse {
    pub success: bool,
    pub diagnostics: Diagnostics,
}

/// Report database connectivity and a peek at the catalog.
///
/// Responds 500 with `success: false` when the database is unreachable.
#[instrument(skip_all)]
pub async fn database(State(state): State<AppState>) -> Response {
    let config = state.config();
    let mut diagnostics = Diagnostics {
        timestamp: Utc::now().to_rfc3339(),
        environment: config.environment.clone(),
        database_configured: true,
        database_url_prefix: config.database_url_prefix(),
        connection_status: ConnectionStatus::Success,
        connection_message: None,
        connection_error: None,
        product_count: None,
        sample_products: Vec::new(),
        query_status: None,
        query_error: None,
    };

    if let Err(e) = sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        warn!(error = %e, "Database diagnostics: connection failed");
        diagnostics.connection_status = ConnectionStatus::Failed;
        diagnostics.connection_error = Some(e.to_string());
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(DiagnosticsResponse {
                success: false,
                diagnostics,
            }),
        )
            .into_response();
    }
    diagnostics.connection_message = Some("Database connection successful".to_string());

    let products = ProductRepository::new(state.pool());
    match products.count().await {
        Ok(count) => {
            diagnostics.product_count = Some(count);
            match products.sample(SAMPLE_PRODUCTS).await {
                Ok(sample) => {
                    diagnostics.sample_products = sample;
                    diagnostics.query_status = Some(ConnectionStatus::Success);
                }
                Err(e) => {
                    diagnostics.query_status = Some(ConnectionStatus::Failed);
                    diagnostics.query_error = Some(e.to_string());
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "Database diagnostics: product query failed");
            diagnostics.query_status = Some(ConnectionStatus::Failed);
            diagnostics.query_error = Some(e.to_string());
        }
    }

    Json(DiagnosticsResponse {
        success: true,
        diagnostics,
    })
    .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(serde_json::to_value(ConnectionStatus::Success).unwrap(), "SUCCESS");
        assert_eq!(serde_json::to_value(ConnectionStatus::Failed).unwrap(), "FAILED");
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(health().await, "ok");
    }
}
