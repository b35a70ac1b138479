//! Health check route
//!
//! | Path | Method | Description | Auth |
//! |------|------|------|------|
//! | /health | GET | Health check (includes database ping) | None |

use axum::{Json, Router, extract::State, routing::get};

use crate::core::ServerState;

/// Health router - public route (no authentication)
pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health_check))
}

pub async fn health_check(State(state): State<ServerState>) -> Json<serde_json::Value> {
    let database = match sqlx::query("SELECT 1").execute(&state.db.pool).await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Health check database ping failed");
            "error"
        }
    };

    Json(serde_json::json!({
        "status": if database == "ok" { "ok" } else { "degraded" },
        "service": "stock-server",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
    }))
}
