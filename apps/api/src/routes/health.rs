use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::config::StrategyKind;
use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and active strategy.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "resume-api",
        "strategy": state.strategy.name(),
        "model": (state.config.strategy == StrategyKind::Llm).then(|| state.config.llm_model.clone())
    }))
}
