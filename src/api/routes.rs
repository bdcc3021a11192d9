//! API route definitions.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::api::state::AppState;
use crate::scheduler::Snapshot;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/snapshot", get(snapshot))
        .route("/reading", get(reading))
        .route("/risk", get(risk))
        .route("/notifications", get(notifications))
        .route("/history", get(history))
}

fn envelope(snap: &Snapshot, data: Value) -> Json<Value> {
    Json(json!({
        "data": data,
        "meta": {
            "sequence": snap.sequence,
            "generated_at": snap.generated_at.to_rfc3339(),
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let snap = state.view.snapshot();
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "machine_status": snap.risk.status,
        },
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "sequence": snap.sequence,
        }
    }))
}

async fn snapshot(State(state): State<AppState>) -> Json<Value> {
    let snap = state.view.snapshot();
    envelope(&snap, json!(&*snap))
}

async fn reading(State(state): State<AppState>) -> Json<Value> {
    let snap = state.view.snapshot();
    envelope(&snap, json!(snap.reading))
}

async fn risk(State(state): State<AppState>) -> Json<Value> {
    let snap = state.view.snapshot();
    envelope(&snap, json!(snap.risk))
}

async fn notifications(State(state): State<AppState>) -> Json<Value> {
    let snap = state.view.snapshot();
    Json(json!({
        "data": snap.notifications,
        "meta": {
            "total": snap.notifications.len(),
            "sequence": snap.sequence,
            "generated_at": snap.generated_at.to_rfc3339(),
        }
    }))
}

async fn history(State(state): State<AppState>) -> Json<Value> {
    let points = state.view.history();
    Json(json!({
        "meta": {
            "total": points.len(),
            "sequence": points.last().map(|p| p.sequence),
        },
        "data": points,
    }))
}
