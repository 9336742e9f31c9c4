/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /me, /groups/{group_id}/me は ezpass gate の内側 (route_layer)
 * - /health は gate の外
 */
use axum::{Json, Router, routing::get};
use serde_json::json;

use crate::api::v1::handlers::me::me;
use crate::middleware::auth::ezpass;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let gated = Router::new()
        .route("/me", get(me))
        .route("/groups/{group_id}/me", get(me));
    let gated = ezpass::apply(gated, state.auth.clone());

    Router::new()
        .route("/health", get(|| async { Json(json!({"status": "ok"})) }))
        .merge(gated)
}
