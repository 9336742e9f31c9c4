/*
 * Responsibility
 * - GET /me, GET /groups/{group_id}/me
 * - ezpass gate を通過した Pass をそのまま返す (access_token は返さない)
 */
use axum::Json;
use serde::Serialize;

use crate::api::v1::extractors::Authenticated;
use crate::services::ezpass::Pass;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct MeResponse {
    pub id: String,
    pub name: String,
    pub avatar_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

impl From<Pass> for MeResponse {
    fn from(pass: Pass) -> Self {
        Self {
            id: pass.user.id,
            name: pass.user.name,
            avatar_url: pass.user.avatar_url,
            nickname: pass.membership.map(|m| m.nickname),
        }
    }
}

pub async fn me(Authenticated(pass): Authenticated) -> Json<MeResponse> {
    Json(pass.into())
}
