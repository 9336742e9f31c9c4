use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::LookupError;
use crate::services::ezpass::Pass;

/// Handler で、ezpass の Pass を受け取るための extractor
/// middleware が Pass を request.extensions() に insert 済みである前提
/// 見つからない場合は 401 を返す（ミドルウェア未設定）
#[derive(Debug, Clone)]
pub struct Authenticated(pub Pass);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = LookupError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Pass>()
            .cloned()
            .map(Authenticated)
            .ok_or(LookupError::Unauthorized)
    }
}
