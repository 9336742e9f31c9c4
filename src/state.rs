/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - ex: auth: EzpassAuth
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use crate::middleware::auth::ezpass::EzpassAuth;

#[derive(Clone, Debug)]
pub struct AppState {
    pub auth: EzpassAuth,
}

impl AppState {
    pub fn new(auth: EzpassAuth) -> Self {
        Self { auth }
    }
}
