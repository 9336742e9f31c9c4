/*
 * Responsibility
 * - ezpass の 200 レスポンス body を表す型 (Pass / User / Membership)
 * - 欠けたフィールドは空文字として受ける (lenient decode)
 * - access_token は Debug 出力に出さない
 */
use std::fmt;

use serde::{Deserialize, Serialize};

/// Result of a successful lookup.
///
/// `membership` is only populated by a group lookup whose response carried
/// membership data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pass {
    #[serde(default)]
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub membership: Option<Membership>,
}

impl Pass {
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Nickname in the looked-up group, empty when this is a plain user pass.
    pub fn nickname(&self) -> &str {
        self.membership
            .as_ref()
            .map(|m| m.nickname.as_str())
            .unwrap_or_default()
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub name: String,
    pub avatar_url: String,
    pub access_token: String,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("avatar_url", &self.avatar_url)
            .field("access_token", &"[redacted]")
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Membership {
    pub nickname: String,
}
