//! Endpoint formatting for the ezpass API.
//!
//! Tokens and group ids are inserted verbatim; the remote service is the one
//! that decides whether they are valid.

pub fn user_url(base_url: &str, token: &str) -> String {
    format!("{base_url}/user?access_token={token}")
}

pub fn group_url(base_url: &str, token: &str, group_id: &str) -> String {
    format!("{base_url}/groups/{group_id}?access_token={token}")
}
