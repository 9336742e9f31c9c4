/*
 * Responsibility
 * - inbound request から token / group_id を取り出す
 * - token の優先順位: X-Access-Token header → `token` → `access_token`
 * - group_id の取り出し方は GroupIdResolver として差し替え可能にする
 *
 * Notes
 * - form value は「body (urlencoded) → query」の順で最初の値を使う
 * - 見つからない token は空文字。拒否するのは remote 側
 */
use std::{fmt, sync::Arc};

use axum::http::{HeaderMap, Method, Request, header};

pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Ordered form/query pairs of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormParams {
    pairs: Vec<(String, String)>,
}

impl FormParams {
    pub fn from_query(query: Option<&str>) -> Self {
        Self::from_body_and_query(&[], query)
    }

    /// Body pairs come first so they win over query pairs with the same key.
    pub fn from_body_and_query(body: &[u8], query: Option<&str>) -> Self {
        let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(body)
            .into_owned()
            .collect();
        if let Some(query) = query {
            pairs.extend(url::form_urlencoded::parse(query.as_bytes()).into_owned());
        }
        Self { pairs }
    }

    /// First value for `name`, which may be empty.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }
}

/// Whether the body of a request with this method and headers should be
/// parsed as form values.
pub fn has_form_body(method: &Method, headers: &HeaderMap) -> bool {
    let body_method = matches!(*method, Method::POST | Method::PUT | Method::PATCH);
    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE));
    body_method && is_form
}

/// Read-only view of the parts of a request that credentials come from.
#[derive(Debug, Clone, Copy)]
pub struct Inbound<'a> {
    pub headers: &'a HeaderMap,
    pub params: &'a FormParams,
    pub path_params: &'a [(String, String)],
}

impl Inbound<'_> {
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

pub fn token_from(headers: &HeaderMap, params: &FormParams) -> String {
    let header_token = headers
        .get(ACCESS_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    header_token
        .or_else(|| params.non_empty("token"))
        .or_else(|| params.non_empty("access_token"))
        .unwrap_or_default()
        .to_string()
}

/// Token from the header or the query string. Returns `""` when absent.
///
/// Body form values are only visible to the middleware, which buffers the
/// body before looking.
pub fn extract_token<B>(req: &Request<B>) -> String {
    let params = FormParams::from_query(req.uri().query());
    token_from(req.headers(), &params)
}

type ResolveFn = dyn Fn(&Inbound<'_>) -> Option<String> + Send + Sync;

/// Strategy for finding the group a request is scoped to.
///
/// Routers disagree on how a group id reaches a handler, so the middleware
/// takes this as a parameter. [`GroupIdResolver::default`] covers the
/// common shapes.
#[derive(Clone)]
pub struct GroupIdResolver(Arc<ResolveFn>);

impl GroupIdResolver {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Inbound<'_>) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Never scopes to a group; every request becomes a user lookup.
    pub fn none() -> Self {
        Self::new(|_| None)
    }

    /// Empty ids count as absent.
    pub fn resolve(&self, inbound: &Inbound<'_>) -> Option<String> {
        (self.0)(inbound).filter(|id| !id.is_empty())
    }
}

impl Default for GroupIdResolver {
    fn default() -> Self {
        Self::new(default_group_id)
    }
}

impl fmt::Debug for GroupIdResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupIdResolver").finish_non_exhaustive()
    }
}

/// `group_id` form/query value, then pat-style `:group_id`, then an axum
/// `{group_id}` path capture. First non-empty wins.
pub fn default_group_id(inbound: &Inbound<'_>) -> Option<String> {
    inbound
        .params
        .non_empty("group_id")
        .or_else(|| inbound.params.non_empty(":group_id"))
        .or_else(|| inbound.path_param("group_id").filter(|v| !v.is_empty()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::HeaderValue;

    use super::*;

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    // ── token precedence ─────────────────────────────────────────────

    #[test]
    fn test_token_from_query_token() {
        assert_eq!(extract_token(&get("http://example.com?token=foo")), "foo");
    }

    #[test]
    fn test_token_from_query_access_token() {
        assert_eq!(
            extract_token(&get("http://example.com?access_token=foo")),
            "foo"
        );
    }

    #[test]
    fn test_token_from_header() {
        let req = Request::builder()
            .uri("http://example.com")
            .header("X-Access-Token", "foo")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&req), "foo");
    }

    #[test]
    fn test_no_token_is_empty() {
        assert_eq!(extract_token(&get("http://example.com")), "");
        assert_eq!(extract_token(&get("/?other=1")), "");
    }

    #[test]
    fn test_header_beats_query() {
        let mut req = get("/?token=query&access_token=other");
        req.headers_mut()
            .insert(ACCESS_TOKEN_HEADER, HeaderValue::from_static("header"));
        assert_eq!(extract_token(&req), "header");
    }

    #[test]
    fn test_token_beats_access_token() {
        assert_eq!(extract_token(&get("/?access_token=b&token=a")), "a");
    }

    #[test]
    fn test_empty_values_fall_through() {
        let mut req = get("/?token=&access_token=fallback");
        req.headers_mut()
            .insert(ACCESS_TOKEN_HEADER, HeaderValue::from_static(""));
        assert_eq!(extract_token(&req), "fallback");
    }

    #[test]
    fn test_percent_encoded_token_is_decoded() {
        assert_eq!(extract_token(&get("/?token=a%2Bb")), "a+b");
    }

    #[test]
    fn test_body_beats_query() {
        let params = FormParams::from_body_and_query(b"token=body", Some("token=query"));
        assert_eq!(token_from(&HeaderMap::new(), &params), "body");
    }

    // ── form body detection ──────────────────────────────────────────

    #[test]
    fn test_has_form_body() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded; charset=utf-8"),
        );
        assert!(has_form_body(&Method::POST, &headers));
        assert!(has_form_body(&Method::PATCH, &headers));
        assert!(!has_form_body(&Method::GET, &headers));

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        assert!(!has_form_body(&Method::POST, &headers));
        assert!(!has_form_body(&Method::POST, &HeaderMap::new()));
    }

    // ── group id ─────────────────────────────────────────────────────

    fn resolve(query: &str, path_params: &[(String, String)]) -> Option<String> {
        let headers = HeaderMap::new();
        let params = FormParams::from_query(Some(query));
        let inbound = Inbound {
            headers: &headers,
            params: &params,
            path_params,
        };
        GroupIdResolver::default().resolve(&inbound)
    }

    #[test]
    fn test_group_id_from_query() {
        assert_eq!(resolve("group_id=1", &[]).as_deref(), Some("1"));
    }

    #[test]
    fn test_group_id_from_pat_style_param() {
        assert_eq!(resolve(":group_id=1", &[]).as_deref(), Some("1"));
    }

    #[test]
    fn test_group_id_from_path_capture() {
        let path = [("group_id".to_string(), "7".to_string())];
        assert_eq!(resolve("", &path).as_deref(), Some("7"));
    }

    #[test]
    fn test_group_id_first_non_empty_wins() {
        let path = [("group_id".to_string(), "7".to_string())];
        assert_eq!(resolve("group_id=&:group_id=3", &path).as_deref(), Some("3"));
        assert_eq!(resolve("group_id=2&:group_id=3", &path).as_deref(), Some("2"));
    }

    #[test]
    fn test_group_id_absent() {
        assert_eq!(resolve("token=200", &[]), None);
        assert_eq!(resolve("group_id=", &[]), None);
    }

    #[test]
    fn test_custom_resolver() {
        let headers = HeaderMap::new();
        let params = FormParams::from_query(Some("group_id=1"));
        let inbound = Inbound {
            headers: &headers,
            params: &params,
            path_params: &[],
        };

        assert_eq!(GroupIdResolver::none().resolve(&inbound), None);

        let fixed = GroupIdResolver::new(|_| Some("99".to_string()));
        assert_eq!(fixed.resolve(&inbound).as_deref(), Some("99"));

        let empty = GroupIdResolver::new(|_| Some(String::new()));
        assert_eq!(empty.resolve(&inbound), None);
    }
}
