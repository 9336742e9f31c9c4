//! ezpass check → Pass を handler に渡す
//!
//! Two shapes of the same gate:
//!
//! - [`apply`]: router-wide. The [`Pass`] goes into request
//!   extensions and handlers read it with
//!   [`Authenticated`](crate::api::v1::extractors::Authenticated).
//! - [`auth_handler`]: wraps a single `(Request, Pass) -> response` function
//!   into an ordinary axum handler.
//!
//! Either way a request costs exactly one lookup, and the inner handler only
//! runs when that lookup succeeded. Failures are answered with
//! `{"meta":{"error":"..."}}` and the status of the error kind.

use std::{future::Future, pin::Pin, sync::Arc};

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{FromRequestParts, RawPathParams, State},
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};

use crate::error::LookupError;
use crate::middleware::auth::credentials::{
    FormParams, GroupIdResolver, Inbound, has_form_body, token_from,
};
use crate::services::ezpass::{Authenticator, Pass};

/// Largest urlencoded body buffered while looking for a form token. Past
/// this the body is ignored and the token comes from header or query.
const FORM_BODY_LIMIT: usize = 1024 * 1024;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Shared configuration of the gate: who answers lookups, and how the group
/// id is found. Cheap to clone.
#[derive(Clone)]
pub struct EzpassAuth {
    authenticator: Arc<dyn Authenticator>,
    group_id: GroupIdResolver,
}

impl EzpassAuth {
    pub fn new(authenticator: impl Authenticator) -> Self {
        Self::from_arc(Arc::new(authenticator))
    }

    pub fn from_arc(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            group_id: GroupIdResolver::default(),
        }
    }

    pub fn with_group_id(mut self, resolver: GroupIdResolver) -> Self {
        self.group_id = resolver;
        self
    }

    /// Group lookup when the request names a group, user lookup otherwise.
    pub async fn check(&self, inbound: &Inbound<'_>) -> Result<Pass, LookupError> {
        let token = token_from(inbound.headers, inbound.params);

        let outcome = match self.group_id.resolve(inbound) {
            Some(group_id) => {
                let outcome = self
                    .authenticator
                    .lookup_membership(&token, &group_id)
                    .await;
                if let Err(err) = &outcome {
                    tracing::warn!(%group_id, kind = ?err.kind(), error = ?err, "ezpass membership check failed");
                }
                outcome
            }
            None => {
                let outcome = self.authenticator.lookup_user(&token).await;
                if let Err(err) = &outcome {
                    tracing::warn!(kind = ?err.kind(), error = ?err, "ezpass user check failed");
                }
                outcome
            }
        };

        if let Ok(pass) = &outcome {
            tracing::debug!(user_id = %pass.user.id, "ezpass check passed");
        }
        outcome
    }
}

impl std::fmt::Debug for EzpassAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EzpassAuth")
            .field("group_id", &self.group_id)
            .finish_non_exhaustive()
    }
}

/// Gate every route of `router`.
///
/// Uses `route_layer`, so `{group_id}` path captures are already resolved
/// when the gate runs.
///
/// ```ignore
/// let v1 = api::v1::routes();
/// let v1 = middleware::auth::ezpass::apply(v1, state.auth.clone());
/// app = app.nest("/api/v1", v1);
/// ```
pub fn apply<S>(router: Router<S>, auth: EzpassAuth) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(auth, ezpass_middleware))
}

async fn ezpass_middleware(
    State(auth): State<EzpassAuth>,
    req: Request<Body>,
    next: Next,
) -> Response {
    match authorize(&auth, req).await {
        Ok((mut req, pass)) => {
            // middleware → extractor への受け渡し
            req.extensions_mut().insert(pass);
            next.run(req).await
        }
        Err(rejection) => rejection,
    }
}

/// Turn `handler(request, pass)` into a handler that checks ezpass first.
///
/// ```ignore
/// async fn show(_req: Request<Body>, pass: Pass) -> String {
///     pass.user.name
/// }
///
/// let app = Router::new().route("/", get(auth_handler(auth, show)));
/// ```
pub fn auth_handler<H, Fut, R>(
    auth: EzpassAuth,
    handler: H,
) -> impl Fn(Request<Body>) -> HandlerFuture + Clone + Send + Sync + 'static
where
    H: Fn(Request<Body>, Pass) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + 'static,
{
    move |req: Request<Body>| {
        let auth = auth.clone();
        let handler = handler.clone();
        let fut: HandlerFuture = Box::pin(async move {
            match authorize(&auth, req).await {
                Ok((req, pass)) => handler(req, pass).await.into_response(),
                Err(rejection) => rejection,
            }
        });
        fut
    }
}

/// Run the check for one request and hand the request back untouched
/// (body included) together with its pass.
pub async fn authorize(
    auth: &EzpassAuth,
    req: Request<Body>,
) -> Result<(Request<Body>, Pass), Response> {
    let (mut parts, body) = req.into_parts();

    let (body, form) = if has_form_body(&parts.method, &parts.headers) {
        match axum::body::to_bytes(body, FORM_BODY_LIMIT).await {
            Ok(bytes) => (Body::from(bytes.clone()), bytes),
            Err(err) => {
                // 読めない form は無視して header / query で判定
                tracing::warn!(error = %err, "ignoring unreadable form body");
                (Body::empty(), Bytes::new())
            }
        }
    } else {
        (body, Bytes::new())
    };

    let params = FormParams::from_body_and_query(&form, parts.uri.query());
    let path_params: Vec<(String, String)> =
        match RawPathParams::from_request_parts(&mut parts, &()).await {
            Ok(raw) => raw
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            Err(_) => Vec::new(),
        };

    let inbound = Inbound {
        headers: &parts.headers,
        params: &params,
        path_params: &path_params,
    };

    let outcome = auth.check(&inbound).await;
    match outcome {
        Ok(pass) => Ok((Request::from_parts(parts, body), pass)),
        Err(err) => Err(err.into_response()),
    }
}
