//! Request router.
//!
//! A single ordered route table maps URL paths to (service, entry
//! operation) pairs, evaluated longest-prefix-first by table order. Two
//! tables exist: routes that expect an authenticated user, and routes that
//! must be reachable without one (credential verification and ECP, which
//! authenticates inline). Resolution is a pure function over the path so it
//! can be tested without a transport.

use crate::error::IdpError;
use crate::services::{self, Entry, ServiceContext, ServiceKind};
use crate::state::IdpState;
use crate::{cookie, login, metadata};
use axum::extract::{Request, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Router;

/// Upper bound on request bodies; protects the form/SOAP decoders.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Routes serving an authenticated (or to-be-authenticated) user. Order
/// matters: more specific prefixes come first.
const AUTHN_ROUTES: &[(&str, ServiceKind, Entry)] = &[
    ("sso/post", ServiceKind::Sso, Entry::Post),
    ("sso/redirect", ServiceKind::Sso, Entry::Redirect),
    ("sso/art", ServiceKind::Sso, Entry::Artifact),
    ("slo/redirect", ServiceKind::Slo, Entry::Redirect),
    ("slo/post", ServiceKind::Slo, Entry::Post),
    ("slo/soap", ServiceKind::Slo, Entry::Soap),
    ("airs", ServiceKind::AssertionIdRequest, Entry::Uri),
    ("ars", ServiceKind::ArtifactResolve, Entry::Soap),
    ("mni/post", ServiceKind::ManageNameId, Entry::Post),
    ("mni/redirect", ServiceKind::ManageNameId, Entry::Redirect),
    ("mni/art", ServiceKind::ManageNameId, Entry::Artifact),
    ("mni/soap", ServiceKind::ManageNameId, Entry::Soap),
    ("nim", ServiceKind::NameIdMapping, Entry::Soap),
    ("aqs", ServiceKind::AuthnQuery, Entry::Soap),
    ("attr", ServiceKind::AttributeQuery, Entry::Soap),
];

/// Routes reachable without an established session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthRoute {
    /// Login form credential verification.
    Verify,
    /// ECP single sign-on; authenticates from HTTP Basic credentials.
    SsoEcp,
}

const UNAUTH_ROUTES: &[(&str, UnauthRoute)] = &[
    ("verify", UnauthRoute::Verify),
    ("sso/ecp", UnauthRoute::SsoEcp),
];

fn path_matches(pattern: &str, path: &str) -> bool {
    path == pattern
        || (path.len() > pattern.len()
            && path.starts_with(pattern)
            && path.as_bytes()[pattern.len()] == b'/')
}

/// Resolve a path against the authenticated route table.
#[must_use]
pub fn resolve(path: &str) -> Option<(ServiceKind, Entry)> {
    let path = path.trim_start_matches('/');
    AUTHN_ROUTES
        .iter()
        .find(|(pattern, _, _)| path_matches(pattern, path))
        .map(|&(_, kind, entry)| (kind, entry))
}

/// Resolve a path against the unauthenticated route table.
#[must_use]
pub fn resolve_unauthenticated(path: &str) -> Option<UnauthRoute> {
    let path = path.trim_start_matches('/');
    UNAUTH_ROUTES
        .iter()
        .find(|(pattern, _)| path_matches(pattern, path))
        .map(|&(_, route)| route)
}

/// Build the IdP router. Every endpoint is dispatched through the route
/// tables, so the axum layer stays a thin transport adapter.
#[must_use]
pub fn router(state: IdpState) -> Router {
    Router::new().fallback(dispatch).with_state(state)
}

async fn dispatch(State(state): State<IdpState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return IdpError::BadRequest("request body too large".to_string()).into_response();
        }
    };
    let body = String::from_utf8_lossy(&bytes).into_owned();

    let path = parts.uri.path().trim_start_matches('/').to_string();
    let query = parts.uri.query().map(str::to_string);

    if path == "idp.xml" {
        return metadata::metadata(&state).await;
    }

    let cookie_header = parts
        .headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok());
    let had_cookie = cookie_header
        .is_some_and(|header| header.contains(&format!("{}=", state.config.cookie_name)));

    // session resolution: the authn cookie first, then the post-login
    // handoff `id` query parameter
    let mut user = None;
    let mut authn_class = None;
    if let Some((session_id, reference)) =
        cookie_header.and_then(|header| cookie::decode(header, &state.config.cookie_name))
    {
        if let Some(found) = state.sessions.lookup(&session_id).await {
            authn_class = state
                .broker
                .get_by_reference(&reference)
                .map(|entry| entry.class_ref.clone());
            user = Some(found);
        }
    }
    if user.is_none() {
        if let Some(id) = query
            .as_deref()
            .map(|query| crate::binding::RequestEnvelope::from_query(query))
            .and_then(|envelope| envelope.get("id").map(str::to_string))
        {
            user = state.sessions.lookup(&id).await;
        }
    }

    if user.is_none() {
        match resolve_unauthenticated(&path) {
            Some(UnauthRoute::Verify) => return login::verify(&state, &body).await,
            Some(UnauthRoute::SsoEcp) => {
                let ctx = context(state, &parts, path, query, body, None, None, had_cookie);
                return services::handle(ServiceKind::Sso, Entry::Ecp, ctx).await;
            }
            None => {}
        }
    }

    if let Some((kind, entry)) = resolve(&path) {
        tracing::debug!(path = %path, user = user.as_deref().unwrap_or("-"), "dispatching");
        let ctx = context(state, &parts, path, query, body, user, authn_class, had_cookie);
        return services::handle(kind, entry, ctx).await;
    }

    if let Some(requested) = path.strip_prefix("static/") {
        return metadata::staticfile(&state, requested).await;
    }

    tracing::debug!(path = %path, "no route matched");
    IdpError::NotFound(path).into_response()
}

#[allow(clippy::too_many_arguments)]
fn context(
    state: IdpState,
    parts: &axum::http::request::Parts,
    path: String,
    query: Option<String>,
    body: String,
    user: Option<String>,
    authn_class: Option<String>,
    had_cookie: bool,
) -> ServiceContext {
    let authorization = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    ServiceContext {
        state,
        user,
        authn_class,
        method: parts.method.clone(),
        path: format!("/{path}"),
        query,
        body,
        authorization,
        had_cookie,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_registered_service_path() {
        assert_eq!(resolve("sso/redirect"), Some((ServiceKind::Sso, Entry::Redirect)));
        assert_eq!(resolve("/sso/post"), Some((ServiceKind::Sso, Entry::Post)));
        assert_eq!(resolve("sso/art"), Some((ServiceKind::Sso, Entry::Artifact)));
        assert_eq!(resolve("slo/soap"), Some((ServiceKind::Slo, Entry::Soap)));
        assert_eq!(resolve("airs"), Some((ServiceKind::AssertionIdRequest, Entry::Uri)));
        assert_eq!(resolve("ars"), Some((ServiceKind::ArtifactResolve, Entry::Soap)));
        assert_eq!(resolve("mni/soap"), Some((ServiceKind::ManageNameId, Entry::Soap)));
        assert_eq!(resolve("nim"), Some((ServiceKind::NameIdMapping, Entry::Soap)));
        assert_eq!(resolve("aqs"), Some((ServiceKind::AuthnQuery, Entry::Soap)));
        assert_eq!(resolve("attr"), Some((ServiceKind::AttributeQuery, Entry::Soap)));
    }

    #[test]
    fn prefix_matches_require_a_segment_boundary() {
        assert_eq!(resolve("sso/redirect/extra"), Some((ServiceKind::Sso, Entry::Redirect)));
        assert_eq!(resolve("attr/more"), Some((ServiceKind::AttributeQuery, Entry::Soap)));
        assert!(resolve("attributes").is_none());
        assert!(resolve("sso/redirectx").is_none());
    }

    #[test]
    fn unknown_paths_do_not_resolve() {
        assert!(resolve("").is_none());
        assert!(resolve("sso").is_none());
        assert!(resolve("unknown/path").is_none());
    }

    #[test]
    fn unauthenticated_table_covers_verify_and_ecp() {
        assert_eq!(resolve_unauthenticated("verify"), Some(UnauthRoute::Verify));
        assert_eq!(resolve_unauthenticated("/sso/ecp"), Some(UnauthRoute::SsoEcp));
        assert!(resolve_unauthenticated("sso/redirect").is_none());
    }
}
