//! SAML profile services.
//!
//! Each profile follows the same shape: verify the inbound message through
//! the codec, authorize and build the response, then render it for the
//! outbound binding. Services are stateless across requests; everything
//! request-scoped lives in [`ServiceContext`].

mod artifact;
mod name_id;
mod query;
mod slo;
mod sso;

use crate::binding::{Binding, RequestEnvelope};
use crate::codec::HttpArtifacts;
use crate::error::{IdpError, IdpResult};
use crate::state::IdpState;
use axum::body::Body;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};

/// One SAML profile, selected by the request router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Sso,
    Slo,
    ManageNameId,
    NameIdMapping,
    AttributeQuery,
    AuthnQuery,
    ArtifactResolve,
    AssertionIdRequest,
}

/// Binding-specific entry operation on a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Redirect,
    Post,
    Artifact,
    Soap,
    Uri,
    Ecp,
}

/// Per-request context assembled by the router.
pub(crate) struct ServiceContext {
    pub state: IdpState,
    /// Resolved user, if the request carried a live session.
    pub user: Option<String>,
    /// Authn context class recorded in the cookie, mapped back through the
    /// broker.
    pub authn_class: Option<String>,
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub body: String,
    pub authorization: Option<String>,
    pub had_cookie: bool,
}

impl ServiceContext {
    /// Decode the inbound request into a protocol-neutral envelope for the
    /// given entry operation.
    pub fn envelope_for(&self, entry: Entry) -> RequestEnvelope {
        match entry {
            Entry::Redirect => RequestEnvelope::from_query(self.query.as_deref().unwrap_or("")),
            Entry::Post => RequestEnvelope::from_form(&self.body),
            Entry::Soap | Entry::Ecp => RequestEnvelope::from_soap(&self.body),
            Entry::Artifact | Entry::Uri => {
                RequestEnvelope::from_either(&self.method, self.query.as_deref(), &self.body)
            }
        }
    }

    /// The wire binding an entry operation receives requests over.
    pub fn binding_for(entry: Entry) -> Binding {
        match entry {
            Entry::Redirect => Binding::HttpRedirect,
            Entry::Post => Binding::HttpPost,
            Entry::Artifact => Binding::HttpArtifact,
            Entry::Soap | Entry::Ecp | Entry::Uri => Binding::Soap,
        }
    }
}

/// Dispatch one request to its profile implementation. Every outcome is
/// rendered as an HTTP response; errors use the shared taxonomy.
pub(crate) async fn handle(kind: ServiceKind, entry: Entry, ctx: ServiceContext) -> Response {
    let result = match kind {
        ServiceKind::Sso => sso::entry(&ctx, entry).await,
        ServiceKind::Slo => slo::entry(&ctx, entry).await,
        ServiceKind::ManageNameId => name_id::manage(&ctx, entry).await,
        ServiceKind::NameIdMapping => name_id::mapping(&ctx, entry).await,
        ServiceKind::AttributeQuery => query::attribute(&ctx, entry).await,
        ServiceKind::AuthnQuery => query::authn(&ctx, entry).await,
        ServiceKind::ArtifactResolve => artifact::resolve(&ctx, entry).await,
        ServiceKind::AssertionIdRequest => query::assertion_id(&ctx, entry).await,
    };
    result.unwrap_or_else(IntoResponse::into_response)
}

/// Render codec HTTP artifacts: inline data becomes a 200 body with the
/// codec-provided headers, a bare `Location` header becomes a redirect, and
/// anything else is a server error.
pub(crate) fn render(artifacts: &HttpArtifacts) -> IdpResult<Response> {
    if let Some(data) = artifacts.data.as_ref().filter(|data| !data.is_empty()) {
        build_response(StatusCode::OK, artifacts, Body::from(data.clone()))
    } else if artifacts.location().is_some() {
        build_response(StatusCode::FOUND, artifacts, Body::empty())
    } else {
        Err(IdpError::ServiceError(
            "no renderable data or Location header for response".to_string(),
        ))
    }
}

/// Render as a redirect; the `Location` header is mandatory.
pub(crate) fn render_redirect(artifacts: &HttpArtifacts) -> IdpResult<Response> {
    if artifacts.location().is_none() {
        return Err(IdpError::ServiceError("missing Location header".to_string()));
    }
    build_response(StatusCode::FOUND, artifacts, Body::empty())
}

fn build_response(
    status: StatusCode,
    artifacts: &HttpArtifacts,
    body: Body,
) -> IdpResult<Response> {
    let mut builder = axum::http::Response::builder().status(status);
    let mut has_content_type = false;
    for (name, value) in &artifacts.headers {
        has_content_type |= name.eq_ignore_ascii_case("content-type");
        builder = builder.header(name.as_str(), value.as_str());
    }
    if status == StatusCode::OK && !has_content_type {
        builder = builder.header(header::CONTENT_TYPE, "text/html; charset=utf-8");
    }
    builder
        .body(body)
        .map_err(|err| IdpError::ServiceError(format!("invalid response headers: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_prefers_inline_data() {
        let artifacts = HttpArtifacts {
            data: Some("<xml/>".to_string()),
            headers: vec![("Content-Type".to_string(), "text/xml".to_string())],
        };
        let response = render(&artifacts).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/xml"
        );
    }

    #[test]
    fn render_falls_back_to_location_redirect() {
        let artifacts = HttpArtifacts {
            data: None,
            headers: vec![("Location".to_string(), "https://sp.example.org/acs".to_string())],
        };
        let response = render(&artifacts).unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://sp.example.org/acs"
        );
    }

    #[test]
    fn render_with_nothing_is_a_server_error() {
        let artifacts = HttpArtifacts::default();
        assert!(matches!(
            render(&artifacts),
            Err(IdpError::ServiceError(_))
        ));
        assert!(matches!(
            render_redirect(&artifacts),
            Err(IdpError::ServiceError(_))
        ));
    }
}
