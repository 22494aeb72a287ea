//! Back-channel query profiles: attribute query, authn query and
//! assertion ID request.

use super::{render, Entry, ServiceContext};
use crate::binding::Binding;
use crate::codec::CodecError;
use crate::error::{IdpError, IdpResult};
use axum::response::Response;

/// `AttributeQuery`: release the extended attribute set for a subject.
pub(super) async fn attribute(ctx: &ServiceContext, entry: Entry) -> IdpResult<Response> {
    let envelope = ctx.envelope_for(entry);
    let binding = ServiceContext::binding_for(entry);

    let raw = envelope
        .saml_request()
        .ok_or_else(|| IdpError::BadRequest("Missing SAMLRequest".to_string()))?;
    let query = ctx
        .state
        .engine
        .parse_attribute_query(raw, binding)
        .map_err(|err| {
            tracing::warn!(error = %err, "could not parse attribute query");
            IdpError::BadRequest("Message parsing failed".to_string())
        })?;

    let identity = ctx
        .state
        .identity
        .extra_attributes(&query.subject.value)
        .ok_or_else(|| IdpError::NotFound(query.subject.value.clone()))?;

    tracing::info!(issuer = %query.issuer, subject = %query.subject.value, "answering attribute query");
    let message = ctx.state.engine.build_attribute_response(&query, &identity)?;
    let artifacts =
        ctx.state
            .engine
            .apply_binding(binding, &message, "", envelope.relay_state())?;
    render(&artifacts)
}

/// `AuthnQuery`: report authentication statements for a subject.
pub(super) async fn authn(ctx: &ServiceContext, entry: Entry) -> IdpResult<Response> {
    let envelope = ctx.envelope_for(entry);
    let binding = ServiceContext::binding_for(entry);

    let raw = envelope
        .saml_request()
        .ok_or_else(|| IdpError::BadRequest("Missing SAMLRequest".to_string()))?;
    let query = ctx
        .state
        .engine
        .parse_authn_query(raw, binding)
        .map_err(|err| {
            tracing::warn!(error = %err, "could not parse authn query");
            IdpError::BadRequest("Message parsing failed".to_string())
        })?;

    tracing::info!(issuer = %query.issuer, subject = %query.subject.value, "answering authn query");
    let message = ctx.state.engine.build_authn_query_response(&query)?;
    let artifacts =
        ctx.state
            .engine
            .apply_binding(binding, &message, "", envelope.relay_state())?;
    render(&artifacts)
}

/// `AssertionIDRequest`: return a previously issued assertion by its ID,
/// delivered over the URI binding. The ID arrives as the `ID` field of the
/// envelope.
pub(super) async fn assertion_id(ctx: &ServiceContext, entry: Entry) -> IdpResult<Response> {
    let envelope = ctx.envelope_for(entry);

    let assertion_id = envelope
        .get("ID")
        .ok_or_else(|| IdpError::BadRequest("Missing assertion ID".to_string()))?;

    let message = match ctx.state.engine.build_assertion_id_response(assertion_id) {
        Ok(message) => message,
        Err(CodecError::UnknownSubject(_)) => {
            return Err(IdpError::NotFound(assertion_id.to_string()));
        }
        Err(err) => return Err(err.into()),
    };

    let artifacts = ctx.state.engine.apply_binding(
        Binding::Uri,
        &message,
        "",
        envelope.relay_state(),
    )?;
    render(&artifacts)
}
