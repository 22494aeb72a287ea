//! Artifact resolution profile (back channel, SOAP only).

use super::{render, Entry, ServiceContext};
use crate::error::{IdpError, IdpResult};
use axum::response::Response;

/// `ArtifactResolve`: exchange an artifact for the referenced message.
pub(super) async fn resolve(ctx: &ServiceContext, entry: Entry) -> IdpResult<Response> {
    let envelope = ctx.envelope_for(entry);
    let binding = ServiceContext::binding_for(entry);

    let raw = envelope
        .saml_request()
        .ok_or_else(|| IdpError::BadRequest("Missing SAMLRequest".to_string()))?;
    let request = ctx
        .state
        .engine
        .parse_artifact_resolve(raw, binding)
        .map_err(|err| {
            tracing::warn!(error = %err, "could not parse artifact resolve request");
            IdpError::BadRequest("Message parsing failed".to_string())
        })?;

    tracing::info!(issuer = %request.issuer, "resolving artifact");
    let message = ctx.state.engine.build_artifact_response(&request)?;
    let artifacts =
        ctx.state
            .engine
            .apply_binding(binding, &message, "", envelope.relay_state())?;
    render(&artifacts)
}
