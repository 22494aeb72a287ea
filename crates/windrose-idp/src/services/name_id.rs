//! Name identifier management and mapping profiles.

use super::{render, Entry, ServiceContext};
use crate::binding::Binding;
use crate::codec::CodecError;
use crate::error::{IdpError, IdpResult};
use axum::response::Response;

/// `ManageNameIDRequest`: register a new SP-provided identifier or
/// terminate the federation, then confirm.
pub(super) async fn manage(ctx: &ServiceContext, entry: Entry) -> IdpResult<Response> {
    let envelope = ctx.envelope_for(entry);

    // the artifact entry carries a reference, not the message itself
    let (raw, binding) = if entry == Entry::Artifact {
        let artifact = envelope
            .artifact()
            .ok_or_else(|| IdpError::BadRequest("Missing SAMLart".to_string()))?;
        (
            ctx.state.engine.resolve_artifact(artifact)?,
            Binding::HttpArtifact,
        )
    } else {
        let raw = envelope
            .saml_request()
            .ok_or_else(|| IdpError::BadRequest("Missing SAMLRequest".to_string()))?;
        (raw.to_string(), ServiceContext::binding_for(entry))
    };

    let request = ctx
        .state
        .engine
        .parse_manage_name_id_request(&raw, binding)
        .map_err(|err| {
            tracing::warn!(error = %err, "could not parse manage name-id request");
            IdpError::BadRequest("Message parsing failed".to_string())
        })?;

    let name_id = ctx.state.engine.handle_manage_name_id(&request)?;
    tracing::info!(
        issuer = %request.issuer,
        terminate = request.terminate,
        name_id = %name_id.value,
        "applied manage name-id request"
    );

    // the confirmation always goes back over SOAP, whatever binding the
    // request arrived on
    let message = ctx.state.engine.build_manage_name_id_response(&request)?;
    let artifacts = ctx.state.engine.apply_binding(
        Binding::Soap,
        &message,
        "",
        envelope.relay_state(),
    )?;
    render(&artifacts)
}

/// `NameIDMappingRequest`: translate a shared identifier into the
/// requested namespace. Only offered over SOAP.
pub(super) async fn mapping(ctx: &ServiceContext, entry: Entry) -> IdpResult<Response> {
    let envelope = ctx.envelope_for(entry);
    let binding = ServiceContext::binding_for(entry);

    let raw = envelope
        .saml_request()
        .ok_or_else(|| IdpError::BadRequest("Missing SAMLRequest".to_string()))?;
    let request = ctx
        .state
        .engine
        .parse_name_id_mapping_request(raw, binding)
        .map_err(|err| {
            tracing::warn!(error = %err, "could not parse name-id mapping request");
            IdpError::BadRequest("Message parsing failed".to_string())
        })?;

    let name_id = match ctx.state.engine.map_name_id(&request) {
        Ok(name_id) => name_id,
        Err(CodecError::UnknownSubject(_) | CodecError::Policy(_)) => {
            return Err(IdpError::BadRequest("Unknown entity".to_string()));
        }
        Err(err) => return Err(err.into()),
    };

    let message = ctx
        .state
        .engine
        .build_name_id_mapping_response(&name_id, &request)?;
    let artifacts =
        ctx.state
            .engine
            .apply_binding(binding, &message, "", envelope.relay_state())?;
    render(&artifacts)
}
