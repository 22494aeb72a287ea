//! Single logout profile.

use super::{render, render_redirect, Entry, ServiceContext};
use crate::binding::Binding;
use crate::codec::{CodecError, EndpointService};
use crate::cookie;
use crate::error::{IdpError, IdpResult};
use axum::http::{header, HeaderValue};
use axum::response::Response;

pub(super) async fn entry(ctx: &ServiceContext, entry: Entry) -> IdpResult<Response> {
    let envelope = ctx.envelope_for(entry);
    let binding = ServiceContext::binding_for(entry);

    let raw = envelope
        .saml_request()
        .ok_or_else(|| IdpError::BadRequest("Missing SAMLRequest".to_string()))?;
    let request = ctx
        .state
        .engine
        .parse_logout_request(raw, binding)
        .map_err(|err| {
            tracing::warn!(error = %err, "could not parse logout request");
            IdpError::BadRequest("Message parsing failed".to_string())
        })?;

    if let Some(name_id) = request.name_id.as_ref() {
        // local session teardown is idempotent; a missing session here is
        // not an error, the authn statement check below decides that
        if let Some(local_id) = ctx.state.engine.find_local_id(name_id) {
            ctx.state.sessions.destroy(&local_id).await;
            tracing::info!(user = %local_id, "destroyed local session for logout");
        }

        match ctx.state.engine.remove_authn_statements(name_id) {
            Ok(()) => {}
            Err(CodecError::UnknownSubject(subject)) => {
                return Err(IdpError::UnknownSession(subject));
            }
            Err(err) => return Err(err.into()),
        }
    }

    let message = ctx.state.engine.build_logout_response(&request, binding)?;

    if binding == Binding::Soap {
        let artifacts = ctx
            .state
            .engine
            .apply_binding(Binding::Soap, &message, "", envelope.relay_state())?;
        return render(&artifacts);
    }

    let (binding_out, destination) = ctx
        .state
        .engine
        .pick_binding(
            EndpointService::SingleLogout,
            Some(&[binding]),
            &request.issuer,
        )
        .map_err(|err| {
            tracing::error!(issuer = %request.issuer, error = %err, "no logout endpoint");
            IdpError::ServiceError(format!("no logout endpoint: {err}"))
        })?;

    let artifacts = ctx.state.engine.apply_binding(
        binding_out,
        &message,
        &destination,
        envelope.relay_state(),
    )?;
    let mut response = if binding_out == Binding::HttpRedirect {
        render_redirect(&artifacts)?
    } else {
        render(&artifacts)?
    };

    // front-channel logout also clears the browser's authn cookie
    let clear = cookie::delete(&ctx.state.config.cookie_name);
    if let Ok(value) = HeaderValue::from_str(&clear) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    Ok(response)
}
