//! Single sign-on profile: browser (redirect/POST), artifact and ECP entry
//! points.

use super::{render, Entry, ServiceContext};
use crate::binding::{Binding, RequestEnvelope};
use crate::broker::AUTHN_CONTEXT_PASSWORD;
use crate::codec::{AuthnRequest, CodecError, EndpointService};
use crate::cookie;
use crate::error::{IdpError, IdpResult};
use crate::login;
use crate::state::IdpState;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(super) async fn entry(ctx: &ServiceContext, entry: Entry) -> IdpResult<Response> {
    match entry {
        Entry::Redirect | Entry::Post => browser_entry(ctx, entry).await,
        Entry::Artifact => artifact_entry(ctx).await,
        Entry::Ecp => ecp_entry(ctx).await,
        Entry::Soap | Entry::Uri => Err(IdpError::BadRequest(
            "unsupported single sign-on entry".to_string(),
        )),
    }
}

/// Browser-facing entry. An unauthenticated user is parked in the ticket
/// store and sent through the login flow; the post-login redirect replays
/// the same endpoint with the ticket key.
async fn browser_entry(ctx: &ServiceContext, entry: Entry) -> IdpResult<Response> {
    let envelope = ctx.envelope_for(entry);
    let binding = ServiceContext::binding_for(entry);

    // returning from login: redeem the parked request; a missing ticket
    // falls through to re-parsing the raw request when one was carried
    if let Some(key) = envelope.get("key") {
        if let Some(ticket) = ctx.state.tickets.take(key).await {
            let relay_state = ticket.envelope.relay_state().to_string();
            return do_sso(
                &ctx.state,
                ctx.user.as_deref(),
                ctx.authn_class.as_deref(),
                &ticket.request,
                &relay_state,
                None,
            );
        }
        if envelope.saml_request().is_none() {
            return Err(IdpError::BadRequest(
                "Unknown or expired request key".to_string(),
            ));
        }
        tracing::debug!(key = %key, "no ticket for key, re-parsing carried request");
    }

    let raw = envelope
        .saml_request()
        .ok_or_else(|| IdpError::BadRequest("Missing SAMLRequest".to_string()))?;
    let request = ctx
        .state
        .engine
        .parse_authn_request(raw, binding)
        .map_err(|err| {
            tracing::warn!(error = %err, "could not parse authn request");
            IdpError::BadRequest("Message parsing failed".to_string())
        })?;

    if binding == Binding::HttpRedirect {
        verify_redirect_signature(&ctx.state, &envelope, &request)?;
    }

    if ctx.user.is_some() && !request.force_authn {
        let relay_state = envelope.relay_state().to_string();
        do_sso(
            &ctx.state,
            ctx.user.as_deref(),
            ctx.authn_class.as_deref(),
            &request,
            &relay_state,
            None,
        )
    } else {
        not_authn(ctx, envelope, request).await
    }
}

/// Check a detached redirect-binding signature, when present, against every
/// signing certificate published for the issuer.
fn verify_redirect_signature(
    state: &IdpState,
    envelope: &RequestEnvelope,
    request: &AuthnRequest,
) -> IdpResult<()> {
    if envelope.signature().is_none() {
        return Ok(());
    }
    if envelope.sig_alg().is_none() {
        return Err(IdpError::BadRequest(
            "Signature Algorithm specification is missing".to_string(),
        ));
    }

    let certificates = state.engine.signing_certificates(&request.issuer);
    let verified = certificates
        .iter()
        .any(|certificate| state.engine.verify_redirect_signature(envelope, certificate));
    if verified {
        Ok(())
    } else {
        tracing::warn!(issuer = %request.issuer, "redirect signature did not verify");
        Err(IdpError::SignatureVerification)
    }
}

/// Park the pending request and answer with the login form of the
/// strongest acceptable authentication method.
async fn not_authn(
    ctx: &ServiceContext,
    envelope: RequestEnvelope,
    request: AuthnRequest,
) -> IdpResult<Response> {
    let picked = ctx
        .state
        .broker
        .pick(request.requested_authn_context.as_deref());
    let Some((_, reference)) = picked.into_iter().next() else {
        return Err(IdpError::NoUsableAuthnMethod);
    };

    let key = ctx.state.tickets.store(envelope, request).await;
    let clear_cookie = ctx
        .had_cookie
        .then(|| cookie::delete(&ctx.state.config.cookie_name));
    tracing::info!(path = %ctx.path, "redirecting unauthenticated user to login");
    Ok(login::login_form(
        &ctx.state.config.verify_path,
        &key,
        &reference,
        &ctx.path,
        clear_cookie,
    ))
}

/// Artifact entry: exchange the artifact for the original request over the
/// back channel, then continue as a normal SSO operation.
async fn artifact_entry(ctx: &ServiceContext) -> IdpResult<Response> {
    let envelope = ctx.envelope_for(Entry::Artifact);
    let artifact = envelope
        .artifact()
        .ok_or_else(|| IdpError::BadRequest("Missing SAMLart".to_string()))?;

    let raw = ctx.state.engine.resolve_artifact(artifact)?;
    let request = ctx
        .state
        .engine
        .parse_authn_request(&raw, Binding::HttpArtifact)
        .map_err(|err| {
            tracing::warn!(error = %err, "could not parse resolved artifact message");
            IdpError::BadRequest("Message parsing failed".to_string())
        })?;

    let relay_state = envelope.relay_state().to_string();
    do_sso(
        &ctx.state,
        ctx.user.as_deref(),
        ctx.authn_class.as_deref(),
        &request,
        &relay_state,
        None,
    )
}

/// ECP entry: authenticate from HTTP Basic credentials and respond over
/// the PAOS binding.
async fn ecp_entry(ctx: &ServiceContext) -> IdpResult<Response> {
    let (username, password) = ctx
        .authorization
        .as_deref()
        .and_then(parse_basic_auth)
        .ok_or_else(|| IdpError::Unauthorized("missing HTTP Basic credentials".to_string()))?;
    if !ctx.state.identity.verify_credentials(&username, &password) {
        tracing::info!(user = %username, "ECP credential verification failed");
        return Err(IdpError::Unauthorized(
            "Unknown user or wrong password".to_string(),
        ));
    }

    let envelope = ctx.envelope_for(Entry::Ecp);
    let raw = envelope
        .saml_request()
        .ok_or_else(|| IdpError::BadRequest("Missing SAMLRequest".to_string()))?;
    let request = ctx
        .state
        .engine
        .parse_authn_request(raw, Binding::Soap)
        .map_err(|err| {
            tracing::warn!(error = %err, "could not parse ECP authn request");
            IdpError::BadRequest("Message parsing failed".to_string())
        })?;

    let authn_class = ctx
        .state
        .broker
        .entry_for_class(AUTHN_CONTEXT_PASSWORD)
        .map(|entry| entry.class_ref.clone());
    let relay_state = envelope.relay_state().to_string();
    do_sso(
        &ctx.state,
        Some(&username),
        authn_class.as_deref(),
        &request,
        &relay_state,
        Some(&[Binding::Paos]),
    )
}

fn parse_basic_auth(header: &str) -> Option<(String, String)> {
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = BASE64.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Build and render the authn response for an authenticated user. Unknown
/// principals and unsupported bindings are answered with a SAML error
/// response to the already-resolved destination, not an HTTP failure.
pub(super) fn do_sso(
    state: &IdpState,
    user: Option<&str>,
    authn_class: Option<&str>,
    request: &AuthnRequest,
    relay_state: &str,
    response_bindings: Option<&[Binding]>,
) -> IdpResult<Response> {
    let Some(user) = user else {
        return Err(IdpError::Unauthorized("user not authenticated".to_string()));
    };

    let (binding_out, destination) = state
        .engine
        .pick_binding(
            EndpointService::AssertionConsumer,
            response_bindings,
            &request.issuer,
        )
        .map_err(|err| {
            tracing::error!(issuer = %request.issuer, error = %err, "no receiver endpoint");
            IdpError::ServiceError(format!("no receiver endpoint: {err}"))
        })?;

    let message = match state.engine.response_args(request, response_bindings) {
        Ok(args) => {
            let mut identity = state.identity.attributes(user).unwrap_or_default();
            identity.insert("uid".to_string(), user.to_string());
            state
                .engine
                .build_authn_response(&args, &identity, user, authn_class)?
        }
        Err(err @ (CodecError::UnknownPrincipal(_) | CodecError::UnsupportedBinding(_))) => {
            tracing::warn!(issuer = %request.issuer, error = %err, "answering with SAML error response");
            state
                .engine
                .build_error_response(&request.id, &destination, &err)?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!(user = %user, issuer = %request.issuer, binding = binding_out.urn(), "issuing authn response");
    let artifacts = state
        .engine
        .apply_binding(binding_out, &message, &destination, relay_state)?;
    render(&artifacts)
}
