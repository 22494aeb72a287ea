//! Username/password login sub-flow.
//!
//! The broker-selected method renders a login form carrying the pending
//! request's ticket key; the verify endpoint checks credentials, mints a
//! session, sets the authn cookie and redirects back to the original
//! service endpoint with `id` and `key`.

use crate::binding::RequestEnvelope;
use crate::cookie;
use crate::error::IdpError;
use crate::state::IdpState;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Render the login form for one broker-selected method.
pub(crate) fn login_form(
    action: &str,
    key: &str,
    reference: &str,
    redirect_uri: &str,
    clear_cookie: Option<String>,
) -> Response {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><title>IdP Login</title></head>
<body>
    <h1>Log in</h1>
    <form method="POST" action="{}">
        <input type="hidden" name="key" value="{}"/>
        <input type="hidden" name="authn_reference" value="{}"/>
        <input type="hidden" name="redirect_uri" value="{}"/>
        <label for="login">Username</label>
        <input type="text" id="login" name="login"/>
        <label for="password">Password</label>
        <input type="password" id="password" name="password"/>
        <input type="submit" value="Log in"/>
    </form>
</body>
</html>"#,
        html_escape(action),
        html_escape(key),
        html_escape(reference),
        html_escape(redirect_uri),
    );

    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
        .into_response();
    // clear any stale cookie before a fresh login
    if let Some(value) = clear_cookie {
        if let Ok(value) = HeaderValue::from_str(&value) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

/// Credential verification endpoint: form fields `login`, `password`,
/// `key`, `authn_reference`, `redirect_uri`.
pub(crate) async fn verify(state: &IdpState, body: &str) -> Response {
    let form = RequestEnvelope::from_form(body);

    let (Some(username), Some(password)) = (form.get("login"), form.get("password")) else {
        return IdpError::Unauthorized("Unknown user or wrong password".to_string())
            .into_response();
    };
    if !state.identity.verify_credentials(username, password) {
        tracing::info!(user = %username, "credential verification failed");
        return IdpError::Unauthorized("Unknown user or wrong password".to_string())
            .into_response();
    }

    let session_id = state.sessions.create(username).await;
    let reference = form.get("authn_reference").unwrap_or_default();
    let set_cookie = cookie::encode(
        &state.config.cookie_name,
        &session_id,
        reference,
        state.config.cookie_ttl_minutes,
    );

    let redirect_uri = form.get("redirect_uri").unwrap_or("/");
    let key = form.get("key").unwrap_or_default();
    let location = format!("{redirect_uri}?id={session_id}&key={key}");
    tracing::info!(user = %username, "login verified, redirecting to pending request");

    let builder = axum::http::Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, &location)
        .header(header::SET_COOKIE, &set_cookie)
        .header(header::CONTENT_TYPE, "text/html");
    match builder.body(axum::body::Body::empty()) {
        Ok(response) => response,
        Err(err) => IdpError::ServiceError(err.to_string()).into_response(),
    }
}
