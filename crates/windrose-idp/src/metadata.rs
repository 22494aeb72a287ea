//! Metadata and static file responders.

use crate::error::{IdpError, IdpResult};
use crate::state::IdpState;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::path::Path;

/// Serve the IdP's own metadata document (`idp.xml`).
pub(crate) async fn metadata(state: &IdpState) -> Response {
    match state.engine.metadata_document() {
        Ok(xml) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/xml")],
            xml,
        )
            .into_response(),
        Err(err) => {
            // never leak codec internals through this endpoint
            tracing::error!(error = %err, "metadata generation failed");
            IdpError::NotFound("idp.xml".to_string()).into_response()
        }
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("xml") => "text/xml",
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

/// Serve a file under the configured static root. The requested path is
/// canonicalized and must stay inside the root; escapes are rejected
/// before touching the filesystem.
pub(crate) async fn staticfile(state: &IdpState, requested: &str) -> Response {
    match staticfile_inner(state, requested).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn staticfile_inner(state: &IdpState, requested: &str) -> IdpResult<Response> {
    let requested = requested.trim_start_matches('/');
    if requested
        .split('/')
        .any(|segment| segment == ".." || segment.is_empty())
    {
        tracing::warn!(path = %requested, "rejected static path traversal");
        return Err(IdpError::Unauthorized(
            "path escapes static root".to_string(),
        ));
    }

    let root = state
        .config
        .static_root
        .as_ref()
        .ok_or_else(|| IdpError::NotFound(requested.to_string()))?;
    let root = tokio::fs::canonicalize(root)
        .await
        .map_err(|_| IdpError::NotFound(requested.to_string()))?;
    let target = tokio::fs::canonicalize(root.join(requested))
        .await
        .map_err(|_| IdpError::NotFound(requested.to_string()))?;

    // canonicalized symlinks may still point outside the root
    if !target.starts_with(&root) {
        tracing::warn!(path = %requested, "rejected static path outside root");
        return Err(IdpError::Unauthorized(
            "path escapes static root".to_string(),
        ));
    }

    let bytes = tokio::fs::read(&target)
        .await
        .map_err(|_| IdpError::NotFound(requested.to_string()))?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type_for(&target))],
        bytes,
    )
        .into_response())
}
