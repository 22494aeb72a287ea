//! External SAML codec boundary.
//!
//! Message parsing, serialization, signing, signature verification and
//! trust-metadata lookup are not reimplemented by this crate. The protocol
//! services call through [`SamlEngine`]; the embedding process supplies an
//! implementation backed by a real SAML library.

use crate::binding::{Binding, RequestEnvelope};
use crate::identity::Attributes;
use thiserror::Error;

/// Failure classes surfaced by the codec. Services convert these at their
/// own boundary into the HTTP error taxonomy; none of them may escape to
/// the transport layer.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The requesting principal is not known to trust metadata.
    #[error("unknown principal: {0}")]
    UnknownPrincipal(String),

    /// The requested response binding is not supported for this SP.
    #[error("unsupported binding: {0}")]
    UnsupportedBinding(String),

    /// A referenced subject, name identifier or assertion ID is unknown.
    #[error("unknown subject: {0}")]
    UnknownSubject(String),

    /// A name-id policy violation.
    #[error("policy violation: {0}")]
    Policy(String),

    /// The message could not be parsed for the declared binding.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// Unexpected codec failure (serialization, signing, ...).
    #[error("codec failure: {0}")]
    Internal(String),
}

/// A SAML name identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameId {
    pub format: Option<String>,
    pub value: String,
}

/// Parsed `AuthnRequest`, reduced to the fields this core acts on.
#[derive(Debug, Clone)]
pub struct AuthnRequest {
    pub id: String,
    pub issuer: String,
    pub force_authn: bool,
    pub requested_authn_context: Option<String>,
}

/// Parsed `LogoutRequest`.
#[derive(Debug, Clone)]
pub struct LogoutRequest {
    pub id: String,
    pub issuer: String,
    pub name_id: Option<NameId>,
}

/// Parsed `ManageNameIDRequest`.
#[derive(Debug, Clone)]
pub struct ManageNameIdRequest {
    pub id: String,
    pub issuer: String,
    pub name_id: NameId,
    pub new_id: Option<String>,
    pub terminate: bool,
}

/// Parsed `NameIDMappingRequest`.
#[derive(Debug, Clone)]
pub struct NameIdMappingRequest {
    pub id: String,
    pub issuer: String,
    pub name_id: NameId,
    pub policy_format: Option<String>,
}

/// Parsed `AttributeQuery`.
#[derive(Debug, Clone)]
pub struct AttributeQuery {
    pub id: String,
    pub issuer: String,
    pub subject: NameId,
}

/// Parsed `AuthnQuery`.
#[derive(Debug, Clone)]
pub struct AuthnQuery {
    pub id: String,
    pub issuer: String,
    pub subject: NameId,
    pub session_index: Option<String>,
    pub requested_authn_context: Option<String>,
}

/// Parsed `ArtifactResolve`.
#[derive(Debug, Clone)]
pub struct ArtifactResolve {
    pub id: String,
    pub issuer: String,
    pub artifact: String,
}

/// Everything needed to build one authn response for a resolved request.
#[derive(Debug, Clone)]
pub struct ResponseArgs {
    pub in_response_to: String,
    pub sp_entity_id: String,
    pub binding: Binding,
    pub destination: String,
}

/// Renderable HTTP data produced by [`SamlEngine::apply_binding`]: either an
/// inline body, or headers carrying a `Location` for redirect bindings.
#[derive(Debug, Clone, Default)]
pub struct HttpArtifacts {
    pub data: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl HttpArtifacts {
    /// The `Location` header value, if present.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("location"))
            .map(|(_, value)| value.as_str())
    }
}

/// Endpoint kind used when picking a response binding from SP metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointService {
    AssertionConsumer,
    SingleLogout,
}

/// The capabilities this core requires from the SAML library.
///
/// All calls are synchronous, bounded-latency operations (parsing, XML
/// construction, signature arithmetic, in-process metadata lookup).
pub trait SamlEngine: Send + Sync {
    fn parse_authn_request(&self, raw: &str, binding: Binding) -> Result<AuthnRequest, CodecError>;
    fn parse_logout_request(&self, raw: &str, binding: Binding)
        -> Result<LogoutRequest, CodecError>;
    fn parse_manage_name_id_request(
        &self,
        raw: &str,
        binding: Binding,
    ) -> Result<ManageNameIdRequest, CodecError>;
    fn parse_name_id_mapping_request(
        &self,
        raw: &str,
        binding: Binding,
    ) -> Result<NameIdMappingRequest, CodecError>;
    fn parse_attribute_query(&self, raw: &str, binding: Binding)
        -> Result<AttributeQuery, CodecError>;
    fn parse_authn_query(&self, raw: &str, binding: Binding) -> Result<AuthnQuery, CodecError>;
    fn parse_artifact_resolve(
        &self,
        raw: &str,
        binding: Binding,
    ) -> Result<ArtifactResolve, CodecError>;

    /// Pick the response binding and destination endpoint for an SP from
    /// trust metadata. `preferred` restricts the candidate bindings (ECP
    /// passes `[Paos]`; SLO echoes the inbound binding).
    fn pick_binding(
        &self,
        service: EndpointService,
        preferred: Option<&[Binding]>,
        entity_id: &str,
    ) -> Result<(Binding, String), CodecError>;

    /// Resolve the response construction arguments for an authn request.
    /// Fails with [`CodecError::UnknownPrincipal`] or
    /// [`CodecError::UnsupportedBinding`]; both are recoverable (the caller
    /// answers with a SAML error response instead).
    fn response_args(
        &self,
        request: &AuthnRequest,
        preferred: Option<&[Binding]>,
    ) -> Result<ResponseArgs, CodecError>;

    /// Build a signed authn response carrying the identity attributes.
    /// `authn_context` records which authentication method produced the
    /// session, when known.
    fn build_authn_response(
        &self,
        args: &ResponseArgs,
        identity: &Attributes,
        user: &str,
        authn_context: Option<&str>,
    ) -> Result<String, CodecError>;

    fn build_error_response(
        &self,
        in_response_to: &str,
        destination: &str,
        error: &CodecError,
    ) -> Result<String, CodecError>;

    fn build_logout_response(
        &self,
        request: &LogoutRequest,
        binding: Binding,
    ) -> Result<String, CodecError>;

    /// Apply a `ManageNameIDRequest` (new identifier or termination) to the
    /// identity backend, returning the resulting name identifier.
    fn handle_manage_name_id(&self, request: &ManageNameIdRequest) -> Result<NameId, CodecError>;

    fn build_manage_name_id_response(
        &self,
        request: &ManageNameIdRequest,
    ) -> Result<String, CodecError>;

    /// Map a shared name identifier into the requested format/namespace.
    fn map_name_id(&self, request: &NameIdMappingRequest) -> Result<NameId, CodecError>;

    fn build_name_id_mapping_response(
        &self,
        name_id: &NameId,
        request: &NameIdMappingRequest,
    ) -> Result<String, CodecError>;

    fn build_attribute_response(
        &self,
        query: &AttributeQuery,
        identity: &Attributes,
    ) -> Result<String, CodecError>;

    fn build_authn_query_response(&self, query: &AuthnQuery) -> Result<String, CodecError>;

    /// Fails with [`CodecError::UnknownSubject`] for an unknown assertion ID.
    fn build_assertion_id_response(&self, assertion_id: &str) -> Result<String, CodecError>;

    fn build_artifact_response(&self, request: &ArtifactResolve) -> Result<String, CodecError>;

    /// Render a response message for the outbound binding. PAOS wraps the
    /// message with the ECP SOAP headers for the destination.
    fn apply_binding(
        &self,
        binding: Binding,
        message: &str,
        destination: &str,
        relay_state: &str,
    ) -> Result<HttpArtifacts, CodecError>;

    /// Verify the detached redirect-binding signature carried in the
    /// envelope (`SAMLRequest`/`RelayState`/`SigAlg`/`Signature`) against
    /// one candidate certificate.
    fn verify_redirect_signature(&self, envelope: &RequestEnvelope, certificate: &str) -> bool;

    /// The issuer's signing certificates from trust metadata.
    fn signing_certificates(&self, entity_id: &str) -> Vec<String>;

    /// Exchange an artifact for the full request message (back channel).
    fn resolve_artifact(&self, artifact: &str) -> Result<String, CodecError>;

    /// Resolve a name identifier to the local user identifier, if federated.
    fn find_local_id(&self, name_id: &NameId) -> Option<String>;

    /// Purge stored authentication statements for a name identifier.
    /// Fails with [`CodecError::UnknownSubject`] when nothing is known
    /// about the identity.
    fn remove_authn_statements(&self, name_id: &NameId) -> Result<(), CodecError>;

    /// The IdP's own metadata document, built from trust configuration.
    fn metadata_document(&self) -> Result<String, CodecError>;
}
