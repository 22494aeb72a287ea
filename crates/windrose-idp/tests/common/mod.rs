#![allow(dead_code)]
//! Shared test fixtures: a scriptable SAML engine and a populated state.
//!
//! The mock engine speaks a trivial comma-separated message format, e.g.
//! `authn,<id>,<issuer>[,force][,ctx=<class>]`, so tests can exercise the
//! full HTTP surface without a real XML codec.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;

use windrose_idp::codec::{
    ArtifactResolve, AttributeQuery, AuthnQuery, AuthnRequest, CodecError, EndpointService,
    HttpArtifacts, LogoutRequest, ManageNameIdRequest, NameId, NameIdMappingRequest, ResponseArgs,
};
use windrose_idp::{
    Attributes, Binding, IdpConfig, IdpState, InMemoryIdentityStore, RequestEnvelope, SamlEngine,
};

pub const SP_REDIRECT: &str = "https://sp-redirect.example.org";
pub const SP_POST: &str = "https://sp-post.example.org";
pub const SP_UNSUPPORTED: &str = "https://sp-unsupported.example.org";

pub const GOOD_SIGNATURE: &str = "good-signature";

struct SpEndpoints {
    acs_binding: Binding,
    acs: String,
    slo: String,
}

pub struct MockEngine {
    sps: HashMap<String, SpEndpoints>,
    /// Artifacts resolvable over the back channel.
    artifacts: HashMap<String, String>,
    /// Name identifiers with a known local user.
    local_ids: HashMap<String, String>,
    /// Subjects with stored authentication statements; drained by logout.
    authn_statements: Mutex<HashSet<String>>,
    /// Previously issued assertions by ID.
    assertions: HashSet<String>,
}

impl MockEngine {
    pub fn new() -> Self {
        let mut sps = HashMap::new();
        sps.insert(
            SP_REDIRECT.to_string(),
            SpEndpoints {
                acs_binding: Binding::HttpRedirect,
                acs: format!("{SP_REDIRECT}/acs"),
                slo: format!("{SP_REDIRECT}/slo"),
            },
        );
        sps.insert(
            SP_POST.to_string(),
            SpEndpoints {
                acs_binding: Binding::HttpPost,
                acs: format!("{SP_POST}/acs"),
                slo: format!("{SP_POST}/slo"),
            },
        );
        sps.insert(
            SP_UNSUPPORTED.to_string(),
            SpEndpoints {
                acs_binding: Binding::HttpRedirect,
                acs: format!("{SP_UNSUPPORTED}/acs"),
                slo: format!("{SP_UNSUPPORTED}/slo"),
            },
        );

        let mut artifacts = HashMap::new();
        artifacts.insert(
            "AAQ-artifact".to_string(),
            format!("authn,art-1,{SP_REDIRECT}"),
        );
        artifacts.insert(
            "AAQ-mni-artifact".to_string(),
            format!("mni,art-2,{SP_REDIRECT},name-testuser,-,terminate"),
        );

        let mut local_ids = HashMap::new();
        local_ids.insert("name-testuser".to_string(), "testuser".to_string());

        let mut authn_statements = HashSet::new();
        authn_statements.insert("name-testuser".to_string());

        let mut assertions = HashSet::new();
        assertions.insert("assertion-1".to_string());

        Self {
            sps,
            artifacts,
            local_ids,
            authn_statements: Mutex::new(authn_statements),
            assertions,
        }
    }

    fn sp(&self, entity_id: &str) -> Result<&SpEndpoints, CodecError> {
        self.sps
            .get(entity_id)
            .ok_or_else(|| CodecError::UnknownPrincipal(entity_id.to_string()))
    }

    fn parts<'a>(&self, raw: &'a str, kind: &str) -> Result<Vec<&'a str>, CodecError> {
        let parts: Vec<&str> = raw.split(',').collect();
        if parts.first() != Some(&kind) || parts.len() < 3 {
            return Err(CodecError::Malformed(format!("not a {kind} message")));
        }
        Ok(parts)
    }
}

impl SamlEngine for MockEngine {
    fn parse_authn_request(&self, raw: &str, _binding: Binding) -> Result<AuthnRequest, CodecError> {
        let parts = self.parts(raw, "authn")?;
        Ok(AuthnRequest {
            id: parts[1].to_string(),
            issuer: parts[2].to_string(),
            force_authn: parts.contains(&"force"),
            requested_authn_context: parts
                .iter()
                .find_map(|part| part.strip_prefix("ctx=").map(str::to_string)),
        })
    }

    fn parse_logout_request(
        &self,
        raw: &str,
        _binding: Binding,
    ) -> Result<LogoutRequest, CodecError> {
        let parts = self.parts(raw, "logout")?;
        let name_id = parts.get(3).filter(|value| **value != "-").map(|value| NameId {
            format: None,
            value: (*value).to_string(),
        });
        Ok(LogoutRequest {
            id: parts[1].to_string(),
            issuer: parts[2].to_string(),
            name_id,
        })
    }

    fn parse_manage_name_id_request(
        &self,
        raw: &str,
        _binding: Binding,
    ) -> Result<ManageNameIdRequest, CodecError> {
        let parts = self.parts(raw, "mni")?;
        Ok(ManageNameIdRequest {
            id: parts[1].to_string(),
            issuer: parts[2].to_string(),
            name_id: NameId {
                format: None,
                value: parts.get(3).unwrap_or(&"").to_string(),
            },
            new_id: parts.get(4).filter(|value| **value != "-").map(|v| (*v).to_string()),
            terminate: parts.contains(&"terminate"),
        })
    }

    fn parse_name_id_mapping_request(
        &self,
        raw: &str,
        _binding: Binding,
    ) -> Result<NameIdMappingRequest, CodecError> {
        let parts = self.parts(raw, "nim")?;
        Ok(NameIdMappingRequest {
            id: parts[1].to_string(),
            issuer: parts[2].to_string(),
            name_id: NameId {
                format: None,
                value: parts.get(3).unwrap_or(&"").to_string(),
            },
            policy_format: None,
        })
    }

    fn parse_attribute_query(
        &self,
        raw: &str,
        _binding: Binding,
    ) -> Result<AttributeQuery, CodecError> {
        let parts = self.parts(raw, "attr")?;
        Ok(AttributeQuery {
            id: parts[1].to_string(),
            issuer: parts[2].to_string(),
            subject: NameId {
                format: None,
                value: parts.get(3).unwrap_or(&"").to_string(),
            },
        })
    }

    fn parse_authn_query(&self, raw: &str, _binding: Binding) -> Result<AuthnQuery, CodecError> {
        let parts = self.parts(raw, "aqs")?;
        Ok(AuthnQuery {
            id: parts[1].to_string(),
            issuer: parts[2].to_string(),
            subject: NameId {
                format: None,
                value: parts.get(3).unwrap_or(&"").to_string(),
            },
            session_index: None,
            requested_authn_context: None,
        })
    }

    fn parse_artifact_resolve(
        &self,
        raw: &str,
        _binding: Binding,
    ) -> Result<ArtifactResolve, CodecError> {
        let parts = self.parts(raw, "ars")?;
        Ok(ArtifactResolve {
            id: parts[1].to_string(),
            issuer: parts[2].to_string(),
            artifact: parts.get(3).unwrap_or(&"").to_string(),
        })
    }

    fn pick_binding(
        &self,
        service: EndpointService,
        preferred: Option<&[Binding]>,
        entity_id: &str,
    ) -> Result<(Binding, String), CodecError> {
        let sp = self.sp(entity_id)?;
        if let Some(preferred) = preferred {
            if preferred.contains(&Binding::Paos) {
                return Ok((Binding::Paos, format!("{entity_id}/paos")));
            }
        }
        match service {
            EndpointService::AssertionConsumer => Ok((sp.acs_binding, sp.acs.clone())),
            EndpointService::SingleLogout => {
                let binding = preferred
                    .and_then(|bindings| bindings.first().copied())
                    .unwrap_or(sp.acs_binding);
                Ok((binding, sp.slo.clone()))
            }
        }
    }

    fn response_args(
        &self,
        request: &AuthnRequest,
        preferred: Option<&[Binding]>,
    ) -> Result<ResponseArgs, CodecError> {
        if request.issuer == SP_UNSUPPORTED {
            return Err(CodecError::UnsupportedBinding(request.issuer.clone()));
        }
        let (binding, destination) =
            self.pick_binding(EndpointService::AssertionConsumer, preferred, &request.issuer)?;
        Ok(ResponseArgs {
            in_response_to: request.id.clone(),
            sp_entity_id: request.issuer.clone(),
            binding,
            destination,
        })
    }

    fn build_authn_response(
        &self,
        args: &ResponseArgs,
        identity: &Attributes,
        user: &str,
        _authn_context: Option<&str>,
    ) -> Result<String, CodecError> {
        assert_eq!(identity.get("uid").map(String::as_str), Some(user));
        Ok(format!("response-to:{}:for:{}", args.in_response_to, user))
    }

    fn build_error_response(
        &self,
        in_response_to: &str,
        destination: &str,
        _error: &CodecError,
    ) -> Result<String, CodecError> {
        assert!(!destination.is_empty());
        Ok(format!("error-response:{in_response_to}"))
    }

    fn build_logout_response(
        &self,
        request: &LogoutRequest,
        _binding: Binding,
    ) -> Result<String, CodecError> {
        Ok(format!("logout-response:{}", request.id))
    }

    fn handle_manage_name_id(&self, request: &ManageNameIdRequest) -> Result<NameId, CodecError> {
        Ok(request.name_id.clone())
    }

    fn build_manage_name_id_response(
        &self,
        request: &ManageNameIdRequest,
    ) -> Result<String, CodecError> {
        Ok(format!("mni-response:{}", request.id))
    }

    fn map_name_id(&self, request: &NameIdMappingRequest) -> Result<NameId, CodecError> {
        if !self.local_ids.contains_key(&request.name_id.value) {
            return Err(CodecError::UnknownSubject(request.name_id.value.clone()));
        }
        Ok(NameId {
            format: request.policy_format.clone(),
            value: format!("mapped-{}", request.name_id.value),
        })
    }

    fn build_name_id_mapping_response(
        &self,
        name_id: &NameId,
        _request: &NameIdMappingRequest,
    ) -> Result<String, CodecError> {
        Ok(format!("nim-response:{}", name_id.value))
    }

    fn build_attribute_response(
        &self,
        query: &AttributeQuery,
        identity: &Attributes,
    ) -> Result<String, CodecError> {
        assert!(!identity.is_empty());
        Ok(format!("attr-response:{}", query.id))
    }

    fn build_authn_query_response(&self, query: &AuthnQuery) -> Result<String, CodecError> {
        Ok(format!("aqs-response:{}", query.id))
    }

    fn build_assertion_id_response(&self, assertion_id: &str) -> Result<String, CodecError> {
        if !self.assertions.contains(assertion_id) {
            return Err(CodecError::UnknownSubject(assertion_id.to_string()));
        }
        Ok(format!("assertion:{assertion_id}"))
    }

    fn build_artifact_response(&self, request: &ArtifactResolve) -> Result<String, CodecError> {
        Ok(format!("ars-response:{}", request.artifact))
    }

    fn apply_binding(
        &self,
        binding: Binding,
        message: &str,
        destination: &str,
        relay_state: &str,
    ) -> Result<HttpArtifacts, CodecError> {
        match binding {
            Binding::HttpRedirect => Ok(HttpArtifacts {
                data: None,
                headers: vec![(
                    "Location".to_string(),
                    format!("{destination}?SAMLResponse={message}&RelayState={relay_state}"),
                )],
            }),
            Binding::HttpPost => Ok(HttpArtifacts {
                data: Some(format!(
                    "<form action=\"{destination}\"><input name=\"SAMLResponse\" value=\"{message}\"/></form>"
                )),
                headers: vec![("Content-Type".to_string(), "text/html".to_string())],
            }),
            Binding::Soap | Binding::Paos | Binding::Uri => Ok(HttpArtifacts {
                data: Some(message.to_string()),
                headers: vec![("Content-Type".to_string(), "text/xml".to_string())],
            }),
            Binding::HttpArtifact => Err(CodecError::Internal(
                "artifact response binding not scripted".to_string(),
            )),
        }
    }

    fn verify_redirect_signature(&self, envelope: &RequestEnvelope, certificate: &str) -> bool {
        certificate == "cert-1" && envelope.signature() == Some(GOOD_SIGNATURE)
    }

    fn signing_certificates(&self, entity_id: &str) -> Vec<String> {
        if self.sps.contains_key(entity_id) {
            vec!["cert-1".to_string()]
        } else {
            Vec::new()
        }
    }

    fn resolve_artifact(&self, artifact: &str) -> Result<String, CodecError> {
        self.artifacts
            .get(artifact)
            .cloned()
            .ok_or_else(|| CodecError::UnknownSubject(artifact.to_string()))
    }

    fn find_local_id(&self, name_id: &NameId) -> Option<String> {
        self.local_ids.get(&name_id.value).cloned()
    }

    fn remove_authn_statements(&self, name_id: &NameId) -> Result<(), CodecError> {
        let mut statements = self
            .authn_statements
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if statements.remove(&name_id.value) {
            Ok(())
        } else {
            Err(CodecError::UnknownSubject(name_id.value.clone()))
        }
    }

    fn metadata_document(&self) -> Result<String, CodecError> {
        Ok("<EntityDescriptor/>".to_string())
    }
}

/// Run one request through a freshly built router over the shared state.
pub async fn send(
    state: IdpState,
    request: axum::http::Request<axum::body::Body>,
) -> (axum::http::StatusCode, axum::http::HeaderMap, String) {
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    let response = windrose_idp::router(state)
        .oneshot(request)
        .await
        .expect("router is infallible");
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.expect("body").to_bytes();
    (
        parts.status,
        parts.headers,
        String::from_utf8_lossy(&bytes).into_owned(),
    )
}

pub fn test_state() -> IdpState {
    let mut identity = InMemoryIdentityStore::new();
    let mut attributes = Attributes::new();
    attributes.insert("surName".to_string(), "Jeter".to_string());
    attributes.insert("givenName".to_string(), "Derek".to_string());
    identity.add_user("testuser", "qwerty", attributes);

    let mut extra = Attributes::new();
    extra.insert(
        "eduPersonAffiliation".to_string(),
        "staff".to_string(),
    );
    identity.add_extra("testuser", extra);

    IdpState::new(
        Arc::new(MockEngine::new()),
        Arc::new(identity),
        IdpConfig::default(),
    )
}
