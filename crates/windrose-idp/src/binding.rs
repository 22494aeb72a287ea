//! SAML binding identifiers and the protocol-neutral request envelope.

use axum::http::Method;
use std::collections::HashMap;

/// Transport binding of a SAML message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    HttpRedirect,
    HttpPost,
    HttpArtifact,
    Soap,
    Paos,
    Uri,
}

impl Binding {
    /// The OASIS binding URN.
    #[must_use]
    pub fn urn(self) -> &'static str {
        match self {
            Binding::HttpRedirect => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect",
            Binding::HttpPost => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST",
            Binding::HttpArtifact => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Artifact",
            Binding::Soap => "urn:oasis:names:tc:SAML:2.0:bindings:SOAP",
            Binding::Paos => "urn:oasis:names:tc:SAML:2.0:bindings:PAOS",
            Binding::Uri => "urn:oasis:names:tc:SAML:2.0:bindings:URI",
        }
    }
}

/// Protocol-defined fields of an inbound message (`SAMLRequest`,
/// `RelayState`, `SigAlg`, `Signature`, `SAMLart`, ...), produced uniformly
/// regardless of which binding carried them.
///
/// Decoding is lenient: unparsable input yields an empty envelope, and a
/// missing mandatory field is reported by the caller as a client error.
#[derive(Debug, Clone, Default)]
pub struct RequestEnvelope {
    fields: HashMap<String, String>,
}

impl RequestEnvelope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode from a query string (HTTP-Redirect binding).
    /// The first value wins for repeated fields.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut fields = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            fields
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        Self { fields }
    }

    /// Decode from a form-encoded body (HTTP-POST binding).
    #[must_use]
    pub fn from_form(body: &str) -> Self {
        Self::from_query(body)
    }

    /// Wrap a raw SOAP body: the whole payload is the request, no relay state.
    #[must_use]
    pub fn from_soap(body: &str) -> Self {
        let mut fields = HashMap::new();
        fields.insert("SAMLRequest".to_string(), body.to_string());
        fields.insert("RelayState".to_string(), String::new());
        Self { fields }
    }

    /// Decode from the query string on GET, the form body on POST.
    #[must_use]
    pub fn from_either(method: &Method, query: Option<&str>, body: &str) -> Self {
        if method == Method::GET {
            Self::from_query(query.unwrap_or(""))
        } else if method == Method::POST {
            Self::from_form(body)
        } else {
            Self::new()
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn insert(&mut self, field: &str, value: &str) {
        self.fields.insert(field.to_string(), value.to_string());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn saml_request(&self) -> Option<&str> {
        self.get("SAMLRequest")
    }

    #[must_use]
    pub fn relay_state(&self) -> &str {
        self.get("RelayState").unwrap_or("")
    }

    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        self.get("Signature")
    }

    #[must_use]
    pub fn sig_alg(&self) -> Option<&str> {
        self.get("SigAlg")
    }

    #[must_use]
    pub fn artifact(&self) -> Option<&str> {
        self.get("SAMLart")
    }
}
