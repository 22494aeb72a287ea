//! Authentication method broker.
//!
//! Orders and selects among configured authentication methods by the authn
//! context class an SP requests. Built once at startup, then shared
//! read-only across requests.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Password authn context class.
pub const AUTHN_CONTEXT_PASSWORD: &str = "urn:oasis:names:tc:SAML:2.0:ac:classes:Password";

/// Unspecified authn context class; satisfies any requested strength.
pub const AUTHN_CONTEXT_UNSPECIFIED: &str = "urn:oasis:names:tc:SAML:2.0:ac:classes:unspecified";

/// How a registered method authenticates the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthnMethod {
    /// Interactive login form posting to the verify endpoint.
    UsernamePassword,
    /// No concrete mechanism; placeholder for the unspecified class.
    Unspecified,
}

/// One registered authentication method.
#[derive(Debug, Clone)]
pub struct AuthnMethodEntry {
    pub class_ref: String,
    pub method: AuthnMethod,
    pub priority: u32,
    pub policy: String,
    /// Opaque reference carried through the cookie so a later request can
    /// be attributed back to this method.
    pub reference: String,
}

#[derive(Debug, Default)]
pub struct AuthnBroker {
    entries: Vec<AuthnMethodEntry>,
}

impl AuthnBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method; returns its reference.
    pub fn add(
        &mut self,
        class_ref: &str,
        method: AuthnMethod,
        priority: u32,
        policy: &str,
    ) -> String {
        let reference: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        self.entries.push(AuthnMethodEntry {
            class_ref: class_ref.to_string(),
            method,
            priority,
            policy: policy.to_string(),
            reference: reference.clone(),
        });
        reference
    }

    /// Methods able to satisfy the requested authn context, strongest
    /// (highest priority) first. An exact class match qualifies, and the
    /// unspecified class is always acceptable. An empty result is the named
    /// "no usable authentication method" outcome, not a failure here.
    #[must_use]
    pub fn pick(&self, requested: Option<&str>) -> Vec<(AuthnMethod, String)> {
        let mut matched: Vec<&AuthnMethodEntry> = self
            .entries
            .iter()
            .filter(|entry| match requested {
                None => true,
                Some(class) if class == AUTHN_CONTEXT_UNSPECIFIED => true,
                Some(class) => {
                    entry.class_ref == class || entry.class_ref == AUTHN_CONTEXT_UNSPECIFIED
                }
            })
            .collect();
        matched.sort_by(|a, b| b.priority.cmp(&a.priority));
        matched
            .into_iter()
            .map(|entry| (entry.method, entry.reference.clone()))
            .collect()
    }

    /// Resolve a cookie-carried reference back to its method.
    #[must_use]
    pub fn get_by_reference(&self, reference: &str) -> Option<&AuthnMethodEntry> {
        self.entries.iter().find(|entry| entry.reference == reference)
    }

    /// The registered entry for an authn context class, if any.
    #[must_use]
    pub fn entry_for_class(&self, class_ref: &str) -> Option<&AuthnMethodEntry> {
        self.entries.iter().find(|entry| entry.class_ref == class_ref)
    }
}
