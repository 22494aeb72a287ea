//! IdP runtime configuration.

use std::path::PathBuf;

/// Settings carried in the shared state. Constructed by the embedding
/// process; host/port/TLS and trust configuration live with the transport
/// and codec collaborators.
#[derive(Debug, Clone)]
pub struct IdpConfig {
    /// Name of the authentication handoff cookie.
    pub cookie_name: String,
    /// Cookie lifetime in minutes; matches the login handoff window.
    pub cookie_ttl_minutes: i64,
    /// Pending-request ticket lifetime in seconds.
    pub ticket_ttl_seconds: i64,
    /// Bound on parked pending requests.
    pub ticket_capacity: usize,
    /// Base policy URL recorded with registered authentication methods.
    pub authn_policy_url: String,
    /// Path the login form posts credentials to.
    pub verify_path: String,
    /// Root directory served under `static/`; disabled when unset.
    pub static_root: Option<PathBuf>,
}

impl Default for IdpConfig {
    fn default() -> Self {
        Self {
            cookie_name: "idpauthn".to_string(),
            cookie_ttl_minutes: 5,
            ticket_ttl_seconds: crate::ticket::DEFAULT_TICKET_TTL_SECONDS,
            ticket_capacity: crate::ticket::DEFAULT_TICKET_CAPACITY,
            authn_policy_url: "http://localhost:8088/".to_string(),
            verify_path: "/verify".to_string(),
            static_root: None,
        }
    }
}
