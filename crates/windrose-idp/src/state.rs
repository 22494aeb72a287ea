//! Shared application state.

use crate::broker::{
    AuthnBroker, AuthnMethod, AUTHN_CONTEXT_PASSWORD, AUTHN_CONTEXT_UNSPECIFIED,
};
use crate::codec::SamlEngine;
use crate::config::IdpConfig;
use crate::identity::IdentityStore;
use crate::session::SessionCache;
use crate::ticket::TicketStore;
use std::sync::Arc;

/// Explicitly constructed store instances, created once at process start
/// and passed by reference to the router and services.
#[derive(Clone)]
pub struct IdpState {
    pub engine: Arc<dyn SamlEngine>,
    pub identity: Arc<dyn IdentityStore>,
    pub tickets: Arc<TicketStore>,
    pub sessions: Arc<SessionCache>,
    pub broker: Arc<AuthnBroker>,
    pub config: Arc<IdpConfig>,
}

impl IdpState {
    /// Build state with the default method table: username/password at
    /// priority 10 and the unspecified class at priority 0.
    #[must_use]
    pub fn new(
        engine: Arc<dyn SamlEngine>,
        identity: Arc<dyn IdentityStore>,
        config: IdpConfig,
    ) -> Self {
        let mut broker = AuthnBroker::new();
        broker.add(
            AUTHN_CONTEXT_PASSWORD,
            AuthnMethod::UsernamePassword,
            10,
            &config.authn_policy_url,
        );
        broker.add(
            AUTHN_CONTEXT_UNSPECIFIED,
            AuthnMethod::Unspecified,
            0,
            &config.authn_policy_url,
        );
        Self::with_broker(engine, identity, config, broker)
    }

    /// Build state with a custom authentication method table.
    #[must_use]
    pub fn with_broker(
        engine: Arc<dyn SamlEngine>,
        identity: Arc<dyn IdentityStore>,
        config: IdpConfig,
        broker: AuthnBroker,
    ) -> Self {
        let tickets = TicketStore::with_limits(config.ticket_ttl_seconds, config.ticket_capacity);
        Self {
            engine,
            identity,
            tickets: Arc::new(tickets),
            sessions: Arc::new(SessionCache::new()),
            broker: Arc::new(broker),
            config: Arc::new(config),
        }
    }
}
