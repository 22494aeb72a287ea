//! SAML 2.0 identity provider core.
//!
//! Implements the IdP side of the SAML 2.0 profiles — single sign-on
//! (redirect, POST, artifact and ECP entry points), single logout, name
//! identifier management and mapping, attribute/authn queries, artifact
//! and assertion ID resolution — plus the interactive login flow that
//! backs them.
//!
//! Message parsing, XML construction, signing and trust metadata live
//! behind the [`codec::SamlEngine`] trait; the embedding process supplies
//! an implementation backed by a real SAML library together with an
//! [`identity::IdentityStore`] and mounts [`router::router`] on its HTTP
//! server.

pub mod binding;
pub mod broker;
pub mod codec;
pub mod config;
pub mod cookie;
pub mod error;
pub mod identity;
pub mod router;
pub mod services;
pub mod session;
pub mod state;
pub mod ticket;

mod login;
mod metadata;

pub use binding::{Binding, RequestEnvelope};
pub use broker::{AuthnBroker, AuthnMethod, AUTHN_CONTEXT_PASSWORD, AUTHN_CONTEXT_UNSPECIFIED};
pub use codec::{CodecError, SamlEngine};
pub use config::IdpConfig;
pub use error::{IdpError, IdpResult};
pub use identity::{Attributes, IdentityStore, InMemoryIdentityStore};
pub use router::router;
pub use session::SessionCache;
pub use state::IdpState;
pub use ticket::{ticket_key, TicketStore};
