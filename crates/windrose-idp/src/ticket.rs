//! Pending-request ticket store.
//!
//! When an unauthenticated user must be sent through the login flow, the
//! parsed request is parked here under a content hash of the raw encoded
//! message and replayed once the user returns. Entries are consumed at most
//! once (delete-on-read) and expire after a TTL; at capacity the oldest
//! entry is evicted.

use crate::binding::RequestEnvelope;
use crate::codec::AuthnRequest;
use chrono::{DateTime, Duration, Utc};
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Default ticket lifetime; matches the login handoff window.
pub const DEFAULT_TICKET_TTL_SECONDS: i64 = 300;

/// Default bound on parked requests.
pub const DEFAULT_TICKET_CAPACITY: usize = 1024;

/// A parked, not-yet-authenticated request.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub envelope: RequestEnvelope,
    pub request: AuthnRequest,
    stored_at: DateTime<Utc>,
    seq: u64,
}

/// Deterministic replay key for a raw encoded request. Identical input
/// yields the identical key, so client retries are idempotent.
#[must_use]
pub fn ticket_key(raw_request: &str) -> String {
    let digest = Sha1::digest(raw_request.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[derive(Debug)]
pub struct TicketStore {
    entries: RwLock<HashMap<String, Ticket>>,
    ttl: Duration,
    capacity: usize,
    next_seq: AtomicU64,
}

impl Default for TicketStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_TICKET_TTL_SECONDS, DEFAULT_TICKET_CAPACITY)
    }
}

impl TicketStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limits(ttl_seconds: i64, capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(ttl_seconds),
            capacity: capacity.max(1),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Park a pending request, returning its replay key.
    pub async fn store(&self, envelope: RequestEnvelope, request: AuthnRequest) -> String {
        let key = ticket_key(envelope.saml_request().unwrap_or_default());
        let now = Utc::now();
        let mut entries = self.entries.write().await;

        entries.retain(|_, ticket| now - ticket.stored_at < self.ttl);
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, ticket)| ticket.seq)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                tracing::warn!(key = %oldest, "ticket store at capacity, evicting oldest entry");
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key.clone(),
            Ticket {
                envelope,
                request,
                stored_at: now,
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            },
        );
        tracing::debug!(key = %key, "stored pending request ticket");
        key
    }

    /// Consume a ticket. Removes the entry atomically, so a replay key can
    /// be redeemed at most once; a missing or expired key is an expected,
    /// non-fatal outcome.
    pub async fn take(&self, key: &str) -> Option<Ticket> {
        let mut entries = self.entries.write().await;
        let ticket = entries.remove(key)?;
        if Utc::now() - ticket.stored_at >= self.ttl {
            tracing::debug!(key = %key, "discarding expired ticket");
            return None;
        }
        tracing::debug!(key = %key, "consumed pending request ticket");
        Some(ticket)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
