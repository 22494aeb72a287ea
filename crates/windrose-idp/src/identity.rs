//! User and credential store boundary.
//!
//! The real store (directory, database, federation backend) lives outside
//! this core; an in-memory implementation is provided for embedding and
//! tests.

use std::collections::HashMap;

/// Identity attributes released into assertions.
pub type Attributes = HashMap<String, String>;

pub trait IdentityStore: Send + Sync {
    /// Check a username/password pair.
    fn verify_credentials(&self, username: &str, password: &str) -> bool;

    /// Attributes asserted for an authenticated user during SSO.
    fn attributes(&self, user: &str) -> Option<Attributes>;

    /// Extended attributes looked up by subject for attribute queries.
    fn extra_attributes(&self, subject: &str) -> Option<Attributes>;
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    passwords: HashMap<String, String>,
    attributes: HashMap<String, Attributes>,
    extra: HashMap<String, Attributes>,
}

impl InMemoryIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self, username: &str, password: &str, attributes: Attributes) {
        self.passwords
            .insert(username.to_string(), password.to_string());
        self.attributes.insert(username.to_string(), attributes);
    }

    pub fn add_extra(&mut self, subject: &str, attributes: Attributes) {
        self.extra.insert(subject.to_string(), attributes);
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn verify_credentials(&self, username: &str, password: &str) -> bool {
        self.passwords
            .get(username)
            .is_some_and(|expected| constant_time_eq(expected, password))
    }

    fn attributes(&self, user: &str) -> Option<Attributes> {
        self.attributes.get(user).cloned()
    }

    fn extra_attributes(&self, subject: &str) -> Option<Attributes> {
        self.extra.get(subject).cloned()
    }
}
