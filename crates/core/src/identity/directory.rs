//! Email-keyed index of auth accounts.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::models::AuthUser;

/// In-memory lookup of auth users by lowercase email.
///
/// Accounts without an email are never indexed. When two accounts share an
/// email, the later one wins.
#[derive(Debug, Default)]
pub struct AuthDirectory {
    by_email: HashMap<String, AuthUser>,
}

impl AuthDirectory {
    /// Index a fetched set of auth users.
    pub fn from_users(users: impl IntoIterator<Item = AuthUser>) -> Self {
        let mut directory = Self::default();
        let mut skipped = 0usize;
        for user in users {
            if !directory.insert(user) {
                skipped += 1;
            }
        }
        info!(
            indexed = directory.len(),
            skipped_without_email = skipped,
            "built auth directory"
        );
        directory
    }

    /// Find the account for `email`, ignoring case.
    pub fn lookup(&self, email: &str) -> Option<&AuthUser> {
        self.by_email.get(&normalize(email))
    }

    /// Add or replace an account under its own email. Returns `false` if it
    /// has no email.
    pub fn insert(&mut self, user: AuthUser) -> bool {
        let key = match user.email() {
            Some(email) => normalize(email),
            None => {
                debug!(auth_id = %user.id, "auth user without email not indexed");
                return false;
            }
        };
        self.by_email.insert(key, user);
        true
    }

    /// Add or replace an account under `email`, regardless of the email the
    /// account itself reports.
    pub fn insert_for(&mut self, email: &str, user: AuthUser) {
        self.by_email.insert(normalize(email), user);
    }

    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }
}

fn normalize(email: &str) -> String {
    email.to_lowercase()
}
