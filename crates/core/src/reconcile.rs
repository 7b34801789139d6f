//! Legacy user to auth account reconciliation.
//!
//! The [`Reconciler`] runs one migration pass:
//!
//! 1. Fetch all legacy users.
//! 2. Fetch all auth users, page by page.
//! 3. Index auth users by lowercase email.
//! 4. For each legacy user with an email, reuse the matching auth account or
//!    create a confirmed one.
//! 5. Collect `{legacy_id, auth_id}` pairs in legacy fetch order.
//!
//! Requests are strictly sequential.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::errors::ApiError;
use crate::identity::AuthDirectory;
use crate::models::{LegacyUser, MappingEntry, NewAuthUser};
use crate::supabase::SupabaseClient;

/// Knobs for a reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Report missing accounts instead of creating them.
    pub dry_run: bool,
}

/// Counters from a single pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileStats {
    pub legacy_total: usize,
    pub auth_indexed: usize,
    pub matched: usize,
    pub created: usize,
    pub would_create: usize,
    pub skipped_without_email: usize,
    pub skipped_unresolved: usize,
    pub started_at: String,
    pub completed_at: Option<String>,
}

impl ReconcileStats {
    /// Number of legacy users that did not make it into the mapping.
    pub fn skipped(&self) -> usize {
        self.skipped_without_email + self.skipped_unresolved
    }
}

/// Mapping plus statistics.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub mapping: Vec<MappingEntry>,
    pub stats: ReconcileStats,
}

/// Drives a migration pass against one Supabase project.
pub struct Reconciler {
    client: SupabaseClient,
    options: ReconcileOptions,
}

impl Reconciler {
    pub fn new(client: SupabaseClient, options: ReconcileOptions) -> Self {
        info!(dry_run = options.dry_run, "initializing reconciler");
        Self { client, options }
    }

    /// Fetch both user sets and reconcile them.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<ReconcileReport, ApiError> {
        let started_at = Utc::now().to_rfc3339();

        let legacy_users = self.client.fetch_legacy_users().await?;
        let auth_users = self.client.fetch_all_auth_users().await?;
        let mut directory = AuthDirectory::from_users(auth_users);

        let mut report = self.reconcile(&legacy_users, &mut directory).await?;
        report.stats.started_at = started_at;
        report.stats.completed_at = Some(Utc::now().to_rfc3339());

        let stats = &report.stats;
        info!(
            legacy_total = stats.legacy_total,
            matched = stats.matched,
            created = stats.created,
            would_create = stats.would_create,
            skipped = stats.skipped(),
            mapped = report.mapping.len(),
            "reconciliation complete"
        );
        Ok(report)
    }

    /// Reconcile already-fetched legacy users against `directory`.
    ///
    /// Newly created accounts are added to `directory`, so a repeated email
    /// later in the list reuses the account instead of creating another.
    pub async fn reconcile(
        &self,
        legacy_users: &[LegacyUser],
        directory: &mut AuthDirectory,
    ) -> Result<ReconcileReport, ApiError> {
        let mut stats = ReconcileStats {
            legacy_total: legacy_users.len(),
            auth_indexed: directory.len(),
            ..Default::default()
        };
        let mut mapping = Vec::with_capacity(legacy_users.len());

        for user in legacy_users {
            let Some(email) = user.email() else {
                debug!(legacy_id = ?user.legacy_id(), "legacy user without email skipped");
                stats.skipped_without_email += 1;
                continue;
            };

            let auth_id = match directory.lookup(email) {
                Some(existing) => {
                    stats.matched += 1;
                    Some(existing.id.clone())
                }
                None if self.options.dry_run => {
                    debug!(email, "would create auth user");
                    stats.would_create += 1;
                    None
                }
                None => {
                    let new_user = NewAuthUser::confirmed(email, user.auth_metadata());
                    match self.client.create_auth_user(&new_user).await? {
                        Some(created) => {
                            stats.created += 1;
                            let id = created.id.clone();
                            directory.insert_for(email, created);
                            Some(id)
                        }
                        None => None,
                    }
                }
            };

            match (user.legacy_id(), auth_id) {
                (Some(legacy_id), Some(auth_id)) => mapping.push(MappingEntry {
                    legacy_id: legacy_id.clone(),
                    auth_id,
                }),
                (legacy_id, auth_id) => {
                    if !(self.options.dry_run && auth_id.is_none()) {
                        debug!(email, ?legacy_id, ?auth_id, "legacy user could not be resolved");
                        stats.skipped_unresolved += 1;
                    }
                }
            }
        }

        Ok(ReconcileReport { mapping, stats })
    }
}
