//! authmigrate core library.
//!
//! This crate provides the pieces of a legacy-user migration into Supabase
//! auth: env-based configuration, the REST / auth admin API client,
//! email-keyed identity matching, mapping output, and the reconciler that
//! ties them together.

pub mod config;
pub mod errors;
pub mod identity;
pub mod models;
pub mod reconcile;
pub mod supabase;

// Re-exports for convenience.
pub use config::MigrationConfig;
pub use identity::AuthDirectory;
pub use reconcile::{ReconcileOptions, ReconcileReport, Reconciler};
pub use supabase::SupabaseClient;
