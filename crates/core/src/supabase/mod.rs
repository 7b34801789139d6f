//! Supabase API access for authmigrate.

pub mod client;

pub use client::{SupabaseClient, AUTH_PAGE_SIZE};
