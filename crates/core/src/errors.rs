//! Error types for the authmigrate core library.
//!
//! Each subsystem has its own error type derived with `thiserror`. The CLI
//! wraps them with `anyhow` context rather than a unified enum.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The service URL or the service-role key is not set.
    #[error("Missing SUPABASE_URL/NEXT_PUBLIC_SUPABASE_URL or SUPABASE_SERVICE_ROLE_KEY")]
    MissingRequired {
        /// Names of the variables that were not found.
        missing: Vec<String>,
    },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// The env file exists but could not be opened.
    #[error("env file error at '{path}': {detail}")]
    EnvFile {
        path: String,
        detail: String,
    },
}

// ---------------------------------------------------------------------------
// Supabase API errors
// ---------------------------------------------------------------------------

/// Errors from the Supabase REST and auth admin APIs.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP-level transport error (network, TLS, etc.).
    #[error("Supabase HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The API returned a non-success status code.
    #[error("Supabase API error (HTTP {status}) for {url}: {body}")]
    ApiError {
        status: u16,
        url: String,
        body: String,
    },

    /// The service-role key was rejected.
    #[error("Supabase authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limit exceeded.
    #[error("Supabase rate limit exceeded (retry after {retry_after})")]
    RateLimited {
        retry_after: String,
    },

    /// The service-role key cannot be sent as an HTTP header.
    #[error("invalid header value for '{0}'")]
    InvalidHeader(String),

    /// JSON deserialization failure.
    #[error("Supabase response parse error: {0}")]
    ParseError(String),
}

// ---------------------------------------------------------------------------
// Mapping output errors
// ---------------------------------------------------------------------------

/// Errors from rendering or writing the legacy/auth mapping.
#[derive(Debug, Error)]
pub enum MappingError {
    /// JSON serialization failed.
    #[error("mapping serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Could not write the mapping file.
    #[error("mapping file error at '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
