//! Environment-based configuration for authmigrate.
//!
//! Settings come from two places: an optional `.env` file and the process
//! environment. Process variables always win over file values. The file is
//! never written back into the process environment; instead the merged view
//! is resolved into a [`MigrationConfig`] which callers pass explicitly to the
//! HTTP client.
//!
//! File values are not read literally. The `dotenv` parser expands `$NAME`
//! and `${NAME}` from the real process environment (or from earlier lines of
//! the file), with unknown names expanding to nothing. A bare `$NAME` ends at
//! the first non-alphanumeric character, so `$MY_VAR` expands `$MY`. It drops
//! an unquoted ` #...` tail and rejects unquoted values containing spaces.
//! Only single quotes keep a `$` literal.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::errors::ConfigError;

/// Primary variable holding the Supabase project URL.
pub const URL_VAR: &str = "SUPABASE_URL";
/// Fallback variable holding the Supabase project URL (Next.js convention).
pub const PUBLIC_URL_VAR: &str = "NEXT_PUBLIC_SUPABASE_URL";
/// Variable holding the service-role key.
pub const SERVICE_ROLE_KEY_VAR: &str = "SUPABASE_SERVICE_ROLE_KEY";
/// Env file read when no other path is given.
pub const DEFAULT_ENV_FILE: &str = ".env";

// ---------------------------------------------------------------------------
// Env file
// ---------------------------------------------------------------------------

/// Reader for `KEY=VALUE` env files.
pub struct EnvFile;

impl EnvFile {
    /// Parse the env file at `path` into a map.
    ///
    /// A missing file yields an empty map. Blank lines and `#` comments are
    /// ignored; lines the parser cannot understand are skipped with a warning.
    /// When a key repeats, the first occurrence is kept. Values go through
    /// `dotenv`'s quoting and `$` substitution rules (see the module docs).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<HashMap<String, String>, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "env file not found, skipping");
            return Ok(HashMap::new());
        }

        info!(path = %path.display(), "loading env file");
        let iter = dotenv::from_path_iter(path).map_err(|e| ConfigError::EnvFile {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;

        let mut vars = HashMap::new();
        for item in iter {
            match item {
                Ok((key, value)) => {
                    vars.entry(key).or_insert(value);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping malformed env line");
                }
            }
        }

        debug!(count = vars.len(), "parsed env file");
        Ok(vars)
    }
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Everything a migration run needs to talk to Supabase.
#[derive(Clone)]
pub struct MigrationConfig {
    /// Project base URL without a trailing slash.
    pub base_url: String,
    /// Service-role key sent as `apikey` and bearer token.
    pub service_role_key: String,
}

impl fmt::Debug for MigrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationConfig")
            .field("base_url", &self.base_url)
            .field("service_role_key", &self.masked_key())
            .finish()
    }
}

impl MigrationConfig {
    /// Build a config directly from known values.
    pub fn new(base_url: impl Into<String>, service_role_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_role_key: service_role_key.into(),
        }
    }

    /// Merge env-file values with a process-environment lookup.
    ///
    /// A variable present in the process environment shadows the file, even
    /// when it is empty. Empty values are then treated as unset, so an empty
    /// `SUPABASE_URL` falls through to `NEXT_PUBLIC_SUPABASE_URL`.
    pub fn resolve<F>(
        file_vars: &HashMap<String, String>,
        process_env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| -> Option<String> {
            process_env(name)
                .or_else(|| file_vars.get(name).cloned())
                .filter(|v| !v.is_empty())
        };

        let base_url = lookup(URL_VAR).or_else(|| lookup(PUBLIC_URL_VAR));
        let key = lookup(SERVICE_ROLE_KEY_VAR);

        match (base_url, key) {
            (Some(url), Some(key)) => {
                let config = Self::new(url, key);
                debug!(base_url = %config.base_url, "resolved Supabase settings");
                Ok(config)
            }
            (url, key) => {
                let mut missing = Vec::new();
                if url.is_none() {
                    missing.push(format!("{URL_VAR}/{PUBLIC_URL_VAR}"));
                }
                if key.is_none() {
                    missing.push(SERVICE_ROLE_KEY_VAR.to_string());
                }
                warn!(?missing, "required Supabase settings not set");
                Err(ConfigError::MissingRequired { missing })
            }
        }
    }

    /// Validate that the base URL is an absolute http(s) URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidValue {
            field: URL_VAR.into(),
            detail: format!("'{}' is not a valid URL: {e}", self.base_url),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                field: URL_VAR.into(),
                detail: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        if self.service_role_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: SERVICE_ROLE_KEY_VAR.into(),
                detail: "service-role key must not be blank".into(),
            });
        }
        Ok(())
    }

    /// Legacy users table endpoint (PostgREST).
    pub fn rest_users_url(&self) -> String {
        format!("{}/rest/v1/users", self.base_url)
    }

    /// Auth admin users endpoint (list and create).
    pub fn auth_admin_users_url(&self) -> String {
        format!("{}/auth/v1/admin/users", self.base_url)
    }

    /// The key with everything but the last four characters hidden.
    pub fn masked_key(&self) -> String {
        let chars: Vec<char> = self.service_role_key.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_process_env(_: &str) -> Option<String> {
        None
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_file_skips_blank_comment_and_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "# comment\n\nSUPABASE_URL=https://proj.supabase.co\nnot a pair\n\
             SUPABASE_SERVICE_ROLE_KEY=secret\n",
        )
        .unwrap();

        let loaded = EnvFile::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["SUPABASE_URL"], "https://proj.supabase.co");
        assert_eq!(loaded["SUPABASE_SERVICE_ROLE_KEY"], "secret");
    }

    #[test]
    fn test_env_file_applies_dotenv_value_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "SUPABASE_SERVICE_ROLE_KEY=abc$AuthmigrateUnsetName\n\
             QUOTED_KEY='abc$AuthmigrateUnsetName'\n\
             UNDERSCORE_KEY=x$AuthmigrateUnset_tail\n\
             NEXT_PUBLIC_SUPABASE_URL=has space\n\
             SUPABASE_URL=https://p.supabase.co #x\n\
             QUOTED_SPACE=\"has space\"\n",
        )
        .unwrap();

        let loaded = EnvFile::load(&path).unwrap();
        // Unset names expand to nothing unless single-quoted.
        assert_eq!(loaded["SUPABASE_SERVICE_ROLE_KEY"], "abc");
        assert_eq!(loaded["QUOTED_KEY"], "abc$AuthmigrateUnsetName");
        assert_eq!(loaded["UNDERSCORE_KEY"], "x_tail");
        // Unquoted spaces reject the line; quoting keeps it.
        assert!(!loaded.contains_key(PUBLIC_URL_VAR));
        assert_eq!(loaded["QUOTED_SPACE"], "has space");
        assert_eq!(loaded["SUPABASE_URL"], "https://p.supabase.co");
        assert_eq!(loaded.len(), 5);
    }

    #[test]
    fn test_env_file_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = EnvFile::load(dir.path().join("nope.env")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_process_env_wins_over_file() {
        let file = vars(&[
            (URL_VAR, "https://file.supabase.co"),
            (SERVICE_ROLE_KEY_VAR, "file-key"),
        ]);
        let config = MigrationConfig::resolve(&file, |name| {
            (name == SERVICE_ROLE_KEY_VAR).then(|| "process-key".to_string())
        })
        .unwrap();
        assert_eq!(config.base_url, "https://file.supabase.co");
        assert_eq!(config.service_role_key, "process-key");
    }

    #[test]
    fn test_public_url_fallback_and_trailing_slash() {
        let file = vars(&[
            (URL_VAR, ""),
            (PUBLIC_URL_VAR, "https://public.supabase.co/"),
            (SERVICE_ROLE_KEY_VAR, "k"),
        ]);
        let config = MigrationConfig::resolve(&file, no_process_env).unwrap();
        assert_eq!(config.base_url, "https://public.supabase.co");
        assert_eq!(
            config.auth_admin_users_url(),
            "https://public.supabase.co/auth/v1/admin/users"
        );
        assert_eq!(
            config.rest_users_url(),
            "https://public.supabase.co/rest/v1/users"
        );
    }

    #[test]
    fn test_missing_key_reports_variable() {
        let file = vars(&[(URL_VAR, "https://proj.supabase.co")]);
        let err = MigrationConfig::resolve(&file, no_process_env).unwrap_err();
        match err {
            ConfigError::MissingRequired { missing } => {
                assert_eq!(missing, vec![SERVICE_ROLE_KEY_VAR.to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_process_value_shadows_file() {
        let file = vars(&[
            (URL_VAR, "https://proj.supabase.co"),
            (SERVICE_ROLE_KEY_VAR, "file-key"),
        ]);
        let err = MigrationConfig::resolve(&file, |name| {
            (name == SERVICE_ROLE_KEY_VAR).then(String::new)
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = MigrationConfig::new("not a url", "k");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let config = MigrationConfig::new("ftp://proj.supabase.co", "k");
        assert!(config.validate().is_err());

        let config = MigrationConfig::new("https://proj.supabase.co", "k");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_masks_key() {
        let config = MigrationConfig::new("https://proj.supabase.co", "supersecret1234");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("supersecret"));
        assert!(rendered.contains("1234"));
        assert_eq!(MigrationConfig::new("x", "abc").masked_key(), "***");
    }
}
