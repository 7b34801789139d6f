//! Supabase REST and auth admin API client.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::MigrationConfig;
use crate::errors::ApiError;
use crate::models::{AuthUser, AuthUserPage, LegacyUser, NewAuthUser};

/// Columns requested from the legacy `users` table.
pub const LEGACY_USER_COLUMNS: &str = "id,email,name,image_url,avatar_url,legacy_user_id";

/// Page size for the auth admin listing. A shorter page marks the end.
pub const AUTH_PAGE_SIZE: usize = 200;

/// Asynchronous client authenticated with the service-role key.
///
/// Every request carries `apikey`, `Authorization: Bearer` and
/// `Content-Type: application/json`.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    rest_users_url: String,
    auth_admin_users_url: String,
    service_role_key: String,
}

impl SupabaseClient {
    pub fn new(config: &MigrationConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let mut apikey = HeaderValue::from_str(&config.service_role_key)
            .map_err(|_| ApiError::InvalidHeader("apikey".into()))?;
        apikey.set_sensitive(true);
        headers.insert("apikey", apikey);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        info!(base_url = %config.base_url, "created SupabaseClient");
        Ok(Self {
            http,
            rest_users_url: config.rest_users_url(),
            auth_admin_users_url: config.auth_admin_users_url(),
            service_role_key: config.service_role_key.clone(),
        })
    }

    /// Send one request and decode the body as JSON.
    ///
    /// An empty body yields an empty JSON object. Non-2xx statuses and
    /// undecodable bodies are errors.
    #[instrument(skip(self, query, payload))]
    pub async fn request_json<Q, B>(
        &self,
        method: Method,
        url: &str,
        query: Option<&Q>,
        payload: Option<&B>,
    ) -> Result<Value, ApiError>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let mut req = self
            .http
            .request(method, url)
            .bearer_auth(&self.service_role_key);
        if let Some(query) = query {
            req = req.query(query);
        }
        if let Some(payload) = payload {
            req = req.json(payload);
        }

        let resp = check_response(req.send().await?).await?;
        let body = resp.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            debug!("empty response body");
            return Ok(Value::Object(serde_json::Map::new()));
        }
        serde_json::from_slice(&body).map_err(|e| ApiError::ParseError(e.to_string()))
    }

    /// Fetch every row of the legacy `users` table.
    #[instrument(skip(self))]
    pub async fn fetch_legacy_users(&self) -> Result<Vec<LegacyUser>, ApiError> {
        let data = self
            .request_json(
                Method::GET,
                &self.rest_users_url,
                Some(&[("select", LEGACY_USER_COLUMNS)]),
                None::<&Value>,
            )
            .await?;
        let users: Vec<LegacyUser> = match data {
            Value::Object(map) if map.is_empty() => Vec::new(),
            other => serde_json::from_value(other)
                .map_err(|e| ApiError::ParseError(format!("legacy users: {e}")))?,
        };
        info!(count = users.len(), "fetched legacy users");
        Ok(users)
    }

    /// Fetch a single page of auth users (pages start at 1).
    #[instrument(skip(self))]
    pub async fn list_auth_users_page(
        &self,
        page: u32,
        per_page: usize,
    ) -> Result<Vec<AuthUser>, ApiError> {
        let page_s = page.to_string();
        let per_page_s = per_page.to_string();
        let data = self
            .request_json(
                Method::GET,
                &self.auth_admin_users_url,
                Some(&[("page", page_s.as_str()), ("per_page", per_page_s.as_str())]),
                None::<&Value>,
            )
            .await?;
        if !data.is_object() {
            warn!(page, "auth users page is not an object, treating as empty");
            return Ok(Vec::new());
        }
        let parsed: AuthUserPage = serde_json::from_value(data)
            .map_err(|e| ApiError::ParseError(format!("auth users page {page}: {e}")))?;
        debug!(page, count = parsed.users.len(), "fetched auth users page");
        Ok(parsed.users)
    }

    /// Walk the auth admin listing until a short page comes back.
    #[instrument(skip(self))]
    pub async fn fetch_all_auth_users(&self) -> Result<Vec<AuthUser>, ApiError> {
        let mut users = Vec::new();
        let mut page = 1;
        loop {
            let batch = self.list_auth_users_page(page, AUTH_PAGE_SIZE).await?;
            let len = batch.len();
            users.extend(batch);
            if len < AUTH_PAGE_SIZE {
                break;
            }
            page += 1;
        }
        info!(count = users.len(), pages = page, "fetched auth users");
        Ok(users)
    }

    /// Create an auth account. Returns `None` when the response carries no
    /// usable user `id`.
    #[instrument(skip(self, new_user), fields(email = %new_user.email))]
    pub async fn create_auth_user(
        &self,
        new_user: &NewAuthUser,
    ) -> Result<Option<AuthUser>, ApiError> {
        let data = self
            .request_json(
                Method::POST,
                &self.auth_admin_users_url,
                None::<&[(&str, &str)]>,
                Some(new_user),
            )
            .await?;
        match serde_json::from_value::<AuthUser>(data) {
            Ok(user) if !user.id.is_empty() => {
                info!(auth_id = %user.id, "created auth user");
                Ok(Some(user))
            }
            Ok(_) | Err(_) => {
                warn!("create response did not contain a user id");
                Ok(None)
            }
        }
    }
}

async fn check_response(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let url = resp.url().to_string();
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(ApiError::AuthenticationFailed(format!("HTTP {status} for {url}")));
    }
    if status.as_u16() == 429 {
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        return Err(ApiError::RateLimited { retry_after });
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::ApiError {
        status: status.as_u16(),
        url,
        body,
    })
}
