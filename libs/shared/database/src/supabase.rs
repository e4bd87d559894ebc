use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, Response,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use shared_config::AppConfig;
use shared_models::auth::{AuthSession, AuthUser, Profile};

use crate::error::BackendError;
use crate::retry::RetryPolicy;
use crate::tables;

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const RETURN_REPRESENTATION: &str = "return=representation";

/// Handle to the hosted backend. Built once at startup and shared through
/// application state.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    retry_policy: RetryPolicy,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_retry_policy(config, RetryPolicy::from_config(config))
    }

    pub fn with_retry_policy(config: &AppConfig, retry_policy: RetryPolicy) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            retry_policy,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, BackendError> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", header_value(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // Anonymous callers (public booking, portals) act as the anon role.
        let bearer = auth_token.unwrap_or(&self.anon_key);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", bearer))?);

        Ok(headers)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<Response, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            let err = BackendError::from_response(status.as_u16(), &error_text);
            if status.is_server_error() {
                error!("API error ({}): {}", status, error_text);
            } else {
                debug!("API error ({}): {}", status, error_text);
            }
            return Err(err);
        }

        Ok(response)
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        headers: Option<HeaderMap>,
    ) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(method, path, auth_token, body, headers).await?;
        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// GET expecting exactly one row. Zero rows surface as [`BackendError::NoRows`].
    pub async fn request_single<T>(&self, path: &str, auth_token: Option<&str>) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(SINGLE_OBJECT));
        self.request_with_headers(Method::GET, path, auth_token, None, Some(headers))
            .await
    }

    /// For responses without a body (deletes, logout).
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(), BackendError> {
        self.send(method, path, auth_token, body, None).await?;
        Ok(())
    }

    pub async fn select<T>(&self, table: &str, query: &str, auth_token: Option<&str>) -> Result<Vec<T>, BackendError>
    where
        T: DeserializeOwned,
    {
        let path = if query.is_empty() {
            tables::rest_path(table)
        } else {
            format!("{}?{}", tables::rest_path(table), query)
        };
        self.request(Method::GET, &path, auth_token, None).await
    }

    pub async fn insert<T>(&self, table: &str, row: Value, auth_token: Option<&str>) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let rows: Vec<T> = self
            .request_with_headers(
                Method::POST,
                &tables::rest_path(table),
                auth_token,
                Some(json!([row])),
                Some(representation_headers()),
            )
            .await?;
        rows.into_iter().next().ok_or(BackendError::NoRows)
    }

    /// PATCH rows matching `filter` (e.g. `id=eq.<uuid>`) and return the first updated row.
    pub async fn update<T>(
        &self,
        table: &str,
        filter: &str,
        patch: Value,
        auth_token: Option<&str>,
    ) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let path = format!("{}?{}", tables::rest_path(table), filter);
        let rows: Vec<T> = self
            .request_with_headers(
                Method::PATCH,
                &path,
                auth_token,
                Some(patch),
                Some(representation_headers()),
            )
            .await?;
        rows.into_iter().next().ok_or(BackendError::NoRows)
    }

    pub async fn delete(&self, table: &str, filter: &str, auth_token: Option<&str>) -> Result<(), BackendError> {
        let path = format!("{}?{}", tables::rest_path(table), filter);
        self.execute(Method::DELETE, &path, auth_token, None).await
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        self.request(
            Method::POST,
            "/auth/v1/token?grant_type=password",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Registers a user. GoTrue answers with the user object when email
    /// confirmation is pending, so only the user is extracted.
    pub async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<AuthUser, BackendError> {
        let response: Value = self
            .request(
                Method::POST,
                "/auth/v1/signup",
                None,
                Some(json!({
                    "email": email,
                    "password": password,
                    "data": { "full_name": full_name }
                })),
            )
            .await?;

        let user = response.get("user").cloned().unwrap_or(response);
        Ok(serde_json::from_value(user)?)
    }

    pub async fn get_user(&self, auth_token: &str) -> Result<AuthUser, BackendError> {
        self.request(Method::GET, "/auth/v1/user", Some(auth_token), None)
            .await
    }

    pub async fn sign_out(&self, auth_token: &str) -> Result<(), BackendError> {
        self.execute(Method::POST, "/auth/v1/logout", Some(auth_token), None)
            .await
    }

    pub async fn get_profile(&self, user_id: &str, auth_token: Option<&str>) -> Result<Profile, BackendError> {
        let path = format!("{}?id=eq.{}", tables::rest_path(tables::PROFILES), user_id);
        self.request_single(&path, auth_token).await
    }

    /// Cheapest query that proves the backend is awake.
    pub async fn check_connection(&self) -> Result<(), BackendError> {
        self.retry_policy
            .execute(|| async {
                let _: Vec<Value> = self.select(tables::PROFILES, "select=id&limit=1", None).await?;
                Ok::<(), BackendError>(())
            })
            .await
            .map_err(|e| {
                warn!("Connectivity check failed: {}", e);
                e
            })
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

fn header_value(raw: &str) -> Result<HeaderValue, BackendError> {
    HeaderValue::from_str(raw).map_err(|e| BackendError::Api {
        status: 0,
        code: None,
        message: format!("Invalid header value: {}", e),
    })
}

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static(RETURN_REPRESENTATION));
    headers
}
