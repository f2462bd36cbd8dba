//! Shared REST client
//!
//! Every feature module talks to the backend through one [`ApiClient`]:
//!
//! - base URL `{api_base}/api/v1` from [`Config`]
//! - cookie store enabled so session cookies travel with each request
//! - `X-Tenant-Code` and `Authorization: Bearer` headers from local storage
//! - a single access-token refresh on 401 (never for `/core/me/`)
//!
//! There are no retries beyond that one refresh: errors go straight back to the
//! caller as [`ApiError`].

pub mod decode;
pub mod error;

use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, API_PREFIX};
use crate::storage::{SessionTokens, SharedStore};
use crate::tenant::TenantOverride;

pub use decode::{decode_list, decode_one, Page};
pub use error::{ApiError, DecodeError};

/// Header carrying the tenant code
pub const TENANT_HEADER: &str = "X-Tenant-Code";

/// Path whose 401 must never trigger a refresh
const CURRENT_USER_PATH: &str = "/core/me/";

/// Path of the token refresh endpoint
const TOKEN_REFRESH_PATH: &str = "/token/refresh/";

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

struct Inner {
    http: Client,
    api_root: String,
    store: SharedStore,
    env_tenant_code: Option<String>,
}

/// Pre-configured REST client shared by all feature modules
///
/// Cloning is cheap; all clones share the connection pool and cookie jar.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_root", &self.inner.api_root)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Init` if the HTTP client cannot be created
    pub fn new(config: &Config, store: SharedStore) -> Result<Self, ApiError> {
        Self::build(
            config.api_root(),
            config.request_timeout(),
            &config.api.user_agent,
            store,
            config.tenant.code.clone(),
        )
    }

    /// Create a client against an arbitrary origin (mock servers in tests)
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Init` if the HTTP client cannot be created
    pub fn with_base_url(base_url: &str, store: SharedStore) -> Result<Self, ApiError> {
        Self::build(
            format!("{}{API_PREFIX}", base_url.trim_end_matches('/')),
            Duration::from_secs(30),
            concat!("hakwonplus/", env!("CARGO_PKG_VERSION")),
            store,
            None,
        )
    }

    fn build(
        api_root: String,
        timeout: Duration,
        user_agent: &str,
        store: SharedStore,
        env_tenant_code: Option<String>,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .cookie_store(true)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ApiError::Init(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                api_root,
                store,
                env_tenant_code,
            }),
        })
    }

    /// Root URL every path is appended to
    pub fn api_root(&self) -> &str {
        &self.inner.api_root
    }

    /// Local storage shared with the auth/tenant services
    pub fn store(&self) -> &SharedStore {
        &self.inner.store
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{path}", self.inner.api_root)
        } else {
            format!("{}/{path}", self.inner.api_root)
        }
    }

    // =========================================================================
    // Typed verbs
    // =========================================================================

    /// GET and deserialize
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(Method::GET, path, None, None::<&()>).await?;
        read_json(response).await
    }

    /// GET on behalf of the tenant resolved from the browsing hostname
    ///
    /// `tenant_code` goes out as `X-Tenant-Code` unless a stored or env
    /// override is present, which still wins.
    pub async fn get_for_tenant<T: DeserializeOwned>(
        &self,
        path: &str,
        tenant_code: &str,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let build = || self.inner.http.get(&url);
        let response = self.dispatch(path, Some(tenant_code), build).await?;
        read_json(response).await
    }

    /// GET with query parameters
    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self.send(Method::GET, path, None, Some(query)).await?;
        read_json(response).await
    }

    /// GET a list endpoint and decode any of the accepted list shapes
    pub async fn get_list<T, Q>(&self, path: &str, query: Option<&Q>) -> crate::error::Result<Vec<T>>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self.send(Method::GET, path, None, query).await?;
        let value: Value = read_json(response).await?;
        Ok(decode_list(value)?)
    }

    /// POST a JSON body
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = to_body(body)?;
        let response = self.send(Method::POST, path, Some(body), None::<&()>).await?;
        read_json(response).await
    }

    /// POST an empty JSON object
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .send(Method::POST, path, Some(Value::Object(Default::default())), None::<&()>)
            .await?;
        read_json(response).await
    }

    /// PATCH a JSON body
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = to_body(body)?;
        let response = self.send(Method::PATCH, path, Some(body), None::<&()>).await?;
        read_json(response).await
    }

    /// PUT a JSON body
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = to_body(body)?;
        let response = self.send(Method::PUT, path, Some(body), None::<&()>).await?;
        read_json(response).await
    }

    /// DELETE, ignoring any response body
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, None, None::<&()>).await?;
        Ok(())
    }

    /// POST a multipart form
    ///
    /// The form is rebuilt by `make_form` if the request has to be replayed
    /// after a token refresh, since a sent form cannot be reused.
    pub async fn post_multipart<T, F>(&self, path: &str, make_form: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::multipart::Form,
    {
        let url = self.url(path);
        let build = || self.inner.http.post(&url).multipart(make_form());
        let response = self.dispatch(path, None, build).await?;
        read_json(response).await
    }

    // =========================================================================
    // Request pipeline
    // =========================================================================

    async fn send<Q>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        query: Option<&Q>,
    ) -> Result<Response, ApiError>
    where
        Q: Serialize + ?Sized,
    {
        let url = self.url(path);
        let build = || {
            let mut request = self.inner.http.request(method.clone(), &url);
            if let Some(query) = query {
                request = request.query(query);
            }
            if let Some(body) = &body {
                request = request.json(body);
            }
            request
        };
        self.dispatch(path, None, build).await
    }

    async fn dispatch<F>(
        &self,
        path: &str,
        tenant_fallback: Option<&str>,
        build: F,
    ) -> Result<Response, ApiError>
    where
        F: Fn() -> RequestBuilder,
    {
        let response = self
            .decorate(build(), tenant_fallback)
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;

        if response.status() == StatusCode::UNAUTHORIZED
            && !path.contains(CURRENT_USER_PATH)
            && !path.contains(TOKEN_REFRESH_PATH)
            && self.refresh_access_token().await
        {
            tracing::debug!(path, "Replaying request with refreshed access token");
            let replay = self
                .decorate(build(), tenant_fallback)
                .send()
                .await
                .map_err(ApiError::from_reqwest)?;
            return check_response(replay).await;
        }

        check_response(response).await
    }

    /// Attach tenant and bearer headers from local storage
    ///
    /// `tenant_fallback` is only sent when no override exists.
    fn decorate(&self, request: RequestBuilder, tenant_fallback: Option<&str>) -> RequestBuilder {
        let store = self.inner.store.as_ref();
        let mut request = request;

        let code = TenantOverride::header_code(store, self.inner.env_tenant_code.as_deref())
            .or_else(|| tenant_fallback.map(str::to_string));
        if let Some(code) = code {
            request = request.header(TENANT_HEADER, code);
        }

        if let Some(token) = SessionTokens::access(store) {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        request
    }

    /// Exchange the stored refresh token for a new access token
    ///
    /// Returns `true` when a new token was stored.
    async fn refresh_access_token(&self) -> bool {
        let store = self.inner.store.as_ref();
        let Some(refresh) = SessionTokens::refresh(store) else {
            return false;
        };

        let url = self.url(TOKEN_REFRESH_PATH);
        let mut request = self
            .inner
            .http
            .post(&url)
            .json(&serde_json::json!({ "refresh": refresh }));
        if let Some(code) = TenantOverride::header_code(store, self.inner.env_tenant_code.as_deref())
        {
            request = request.header(TENANT_HEADER, code);
        }

        let result: Result<RefreshResponse, ApiError> = async {
            let response = check_response(request.send().await.map_err(ApiError::from_reqwest)?).await?;
            read_json::<RefreshResponse>(response).await
        }
        .await;

        match result {
            Ok(RefreshResponse { access }) => match SessionTokens::store(store, &access, None) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to persist refreshed access token");
                    false
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Access token refresh failed");
                false
            }
        }
    }
}

fn to_body<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))
}

/// Turn a non-2xx response into [`ApiError::Http`]
///
/// The message prefers the backend's `detail`/`message`/`error` field over the raw body.
pub async fn check_response(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(ApiError::Http {
        status: status.as_u16(),
        message: extract_message(&text),
    })
}

fn extract_message(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["detail", "message", "error", "error_message"] {
            if let Some(Value::String(msg)) = map.get(key) {
                return msg.clone();
            }
        }
    }
    body.trim().to_string()
}

/// Deserialize a body, treating an empty body as JSON `null`
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await.map_err(ApiError::from_reqwest)?;
    let slice: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        &bytes
    };
    serde_json::from_slice(slice).map_err(|e| ApiError::Body(e.to_string()))
}
