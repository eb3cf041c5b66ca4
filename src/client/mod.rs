//! Authenticated HTTP client for the Echo backend.
//!
//! Every call goes through `ApiClient::request` which attaches the
//! bearer token, and on a 401 exchanges the refresh token for a new
//! pair and retries the call once.
pub mod error;
pub mod tokens;

pub use error::ApiError;
pub use tokens::{FileStorage, MemoryStorage, TokenStorage, TokenStore};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::auth::models::TokenResponse;
use crate::core::AppConfig;

/// Method, extra headers, and JSON body for a single call.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: &'static str, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    tokens: TokenStore,
}

impl ApiClient {
    pub fn new(base_url: &str, tokens: TokenStore) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            tokens,
        }
    }

    /// Client persisting its tokens to the credentials file of `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        let storage = FileStorage::new(config.credentials_path());
        Self::new(&config.api_base(), TokenStore::new(Box::new(storage)))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    pub fn get_token(&self) -> Option<String> {
        self.tokens.access_token()
    }

    /// Set or clear the access token. Clearing it also drops the
    /// refresh token.
    pub fn set_token(&self, token: Option<&str>) {
        self.tokens.set_access(token);
    }

    pub fn set_tokens(&self, access_token: &str, refresh_token: &str) {
        self.tokens.set(access_token, Some(refresh_token));
    }

    pub fn get_refresh_token(&self) -> Option<String> {
        self.tokens.refresh_token()
    }

    pub fn has_token(&self) -> bool {
        self.tokens.has_token()
    }

    pub fn clear_tokens(&self) {
        self.tokens.clear();
    }

    pub(crate) fn store_tokens(&self, tokens: &TokenResponse) {
        self.tokens
            .set(&tokens.access_token, Some(&tokens.refresh_token));
    }

    async fn send(&self, endpoint: &str, options: &RequestOptions) -> Result<Response, ApiError> {
        let url = self.url(endpoint);

        // Caller headers go first so auth and content type always win
        let mut headers = options.headers.clone();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = self.tokens.access_token()
            && let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token))
        {
            headers.insert(AUTHORIZATION, value);
        }

        tracing::debug!("{} {}", options.method, url);

        let mut req = self
            .http
            .request(options.method.clone(), &url)
            .headers(headers);
        if let Some(body) = &options.body {
            req = req.body(body.to_string());
        }

        Ok(req.send().await?)
    }

    /// Perform a JSON request and decode the response body.
    ///
    /// A 401 triggers at most one token refresh followed by at most one
    /// retry of the original request.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let mut response = self.send(endpoint, &options).await?;

        if response.status() == StatusCode::UNAUTHORIZED && self.tokens.refresh_token().is_some() {
            tracing::debug!("Access token rejected for {}, refreshing", endpoint);
            if self.refresh_tokens().await {
                response = self.send(endpoint, &options).await?;
            }
        }

        parse_response(response).await
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request(endpoint, RequestOptions::new(Method::GET))
            .await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body).map_err(ApiError::Encode)?;
        let options = RequestOptions::new(Method::POST).body(body);
        self.request(endpoint, options).await
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body).map_err(ApiError::Encode)?;
        let options = RequestOptions::new(Method::PATCH).body(body);
        self.request(endpoint, options).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request(endpoint, RequestOptions::new(Method::DELETE))
            .await
    }

    /// POST without a bearer token. Used by the auth endpoints which
    /// must never send a stale token.
    pub(crate) async fn post_anonymous<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(endpoint);
        let body = serde_json::to_vec(body).map_err(ApiError::Encode)?;
        tracing::debug!("POST {}", url);
        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        parse_response(response).await
    }

    /// Exchange the refresh token for a new token pair.
    ///
    /// Returns `false` without touching the network when there is no
    /// refresh token. Any failure clears both tokens.
    pub async fn refresh_tokens(&self) -> bool {
        let Some(refresh_token) = self.tokens.refresh_token() else {
            return false;
        };

        let result: Result<TokenResponse, ApiError> = self
            .post_anonymous("/auth/refresh", &json!({ "refresh_token": refresh_token }))
            .await;

        match result {
            Ok(tokens) => {
                self.store_tokens(&tokens);
                tracing::debug!("Refreshed access token");
                true
            }
            Err(e) => {
                tracing::warn!("Token refresh failed, clearing credentials: {}", e);
                self.tokens.clear();
                false
            }
        }
    }

    /// Upload a file as the `file` field of a multipart form.
    ///
    /// Only the bearer header is attached. Unlike `request` a 401 here
    /// is returned as-is without a refresh.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<T, ApiError> {
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        self.upload_form(endpoint, Form::new().part("file", part))
            .await
    }

    /// Upload several files, each as a `files` field of one multipart
    /// form. Same auth handling as `upload`.
    pub async fn upload_many<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        files: Vec<(String, Vec<u8>)>,
    ) -> Result<T, ApiError> {
        let form = files.into_iter().fold(Form::new(), |form, (file_name, bytes)| {
            form.part("files", Part::bytes(bytes).file_name(file_name))
        });
        self.upload_form(endpoint, form).await
    }

    async fn upload_form<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        form: Form,
    ) -> Result<T, ApiError> {
        let url = self.url(endpoint);
        tracing::debug!("POST {} (multipart)", url);

        let mut req = self.http.post(&url).multipart(form);
        if let Some(token) = self.tokens.access_token() {
            req = req.bearer_auth(token);
        }
        let response = req.send().await?;
        parse_response(response).await
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(ApiError::from_response(status, &text));
    }

    // Some endpoints answer with an empty body
    if text.trim().is_empty() {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_str(&text)?)
}
