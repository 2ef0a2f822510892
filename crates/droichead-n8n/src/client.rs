use std::time::Duration;

use reqwest::Method;
use serde_json::Value;

use crate::error::UpstreamError;

/// Header n8n expects on management API calls.
const API_KEY_HEADER: &str = "X-N8N-API-KEY";

/// A decoded upstream response: the HTTP status and the body, parsed as JSON
/// when possible and kept as a raw string otherwise.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Value,
}

/// Client for the n8n REST surface.
///
/// One reusable connection pool, 30 second request timeout. Calls against the
/// management interface (`request` and its method wrappers) carry the API-key
/// header; webhook invocations deliberately do not — the caller embeds any
/// secret in the webhook path itself, per n8n convention.
pub struct N8nClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl N8nClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| UpstreamError::Transport(format!("failed to build HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one management API call. Statuses >= 400 become
    /// `UpstreamError::Status` carrying the raw response text.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, url).header(API_KEY_HEADER, &self.api_key);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        if status >= 400 {
            return Err(UpstreamError::Status { status, body: text });
        }

        Ok(UpstreamResponse {
            status,
            body: parse_or_raw(text),
        })
    }

    pub async fn get(&self, path: &str) -> Result<Value, UpstreamError> {
        Ok(self.request(Method::GET, path, None).await?.body)
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, UpstreamError> {
        Ok(self.request(Method::POST, path, Some(body)).await?.body)
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value, UpstreamError> {
        Ok(self.request(Method::PATCH, path, Some(body)).await?.body)
    }

    pub async fn delete(&self, path: &str) -> Result<UpstreamResponse, UpstreamError> {
        self.request(Method::DELETE, path, None).await
    }

    /// POST a payload to a literal webhook path on the base URL.
    ///
    /// No API-key header is attached, and unlike `request` the status is
    /// reported as data even when it is >= 400: the webhook's response is the
    /// result the caller asked for, whatever the status.
    pub async fn webhook(&self, path: &str, payload: &Value) -> Result<UpstreamResponse, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(UpstreamResponse {
            status,
            body: parse_or_raw(text),
        })
    }
}

fn parse_or_raw(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
