use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{header::HeaderMap, Client, Method};
use tracing::debug;
use url::Url;

use crate::model::{RequestDescriptor, ResponseSnapshot};

pub const DEFAULT_BASE_URL: &str = "https://api.restful-api.dev";

/// Transport for the object API. Every request carries the bearer token,
/// including an empty one.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth_token: String,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        auth_token: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let parsed =
            Url::parse(base_url).with_context(|| format!("invalid base URL {base_url}"))?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("building HTTP client")?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            auth_token: auth_token.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `path` is appended verbatim, query string included.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn descriptor(&self, method: &str, path: &str) -> RequestDescriptor {
        RequestDescriptor::new(method, self.url_for(path))
            .header("Authorization", format!("Bearer {}", self.auth_token))
    }

    pub async fn send(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot> {
        let method = Method::from_bytes(request.method.as_bytes())
            .with_context(|| format!("invalid HTTP method {}", request.method))?;
        let mut request_builder = self.client.request(method, &request.url);

        for (name, value) in &request.headers {
            request_builder = request_builder.header(name, value);
        }

        if let Some(body) = &request.body {
            request_builder = request_builder.json(body);
        }

        debug!(method = %request.method, url = %request.url, "sending request");

        let start = Instant::now();
        let response = request_builder
            .send()
            .await
            .with_context(|| format!("{} {}", request.method, request.url))?;

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("reading response body of {}", request.url))?;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        let body = String::from_utf8(bytes.to_vec())
            .with_context(|| format!("response body of {} is not valid UTF-8", request.url))?;

        let snapshot = ResponseSnapshot {
            status,
            headers,
            body,
            duration_ms,
        };
        debug!(
            status,
            duration_ms,
            bytes = snapshot.body.len(),
            content_type = snapshot.header("content-type").unwrap_or_default(),
            "received response"
        );
        Ok(snapshot)
    }
}

fn collect_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect()
}
