//! HTTP client implementation for the Bria API.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT},
    multipart, Client as ReqwestClient, Response,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::error::{Error, Result};

/// Header carrying the Bria credential.
pub const API_TOKEN_HEADER: &str = "api_token";

const USER_AGENT_VALUE: &str = "visionary-bria-rust/1.0";

/// HTTP client for the Bria API.
///
/// Holds the connection pool and base URL only; the credential is supplied
/// on each call so that one pool can serve many callers.
pub struct HttpClient {
    client: ReqwestClient,
    base_url: String,
}

impl HttpClient {
    /// Creates a new HTTP client.
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = ReqwestClient::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a JSON body to `path` and returns the JSON response.
    ///
    /// No retries are attempted; a non-2xx status becomes [`Error::Api`].
    pub async fn post_json<T>(&self, api_key: &str, path: &str, body: &T) -> Result<Value>
    where
        T: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "bria request");

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers(api_key)?)
            .json(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Uploads a file using multipart form data.
    pub async fn post_multipart(
        &self,
        api_key: &str,
        path: &str,
        file_bytes: Vec<u8>,
        filename: &str,
        fields: Vec<(&str, String)>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, size = file_bytes.len(), "bria upload");

        let mut form = multipart::Form::new().part(
            "file",
            multipart::Part::bytes(file_bytes).file_name(filename.to_string()),
        );

        for (key, value) in fields {
            form = form.text(key.to_string(), value);
        }

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers(api_key)?)
            .multipart(form)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Downloads an absolute URL, typically a result asset.
    pub async fn get_bytes(&self, url: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, USER_AGENT_VALUE)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(Error::api(status.as_u16(), String::from_utf8_lossy(&body)));
        }

        Ok(body)
    }

    /// Returns the headers for an authenticated API request.
    fn auth_headers(&self, api_key: &str) -> Result<HeaderMap> {
        if api_key.is_empty() {
            return Err(Error::Config("api_key must be non-empty".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            API_TOKEN_HEADER,
            HeaderValue::from_str(api_key)
                .map_err(|_| Error::Config("api_key is not a valid header value".to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        Ok(headers)
    }

    /// Handles the API response.
    async fn handle_response(&self, response: Response) -> Result<Value> {
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(Error::api(status.as_u16(), String::from_utf8_lossy(&body)));
        }

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&body).map_err(Error::from)
    }
}
