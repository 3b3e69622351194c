//! Bria API client.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;

use super::{
    background::BackgroundService,
    edit::EditService,
    error::{Error, Result},
    http::HttpClient,
    image::ImageService,
    product::ProductService,
};

/// Default Bria API base URL.
pub const DEFAULT_BASE_URL: &str = "https://engine.prod.bria-api.com";

/// Default request timeout. Synchronous generation can take a while.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Bria API client.
///
/// The client provides access to all Bria API services. Cloning is cheap:
/// clones share the same connection pool.
///
/// # Example
///
/// ```rust,no_run
/// use visionary_bria::{Client, TextToImageRequest};
///
/// # async fn run() -> visionary_bria::Result<()> {
/// let client = Client::new("your-api-key")?;
///
/// let request = TextToImageRequest {
///     prompt: "a lighthouse at dawn".to_string(),
///     num_results: 1,
///     sync: true,
///     ..Default::default()
/// };
/// let response = client.image().generate(&request).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    http: Arc<HttpClient>,
    api_key: String,
}

impl Client {
    /// Creates a new Bria API client with the default base URL.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        ClientBuilder::new().api_key(api_key).build()
    }

    /// Creates a new client builder for more configuration options.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Returns a client that shares this connection pool but authenticates
    /// with `api_key`.
    pub fn with_api_key(&self, api_key: impl Into<String>) -> Client {
        Client {
            http: self.http.clone(),
            api_key: api_key.into(),
        }
    }

    /// Returns the configured API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the configured base URL.
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Returns the text-to-image and prompt service.
    pub fn image(&self) -> ImageService {
        ImageService::new(self.http.clone(), self.api_key.clone())
    }

    /// Returns the product photography service.
    pub fn product(&self) -> ProductService {
        ProductService::new(self.http.clone(), self.api_key.clone())
    }

    /// Returns the image editing service.
    pub fn edit(&self) -> EditService {
        EditService::new(self.http.clone(), self.api_key.clone())
    }

    /// Returns the background service.
    pub fn background(&self) -> BackgroundService {
        BackgroundService::new(self.http.clone(), self.api_key.clone())
    }

    /// Downloads a result asset.
    pub async fn download(&self, url: &str) -> Result<Bytes> {
        self.http.get_bytes(url).await
    }

    /// Returns a reference to the internal HTTP client.
    pub fn http(&self) -> &Arc<HttpClient> {
        &self.http
    }
}

/// Builder for creating a Bria API client.
pub struct ClientBuilder {
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Creates a new client builder.
    pub fn new() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the API key. It may be left empty when every call goes through
    /// [`Client::with_api_key`].
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Sets a custom base URL for the API.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the client.
    pub fn build(self) -> Result<Client> {
        if self.base_url.is_empty() {
            return Err(Error::Config("base_url must be non-empty".to_string()));
        }

        let http = HttpClient::new(self.base_url, self.timeout)?;

        Ok(Client {
            http: Arc::new(http),
            api_key: self.api_key,
        })
    }
}
