//! HTTP fetch client for ads.txt and sellers.json resources.
//!
//! Every remote condition is normalized into a [`FetchOutcome`] rather than
//! an error:
//!
//! - 200 + matching content type → `Success` with body
//! - 404 → `NotFound`
//! - 200 + mismatched content type → `InvalidFormat` (HTML error pages
//!   served with a 200 are common)
//! - transport failure, timeout, oversize body → `Error`
//!
//! The classifier downstream treats all non-success outcomes as "no data
//! available" for the domain; nothing here aborts an optimize call.

pub mod domain;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};

pub use domain::{DomainError, normalize_domain, validate_domain};

use adstxt_core::cache::{FetchStatus, ResourceType};
use adstxt_core::error::Error;

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "adstxt-optimizer/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 50MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "adstxt-optimizer/0.1".to_string(),
            max_bytes: 50 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

/// Normalized result of one fetch attempt.
///
/// Invariant: `content` is `Some` iff `status` is `Success`.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub status: FetchStatus,
    pub status_code: Option<i32>,
    pub content: Option<String>,
    pub error_message: Option<String>,
}

impl FetchOutcome {
    pub fn success(status_code: StatusCode, content: String) -> Self {
        Self {
            status: FetchStatus::Success,
            status_code: Some(status_code.as_u16() as i32),
            content: Some(content),
            error_message: None,
        }
    }

    pub fn not_found() -> Self {
        Self { status: FetchStatus::NotFound, status_code: Some(404), content: None, error_message: None }
    }

    pub fn invalid_format(status_code: StatusCode, content_type: &str) -> Self {
        Self {
            status: FetchStatus::InvalidFormat,
            status_code: Some(status_code.as_u16() as i32),
            content: None,
            error_message: Some(format!("unexpected content type: {content_type}")),
        }
    }

    pub fn error(status_code: Option<StatusCode>, message: impl Into<String>) -> Self {
        Self {
            status: FetchStatus::Error,
            status_code: status_code.map(|s| s.as_u16() as i32),
            content: None,
            error_message: Some(message.into()),
        }
    }
}

/// Seam between the domain resource cache and the network.
///
/// The real implementation is [`FetchClient`]; tests substitute counting
/// or scripted fetchers.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch `https://{domain}/{ads.txt|sellers.json}` and normalize the
    /// outcome. Remote failures are encoded in the outcome, never `Err`.
    async fn fetch(&self, resource_type: ResourceType, domain: &str) -> FetchOutcome;
}

/// HTTP fetch client.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::ClientBuild(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn resource_url(resource_type: ResourceType, domain: &str) -> String {
        format!("https://{domain}/{}", resource_type.well_known_path())
    }
}

/// Whether a Content-Type header satisfies the expectation for a resource.
///
/// sellers.json must be served as `application/json` (parameters ignored);
/// ads.txt accepts any `text/*` type or a missing header.
fn content_type_matches(resource_type: ResourceType, content_type: Option<&str>) -> bool {
    let essence = content_type.map(|ct| ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase());
    match resource_type {
        ResourceType::SellersJson => matches!(essence.as_deref(), Some("application/json")),
        ResourceType::AdsTxt => match essence.as_deref() {
            None => true,
            Some(e) => e.starts_with("text/"),
        },
    }
}

#[async_trait]
impl ResourceFetcher for FetchClient {
    async fn fetch(&self, resource_type: ResourceType, domain: &str) -> FetchOutcome {
        let start = Instant::now();
        let url = Self::resource_url(resource_type, domain);

        let accept = match resource_type {
            ResourceType::SellersJson => "application/json",
            ResourceType::AdsTxt => "text/plain, text/*;q=0.9",
        };

        let response = match self.http.get(&url).header(header::ACCEPT, accept).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(%url, error = %e, "fetch transport error");
                return FetchOutcome::error(None, e.to_string());
            }
        };

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return FetchOutcome::not_found();
        }

        if !status.is_success() {
            return FetchOutcome::error(Some(status), format!("status {}", status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !content_type_matches(resource_type, content_type.as_deref()) {
            return FetchOutcome::invalid_format(status, content_type.as_deref().unwrap_or("<none>"));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return FetchOutcome::error(Some(status), format!("{} bytes exceeds {}", len, self.config.max_bytes));
        }

        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return FetchOutcome::error(Some(status), format!("failed to read response: {e}")),
        };

        if bytes.len() > self.config.max_bytes {
            return FetchOutcome::error(
                Some(status),
                format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes),
            );
        }

        let content = String::from_utf8_lossy(&bytes).into_owned();

        tracing::debug!(
            %url,
            status = status.as_u16(),
            bytes = bytes.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched resource"
        );

        FetchOutcome::success(status, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "adstxt-optimizer/0.1");
        assert_eq!(config.max_bytes, 50 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_resource_url() {
        assert_eq!(
            FetchClient::resource_url(ResourceType::SellersJson, "openx.com"),
            "https://openx.com/sellers.json"
        );
        assert_eq!(FetchClient::resource_url(ResourceType::AdsTxt, "example.com"), "https://example.com/ads.txt");
    }

    #[test]
    fn test_content_type_sellers_json() {
        assert!(content_type_matches(ResourceType::SellersJson, Some("application/json")));
        assert!(content_type_matches(ResourceType::SellersJson, Some("application/json; charset=utf-8")));
        assert!(!content_type_matches(ResourceType::SellersJson, Some("text/html")));
        assert!(!content_type_matches(ResourceType::SellersJson, None));
    }

    #[test]
    fn test_content_type_ads_txt() {
        assert!(content_type_matches(ResourceType::AdsTxt, Some("text/plain")));
        assert!(content_type_matches(ResourceType::AdsTxt, Some("text/plain; charset=UTF-8")));
        assert!(content_type_matches(ResourceType::AdsTxt, None));
        assert!(!content_type_matches(ResourceType::AdsTxt, Some("application/json")));
    }

    #[test]
    fn test_outcome_invariant() {
        let ok = FetchOutcome::success(StatusCode::OK, "{}".into());
        assert!(ok.content.is_some());
        for outcome in [
            FetchOutcome::not_found(),
            FetchOutcome::invalid_format(StatusCode::OK, "text/html"),
            FetchOutcome::error(None, "timed out"),
        ] {
            assert!(outcome.content.is_none());
        }
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }
}
