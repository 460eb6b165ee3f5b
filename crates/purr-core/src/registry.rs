//! HTTP client for the purr registry.
//!
//! Every call walks the configured base URLs in order and returns the first
//! successful answer. Per-URL failures are logged and fall through to the next
//! mirror; an explicit 404 ends the walk immediately. There are no retries:
//! each URL is attempted once per call.
//!
//! The index of the last URL that answered is remembered for the lifetime of
//! the client, so a dead primary is only paid for once per invocation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use purr_schema::{HealthStatus, PackageList, PackageMetadata, PackageName, RepositoryStatistics};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("network error talking to {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} requires authentication")]
    Unauthorized { url: String },

    #[error("rate limited by {url}, try again later")]
    RateLimited { url: String },

    #[error("bad request to {url}: {body}")]
    BadRequest { url: String, body: String },

    #[error("{url} returned {status}: {body}")]
    Server {
        url: String,
        status: u16,
        body: String,
    },

    #[error("invalid response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid registry URL '{0}'")]
    InvalidUrl(String),

    #[error("no registry URLs configured")]
    NoRegistries,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl RegistryError {
    /// True for the explicit "no such package/version" answer.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// The slice of the registry the installer depends on.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Fetch metadata for `name`, optionally at a specific version.
    async fn fetch_metadata(
        &self,
        name: &PackageName,
        version: Option<&str>,
    ) -> Result<PackageMetadata, RegistryError>;

    /// Record a download. Failures are swallowed.
    async fn report_download(&self, name: &PackageName);
}

/// Sort and paging options for [`RegistryClient::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub sort: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            sort: None,
            page: 1,
            page_size: 50,
        }
    }
}

#[derive(Debug)]
pub struct RegistryClient {
    client: Client,
    bases: Vec<String>,
    preferred: AtomicUsize,
}

impl RegistryClient {
    /// Build a client over `bases` with a per-request `timeout`.
    pub fn new(bases: Vec<String>, timeout: Duration) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(RegistryError::Client)?;
        Ok(Self::with_client(client, bases))
    }

    pub fn with_client(client: Client, bases: Vec<String>) -> Self {
        Self {
            client,
            bases,
            preferred: AtomicUsize::new(0),
        }
    }

    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    /// The base URL that will be tried first on the next call.
    pub fn preferred_base(&self) -> Option<&str> {
        self.bases
            .get(self.preferred.load(Ordering::Relaxed))
            .map(String::as_str)
    }

    /// Search packages by free-text query, with full entries when available.
    pub async fn search(&self, query: &str) -> Result<PackageList, RegistryError> {
        self.get_json(
            &["api", "v1", "packages"],
            &[("search", query.to_string()), ("details", "true".to_string())],
        )
        .await
    }

    /// List packages page by page.
    pub async fn list(&self, query: &ListQuery) -> Result<PackageList, RegistryError> {
        let mut params = vec![
            ("page", query.page.to_string()),
            ("pageSize", query.page_size.to_string()),
        ];
        if let Some(sort) = query.sort.as_deref().filter(|s| !s.is_empty()) {
            params.push(("sort", sort.to_string()));
        }
        self.get_json(&["api", "v1", "packages"], &params).await
    }

    pub async fn statistics(&self) -> Result<RepositoryStatistics, RegistryError> {
        self.get_json(&["api", "v1", "packages", "statistics"], &[])
            .await
    }

    /// Liveness check. `None` means no registry answered.
    pub async fn health(&self) -> Option<HealthStatus> {
        for idx in self.order() {
            let Ok(url) = endpoint(&self.bases[idx], &["api", "v1", "health"], &[]) else {
                continue;
            };
            match self.try_get::<HealthStatus>(url).await {
                Ok(status) => return Some(status),
                Err(e) => debug!(base = %self.bases[idx], error = %e, "health check failed"),
            }
        }
        None
    }

    /// Indices of `bases`, last successful first, the rest in configured order.
    fn order(&self) -> impl Iterator<Item = usize> {
        let len = self.bases.len();
        let first = self.preferred.load(Ordering::Relaxed).min(len.saturating_sub(1));
        std::iter::once(first)
            .filter(move |_| len > 0)
            .chain((0..len).filter(move |&i| i != first))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, RegistryError> {
        let mut last_err = None;
        for idx in self.order() {
            let base = &self.bases[idx];
            let result = match endpoint(base, segments, query) {
                Ok(url) => self.try_get(url).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(value) => {
                    self.preferred.store(idx, Ordering::Relaxed);
                    return Ok(value);
                }
                Err(e) if e.is_not_found() => return Err(e),
                Err(e) => {
                    warn!(base = %base, error = %e, "registry request failed, trying next");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or(RegistryError::NoRegistries))
    }

    async fn try_get<T: DeserializeOwned>(&self, url: Url) -> Result<T, RegistryError> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| RegistryError::Network {
                url: url.to_string(),
                source,
            })?;
        let response = check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|source| RegistryError::Decode {
                url: url.to_string(),
                source,
            })
    }
}

#[async_trait]
impl Registry for RegistryClient {
    async fn fetch_metadata(
        &self,
        name: &PackageName,
        version: Option<&str>,
    ) -> Result<PackageMetadata, RegistryError> {
        let mut segments = vec!["api", "v1", "packages", name.as_str()];
        if let Some(version) = version {
            segments.push(version);
        }
        self.get_json(&segments, &[]).await.map_err(|e| match e {
            RegistryError::NotFound(_) => RegistryError::NotFound(match version {
                Some(v) => format!("{name}@{v}"),
                None => name.to_string(),
            }),
            other => other,
        })
    }

    async fn report_download(&self, name: &PackageName) {
        for idx in self.order() {
            let base = &self.bases[idx];
            let Ok(url) = endpoint(base, &["api", "v1", "packages", name.as_str(), "download"], &[])
            else {
                continue;
            };
            match self.client.post(url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                Ok(resp) if resp.status() == StatusCode::NOT_FOUND => {
                    debug!(base = %base, package = %name, "registry does not track this package");
                }
                Ok(resp) => {
                    debug!(base = %base, status = %resp.status(), "could not track download");
                }
                Err(e) => debug!(base = %base, error = %e, "could not track download"),
            }
        }
    }
}

/// Join `segments` (percent-encoded) onto `base` and append `query`.
fn endpoint(base: &str, segments: &[&str], query: &[(&str, String)]) -> Result<Url, RegistryError> {
    let invalid = || RegistryError::InvalidUrl(base.to_string());
    let mut url = Url::parse(base).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|()| invalid())?
        .pop_if_empty()
        .extend(segments);
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

async fn check_status(response: Response) -> Result<Response, RegistryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => RegistryError::NotFound(url),
        StatusCode::UNAUTHORIZED => RegistryError::Unauthorized { url },
        StatusCode::TOO_MANY_REQUESTS => RegistryError::RateLimited { url },
        StatusCode::BAD_REQUEST => RegistryError::BadRequest { url, body },
        _ => RegistryError::Server {
            url,
            status: status.as_u16(),
            body,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const CATNIP: &str = r#"{
        "name": "catnip",
        "version": "1.2.0",
        "authors": ["tabby"],
        "git": "https://example.com/catnip.git",
        "installer": "install.sh",
        "dependencies": ["yarn@2.0"]
    }"#;

    fn client(bases: Vec<String>) -> RegistryClient {
        RegistryClient::new(bases, Duration::from_secs(5)).unwrap()
    }

    fn name(s: &str) -> PackageName {
        PackageName::new(s).unwrap()
    }

    #[test]
    fn test_endpoint_encodes_segments_and_query() {
        let url = endpoint(
            "http://registry.local/base/",
            &["api", "v1", "packages", "cat nip"],
            &[("search", "a&b".to_string())],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "http://registry.local/base/api/v1/packages/cat%20nip?search=a%26b"
        );
        assert!(matches!(
            endpoint("not a url", &["api"], &[]),
            Err(RegistryError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_metadata_versioned() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/api/v1/packages/catnip/1.2.0")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(CATNIP)
            .create_async()
            .await;

        let registry = client(vec![server.url()]);
        let meta = registry
            .fetch_metadata(&name("catnip"), Some("1.2.0"))
            .await
            .unwrap();

        assert_eq!(meta.version, "1.2.0");
        assert_eq!(meta.dependencies, vec!["yarn@2.0".to_string()]);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_falls_through_and_remembers_working_mirror() {
        let mut broken = Server::new_async().await;
        let mut healthy = Server::new_async().await;

        let broken_mock = broken
            .mock("GET", "/api/v1/packages/catnip")
            .with_status(500)
            .with_body("boom")
            .expect(1)
            .create_async()
            .await;
        let healthy_mock = healthy
            .mock("GET", "/api/v1/packages/catnip")
            .with_status(200)
            .with_body(CATNIP)
            .expect(2)
            .create_async()
            .await;

        let registry = client(vec![broken.url(), healthy.url()]);
        registry.fetch_metadata(&name("catnip"), None).await.unwrap();
        assert_eq!(registry.preferred_base(), Some(healthy.url().as_str()));

        // Second call goes straight to the mirror that answered.
        registry.fetch_metadata(&name("catnip"), None).await.unwrap();

        broken_mock.assert_async().await;
        healthy_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_not_found_stops_the_walk() {
        let mut first = Server::new_async().await;
        let mut second = Server::new_async().await;

        let _missing = first
            .mock("GET", "/api/v1/packages/ghost")
            .with_status(404)
            .create_async()
            .await;
        let untouched = second
            .mock("GET", "/api/v1/packages/ghost")
            .expect(0)
            .create_async()
            .await;

        let registry = client(vec![first.url(), second.url()]);
        let err = registry
            .fetch_metadata(&name("ghost"), None)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "not found: ghost");
        untouched.assert_async().await;
    }

    #[tokio::test]
    async fn test_exhausted_mirrors_return_last_error() {
        let mut server = Server::new_async().await;
        let _down = server
            .mock("GET", "/api/v1/packages/catnip")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let registry = client(vec!["not a url".to_string(), server.url()]);
        let err = registry
            .fetch_metadata(&name("catnip"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, RegistryError::Server { status: 503, ref body, .. } if body == "maintenance"));
    }

    #[tokio::test]
    async fn test_classifies_auth_and_rate_limit() {
        let mut server = Server::new_async().await;
        let _secret = server
            .mock("GET", "/api/v1/packages/secret")
            .with_status(401)
            .create_async()
            .await;
        let _busy = server
            .mock("GET", "/api/v1/packages/busy")
            .with_status(429)
            .create_async()
            .await;

        let registry = client(vec![server.url()]);
        assert!(matches!(
            registry.fetch_metadata(&name("secret"), None).await,
            Err(RegistryError::Unauthorized { .. })
        ));
        assert!(matches!(
            registry.fetch_metadata(&name("busy"), None).await,
            Err(RegistryError::RateLimited { .. })
        ));
    }

    #[tokio::test]
    async fn test_search_sends_query_and_details() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/api/v1/packages")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("search".into(), "cat tools".into()),
                Matcher::UrlEncoded("details".into(), "true".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"package_count":1,"packages":["catnip"],
                    "detailed_packages":[{"name":"catnip","version":"1.2.0"}]}"#,
            )
            .create_async()
            .await;

        let registry = client(vec![server.url()]);
        let results = registry.search("cat tools").await.unwrap();

        assert_eq!(results.package_count, 1);
        assert_eq!(results.detailed_packages[0].name, "catnip");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_sends_paging_and_sort() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/api/v1/packages")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "2".into()),
                Matcher::UrlEncoded("pageSize".into(), "10".into()),
                Matcher::UrlEncoded("sort".into(), "mostDownloads".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"package_count":0,"packages":[]}"#)
            .create_async()
            .await;

        let registry = client(vec![server.url()]);
        let results = registry
            .list(&ListQuery {
                sort: Some("mostDownloads".into()),
                page: 2,
                page_size: 10,
            })
            .await
            .unwrap();

        assert!(results.is_empty());
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_report_download_is_best_effort() {
        let mut failing = Server::new_async().await;
        let mut working = Server::new_async().await;
        let fail_mock = failing
            .mock("POST", "/api/v1/packages/catnip/download")
            .with_status(500)
            .create_async()
            .await;
        let ok_mock = working
            .mock("POST", "/api/v1/packages/catnip/download")
            .with_status(200)
            .create_async()
            .await;

        let registry = client(vec![failing.url(), working.url()]);
        registry.report_download(&name("catnip")).await;

        fail_mock.assert_async().await;
        ok_mock.assert_async().await;

        // Nothing listening at all: still no error surfaces.
        let offline = client(vec!["http://127.0.0.1:9".to_string()]);
        offline.report_download(&name("catnip")).await;
    }

    #[tokio::test]
    async fn test_health_unknown_when_no_registry_answers() {
        let mut server = Server::new_async().await;
        let _health = server
            .mock("GET", "/api/v1/health")
            .with_status(200)
            .with_body(r#"{"status":"healthy","version":"1.0.0","packageCount":3}"#)
            .create_async()
            .await;

        let healthy = client(vec![server.url()]).health().await.unwrap();
        assert!(healthy.is_healthy());
        assert_eq!(healthy.package_count, 3);

        assert!(client(vec![]).health().await.is_none());
    }

    #[tokio::test]
    async fn test_no_registries_configured() {
        let err = client(vec![]).statistics().await.unwrap_err();
        assert!(matches!(err, RegistryError::NoRegistries));
    }
}
