use futures::StreamExt;
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::types::{dedup_by_id, CategoryInfo, CategoryList, Item};

/// Upper bound on a catalog response body. A category listing is ~100 items.
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Most highlights the start screen shows.
pub const MAX_HIGHLIGHTS: usize = 12;

/// Errors from a remote retrieval (search, category fetch, category metadata).
///
/// Every variant is non-fatal: the UI turns it into a mode-specific message and
/// waits for the user to trigger a new query. Nothing here is retried.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Network-level error (DNS, connection refused, TLS, ...)
    #[error("Request failed: {0}")]
    Network(#[source] reqwest::Error),
    /// The request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response with a non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Body was not the expected JSON shape
    #[error("Malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Body exceeded the size limit
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// The configured base URL cannot carry path segments
    #[error("Catalog base URL cannot be used to build request paths")]
    InvalidBaseUrl,
    /// The background task running the request panicked
    #[error("Retrieval task failed: {0}")]
    TaskFailed(String),
}

impl From<reqwest::Error> for RetrievalError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RetrievalError::Timeout
        } else {
            RetrievalError::Network(e)
        }
    }
}

/// A query the catalog service answers remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteQuery {
    Search(String),
    Category(String),
}

/// Limit redirects to 3 hops and refuse loops.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );
        attempt.follow()
    })
}

/// HTTP client for the book catalog service.
///
/// Cheap to clone: the inner `reqwest::Client` shares its connection pool, so
/// each spawned retrieval task takes its own clone.
#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CatalogClient {
    /// Build a client rooted at `base_url` (e.g. `http://localhost:8000/api`).
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, RetrievalError> {
        if base_url.cannot_be_a_base() {
            return Err(RetrievalError::InvalidBaseUrl);
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("estante/", env!("CARGO_PKG_VERSION")))
            .redirect(create_redirect_policy())
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET {base}/search?query=<text>`
    pub async fn search(&self, text: &str) -> Result<Vec<Item>, RetrievalError> {
        let mut url = self.endpoint(&["search"])?;
        url.query_pairs_mut().append_pair("query", text);
        let items: Vec<Item> = self.get_json(url).await?;
        Ok(dedup_by_id(items))
    }

    /// `GET {base}/category/<name>`; order is the server's (popularity rank).
    pub async fn category(&self, name: &str) -> Result<Vec<Item>, RetrievalError> {
        let url = self.endpoint(&["category", name])?;
        let items: Vec<Item> = self.get_json(url).await?;
        Ok(dedup_by_id(items))
    }

    /// `GET {base}/categories`: navigation metadata for the recognized categories.
    ///
    /// Backends that only serve the Portuguese route answer on
    /// `{base}/categorias`, which is tried after a 404.
    pub async fn categories(&self) -> Result<Vec<CategoryInfo>, RetrievalError> {
        let list: CategoryList = self.get_json_or_legacy("categories", "categorias").await?;
        Ok(list.categories)
    }

    /// `GET {base}/highlights` (legacy `{base}/destaques`): the curated
    /// "books of the day" shown on the start screen, capped at
    /// [`MAX_HIGHLIGHTS`].
    pub async fn highlights(&self) -> Result<Vec<Item>, RetrievalError> {
        let items: Vec<Item> = self.get_json_or_legacy("highlights", "destaques").await?;
        let mut items = dedup_by_id(items);
        items.truncate(MAX_HIGHLIGHTS);
        Ok(items)
    }

    /// Dispatch a remote query to the matching endpoint.
    pub async fn retrieve(&self, query: &RemoteQuery) -> Result<Vec<Item>, RetrievalError> {
        match query {
            RemoteQuery::Search(text) => self.search(text).await,
            RemoteQuery::Category(name) => self.category(name).await,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RetrievalError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RetrievalError::InvalidBaseUrl)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json_or_legacy<T: DeserializeOwned>(
        &self,
        segment: &str,
        legacy: &str,
    ) -> Result<T, RetrievalError> {
        match self.get_json(self.endpoint(&[segment])?).await {
            Err(RetrievalError::HttpStatus(404)) => {
                tracing::debug!(segment, legacy, "Endpoint not found, trying legacy route");
                self.get_json(self.endpoint(&[legacy])?).await
            }
            other => other,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, RetrievalError> {
        tracing::debug!(url = %url, "Catalog request");

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "Catalog returned error status");
            return Err(RetrievalError::HttpStatus(status.as_u16()));
        }

        let bytes = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
        let value = serde_json::from_slice(&bytes).inspect_err(|e| {
            tracing::warn!(url = %url, error = %e, "Catalog response is not valid JSON");
        })?;
        Ok(value)
    }
}

/// Read a response body, failing once it grows past `limit` bytes.
async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, RetrievalError> {
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(RetrievalError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(RetrievalError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, prefix: &str) -> CatalogClient {
        let base = Url::parse(&format!("{}{}", server.uri(), prefix)).unwrap();
        CatalogClient::new(base, Duration::from_secs(5)).unwrap()
    }

    fn books_json(ids: &[&str]) -> serde_json::Value {
        serde_json::Value::Array(
            ids.iter()
                .map(|id| {
                    serde_json::json!({
                        "id": id,
                        "title": format!("Book {}", id),
                        "author": null,
                        "source": "Gutenberg"
                    })
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_search_sends_query_param_under_base_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search"))
            .and(query_param("query", "Machado de Assis"))
            .respond_with(ResponseTemplate::new(200).set_body_json(books_json(&["1", "2"])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, "/api");
        let items = client.search("Machado de Assis").await.unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_category_preserves_server_order_and_dedups() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/category/fantasia"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(books_json(&["c", "a", "c", "b"])),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, "");
        let items = client.category("fantasia").await.unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_category_name_is_percent_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/category/fic%C3%A7%C3%A3o"))
            .respond_with(ResponseTemplate::new(200).set_body_json(books_json(&[])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, "");
        assert!(client.category("ficção").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_2xx_is_http_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server, "");
        let err = client.search("x").await.unwrap_err();
        assert!(matches!(err, RetrievalError::HttpStatus(503)));
    }

    #[tokio::test]
    async fn test_malformed_json_is_typed_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, "");
        let err = client.category("dark").await.unwrap_err();
        assert!(matches!(err, RetrievalError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_wrong_json_shape_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"detail": "x"})))
            .mount(&server)
            .await;

        let client = client_for(&server, "");
        assert!(matches!(
            client.search("x").await,
            Err(RetrievalError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_reported_as_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(books_json(&["1"]))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let base = Url::parse(&server.uri()).unwrap();
        let client = CatalogClient::new(base, Duration::from_millis(50)).unwrap();
        assert!(matches!(
            client.search("slow").await,
            Err(RetrievalError::Timeout)
        ));
    }

    #[tokio::test]
    async fn test_categories_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/categories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "categorias": [{"id": 1, "nome": "Fantasia", "cor": "#8b5cf6", "adulto": false}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, "/api/");
        let cats = client.categories().await.unwrap();
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].name, "Fantasia");
    }

    #[tokio::test]
    async fn test_categories_fall_back_to_portuguese_route() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/categorias"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "categorias": [{"nome": "Dark", "adulto": true}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, "/api");
        let cats = client.categories().await.unwrap();
        assert_eq!(cats.len(), 1);
        assert!(cats[0].sensitive);
    }

    #[tokio::test]
    async fn test_legacy_route_not_tried_for_other_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/categories"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/categorias"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"categorias": []})))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, "/api");
        assert!(matches!(
            client.categories().await,
            Err(RetrievalError::HttpStatus(500))
        ));
    }

    #[tokio::test]
    async fn test_highlights_are_deduped_and_capped() {
        let server = MockServer::start().await;
        let ids: Vec<String> = (0..20).map(|i| format!("h{}", i)).collect();
        let mut id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        id_refs.insert(1, "h0");
        Mock::given(method("GET"))
            .and(path("/api/highlights"))
            .respond_with(ResponseTemplate::new(200).set_body_json(books_json(&id_refs)))
            .mount(&server)
            .await;

        let client = client_for(&server, "/api");
        let items = client.highlights().await.unwrap();
        assert_eq!(items.len(), MAX_HIGHLIGHTS);
        assert_eq!(items[0].id, "h0");
        assert_eq!(items[1].id, "h1");
    }

    #[tokio::test]
    async fn test_highlights_fall_back_to_destaques() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/destaques"))
            .respond_with(ResponseTemplate::new(200).set_body_json(books_json(&["d1"])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, "/api");
        let items = client.highlights().await.unwrap();
        assert_eq!(items[0].id, "d1");
    }

    #[tokio::test]
    async fn test_retrieve_dispatches_by_query_kind() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/category/estudo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(books_json(&["e1"])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, "");
        let items = client
            .retrieve(&RemoteQuery::Category("estudo".to_string()))
            .await
            .unwrap();
        assert_eq!(items[0].id, "e1");
    }

    #[test]
    fn test_rejects_cannot_be_a_base_url() {
        let url = Url::parse("mailto:books@example.com").unwrap();
        assert!(matches!(
            CatalogClient::new(url, Duration::from_secs(1)),
            Err(RetrievalError::InvalidBaseUrl)
        ));
    }
}
