//! The remote endpoint seam.
//!
//! Everything above this module talks to [`SparqlEndpoint`]; tests script
//! responses and failures behind it, production uses [`HttpEndpoint`].

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};

/// Remote failure. Timeouts, connection errors and server-side errors are
/// all transient for retry purposes.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("http status {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("response decode failed: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

/// Read-only query access to the knowledge endpoint.
pub trait SparqlEndpoint {
    /// Issue a CONSTRUCT query; the response body is line-oriented
    /// N-Triples text.
    fn construct(&self, query: &str) -> Result<String, FetchError>;

    /// Issue a SELECT query; the response is SPARQL JSON results.
    fn select(&self, query: &str) -> Result<serde_json::Value, FetchError>;
}

/// Blocking HTTP implementation (POSTed form queries, fixed timeout,
/// explicit User-Agent).
pub struct HttpEndpoint {
    client: Client,
    url: String,
}

impl HttpEndpoint {
    pub fn new(url: &str, user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("alignbench")),
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    fn post(&self, query: &str, accept: &'static str) -> Result<reqwest::blocking::Response, FetchError> {
        let resp = self
            .client
            .post(&self.url)
            .header(ACCEPT, accept)
            .form(&[("query", query)])
            .send()?;
        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }
        Ok(resp)
    }
}

impl SparqlEndpoint for HttpEndpoint {
    fn construct(&self, query: &str) -> Result<String, FetchError> {
        Ok(self.post(query, "application/n-triples")?.text()?)
    }

    fn select(&self, query: &str) -> Result<serde_json::Value, FetchError> {
        self.post(query, "application/sparql-results+json")?
            .json()
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}
