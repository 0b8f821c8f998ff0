//! HTTP transport for the contest API
//!
//! Maps each `ApiRequest` to its URL and method and sends it with the
//! credential header attached.

use reqwest::Client;

use super::{ApiRequest, RawResponse, Transport, TransportError};

/// Header carrying the API key on every request
pub const API_KEY_HEADER: &str = "X-API-Key";

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// HTTP client for making requests
    client: Client,
    /// Base URL of the API, ending with `/`
    base_url: String,
    /// Secret sent in the `X-API-Key` header
    api_key: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, api_key)
    }

    /// Create a transport with a custom HTTP client
    pub fn with_client(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            client,
            base_url,
            api_key: api_key.into(),
        }
    }

    /// Returns the URL a request is sent to
    pub fn url_for(&self, request: &ApiRequest) -> String {
        match request {
            ApiRequest::Hello => format!("{}hello", self.base_url),
            ApiRequest::SnapshotList => format!("{}snapshot/list", self.base_url),
            ApiRequest::Blob { hash } => format!("{}blob/{}", self.base_url, hash),
            ApiRequest::SubmitSolution { .. } => format!("{}solution/submit", self.base_url),
        }
    }
}

impl Transport for HttpTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        let url = self.url_for(request);
        let builder = match request {
            ApiRequest::SubmitSolution {
                problem_id,
                solution,
            } => self.client.post(&url).form(&[
                ("problem_id", problem_id.to_string()),
                ("solution_spec", solution.clone()),
            ]),
            ApiRequest::Hello | ApiRequest::SnapshotList | ApiRequest::Blob { .. } => {
                self.client.get(&url)
            }
        };

        let response = builder.header(API_KEY_HEADER, &self.api_key).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(RawResponse { status, body })
    }
}
