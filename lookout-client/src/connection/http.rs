//! HTTP transport to the debugger server

use async_trait::async_trait;
use reqwest_eventsource::EventSource as SseStream;
use url::Url;

use lookout_utils::{LookoutError, Result};

use super::stream::SseSource;
use super::transport::{CommandTransport, SourceFetcher, StateFetcher};
use crate::config::EndpointConfig;

/// Form field carrying the instruction string
const COMMAND_FIELD: &str = "cmd";

/// reqwest-backed implementation of every server transport
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base: Url,
    endpoints: EndpointConfig,
}

impl HttpBackend {
    pub fn new(server: &str, endpoints: EndpointConfig) -> Result<Self> {
        let mut base = Url::parse(server)
            .map_err(|e| LookoutError::config(format!("Invalid server URL '{}': {}", server, e)))?;
        if base.cannot_be_a_base() {
            return Err(LookoutError::config(format!(
                "Server URL '{}' cannot carry a path",
                server
            )));
        }
        // Join relative to the server path rather than replacing its last segment
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base,
            endpoints,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| LookoutError::config(format!("Invalid endpoint '{}': {}", path, e)))
    }

    /// URL of the formatted-file endpoint for a source path
    pub fn formatted_file_url(&self, filepath: &str) -> Result<Url> {
        let mut url = self.endpoint(&self.endpoints.formatted_file)?;
        url.path_segments_mut()
            .map_err(|_| LookoutError::config("Formatted-file URL cannot carry a path"))?
            .pop_if_empty()
            .extend(filepath.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }

    /// Open a new push-stream subscription
    pub fn subscribe(&self) -> Result<SseSource> {
        let url = self.endpoint(&self.endpoints.stream)?;
        tracing::debug!(%url, "Subscribing to message stream");
        Ok(SseSource::new(SseStream::get(url)))
    }

    async fn get_text(&self, url: Url) -> Result<String> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(to_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookoutError::transport(format!("GET {} returned {}", url, status)));
        }

        response.text().await.map_err(to_transport_error)
    }
}

#[async_trait]
impl CommandTransport for HttpBackend {
    async fn post_command(&self, instruction: &str) -> Result<String> {
        let url = self.endpoint(&self.endpoints.command)?;
        let response = self
            .http
            .post(url)
            .form(&[(COMMAND_FIELD, instruction)])
            .send()
            .await
            .map_err(to_transport_error)?;

        // The body decides acceptance; a non-2xx status is still reported with it
        let status = response.status();
        let body = response.text().await.map_err(to_transport_error)?;
        if !status.is_success() && body.trim().is_empty() {
            return Err(LookoutError::transport(format!("POST returned {}", status)));
        }
        Ok(body)
    }
}

#[async_trait]
impl SourceFetcher for HttpBackend {
    async fn fetch_source(&self, filepath: &str) -> Result<String> {
        let url = self.formatted_file_url(filepath)?;
        self.get_text(url).await
    }
}

#[async_trait]
impl StateFetcher for HttpBackend {
    async fn fetch_state(&self) -> Result<String> {
        let url = self.endpoint(&self.endpoints.state)?;
        self.get_text(url).await
    }
}

fn to_transport_error(err: reqwest::Error) -> LookoutError {
    LookoutError::transport(err.to_string())
}
