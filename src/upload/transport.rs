//! Transports that deliver chunks to the receiver

use crate::error::{IngestError, Result};
use crate::upload::chunks::{ChunkAck, ChunkPayload, IngestReply};
use crate::upload::table::TableLoadRequest;
use crate::worker::config::{IngestConfig, DEFAULT_INGEST_PATH, DEFAULT_LOAD_PATH};
use async_trait::async_trait;
use reqwest::Url;
use std::collections::BTreeMap;

/// Delivers one payload and waits for the receiver's acknowledgement
#[async_trait]
pub trait ChunkTransport: Send + Sync {
    async fn send(&self, payload: ChunkPayload) -> Result<ChunkAck>;
}

/// Asks the receiver to load an already uploaded file into a table
#[async_trait]
pub trait TableLoader: Send + Sync {
    /// Returns the receiver's response text
    async fn load_to_table(&self, request: &TableLoadRequest) -> Result<String>;
}

/// HTTP transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
    ingest_path: String,
    load_path: String,
    parameters: BTreeMap<String, String>,
}

impl HttpTransport {
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            IngestError::config_error(format!("Invalid endpoint {:?}: {}", endpoint, e))
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            ingest_path: DEFAULT_INGEST_PATH.to_string(),
            load_path: DEFAULT_LOAD_PATH.to_string(),
            parameters: BTreeMap::new(),
        })
    }

    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| IngestError::config_error("No receiver endpoint configured"))?;

        Ok(Self::new(endpoint)?
            .ingest_path(&config.ingest_path)
            .load_path(&config.load_path))
    }

    pub fn ingest_path(mut self, path: &str) -> Self {
        self.ingest_path = path.to_string();
        self
    }

    pub fn load_path(mut self, path: &str) -> Self {
        self.load_path = path.to_string();
        self
    }

    /// Add one query parameter to every ingestion request
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_parameters<I, K, V>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in parameters {
            self.parameters.insert(key.into(), value.into());
        }
        self
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn ingest_url(&self) -> String {
        self.url(&self.ingest_path)
    }

    pub fn load_url(&self) -> String {
        self.url(&self.load_path)
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

async fn response_text(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(IngestError::transport_error(format!(
            "Receiver answered {}: {}",
            status, body
        )));
    }

    Ok(body)
}

#[async_trait]
impl ChunkTransport for HttpTransport {
    async fn send(&self, payload: ChunkPayload) -> Result<ChunkAck> {
        let end_of_file = payload.is_end_of_file();

        let response = self
            .client
            .post(self.ingest_url())
            .query(&self.parameters)
            .body(payload.into_body())
            .send()
            .await?;

        let body = response_text(response).await?;

        if end_of_file {
            let count = IngestReply::parse_record_count(&body)?;
            return Ok(ChunkAck::new(Some(count)));
        }

        Ok(ChunkAck::new(IngestReply::parse_record_count(&body).ok()))
    }
}

#[async_trait]
impl TableLoader for HttpTransport {
    async fn load_to_table(&self, request: &TableLoadRequest) -> Result<String> {
        log::debug!("Loading {} via {}", request.file_name, self.load_url());

        let response = self
            .client
            .get(self.load_url())
            .query(&request.query_pairs())
            .send()
            .await?;

        response_text(response).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let transport = HttpTransport::new("http://localhost:8080/").unwrap();
        assert_eq!(
            transport.ingest_url(),
            "http://localhost:8080/fusebase/loadfilefromclient"
        );
        assert_eq!(transport.load_url(), "http://localhost:8080/loadtodb");

        let transport = HttpTransport::new("https://db.example.com/api")
            .unwrap()
            .ingest_path("upload");
        assert_eq!(transport.ingest_url(), "https://db.example.com/api/upload");
    }

    #[test]
    fn test_invalid_endpoint() {
        let err = HttpTransport::new("not a url").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_parameters_are_ordered() {
        let transport = HttpTransport::new("http://localhost")
            .unwrap()
            .with_parameter("table", "people")
            .with_parameters([("filename", "a.csv")]);
        let keys: Vec<_> = transport.parameters().keys().cloned().collect();
        assert_eq!(keys, vec!["filename", "table"]);
    }

    #[test]
    fn test_from_config_requires_endpoint() {
        assert!(HttpTransport::from_config(&IngestConfig::new()).is_err());

        let config = IngestConfig::new().endpoint("http://127.0.0.1:9000");
        let transport = HttpTransport::from_config(&config).unwrap();
        assert_eq!(
            transport.ingest_url(),
            "http://127.0.0.1:9000/fusebase/loadfilefromclient"
        );
    }
}
