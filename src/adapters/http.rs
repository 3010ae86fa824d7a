use crate::config::SourceConfig;
use crate::domain::model::FetchOutcome;
use crate::domain::ports::RegistryClient;
use crate::utils::error::{HarvestError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Registry lookup over HTTP: `GET {endpoint}?{query_param}={id}`.
pub struct HttpRegistryClient {
    client: Client,
    endpoint: String,
    query_param: String,
}

impl HttpRegistryClient {
    pub fn new(source: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(source.timeout_seconds))
            .default_headers(build_headers(source)?)
            .build()?;

        Ok(Self {
            client,
            endpoint: source.endpoint.clone(),
            query_param: source.query_param.clone(),
        })
    }

    async fn lookup(&self, identifier: &str) -> std::result::Result<FetchOutcome, reqwest::Error> {
        tracing::debug!("Making API request to: {} ({})", self.endpoint, identifier);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[(self.query_param.as_str(), identifier)])
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("API response status: {}", status);

        if status == StatusCode::NOT_FOUND {
            return Ok(FetchOutcome::NotFound);
        }
        if !status.is_success() {
            return Ok(FetchOutcome::Failed {
                reason: format!("HTTP {}", status),
            });
        }

        let payload: serde_json::Value = response.json().await?;
        Ok(match &payload {
            serde_json::Value::Null => FetchOutcome::NotFound,
            serde_json::Value::Array(items) if items.is_empty() => FetchOutcome::NotFound,
            _ => FetchOutcome::Found(payload),
        })
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn fetch(&self, identifier: &str) -> FetchOutcome {
        match self.lookup(identifier).await {
            Ok(outcome) => outcome,
            Err(e) => FetchOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }
}

fn build_headers(source: &SourceConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in &source.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            HarvestError::InvalidConfigValueError {
                field: format!("source.headers.{}", name),
                value: name.clone(),
                reason: e.to_string(),
            }
        })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|e| HarvestError::InvalidConfigValueError {
                field: format!("source.headers.{}", name),
                value: value.clone(),
                reason: e.to_string(),
            })?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn source_for(server: &MockServer) -> SourceConfig {
        SourceConfig {
            endpoint: server.url("/api/V1/outpatientcare"),
            ..SourceConfig::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_single_record() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/V1/outpatientcare")
                .query_param("number", "2201123456")
                .header_exists("user-agent");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"number": "2201123456", "name": "ДКЦ 1"}));
        });

        let client = HttpRegistryClient::new(&source_for(&server)).unwrap();
        let outcome = client.fetch("2201123456").await;

        api_mock.assert();
        match outcome {
            FetchOutcome::Found(payload) => assert_eq!(payload["name"], "ДКЦ 1"),
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_not_found_variants() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).query_param("number", "404");
            then.status(404);
        });
        server.mock(|when, then| {
            when.method(GET).query_param("number", "empty");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([]));
        });

        let client = HttpRegistryClient::new(&source_for(&server)).unwrap();

        assert!(matches!(client.fetch("404").await, FetchOutcome::NotFound));
        assert!(matches!(client.fetch("empty").await, FetchOutcome::NotFound));
    }

    #[tokio::test]
    async fn test_fetch_server_error_and_bad_body_are_failures() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).query_param("number", "500");
            then.status(500);
        });
        server.mock(|when, then| {
            when.method(GET).query_param("number", "garbage");
            then.status(200).body("<html>maintenance</html>");
        });

        let client = HttpRegistryClient::new(&source_for(&server)).unwrap();

        match client.fetch("500").await {
            FetchOutcome::Failed { reason } => assert!(reason.contains("500")),
            other => panic!("expected Failed, got {:?}", other),
        }
        assert!(matches!(
            client.fetch("garbage").await,
            FetchOutcome::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_is_a_failure() {
        let source = SourceConfig {
            endpoint: "http://127.0.0.1:9/unreachable".to_string(),
            timeout_seconds: 1,
            ..SourceConfig::default()
        };
        let client = HttpRegistryClient::new(&source).unwrap();

        assert!(matches!(
            client.fetch("1").await,
            FetchOutcome::Failed { .. }
        ));
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let mut source = SourceConfig::default();
        source
            .headers
            .insert("bad header".to_string(), "x".to_string());

        assert!(matches!(
            HttpRegistryClient::new(&source),
            Err(HarvestError::InvalidConfigValueError { .. })
        ));
    }
}
