//! REST client for the warehouse.

use std::sync::Arc;

use cachebench_core::{
    IngestionRequest, IngestionSource, IngestionStage, WarehouseClient,
};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use url::Url;
use uuid::Uuid;

use super::{Error, KustoConfig, Result, TRACING_TARGET};

#[derive(Serialize)]
struct CommandBody<'a> {
    db: &'a str,
    csl: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct BlobSourceBody<'a> {
    source_uri: &'a str,
}

struct KustoClientInner {
    http: Client,
    config: KustoConfig,
    warehouse_uri: Url,
    ingest_uri: Url,
}

/// Warehouse client speaking the Kusto REST API.
///
/// Control commands go to `/v1/rest/mgmt`, queries to `/v1/rest/query` and
/// ingestion to `/v1/rest/ingest/{db}/{table}` on the ingest endpoint.
/// Local files are uploaded as the request body; blobs are passed by URI
/// for the service to pull.
#[derive(Clone)]
pub struct KustoClient {
    inner: Arc<KustoClientInner>,
}

impl std::fmt::Debug for KustoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KustoClient")
            .field("warehouse_uri", &self.inner.warehouse_uri.as_str())
            .field("ingest_uri", &self.inner.ingest_uri.as_str())
            .finish_non_exhaustive()
    }
}

impl KustoClient {
    /// Creates a client for the given endpoints.
    pub fn new(config: KustoConfig, warehouse_uri: &str, ingest_uri: &str) -> Result<Self> {
        let timeout = config.effective_timeout();

        tracing::debug!(
            target: TRACING_TARGET,
            warehouse_uri,
            ingest_uri,
            timeout_ms = timeout.as_millis(),
            "Creating warehouse client"
        );

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(config.effective_user_agent())
            .build()?;

        let inner = KustoClientInner {
            http,
            config,
            warehouse_uri: Url::parse(warehouse_uri)?,
            ingest_uri: Url::parse(ingest_uri)?,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &KustoConfig {
        &self.inner.config
    }

    fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Response(format!("'{base}' cannot be a base URL")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn post(&self, url: Url) -> RequestBuilder {
        let request = self
            .inner
            .http
            .post(url)
            .header("Accept", "application/json")
            .header("x-ms-client-request-id", format!("cachebench;{}", Uuid::new_v4()));

        match self.inner.config.access_token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn command(&self, path: &str, database: &str, csl: &str) -> Result<serde_json::Value> {
        let url = Self::endpoint(&self.inner.warehouse_uri, &["v1", "rest", path])?;
        let request = self.post(url).json(&CommandBody { db: database, csl });
        let response = Self::send(request).await?;
        Ok(response.json().await?)
    }

    fn ingest_url(&self, request: &IngestionRequest) -> Result<Url> {
        let mut url = Self::endpoint(
            &self.inner.ingest_uri,
            &["v1", "rest", "ingest", &request.database, &request.table],
        )?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("streamFormat", request.format.as_ref());
            if let Some(ref mapping) = request.mapping_name {
                query.append_pair("mappingName", mapping);
            }
            if request.source == IngestionSource::Blob {
                query.append_pair("sourceKind", "uri");
            }
        }

        Ok(url)
    }

    async fn ingest(&self, request: &IngestionRequest) -> Result<()> {
        let url = self.ingest_url(request)?;
        let builder = match request.source {
            IngestionSource::LocalFile => {
                let body = tokio::fs::read(&request.source_uri)
                    .await
                    .map_err(|e| Error::Response(format!("'{}': {e}", request.source_uri)))?;
                self.post(url).body(body)
            }
            IngestionSource::Blob => self.post(url).json(&BlobSourceBody {
                source_uri: &request.source_uri,
            }),
        };

        Self::send(builder).await?;
        Ok(())
    }
}

/// Reads the first cell of the primary result table as a row count.
fn parse_row_count(response: &serde_json::Value) -> Option<u64> {
    let cell = response
        .get("Tables")?
        .as_array()?
        .first()?
        .get("Rows")?
        .as_array()?
        .first()?
        .as_array()?
        .first()?;

    cell.as_u64()
        .or_else(|| cell.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64))
        .or_else(|| cell.as_str()?.parse().ok())
}

#[async_trait::async_trait]
impl WarehouseClient for KustoClient {
    async fn execute_control(&self, database: &str, command: &str) -> cachebench_core::Result<()> {
        tracing::debug!(target: TRACING_TARGET, database, command, "Executing control command");

        self.command("mgmt", database, command)
            .await
            .map_err(|e| e.into_core(IngestionStage::Schema))?;
        Ok(())
    }

    async fn query_count(&self, database: &str, query: &str) -> cachebench_core::Result<u64> {
        tracing::debug!(target: TRACING_TARGET, database, query, "Running query");

        let response = self
            .command("query", database, query)
            .await
            .map_err(|e| e.into_core(IngestionStage::Query))?;

        parse_row_count(&response).ok_or_else(|| {
            cachebench_core::Error::ingestion(
                IngestionStage::Query,
                format!("'{query}' did not return a row count"),
            )
        })
    }

    async fn queue_ingestion(&self, request: &IngestionRequest) -> cachebench_core::Result<()> {
        tracing::debug!(
            target: TRACING_TARGET,
            database = %request.database,
            table = %request.table,
            source_uri = %request.source_uri,
            format = %request.format,
            "Queueing ingestion"
        );

        self.ingest(request)
            .await
            .map_err(|e| e.into_core(IngestionStage::Queue))
    }
}

#[cfg(test)]
mod tests {
    use cachebench_core::DataFormat;

    use super::*;

    fn client() -> KustoClient {
        KustoClient::new(
            KustoConfig::default(),
            "https://cluster.example.net",
            "https://ingest-cluster.example.net/",
        )
        .unwrap()
    }

    fn request(source: IngestionSource, mapping_name: Option<&str>) -> IngestionRequest {
        IngestionRequest {
            database: "Benchmarks".into(),
            table: "Results".into(),
            source_uri: "/staging/Test_1".into(),
            format: DataFormat::MultiJson,
            mapping_name: mapping_name.map(str::to_owned),
            source,
        }
    }

    #[test]
    fn builds_management_endpoint() {
        let url = KustoClient::endpoint(&client().inner.warehouse_uri, &["v1", "rest", "mgmt"])
            .unwrap();
        assert_eq!(url.as_str(), "https://cluster.example.net/v1/rest/mgmt");
    }

    #[test]
    fn builds_ingest_endpoint() {
        let client = client();

        let url = client
            .ingest_url(&request(IngestionSource::LocalFile, Some("ResultsMapping")))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://ingest-cluster.example.net/v1/rest/ingest/Benchmarks/Results?streamFormat=multijson&mappingName=ResultsMapping"
        );

        let url = client.ingest_url(&request(IngestionSource::Blob, None)).unwrap();
        assert!(url.as_str().ends_with("?streamFormat=multijson&sourceKind=uri"));
    }

    #[test]
    fn rejects_malformed_endpoint() {
        assert!(KustoClient::new(KustoConfig::default(), "not a url", "https://x").is_err());
    }

    #[test]
    fn parses_row_count_response() {
        let response = serde_json::json!({
            "Tables": [{
                "TableName": "Table_0",
                "Columns": [{ "ColumnName": "Count", "DataType": "Int64" }],
                "Rows": [[1234]]
            }]
        });
        assert_eq!(parse_row_count(&response), Some(1234));
        assert_eq!(parse_row_count(&serde_json::json!({ "Tables": [] })), None);
    }
}
