// InfluxDB v2 repository implementation (Flux over HTTP, CSV results)
use crate::application::reading_repository::{ReadingRepository, StoreError};
use crate::domain::reading::{Metric, Reading};
use crate::infrastructure::config::InfluxSettings;
use crate::infrastructure::flux::{
    DEVICE_TAG, LATITUDE_FIELD, LOCATION_TAG, LONGITUDE_FIELD, PING_QUERY,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use csv::StringRecord;
use reqwest::StatusCode;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct InfluxRepository {
    client: reqwest::Client,
    host: String,
    token: String,
    org: String,
}

impl InfluxRepository {
    pub fn new(settings: &InfluxSettings) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| StoreError::Client(e.to_string()))?;
        Ok(Self {
            client,
            host: settings.host.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            org: settings.org.clone(),
        })
    }

    fn build_query_url(&self) -> String {
        format!("{}/api/v2/query?org={}", self.host, urlencoding::encode(&self.org))
    }

    async fn execute_query(&self, flux: &str) -> Result<String, StoreError> {
        let body = serde_json::json!({
            "query": flux,
            "type": "flux",
            "dialect": { "header": true, "annotations": [], "delimiter": "," },
        });

        let response = self
            .client
            .post(self.build_query_url())
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/csv")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        Ok(response.text().await?)
    }
}

/// A 503 means the store is still starting; any other failure status is a
/// rejected query.
fn status_error(status: StatusCode, body: String) -> StoreError {
    if status == StatusCode::SERVICE_UNAVAILABLE {
        StoreError::NotReady(body)
    } else {
        StoreError::Status {
            status: status.as_u16(),
            body,
        }
    }
}

#[async_trait]
impl ReadingRepository for InfluxRepository {
    async fn ping(&self) -> Result<(), StoreError> {
        let url = format!("{}/health", self.host);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(StoreError::NotReady(format!(
                "health check returned {}",
                response.status()
            )));
        }
        // Health alone does not prove the token and org work
        self.execute_query(PING_QUERY).await.map(|_| ())
    }

    async fn fetch_readings(&self, flux: &str) -> Result<Vec<Reading>, StoreError> {
        tracing::debug!("Executing flux query: {}", flux);
        let body = self.execute_query(flux).await?;
        let decoded = decode_csv(&body)?;
        if decoded.skipped > 0 {
            tracing::warn!("Skipped {} rows without time or location", decoded.skipped);
        }
        tracing::debug!("Decoded {} readings", decoded.readings.len());
        Ok(decoded.readings)
    }
}

#[derive(Debug, Default)]
pub struct DecodedRows {
    pub readings: Vec<Reading>,
    pub skipped: usize,
}

/// Column positions of one result table.
#[derive(Debug, Default)]
struct Columns {
    time: Option<usize>,
    location: Option<usize>,
    device: Option<usize>,
    latitude: Option<usize>,
    longitude: Option<usize>,
    pm25: Option<usize>,
    co2: Option<usize>,
    temperature: Option<usize>,
}

impl Columns {
    fn from_header(header: &StringRecord) -> Self {
        let find = |name: &str| header.iter().position(|column| column == name);
        Self {
            time: find("_time"),
            location: find(LOCATION_TAG),
            device: find(DEVICE_TAG),
            latitude: find(LATITUDE_FIELD),
            longitude: find(LONGITUDE_FIELD),
            pm25: find(Metric::Pm25.field()),
            co2: find(Metric::Co2.field()),
            temperature: find(Metric::Temperature.field()),
        }
    }

    fn reading(&self, record: &StringRecord) -> Option<Reading> {
        let text = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };
        let number = |idx: Option<usize>| text(idx).and_then(|s| s.parse::<f64>().ok());

        let timestamp = DateTime::parse_from_rfc3339(text(self.time)?)
            .ok()?
            .with_timezone(&Utc);
        let location = text(self.location)?;

        Some(Reading {
            timestamp,
            location: location.to_string(),
            device_id: text(self.device).map(str::to_string),
            latitude: number(self.latitude),
            longitude: number(self.longitude),
            pm25: number(self.pm25),
            co2: number(self.co2),
            temperature: number(self.temperature),
        })
    }
}

fn is_header(record: &StringRecord) -> bool {
    record.iter().any(|f| f == "_time") && record.iter().any(|f| f == "table")
}

/// Decode an unannotated Flux CSV response. Each table brings its own
/// header row; tables are separated by blank lines.
pub fn decode_csv(body: &str) -> Result<DecodedRows, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut decoded = DecodedRows::default();
    let mut columns: Option<Columns> = None;

    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            columns = None;
            continue;
        }
        if record.get(0).is_some_and(|f| f.starts_with('#')) {
            continue;
        }
        if is_header(&record) {
            columns = Some(Columns::from_header(&record));
            continue;
        }
        let Some(current) = &columns else {
            return Err(StoreError::Decode("data row before header".to_string()));
        };
        match current.reading(&record) {
            Some(reading) => decoded.readings.push(reading),
            None => decoded.skipped += 1,
        }
    }

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const BODY: &str = "\
,result,table,_start,_stop,_time,location,CO2,Lat,Lon,PM2.5,Temperature
,_result,0,2025-01-01T00:00:00Z,2025-01-31T00:00:00Z,2025-01-10T12:00:00Z,Ruta1,420,7.1,-73.1,8.5,24.1
,_result,0,2025-01-01T00:00:00Z,2025-01-31T00:00:00Z,2025-01-10T12:00:10Z,Ruta1,-1,-1,-1,9,
,_result,0,2025-01-01T00:00:00Z,2025-01-31T00:00:00Z,2025-01-10T12:00:20Z,,410,7.1,-73.1,9,24

,result,table,_start,_stop,_time,location,deviceId,PM2.5
,_result,1,2025-01-01T00:00:00Z,2025-01-31T00:00:00Z,2025-01-10T12:00:00.5Z,Ruta2,bus-9,40.2
";

    #[test]
    fn test_decode_multi_table_csv() {
        let decoded = decode_csv(BODY).unwrap();
        assert_eq!(decoded.readings.len(), 3);
        assert_eq!(decoded.skipped, 1);

        let first = &decoded.readings[0];
        assert_eq!(first.location, "Ruta1");
        assert_eq!(first.timestamp, Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap());
        assert_eq!(first.co2, Some(420.0));
        assert_eq!(first.temperature, Some(24.1));

        let sentinel = &decoded.readings[1];
        assert!(sentinel.position().is_none());
        assert_eq!(sentinel.metric(Metric::Co2), None);
        assert_eq!(sentinel.temperature, None);

        let other = &decoded.readings[2];
        assert_eq!(other.location, "Ruta2");
        assert_eq!(other.device_id.as_deref(), Some("bus-9"));
        assert_eq!(other.pm25, Some(40.2));
        assert_eq!(other.latitude, None);
    }

    #[test]
    fn test_empty_body_is_no_data() {
        let decoded = decode_csv("").unwrap();
        assert!(decoded.readings.is_empty());
        let decoded = decode_csv("\r\n").unwrap();
        assert!(decoded.readings.is_empty());
    }

    #[test]
    fn test_row_without_header_is_malformed() {
        let err = decode_csv(",_result,0,2025-01-10T12:00:00Z,Ruta1\n").unwrap_err();
        assert!(!err.is_connectivity());
    }

    #[test]
    fn test_status_mapping() {
        let err = status_error(StatusCode::SERVICE_UNAVAILABLE, "starting".into());
        assert!(err.is_connectivity());
        let err = status_error(StatusCode::BAD_REQUEST, "compilation failed".into());
        assert!(!err.is_connectivity());
        assert!(matches!(err, StoreError::Status { status: 400, .. }));
    }

    fn settings(host: String) -> InfluxSettings {
        InfluxSettings {
            host,
            token: "secret".into(),
            ..InfluxSettings::default()
        }
    }

    /// Serves `router` on an ephemeral local port and returns its base URL.
    async fn serve(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn store(query_status: StatusCode, query_body: &'static str) -> axum::Router {
        use axum::http::HeaderMap;
        use axum::routing::{get, post};

        axum::Router::new()
            .route("/health", get(|| async { "ok" }))
            .route(
                "/api/v2/query",
                post(move |headers: HeaderMap| async move {
                    let authorized = headers
                        .get("authorization")
                        .is_some_and(|v| v.as_bytes() == b"Token secret");
                    if authorized {
                        (query_status, query_body)
                    } else {
                        (StatusCode::UNAUTHORIZED, "unauthorized")
                    }
                }),
            )
    }

    #[tokio::test]
    async fn test_refused_connection_is_connectivity() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let repo = InfluxRepository::new(&settings(format!("http://127.0.0.1:{}", port))).unwrap();

        let err = repo.fetch_readings("buckets()").await.unwrap_err();
        assert!(err.is_connectivity(), "{:?}", err);
        let err = repo.ping().await.unwrap_err();
        assert!(err.is_connectivity(), "{:?}", err);
    }

    #[tokio::test]
    async fn test_rejected_query_is_not_connectivity() {
        let host = serve(store(StatusCode::BAD_REQUEST, "compilation failed")).await;
        let repo = InfluxRepository::new(&settings(host)).unwrap();

        let err = repo.fetch_readings("from(").await.unwrap_err();
        assert!(!err.is_connectivity());
        match err {
            StoreError::Status { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "compilation failed");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unavailable_store_is_not_ready() {
        let host = serve(store(StatusCode::SERVICE_UNAVAILABLE, "starting")).await;
        let repo = InfluxRepository::new(&settings(host)).unwrap();

        assert!(matches!(
            repo.fetch_readings("buckets()").await,
            Err(StoreError::NotReady(_))
        ));
        assert!(repo.ping().await.unwrap_err().is_connectivity());
    }

    #[tokio::test]
    async fn test_fetch_decodes_store_body() {
        let host = serve(store(StatusCode::OK, BODY)).await;
        let repo = InfluxRepository::new(&settings(host)).unwrap();

        assert!(repo.ping().await.is_ok());
        let readings = repo.fetch_readings("from(bucket: \"iotuis\")").await.unwrap();
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[2].location, "Ruta2");
    }

    #[test]
    fn test_query_url_encodes_org() {
        let repo = InfluxRepository::new(&InfluxSettings {
            host: "http://influx:8086/".into(),
            org: "smart campus".into(),
            ..InfluxSettings::default()
        })
        .unwrap();
        assert_eq!(repo.build_query_url(), "http://influx:8086/api/v2/query?org=smart%20campus");
    }
}
