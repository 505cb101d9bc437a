// Flux query construction for the pivoted telemetry schema
//
// Canonical schema: one row per (_time, location), one column per field
// ("CO2", "PM2.5", "Temperature", "Lat", "Lon"), optional "deviceId" tag.
use crate::domain::reading::Metric;

pub const LATITUDE_FIELD: &str = "Lat";
pub const LONGITUDE_FIELD: &str = "Lon";
pub const LOCATION_TAG: &str = "location";
pub const DEVICE_TAG: &str = "deviceId";

/// Every field the dashboard reads.
pub fn default_fields() -> Vec<String> {
    let mut fields: Vec<String> = Metric::ALL.iter().map(|m| m.field().to_string()).collect();
    fields.push(LATITUDE_FIELD.to_string());
    fields.push(LONGITUDE_FIELD.to_string());
    fields
}

/// Builder for `from |> range |> filter |> aggregateWindow |> pivot`.
/// Field names are not validated; the store rejects bad queries.
#[derive(Debug, Clone, PartialEq)]
pub struct FluxQuery {
    bucket: String,
    start: String,
    measurement: Option<String>,
    fields: Vec<String>,
    window_secs: Option<u64>,
    pivot: bool,
}

impl FluxQuery {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            start: "-1h".to_string(),
            measurement: None,
            fields: Vec::new(),
            window_secs: None,
            pivot: true,
        }
    }

    /// Relative (`-30d`) or absolute RFC 3339 start.
    pub fn start(mut self, start: impl Into<String>) -> Self {
        self.start = start.into();
        self
    }

    pub fn measurement(mut self, measurement: Option<String>) -> Self {
        self.measurement = measurement;
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Downsample to the last value of each window before pivoting.
    pub fn window_secs(mut self, window_secs: Option<u64>) -> Self {
        self.window_secs = window_secs.filter(|w| *w > 0);
        self
    }

    pub fn pivot(mut self, pivot: bool) -> Self {
        self.pivot = pivot;
        self
    }

    pub fn build(&self) -> String {
        let mut lines = vec![
            format!("from(bucket: \"{}\")", escape(&self.bucket)),
            format!("  |> range(start: {})", self.start),
        ];
        if let Some(measurement) = &self.measurement {
            lines.push(format!(
                "  |> filter(fn: (r) => r[\"_measurement\"] == \"{}\")",
                escape(measurement)
            ));
        }
        if !self.fields.is_empty() {
            let predicate = self
                .fields
                .iter()
                .map(|f| format!("r[\"_field\"] == \"{}\"", escape(f)))
                .collect::<Vec<_>>()
                .join(" or ");
            lines.push(format!("  |> filter(fn: (r) => {})", predicate));
        }
        if let Some(window) = self.window_secs {
            lines.push(format!(
                "  |> aggregateWindow(every: {}s, fn: last, createEmpty: false)",
                window
            ));
        }
        if self.pivot {
            lines.push(format!(
                "  |> pivot(rowKey: [\"_time\", \"{}\"], columnKey: [\"_field\"], valueColumn: \"_value\")",
                LOCATION_TAG
            ));
        }
        lines.join("\n")
    }
}

/// Escape a value placed inside a Flux string literal.
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Pivoted query over `fields` with an optional downsample window.
pub fn build_query<I, S>(fields: I, bucket: &str, start: &str, window_secs: Option<u64>) -> String
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    FluxQuery::new(bucket)
        .start(start)
        .fields(fields)
        .window_secs(window_secs)
        .build()
}

/// Readiness probe query.
pub const PING_QUERY: &str = "buckets() |> limit(n: 1)";
