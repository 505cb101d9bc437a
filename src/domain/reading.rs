// Sensor reading domain model
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

/// Marker the devices send for "no GPS fix" / "no CO2 reading".
pub const SENTINEL: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Planar distance in degree space.
    pub fn degree_distance(&self, other: &GeoPoint) -> f64 {
        ((self.lat - other.lat).powi(2) + (self.lon - other.lon).powi(2)).sqrt()
    }
}

/// One sample as returned by the store. Never mutated after decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub location: String,
    pub device_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub pm25: Option<f64>,
    pub co2: Option<f64>,
    pub temperature: Option<f64>,
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>, location: impl Into<String>) -> Self {
        Self {
            timestamp,
            location: location.into(),
            device_id: None,
            latitude: None,
            longitude: None,
            pm25: None,
            co2: None,
            temperature: None,
        }
    }

    pub fn with_position(mut self, lat: f64, lon: f64) -> Self {
        self.latitude = Some(lat);
        self.longitude = Some(lon);
        self
    }

    pub fn with_pm25(mut self, value: f64) -> Self {
        self.pm25 = Some(value);
        self
    }

    pub fn with_co2(mut self, value: f64) -> Self {
        self.co2 = Some(value);
        self
    }

    pub fn with_temperature(mut self, value: f64) -> Self {
        self.temperature = Some(value);
        self
    }

    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Position usable for spatial work: both coordinates present, finite and
    /// not the sentinel.
    pub fn position(&self) -> Option<GeoPoint> {
        let lat = self.latitude.filter(|v| is_valid_coordinate(*v))?;
        let lon = self.longitude.filter(|v| is_valid_coordinate(*v))?;
        Some(GeoPoint::new(lat, lon))
    }

    /// Value of a metric with sentinels and non-finite values removed.
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        let raw = match metric {
            Metric::Pm25 => self.pm25,
            Metric::Co2 => self.co2.filter(|v| *v != SENTINEL),
            Metric::Temperature => self.temperature,
        };
        raw.filter(|v| v.is_finite())
    }

    pub fn local_time(&self, offset: FixedOffset) -> DateTime<FixedOffset> {
        self.timestamp.with_timezone(&offset)
    }

    pub fn local_date(&self, offset: FixedOffset) -> NaiveDate {
        self.local_time(offset).date_naive()
    }
}

fn is_valid_coordinate(value: f64) -> bool {
    value.is_finite() && value != SENTINEL
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Metric {
    #[serde(rename = "PM2.5")]
    Pm25,
    #[serde(rename = "CO2")]
    Co2,
    #[serde(rename = "Temperature")]
    Temperature,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Co2, Metric::Pm25, Metric::Temperature];

    /// Field name in the pivoted store schema.
    pub fn field(&self) -> &'static str {
        match self {
            Metric::Pm25 => "PM2.5",
            Metric::Co2 => "CO2",
            Metric::Temperature => "Temperature",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Pm25 => "μg/m³",
            Metric::Co2 => "ppm",
            Metric::Temperature => "°C",
        }
    }

    pub fn parse(input: &str) -> Option<Metric> {
        match input.trim().to_ascii_lowercase().as_str() {
            "pm2.5" | "pm25" => Some(Metric::Pm25),
            "co2" => Some(Metric::Co2),
            "temperature" | "temp" => Some(Metric::Temperature),
            _ => None,
        }
    }
}
