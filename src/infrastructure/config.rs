use crate::domain::segment::SegmentPolicy;
use crate::domain::zone::DisplayZone;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub influx: InfluxSettings,
    pub readiness: ReadinessSettings,
    pub query: QuerySettings,
    pub display: DisplaySettings,
    pub segments: SegmentPolicy,
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InfluxSettings {
    pub host: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
    pub timeout_secs: u64,
}

impl Default for InfluxSettings {
    fn default() -> Self {
        Self {
            host: "http://localhost:8086".to_string(),
            token: String::new(),
            org: "uis".to_string(),
            bucket: "iotuis".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReadinessSettings {
    pub max_wait_secs: u64,
    pub interval_ms: u64,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            max_wait_secs: 10,
            interval_ms: 1000,
        }
    }
}

impl ReadinessSettings {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QuerySettings {
    pub start: String,
    pub measurement: Option<String>,
    pub window_secs: Option<u64>,
    pub cache_ttl_secs: u64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            start: "-30d".to_string(),
            measurement: None,
            window_secs: Some(10),
            cache_ttl_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplaySettings {
    pub utc_offset_hours: i32,
    pub zone_label: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            utc_offset_hours: -5,
            zone_label: "COT".to_string(),
        }
    }
}

impl DisplaySettings {
    pub fn zone(&self) -> anyhow::Result<DisplayZone> {
        DisplayZone::from_hours(self.utc_offset_hours, self.zone_label.clone()).ok_or_else(|| {
            anyhow::anyhow!("utc_offset_hours out of range: {}", self.utc_offset_hours)
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

/// `config/dashboard.{toml,...}` if present, then `AQ_*` environment
/// variables (`AQ_INFLUX__TOKEN`, `AQ_SERVER__BIND`, ...).
pub fn load_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(
            config::Environment::with_prefix("AQ")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.influx.timeout_secs, 30);
        assert_eq!(config.readiness.deadline(), Duration::from_secs(10));
        assert_eq!(config.readiness.interval(), Duration::from_secs(1));
        assert_eq!(config.query.window_secs, Some(10));
        assert_eq!(config.segments.max_gap_secs, 180);
        assert_eq!(config.display.zone().unwrap().label(), "COT");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [influx]
            host = "http://influx:8086"
            token = "secret"

            [query]
            start = "-7d"

            [segments]
            max_distance_deg = 0.02
            "#,
        )
        .unwrap();
        assert_eq!(config.influx.host, "http://influx:8086");
        assert_eq!(config.influx.bucket, "iotuis");
        assert_eq!(config.query.start, "-7d");
        assert_eq!(config.query.cache_ttl_secs, 10);
        assert_eq!(config.segments.max_distance_deg, 0.02);
        assert_eq!(config.segments.max_gap_secs, 180);
        assert_eq!(config.server.bind, "0.0.0.0:8080");
    }

    #[test]
    fn test_invalid_offset_is_rejected() {
        let display = DisplaySettings {
            utc_offset_hours: 48,
            zone_label: "X".into(),
        };
        assert!(display.zone().is_err());
    }
}
