// Route path segments between consecutive geolocated readings
use super::category::{Category, STROKE_ALPHA, classify};
use super::reading::{GeoPoint, Metric, Reading};
use super::thresholds::Rgba;
use super::zone::DisplayZone;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Alpha for segments whose category is filtered out.
pub const DIMMED_ALPHA: u8 = 60;

/// Gap rules deciding whether two consecutive readings are connected.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SegmentPolicy {
    pub max_gap_secs: i64,
    pub max_distance_deg: f64,
    pub elevation: f64,
}

impl Default for SegmentPolicy {
    fn default() -> Self {
        Self {
            max_gap_secs: 180,
            max_distance_deg: 0.01,
            elevation: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub location: String,
    pub start: GeoPoint,
    pub end: GeoPoint,
    pub elevation: f64,
    pub color: Rgba,
    pub category: Category,
    pub pm25: f64,
    pub co2: Option<f64>,
    pub temperature: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub time_label: String,
}

/// A reading that survived position validation, with its position resolved.
#[derive(Clone, Copy)]
struct Located<'a> {
    reading: &'a Reading,
    position: GeoPoint,
}

#[derive(Debug, Clone, Default)]
pub struct SegmentBuilder {
    policy: SegmentPolicy,
    zone: DisplayZone,
}

impl SegmentBuilder {
    pub fn new(policy: SegmentPolicy, zone: DisplayZone) -> Self {
        Self { policy, zone }
    }

    pub fn policy(&self) -> &SegmentPolicy {
        &self.policy
    }

    /// Lazily yields segments route by route (routes in location order),
    /// chronological within each route. Calling it again restarts the scan.
    ///
    /// `active`: `None` draws everything at full opacity, otherwise
    /// categories outside the set are dimmed rather than removed.
    pub fn segments<'a>(
        &'a self,
        readings: &'a [Reading],
        active: Option<&'a HashSet<Category>>,
    ) -> impl Iterator<Item = Segment> + 'a {
        partition_routes(readings)
            .into_values()
            .flat_map(move |route| {
                (1..route.len()).filter_map(move |i| self.connect(route[i - 1], route[i], active))
            })
    }

    pub fn build(&self, readings: &[Reading], active: Option<&HashSet<Category>>) -> Vec<Segment> {
        self.segments(readings, active).collect()
    }

    fn connect(
        &self,
        current: Located<'_>,
        next: Located<'_>,
        active: Option<&HashSet<Category>>,
    ) -> Option<Segment> {
        let gap_ms = (next.reading.timestamp - current.reading.timestamp).num_milliseconds();
        if gap_ms > self.policy.max_gap_secs.saturating_mul(1000) {
            return None;
        }

        if current.position.degree_distance(&next.position) > self.policy.max_distance_deg {
            return None;
        }

        let pm25 = current.reading.metric(Metric::Pm25)?;
        let (category, color) = classify(pm25);
        let alpha = match active {
            Some(set) if !set.contains(&category) => DIMMED_ALPHA,
            _ => STROKE_ALPHA,
        };

        Some(Segment {
            location: current.reading.location.clone(),
            start: current.position,
            end: next.position,
            elevation: self.policy.elevation,
            color: color.with_alpha(alpha),
            category,
            pm25,
            co2: current.reading.metric(Metric::Co2),
            temperature: current.reading.metric(Metric::Temperature),
            timestamp: current.reading.timestamp,
            time_label: self.zone.format(&current.reading.timestamp),
        })
    }
}

/// Group by location, drop invalid positions, sort each route by time.
fn partition_routes(readings: &[Reading]) -> BTreeMap<&str, Vec<Located<'_>>> {
    let mut routes: BTreeMap<&str, Vec<Located<'_>>> = BTreeMap::new();
    for reading in readings {
        if let Some(position) = reading.position() {
            routes
                .entry(reading.location.as_str())
                .or_default()
                .push(Located { reading, position });
        }
    }
    for route in routes.values_mut() {
        route.sort_by_key(|located| located.reading.timestamp);
    }
    routes
}

/// Segments with the default gap rules and display zone.
pub fn build_segments(readings: &[Reading], active: Option<&HashSet<Category>>) -> Vec<Segment> {
    SegmentBuilder::default().build(readings, active)
}
