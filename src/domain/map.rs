// Point layer and viewport for the route map
use super::category::{Category, FILL_ALPHA, classify_with_alpha};
use super::reading::{GeoPoint, Metric, Reading};
use super::table::round_to;
use super::thresholds::Rgba;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub location: String,
    pub position: GeoPoint,
    pub pm25: f64,
    pub co2: Option<f64>,
    pub category: Category,
    pub color: Rgba,
}

/// One point per reading with a valid position and a PM2.5 value.
pub fn map_points(readings: &[Reading]) -> Vec<MapPoint> {
    readings
        .iter()
        .filter_map(|reading| {
            let position = reading.position()?;
            let pm25 = reading.metric(Metric::Pm25)?;
            let (category, color) = classify_with_alpha(pm25, FILL_ALPHA);
            Some(MapPoint {
                location: reading.location.clone(),
                position,
                pm25: round_to(pm25, 1),
                co2: reading.metric(Metric::Co2).map(|v| round_to(v, 1)),
                category,
                color,
            })
        })
        .collect()
}

/// Mean of all valid positions.
pub fn view_center(readings: &[Reading]) -> Option<GeoPoint> {
    let (sum_lat, sum_lon, count) = readings
        .iter()
        .filter_map(Reading::position)
        .fold((0.0, 0.0, 0usize), |(lat, lon, n), p| (lat + p.lat, lon + p.lon, n + 1));
    (count > 0).then(|| GeoPoint::new(sum_lat / count as f64, sum_lon / count as f64))
}
