// Tabular view: formatted rows, column selection and pagination
use super::category::category_label;
use super::reading::{Metric, Reading};
use super::zone::DisplayZone;
use serde::Serialize;

pub const PAGE_SIZES: [usize; 5] = [25, 50, 100, 200, 500];
pub const DEFAULT_PAGE_SIZE: usize = 100;

pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// Which metric columns are shown. Base columns are always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableColumns {
    pub co2: bool,
    pub pm25: bool,
    pub temperature: bool,
}

impl Default for TableColumns {
    fn default() -> Self {
        Self {
            co2: true,
            pm25: true,
            temperature: true,
        }
    }
}

impl TableColumns {
    /// An empty selection falls back to every metric.
    pub fn from_metrics(metrics: &[Metric]) -> Self {
        if metrics.is_empty() {
            return Self::default();
        }
        Self {
            co2: metrics.contains(&Metric::Co2),
            pm25: metrics.contains(&Metric::Pm25),
            temperature: metrics.contains(&Metric::Temperature),
        }
    }

    pub fn headers(&self) -> Vec<&'static str> {
        let mut headers = vec!["Fecha y Hora", "ID Dispositivo", "Ruta", "Latitud", "Longitud"];
        if self.co2 {
            headers.push("CO₂ (ppm)");
        }
        if self.pm25 {
            headers.push("PM2.5 (μg/m³)");
        }
        if self.temperature {
            headers.push("Temperatura (°C)");
        }
        if self.pm25 {
            headers.push("Calidad del Aire");
        }
        headers
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub timestamp: String,
    pub device_id: Option<String>,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub co2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm25: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub air_quality: Option<&'static str>,
}

impl TableRow {
    pub fn from_reading(reading: &Reading, columns: &TableColumns, zone: &DisplayZone) -> Self {
        let metric = |enabled: bool, metric: Metric| {
            enabled
                .then(|| reading.metric(metric).map(|v| round_to(v, 2)))
                .flatten()
        };
        Self {
            timestamp: zone.format(&reading.timestamp),
            device_id: reading.device_id.clone(),
            location: reading.location.clone(),
            latitude: reading.latitude.map(|v| round_to(v, 6)),
            longitude: reading.longitude.map(|v| round_to(v, 6)),
            co2: metric(columns.co2, Metric::Co2),
            pm25: metric(columns.pm25, Metric::Pm25),
            temperature: metric(columns.temperature, Metric::Temperature),
            air_quality: columns
                .pm25
                .then(|| category_label(reading.metric(Metric::Pm25))),
        }
    }

    /// Cells in `TableColumns::headers` order; missing values are empty.
    pub fn cells(&self, columns: &TableColumns) -> Vec<String> {
        let number = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        let mut cells = vec![
            self.timestamp.clone(),
            self.device_id.clone().unwrap_or_default(),
            self.location.clone(),
            number(self.latitude),
            number(self.longitude),
        ];
        if columns.co2 {
            cells.push(number(self.co2));
        }
        if columns.pm25 {
            cells.push(number(self.pm25));
        }
        if columns.temperature {
            cells.push(number(self.temperature));
        }
        if columns.pm25 {
            cells.push(self.air_quality.unwrap_or_default().to_string());
        }
        cells
    }
}

pub fn format_rows(
    readings: &[Reading],
    columns: &TableColumns,
    zone: &DisplayZone,
) -> Vec<TableRow> {
    readings
        .iter()
        .map(|r| TableRow::from_reading(r, columns, zone))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub total_records: usize,
    /// 1-based index of the first item on this page (0 when empty).
    pub first: usize,
    pub last: usize,
    pub items: Vec<T>,
}

/// Unknown page sizes fall back to the default; pages clamp to `1..=total_pages`.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = if PAGE_SIZES.contains(&per_page) {
        per_page
    } else {
        DEFAULT_PAGE_SIZE
    };
    let total_records = items.len();
    let total_pages = total_records.div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);
    let start = ((page - 1) * per_page).min(total_records);
    let end = (start + per_page).min(total_records);
    Page {
        page,
        per_page,
        total_pages,
        total_records,
        first: if start < end { start + 1 } else { 0 },
        last: end,
        items: items[start..end].to_vec(),
    }
}
