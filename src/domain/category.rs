// PM2.5 air-quality categories (EPA AQI breakpoints)
use super::thresholds::{Band, Rgb, Rgba, ThresholdTable};
use serde::Serialize;

/// Alpha used for point fills on the map.
pub const FILL_ALPHA: u8 = 180;
/// Alpha used for path strokes.
pub const STROKE_ALPHA: u8 = 200;

/// Label shown when a reading carries no PM2.5 value.
pub const UNAVAILABLE_LABEL: &str = "No disponible";

/// Severity bands ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Category {
    #[serde(rename = "Buena")]
    Good,
    #[serde(rename = "Moderada")]
    Moderate,
    #[serde(rename = "Dañina para sensibles")]
    UnhealthyForSensitive,
    #[serde(rename = "Dañina")]
    Unhealthy,
    #[serde(rename = "Muy dañina")]
    VeryUnhealthy,
    #[serde(rename = "Peligrosa")]
    Hazardous,
}

static PM25_BANDS: [Band<Category>; 6] = [
    Band::new(0.0, 12.0, Category::Good, Rgb::new(0x00, 0xe4, 0x00)),
    Band::new(12.1, 35.4, Category::Moderate, Rgb::new(0xff, 0xff, 0x00)),
    Band::new(35.5, 55.4, Category::UnhealthyForSensitive, Rgb::new(0xff, 0x7e, 0x00)),
    Band::new(55.5, 150.4, Category::Unhealthy, Rgb::new(0xff, 0x00, 0x00)),
    Band::new(150.5, 250.4, Category::VeryUnhealthy, Rgb::new(0x8f, 0x3f, 0x97)),
    Band::new(250.5, 500.4, Category::Hazardous, Rgb::new(0x7e, 0x00, 0x23)),
];

pub static PM25_SCALE: ThresholdTable<Category> = ThresholdTable::new(&PM25_BANDS);

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Good,
        Category::Moderate,
        Category::UnhealthyForSensitive,
        Category::Unhealthy,
        Category::VeryUnhealthy,
        Category::Hazardous,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Good => "Buena",
            Category::Moderate => "Moderada",
            Category::UnhealthyForSensitive => "Dañina para sensibles",
            Category::Unhealthy => "Dañina",
            Category::VeryUnhealthy => "Muy dañina",
            Category::Hazardous => "Peligrosa",
        }
    }

    /// Accepts either the display label or the variant name, case-insensitive.
    pub fn parse(input: &str) -> Option<Category> {
        let needle = input.trim();
        Category::ALL.into_iter().find(|c| {
            c.label().eq_ignore_ascii_case(needle)
                || format!("{:?}", c).eq_ignore_ascii_case(needle)
        })
    }

    pub fn color(&self) -> Rgb {
        PM25_BANDS
            .iter()
            .find(|band| band.label == *self)
            .map(|band| band.color)
            .unwrap_or(PM25_BANDS[PM25_BANDS.len() - 1].color)
    }
}

/// Classify a PM2.5 concentration (μg/m³). Values outside every band,
/// including anything above 500.4, are treated as `Hazardous`.
pub fn classify(pm25: f64) -> (Category, Rgb) {
    let hit = PM25_SCALE.lookup(pm25);
    (hit.label, hit.color)
}

pub fn classify_with_alpha(pm25: f64, alpha: u8) -> (Category, Rgba) {
    let (category, color) = classify(pm25);
    (category, color.with_alpha(alpha))
}

/// Category by upper bound only: the first band whose `high` is not
/// exceeded. Values between two bands round up into the next one, negative
/// values are `Good` and anything past the scale is `Hazardous`.
pub fn category_at_most(pm25: f64) -> Category {
    PM25_BANDS
        .iter()
        .find(|band| pm25 <= band.high)
        .map(|band| band.label)
        .unwrap_or(Category::Hazardous)
}

/// Table label for an optional reading.
pub fn category_label(pm25: Option<f64>) -> &'static str {
    match pm25 {
        Some(value) => category_at_most(value).label(),
        None => UNAVAILABLE_LABEL,
    }
}
