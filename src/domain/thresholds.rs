// Ordered threshold lookup shared by the PM2.5, CO2 and temperature scales
use serde::Serialize;

/// Opaque RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn with_alpha(self, alpha: u8) -> Rgba {
        Rgba([self.r, self.g, self.b, alpha])
    }

    /// Lowercase `#rrggbb` form.
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// RGBA color, serialized as `[r, g, b, a]` the way map layers expect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub fn rgb(&self) -> Rgb {
        Rgb::new(self.0[0], self.0[1], self.0[2])
    }

    pub fn alpha(&self) -> u8 {
        self.0[3]
    }
}

/// One inclusive `[low, high]` band of a scale.
#[derive(Debug, Clone, Copy)]
pub struct Band<T> {
    pub low: f64,
    pub high: f64,
    pub label: T,
    pub color: Rgb,
}

impl<T> Band<T> {
    pub const fn new(low: f64, high: f64, label: T, color: Rgb) -> Self {
        Self {
            low,
            high,
            label,
            color,
        }
    }

    fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }
}

/// Result of a lookup. `fallback` is set when no band matched and the last
/// (worst) band was used instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandMatch<T> {
    pub label: T,
    pub color: Rgb,
    pub fallback: bool,
}

/// Ascending table of bands, first match wins, unmatched values land in the
/// last band.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdTable<T: 'static> {
    bands: &'static [Band<T>],
}

impl<T: Copy + 'static> ThresholdTable<T> {
    pub const fn new(bands: &'static [Band<T>]) -> Self {
        assert!(!bands.is_empty(), "threshold table needs at least one band");
        Self { bands }
    }

    pub fn bands(&self) -> &'static [Band<T>] {
        self.bands
    }

    pub fn lookup(&self, value: f64) -> BandMatch<T> {
        match self.bands.iter().find(|band| band.contains(value)) {
            Some(band) => BandMatch {
                label: band.label,
                color: band.color,
                fallback: false,
            },
            None => {
                let last = &self.bands[self.bands.len() - 1];
                BandMatch {
                    label: last.label,
                    color: last.color,
                    fallback: true,
                }
            }
        }
    }
}
