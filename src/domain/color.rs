// CO2 and temperature color scales
use super::category::FILL_ALPHA;
use super::thresholds::{Band, BandMatch, Rgb, Rgba, ThresholdTable};

static CO2_BANDS: [Band<&str>; 6] = [
    Band::new(f64::NEG_INFINITY, 400.0, "Exterior", Rgb::new(0x00, 0xe4, 0x00)),
    Band::new(400.0, 600.0, "Buena", Rgb::new(0xff, 0xff, 0x00)),
    Band::new(600.0, 1000.0, "Aceptable", Rgb::new(0xff, 0x7e, 0x00)),
    Band::new(1000.0, 5000.0, "Mala", Rgb::new(0xff, 0x00, 0x00)),
    Band::new(5000.0, 10000.0, "Muy mala", Rgb::new(0x8f, 0x3f, 0x97)),
    Band::new(10000.0, f64::INFINITY, "Peligrosa", Rgb::new(0x7e, 0x00, 0x23)),
];

static TEMPERATURE_BANDS: [Band<&str>; 7] = [
    Band::new(f64::NEG_INFINITY, 10.0, "Frío", Rgb::new(0x00, 0x00, 0xff)),
    Band::new(10.0, 15.0, "Fresco", Rgb::new(0x00, 0x80, 0xff)),
    Band::new(15.0, 20.0, "Templado", Rgb::new(0x00, 0xff, 0xff)),
    Band::new(20.0, 25.0, "Agradable", Rgb::new(0x00, 0xff, 0x00)),
    Band::new(25.0, 30.0, "Cálido", Rgb::new(0xff, 0xff, 0x00)),
    Band::new(30.0, 35.0, "Caluroso", Rgb::new(0xff, 0x80, 0x00)),
    Band::new(35.0, f64::INFINITY, "Extremo", Rgb::new(0xff, 0x00, 0x00)),
];

/// Upper-inclusive CO2 scale in ppm: ≤400, ≤600, ≤1000, ≤5000, ≤10000, above.
pub static CO2_SCALE: ThresholdTable<&str> = ThresholdTable::new(&CO2_BANDS);

/// Upper-inclusive temperature scale in °C: ≤10, ≤15, ≤20, ≤25, ≤30, ≤35, above.
pub static TEMPERATURE_SCALE: ThresholdTable<&str> = ThresholdTable::new(&TEMPERATURE_BANDS);

pub fn co2_band(ppm: f64) -> BandMatch<&'static str> {
    CO2_SCALE.lookup(ppm)
}

pub fn temperature_band(celsius: f64) -> BandMatch<&'static str> {
    TEMPERATURE_SCALE.lookup(celsius)
}

pub fn co2_color(ppm: f64) -> Rgba {
    co2_band(ppm).color.with_alpha(FILL_ALPHA)
}

pub fn temp_color(celsius: f64) -> Rgba {
    temperature_band(celsius).color.with_alpha(FILL_ALPHA)
}
