// User-selected filters applied before any view is built
use super::reading::Reading;
use chrono::{FixedOffset, NaiveDate};
use std::collections::HashSet;

/// Empty or absent selections leave the data untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingFilter {
    /// Inclusive local calendar dates.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub locations: HashSet<String>,
    pub devices: HashSet<String>,
}

impl ReadingFilter {
    pub fn is_empty(&self) -> bool {
        self.date_range.is_none() && self.locations.is_empty() && self.devices.is_empty()
    }

    pub fn matches(&self, reading: &Reading, offset: FixedOffset) -> bool {
        if let Some((from, to)) = self.date_range {
            let date = reading.local_date(offset);
            if date < from || date > to {
                return false;
            }
        }
        if !self.locations.is_empty() && !self.locations.contains(&reading.location) {
            return false;
        }
        if !self.devices.is_empty() {
            match &reading.device_id {
                Some(device) if self.devices.contains(device) => {}
                _ => return false,
            }
        }
        true
    }

    pub fn apply(&self, readings: &[Reading], offset: FixedOffset) -> Vec<Reading> {
        readings
            .iter()
            .filter(|r| self.matches(r, offset))
            .cloned()
            .collect()
    }
}
