// Local display time zone (fixed offset, e.g. COT = UTC-5)
use chrono::{DateTime, FixedOffset, Offset, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayZone {
    offset: FixedOffset,
    label: String,
}

impl DisplayZone {
    pub fn new(offset: FixedOffset, label: impl Into<String>) -> Self {
        Self {
            offset,
            label: label.into(),
        }
    }

    /// `None` when the offset is outside ±24h.
    pub fn from_hours(hours: i32, label: impl Into<String>) -> Option<Self> {
        let offset = FixedOffset::east_opt(hours.checked_mul(3600)?)?;
        Some(Self::new(offset, label))
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix(), "UTC")
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// `YYYY-mm-dd HH:MM:SS <label>`
    pub fn format(&self, timestamp: &DateTime<Utc>) -> String {
        format!(
            "{} {}",
            timestamp.with_timezone(&self.offset).format("%Y-%m-%d %H:%M:%S"),
            self.label
        )
    }
}

impl Default for DisplayZone {
    fn default() -> Self {
        Self::from_hours(-5, "COT").unwrap_or_else(Self::utc)
    }
}
