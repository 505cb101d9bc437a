// Grouped descriptive statistics over readings
use super::category::{Category, classify};
use super::reading::{Metric, Reading};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Timelike, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl Stats {
    /// `None` for an empty input.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in values {
            count += 1;
            sum += value;
            min = min.min(value);
            max = max.max(value);
        }
        (count > 0).then(|| Stats {
            mean: sum / count as f64,
            min,
            max,
            count,
        })
    }
}

/// Per-metric stats of one group. A metric with no values in the group is
/// `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MetricSummary {
    pub records: usize,
    #[serde(rename = "PM2.5")]
    pub pm25: Option<Stats>,
    #[serde(rename = "CO2")]
    pub co2: Option<Stats>,
    #[serde(rename = "Temperature")]
    pub temperature: Option<Stats>,
}

impl MetricSummary {
    pub fn from_readings(readings: &[&Reading]) -> Self {
        let stats =
            |metric: Metric| Stats::from_values(readings.iter().filter_map(|r| r.metric(metric)));
        Self {
            records: readings.len(),
            pm25: stats(Metric::Pm25),
            co2: stats(Metric::Co2),
            temperature: stats(Metric::Temperature),
        }
    }

    pub fn get(&self, metric: Metric) -> Option<&Stats> {
        match metric {
            Metric::Pm25 => self.pm25.as_ref(),
            Metric::Co2 => self.co2.as_ref(),
            Metric::Temperature => self.temperature.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Location,
    Date,
    Hour,
}

/// Key of one group. Ordering is what breaks ties between groups.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum GroupValue {
    Location(String),
    Date(NaiveDate),
    Hour(u32),
}

/// Group readings and summarize each group. Date and hour buckets use the
/// given local offset.
pub fn aggregate(
    readings: &[Reading],
    key: GroupKey,
    offset: FixedOffset,
) -> BTreeMap<GroupValue, MetricSummary> {
    let mut groups: BTreeMap<GroupValue, Vec<&Reading>> = BTreeMap::new();
    for reading in readings {
        let value = match key {
            GroupKey::Location => GroupValue::Location(reading.location.clone()),
            GroupKey::Date => GroupValue::Date(reading.local_date(offset)),
            GroupKey::Hour => GroupValue::Hour(reading.local_time(offset).hour()),
        };
        groups.entry(value).or_default().push(reading);
    }
    groups
        .into_iter()
        .map(|(value, members)| (value, MetricSummary::from_readings(&members)))
        .collect()
}

fn extreme_by_mean<'a>(
    groups: &'a BTreeMap<GroupValue, MetricSummary>,
    metric: Metric,
    better: impl Fn(f64, f64) -> bool,
) -> Option<(&'a GroupValue, f64)> {
    let mut best: Option<(&GroupValue, f64)> = None;
    for (key, summary) in groups {
        let Some(stats) = summary.get(metric) else {
            continue;
        };
        match best {
            Some((_, current)) if !better(stats.mean, current) => {}
            _ => best = Some((key, stats.mean)),
        }
    }
    best
}

/// Group with the highest mean; ties go to the smallest key.
pub fn max_mean(
    groups: &BTreeMap<GroupValue, MetricSummary>,
    metric: Metric,
) -> Option<(&GroupValue, f64)> {
    extreme_by_mean(groups, metric, |candidate, current| candidate > current)
}

/// Group with the lowest mean; ties go to the smallest key.
pub fn min_mean(
    groups: &BTreeMap<GroupValue, MetricSummary>,
    metric: Metric,
) -> Option<(&GroupValue, f64)> {
    extreme_by_mean(groups, metric, |candidate, current| candidate < current)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourHighlight {
    pub hour: u32,
    pub mean_pm25: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationHighlight {
    pub location: String,
    pub mean_pm25: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: Category,
    pub count: usize,
    /// Percentage of all records, PM2.5 present or not.
    pub percentage: f64,
}

/// Headline cards of the analytics page.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Highlights {
    pub total_records: usize,
    pub most_dangerous_hour: Option<HourHighlight>,
    pub most_contaminated_location: Option<LocationHighlight>,
    pub least_contaminated_location: Option<LocationHighlight>,
    pub most_common_category: Option<CategoryShare>,
}

pub fn highlights(readings: &[Reading], offset: FixedOffset) -> Highlights {
    let hours = aggregate(readings, GroupKey::Hour, offset);
    let locations = aggregate(readings, GroupKey::Location, offset);

    let most_dangerous_hour = match max_mean(&hours, Metric::Pm25) {
        Some((GroupValue::Hour(hour), mean_pm25)) => Some(HourHighlight {
            hour: *hour,
            mean_pm25,
        }),
        _ => None,
    };
    let location_highlight = |hit: Option<(&GroupValue, f64)>| match hit {
        Some((GroupValue::Location(location), mean_pm25)) => Some(LocationHighlight {
            location: location.clone(),
            mean_pm25,
        }),
        _ => None,
    };

    Highlights {
        total_records: readings.len(),
        most_dangerous_hour,
        most_contaminated_location: location_highlight(max_mean(&locations, Metric::Pm25)),
        least_contaminated_location: location_highlight(min_mean(&locations, Metric::Pm25)),
        most_common_category: most_common_category(readings),
    }
}

/// Count of readings per PM2.5 category. Readings without PM2.5 are not
/// counted.
pub fn category_distribution(readings: &[Reading]) -> BTreeMap<Category, usize> {
    let mut counts = BTreeMap::new();
    for pm25 in readings.iter().filter_map(|r| r.metric(Metric::Pm25)) {
        *counts.entry(classify(pm25).0).or_insert(0) += 1;
    }
    counts
}

/// Modal category; ties go to the less severe category.
pub fn most_common_category(readings: &[Reading]) -> Option<CategoryShare> {
    let counts = category_distribution(readings);
    let mut best: Option<(Category, usize)> = None;
    for (category, count) in counts {
        if best.is_none_or(|(_, current)| count > current) {
            best = Some((category, count));
        }
    }
    best.map(|(category, count)| CategoryShare {
        category,
        count,
        percentage: count as f64 / readings.len() as f64 * 100.0,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationRank {
    pub location: String,
    pub mean_pm25: f64,
    pub category: Category,
    pub color: String,
}

/// Mean PM2.5 per location, lowest first, colored by its category.
pub fn location_ranking(readings: &[Reading]) -> Vec<LocationRank> {
    let groups = aggregate(readings, GroupKey::Location, Utc.fix());
    let mut ranking: Vec<LocationRank> = groups
        .into_iter()
        .filter_map(|(key, summary)| {
            let GroupValue::Location(location) = key else {
                return None;
            };
            let mean_pm25 = summary.pm25?.mean;
            let (category, color) = classify(mean_pm25);
            Some(LocationRank {
                location,
                mean_pm25,
                category,
                color: color.hex(),
            })
        })
        .collect();
    ranking.sort_by(|a, b| a.mean_pm25.total_cmp(&b.mean_pm25));
    ranking
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStat {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub summary: MetricSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyStat {
    pub hour: u32,
    #[serde(flatten)]
    pub summary: MetricSummary,
}

/// Daily stats, newest date first.
pub fn daily_stats(readings: &[Reading], offset: FixedOffset) -> Vec<DailyStat> {
    let mut days: Vec<DailyStat> = aggregate(readings, GroupKey::Date, offset)
        .into_iter()
        .filter_map(|(key, summary)| match key {
            GroupValue::Date(date) => Some(DailyStat { date, summary }),
            _ => None,
        })
        .collect();
    days.reverse();
    days
}

/// Hourly stats, hour 0 first.
pub fn hourly_stats(readings: &[Reading], offset: FixedOffset) -> Vec<HourlyStat> {
    aggregate(readings, GroupKey::Hour, offset)
        .into_iter()
        .filter_map(|(key, summary)| match key {
            GroupValue::Hour(hour) => Some(HourlyStat { hour, summary }),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Mean of a metric per distinct timestamp, ascending in time.
pub fn metric_series(readings: &[Reading], metric: Metric) -> Vec<SeriesPoint> {
    let mut buckets: BTreeMap<DateTime<Utc>, (f64, usize)> = BTreeMap::new();
    for reading in readings {
        if let Some(value) = reading.metric(metric) {
            let bucket = buckets.entry(reading.timestamp).or_insert((0.0, 0));
            bucket.0 += value;
            bucket.1 += 1;
        }
    }
    buckets
        .into_iter()
        .map(|(timestamp, (sum, count))| SeriesPoint {
            timestamp,
            value: sum / count as f64,
        })
        .collect()
}

/// Summary cards of the table page.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DatasetSummary {
    pub total_records: usize,
    pub unique_locations: usize,
    pub unique_devices: usize,
    pub period_days: i64,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

pub fn dataset_summary(readings: &[Reading]) -> DatasetSummary {
    let locations: BTreeSet<&str> = readings.iter().map(|r| r.location.as_str()).collect();
    let devices: BTreeSet<&str> = readings.iter().filter_map(|r| r.device_id.as_deref()).collect();
    let first_seen = readings.iter().map(|r| r.timestamp).min();
    let last_seen = readings.iter().map(|r| r.timestamp).max();
    let period_days = match (first_seen, last_seen) {
        (Some(first), Some(last)) => (last - first).num_days(),
        _ => 0,
    };
    DatasetSummary {
        total_records: readings.len(),
        unique_locations: locations.len(),
        unique_devices: devices.len(),
        period_days,
        first_seen,
        last_seen,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 10, h, m, 0).unwrap()
    }

    fn r(loc: &str, ts: DateTime<Utc>, pm25: f64) -> Reading {
        Reading::new(ts, loc).with_pm25(pm25)
    }

    #[test]
    fn test_mean_by_location() {
        let readings = [r("A", at(8, 0), 10.0), r("A", at(8, 1), 30.0), r("B", at(8, 2), 50.0)];
        let groups = aggregate(&readings, GroupKey::Location, utc());
        let a = &groups[&GroupValue::Location("A".into())];
        let b = &groups[&GroupValue::Location("B".into())];
        assert_eq!(a.pm25.unwrap().mean, 20.0);
        assert_eq!(a.pm25.unwrap().min, 10.0);
        assert_eq!(a.pm25.unwrap().max, 30.0);
        assert_eq!(a.pm25.unwrap().count, 2);
        assert_eq!(b.pm25.unwrap().mean, 50.0);
        assert!(a.co2.is_none());
    }

    #[test]
    fn test_empty_input_gives_empty_output() {
        assert!(aggregate(&[], GroupKey::Date, utc()).is_empty());
        let h = highlights(&[], utc());
        assert_eq!(h, Highlights::default());
        assert!(location_ranking(&[]).is_empty());
        assert_eq!(dataset_summary(&[]).period_days, 0);
    }

    #[test]
    fn test_highlights() {
        let readings = [
            r("Ruta1", at(7, 0), 10.0),
            r("Ruta1", at(7, 30), 20.0),
            r("Ruta2", at(18, 0), 90.0),
            r("Ruta3", at(12, 0), 5.0),
        ];
        let h = highlights(&readings, utc());
        assert_eq!(h.most_dangerous_hour, Some(HourHighlight { hour: 18, mean_pm25: 90.0 }));
        assert_eq!(h.most_contaminated_location.unwrap().location, "Ruta2");
        assert_eq!(h.least_contaminated_location.unwrap().location, "Ruta3");
        let share = h.most_common_category.unwrap();
        assert_eq!(share.category, Category::Good);
        assert_eq!(share.count, 2);
        assert_eq!(share.percentage, 50.0);
    }

    #[test]
    fn test_ties_resolve_to_smallest_key() {
        let readings = [r("B", at(9, 0), 40.0), r("A", at(10, 0), 40.0)];
        let h = highlights(&readings, utc());
        assert_eq!(h.most_contaminated_location.unwrap().location, "A");
        assert_eq!(h.least_contaminated_location.unwrap().location, "A");
        assert_eq!(h.most_dangerous_hour.unwrap().hour, 9);

        let mixed = [r("A", at(9, 0), 5.0), r("A", at(9, 1), 80.0)];
        assert_eq!(most_common_category(&mixed).unwrap().category, Category::Good);
    }

    #[test]
    fn test_hour_buckets_use_local_offset() {
        let cot = FixedOffset::west_opt(5 * 3600).unwrap();
        let hours = hourly_stats(&[r("A", at(3, 0), 10.0)], cot);
        assert_eq!(hours[0].hour, 22);
        let days = daily_stats(&[r("A", at(3, 0), 10.0), r("A", at(12, 0), 10.0)], cot);
        assert_eq!(days.len(), 2);
        assert!(days[0].date > days[1].date);
    }

    #[test]
    fn test_location_ranking_sorted_with_colors() {
        let readings = [r("A", at(8, 0), 70.0), r("B", at(8, 0), 8.0), r("C", at(8, 0), 20.0)];
        let ranking = location_ranking(&readings);
        let order: Vec<&str> = ranking.iter().map(|l| l.location.as_str()).collect();
        assert_eq!(order, ["B", "C", "A"]);
        assert_eq!(ranking[0].color, "#00e400");
        assert_eq!(ranking[2].category, Category::Unhealthy);
    }

    #[test]
    fn test_metric_series_averages_same_timestamp() {
        let readings = [
            Reading::new(at(8, 0), "A").with_co2(400.0),
            Reading::new(at(8, 0), "B").with_co2(600.0),
            Reading::new(at(7, 0), "A").with_co2(-1.0),
            Reading::new(at(9, 0), "A").with_co2(450.0),
        ];
        let series = metric_series(&readings, Metric::Co2);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].value, 500.0);
        assert_eq!(series[1].timestamp, at(9, 0));
    }

    #[test]
    fn test_dataset_summary() {
        let readings = [
            r("A", at(8, 0), 1.0).with_device("dev-1"),
            r("B", at(8, 0), 1.0).with_device("dev-1"),
            Reading::new(Utc.with_ymd_and_hms(2025, 5, 13, 9, 0, 0).unwrap(), "A")
                .with_device("dev-2"),
        ];
        let summary = dataset_summary(&readings);
        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.unique_locations, 2);
        assert_eq!(summary.unique_devices, 2);
        assert_eq!(summary.period_days, 3);
    }
}
