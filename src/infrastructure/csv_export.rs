// CSV encoding of the formatted table
use crate::domain::table::{TableColumns, TableRow};
use bytes::Bytes;
use chrono::{DateTime, Utc};

pub const CONTENT_TYPE: &str = "text/csv; charset=utf-8";

pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("datos_calidad_aire_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

pub fn encode_rows(rows: &[TableRow], columns: &TableColumns) -> Result<Bytes, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns.headers())?;
    for row in rows {
        writer.write_record(row.cells(columns))?;
    }
    let buffer = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(Bytes::from(buffer))
}
