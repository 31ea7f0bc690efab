//! Report formatting
//!
//! Renders activity records as display rows and as a quoted CSV export.

use crate::config::ReportConfig;
use crate::dwell::format_duration;
use crate::error::ReportError;
use crate::types::{ActivityRecord, DisplayRow, ExportFile};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// MIME type of the CSV export
pub const CSV_MIME_TYPE: &str = "text/csv;charset=utf-8";

/// Column headers, shared by the table and the export
pub const COLUMNS: [&str; 6] = [
    "Card Name",
    "Moved By",
    "From List",
    "To List",
    "Time in Previous List",
    "Action Date",
];

const ONGOING_SUFFIX: &str = " (ongoing)";

/// Formatter producing display rows and export payloads
pub struct ReportFormatter {
    timezone: Tz,
    timestamp_format: String,
    export_filename: String,
    mark_open_intervals: bool,
}

impl ReportFormatter {
    pub fn new(config: &ReportConfig) -> Result<Self, ReportError> {
        config.validate()?;
        Ok(Self {
            timezone: config.display_timezone()?,
            timestamp_format: config.timestamp_format.clone(),
            export_filename: config.export_filename.clone(),
            mark_open_intervals: config.mark_open_intervals,
        })
    }

    /// Render both artifacts. An empty record set is `NoMatchingRecords`.
    pub fn format(
        &self,
        records: &[ActivityRecord],
    ) -> Result<(Vec<DisplayRow>, ExportFile), ReportError> {
        if records.is_empty() {
            return Err(ReportError::NoMatchingRecords);
        }
        Ok((self.display_rows(records), self.export_csv(records)?))
    }

    /// Map records to table rows, one cell per column
    pub fn display_rows(&self, records: &[ActivityRecord]) -> Vec<DisplayRow> {
        records
            .iter()
            .map(|record| {
                let mut time_in_list = format_duration(record.dwell.millis);
                if self.mark_open_intervals && record.dwell.open {
                    time_in_list.push_str(ONGOING_SUFFIX);
                }
                DisplayRow {
                    card_name: record.card_name.clone(),
                    moved_by: record.actor_name.clone(),
                    from_list: record.from_list.clone(),
                    to_list: record.to_list.clone(),
                    time_in_list,
                    action_date: self.render_timestamp(record.event_time),
                    ongoing: record.dwell.open,
                }
            })
            .collect()
    }

    /// Build the CSV export: header line, then one fully quoted line per record
    pub fn export_csv(&self, records: &[ActivityRecord]) -> Result<ExportFile, ReportError> {
        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        writer
            .write_record(COLUMNS)
            .map_err(|e| ReportError::Export(e.to_string()))?;

        for record in records {
            writer
                .write_record([
                    record.card_name.as_str(),
                    record.actor_name.as_str(),
                    record.from_list.as_str(),
                    record.to_list.as_str(),
                    format_duration(record.dwell.millis).as_str(),
                    self.render_timestamp(record.event_time).as_str(),
                ])
                .map_err(|e| ReportError::Export(e.to_string()))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ReportError::Export(e.to_string()))?;

        Ok(ExportFile {
            filename: self.export_filename.clone(),
            mime_type: CSV_MIME_TYPE.to_string(),
            bytes,
        })
    }

    /// Human-readable action date in the configured zone
    pub fn render_timestamp(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.timezone)
            .format(&self.timestamp_format)
            .to_string()
    }
}
