//! Pipeline orchestration
//!
//! This module provides the public API for Card Dwell.
//! It orchestrates the full pipeline from a raw action log to a rendered report.

use crate::clock::{Clock, SystemClock};
use crate::config::ReportConfig;
use crate::dwell::DwellCalculator;
use crate::error::ReportError;
use crate::filter::FilterPanel;
use crate::formatter::ReportFormatter;
use crate::host::{ActionQuery, DateWindow, HostClient};
use crate::normalizer::ActionNormalizer;
use crate::timeline::TimelineBuilder;
use crate::types::{ActivityRecord, Report, ReportSummary};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

/// Restricts which moves enter the report
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityFilter {
    /// Keep only moves made by this member
    pub member_id: Option<String>,
}

/// Convert a raw action log JSON string to a report (stateless, one-shot).
///
/// # Arguments
/// * `log_json` - Host response: an action array or `{ "actions": [...] }`
/// * `clock` - Source of "now" for each card's final interval
/// * `config` - Rendering settings
///
/// # Example
/// ```ignore
/// let report = actions_to_report(&log_json, &SystemClock, &ReportConfig::default())?;
/// print!("{}", report.export.text());
/// ```
pub fn actions_to_report(
    log_json: &str,
    clock: &dyn Clock,
    config: &ReportConfig,
) -> Result<Report, ReportError> {
    let response: serde_json::Value = serde_json::from_str(log_json)?;
    build_report(&response, &ActivityFilter::default(), clock.now(), config)
}

/// Run every stage over an already-fetched host response.
///
/// Pipeline stages:
/// 1. ActionNormalizer - Validate and canonicalize raw actions
/// 2. TimelineBuilder - Group by card, order chronologically
/// 3. DwellCalculator - Time spent in each list
/// 4. ActivityFilter - Drop moves by other members, if requested
/// 5. ReportFormatter - Display rows and CSV export
///
/// The member filter runs after dwell computation so that a move by anyone
/// still closes the previous interval of the card.
pub fn build_report(
    response: &serde_json::Value,
    filter: &ActivityFilter,
    now: DateTime<Utc>,
    config: &ReportConfig,
) -> Result<Report, ReportError> {
    let formatter = ReportFormatter::new(config)?;

    // Stage 1: Normalize
    let outcome = ActionNormalizer::normalize(response)?;

    // Stage 2: Build timelines
    let timelines = TimelineBuilder::build(outcome.events);

    // Stage 3: Compute dwell times
    let records = DwellCalculator::new(config.negative_durations).compute(&timelines, now);

    // Stage 4: Filter by member
    let records: Vec<ActivityRecord> = match filter.member_id.as_deref() {
        Some(member_id) => records
            .into_iter()
            .filter(|r| r.actor_id.as_deref() == Some(member_id))
            .collect(),
        None => records,
    };

    // Stage 5: Format
    let (rows, export) = formatter.format(&records)?;

    let summary = ReportSummary {
        records: records.len(),
        cards: records
            .iter()
            .map(|r| r.card_id.as_str())
            .collect::<HashSet<_>>()
            .len(),
        skipped_actions: outcome.skipped.len(),
        open_intervals: records.iter().filter(|r| r.dwell.open).count(),
        negative_intervals: records.iter().filter(|r| r.dwell.negative).count(),
    };

    Ok(Report {
        run_id: Uuid::new_v4().to_string(),
        generated_at: now,
        records,
        rows,
        export,
        summary,
    })
}

/// Runs the load-and-export action against a host.
///
/// Every call is an independent pipeline run; nothing is shared between runs
/// except the host itself.
pub struct ActivityReporter<H: HostClient, C: Clock = SystemClock> {
    host: H,
    clock: C,
    config: ReportConfig,
}

impl<H: HostClient> ActivityReporter<H, SystemClock> {
    /// Create a reporter that measures open intervals against wall time
    pub fn new(host: H, config: ReportConfig) -> Self {
        Self::with_clock(host, SystemClock, config)
    }
}

impl<H: HostClient, C: Clock> ActivityReporter<H, C> {
    /// Create a reporter with an explicit clock
    pub fn with_clock(host: H, clock: C, config: ReportConfig) -> Self {
        Self {
            host,
            clock,
            config,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Fetch the board's moves in `[since, before)`, build the report and hand
    /// the CSV to the host's download mechanism.
    ///
    /// Nothing is exported unless the whole fetch succeeded and at least one
    /// record came out.
    pub fn run(
        &self,
        since: &str,
        before: &str,
        filter: &ActivityFilter,
    ) -> Result<Report, ReportError> {
        let window = DateWindow::from_inputs(since, before)?;

        let board_id = self.host.board_id().map_err(|e| {
            log::error!("Error looking up board: {}", e);
            e
        })?;

        log::info!(
            "loading card activity for board {} from {} to {}",
            board_id,
            window.since.to_rfc3339(),
            window.before.to_rfc3339()
        );

        let query = ActionQuery::new(board_id, window, self.config.action_filter.clone());
        let response = self.host.fetch_action_log(&query).map_err(|e| {
            log::error!("Error fetching or processing actions: {}", e);
            e
        })?;

        // Open intervals run up to the moment the report is rendered
        let now = self.clock.now();
        let report = build_report(&response, filter, now, &self.config).map_err(|e| {
            if !e.is_recoverable() {
                log::error!("Error fetching or processing actions: {}", e);
            }
            e
        })?;

        self.host.save_export(&report.export)?;
        log::info!(
            "report {} ready: {} records across {} cards ({} actions skipped)",
            report.run_id,
            report.summary.records,
            report.summary.cards,
            report.summary.skipped_actions
        );

        Ok(report)
    }

    /// Like [`run`](Self::run), applying the filter the viewer saved for this
    /// board, if any.
    ///
    /// The saved member restricts the records. The saved date pre-fills the
    /// start of the range, so it is used when `since` is blank.
    pub fn run_saved_view(&self, since: &str, before: &str) -> Result<Report, ReportError> {
        let settings = FilterPanel::open(&self.host)?.restore()?.unwrap_or_default();
        let since = match settings.date.as_deref() {
            Some(date) if since.trim().is_empty() => date,
            _ => since,
        };
        self.run(since, before, &settings.activity_filter())
    }
}
