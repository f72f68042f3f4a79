use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tally_common::types::Platform;

use crate::error::SyncError;

/// Length of the default backfill window, today included.
pub const DEFAULT_BACKFILL_DAYS: u64 = 30;

/// The date range a sync covers, stated explicitly by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SyncWindow {
    /// Today only. Used by the scheduler on every poll.
    Incremental,
    /// Inclusive range, stored as one aggregate snapshot dated `from`.
    Backfill { from: NaiveDate, to: NaiveDate },
}

impl SyncWindow {
    /// Trailing [`DEFAULT_BACKFILL_DAYS`] ending `today`.
    pub fn default_backfill(today: NaiveDate) -> Self {
        let from = today
            .checked_sub_days(Days::new(DEFAULT_BACKFILL_DAYS - 1))
            .unwrap_or(today);
        SyncWindow::Backfill { from, to: today }
    }

    /// Build a backfill window from optional request bounds.
    ///
    /// Both bounds: that range. Neither: the default trailing window.
    /// Exactly one is ambiguous and rejected.
    pub fn from_bounds(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, SyncError> {
        match (from, to) {
            (Some(from), Some(to)) => {
                let window = SyncWindow::Backfill { from, to };
                window.resolve(today)?;
                Ok(window)
            }
            (None, None) => Ok(SyncWindow::default_backfill(today)),
            (Some(_), None) => Err(SyncError::InvalidWindow(
                "`to` is required when `from` is given".to_string(),
            )),
            (None, Some(_)) => Err(SyncError::InvalidWindow(
                "`from` is required when `to` is given".to_string(),
            )),
        }
    }

    pub fn resolve(&self, today: NaiveDate) -> Result<ResolvedWindow, SyncError> {
        match *self {
            SyncWindow::Incremental => Ok(ResolvedWindow {
                from: today,
                to: today,
                mode: WindowMode::SingleDay,
            }),
            SyncWindow::Backfill { from, to } => {
                if from > to {
                    return Err(SyncError::InvalidWindow(format!(
                        "from ({from}) is after to ({to})"
                    )));
                }
                Ok(ResolvedWindow {
                    from,
                    to,
                    mode: WindowMode::Aggregate,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    SingleDay,
    Aggregate,
}

/// Concrete inclusive date range plus the snapshot semantics it implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub mode: WindowMode,
}

impl ResolvedWindow {
    pub fn is_aggregate(&self) -> bool {
        self.mode == WindowMode::Aggregate
    }

    pub fn metric_type(&self, platform: Platform) -> String {
        match self.mode {
            WindowMode::SingleDay => platform.daily_metric_type(),
            WindowMode::Aggregate => platform.aggregate_metric_type(),
        }
    }

    /// Date the window's main snapshot is filed under.
    pub fn snapshot_date(&self) -> NaiveDate {
        self.from
    }

    pub fn day_count(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }

    /// Start of `from` in UTC.
    pub fn start(&self) -> DateTime<Utc> {
        self.from.and_time(NaiveTime::MIN).and_utc()
    }

    /// Last second of `to` in UTC.
    pub fn end(&self) -> DateTime<Utc> {
        let last = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        self.to.and_time(last).and_utc()
    }
}
