use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tally_common::error::{TallyError, TallyResult};
use tally_common::types::Platform;
use uuid::Uuid;

/// One persisted metrics record for a day and platform.
///
/// Unique per `(client_id, integration_id, platform, metric_type, date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub id: Uuid,
    pub client_id: Uuid,
    pub integration_id: Uuid,
    pub platform: Platform,
    pub metric_type: String,
    pub date: NaiveDate,
    pub metrics: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl MetricsSnapshot {
    pub fn new(
        client_id: Uuid,
        integration_id: Uuid,
        platform: Platform,
        metric_type: impl Into<String>,
        date: NaiveDate,
        metrics: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            integration_id,
            platform,
            metric_type: metric_type.into(),
            date,
            metrics,
            created_at: Utc::now(),
        }
    }

    /// The logical uniqueness key.
    pub fn key(&self) -> (Uuid, Uuid, Platform, &str, NaiveDate) {
        (
            self.client_id,
            self.integration_id,
            self.platform,
            self.metric_type.as_str(),
            self.date,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SnapshotFilter {
    pub client_id: Option<Uuid>,
    pub integration_id: Option<Uuid>,
    pub platform: Option<Platform>,
    pub metric_type: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SnapshotFilter {
    pub fn matches(&self, snapshot: &MetricsSnapshot) -> bool {
        self.client_id.is_none_or(|c| c == snapshot.client_id)
            && self.integration_id.is_none_or(|i| i == snapshot.integration_id)
            && self.platform.is_none_or(|p| p == snapshot.platform)
            && self
                .metric_type
                .as_deref()
                .is_none_or(|m| m == snapshot.metric_type)
            && self.date_from.is_none_or(|d| snapshot.date >= d)
            && self.date_to.is_none_or(|d| snapshot.date <= d)
    }
}

/// Administrative range delete. Client and both dates are mandatory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDeleteFilter {
    pub client_id: Uuid,
    pub integration_id: Option<Uuid>,
    pub platform: Option<Platform>,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

impl SnapshotDeleteFilter {
    pub fn validate(&self) -> TallyResult<()> {
        if self.date_from > self.date_to {
            return Err(TallyError::Validation(format!(
                "date_from ({}) must not be after date_to ({})",
                self.date_from, self.date_to
            )));
        }
        Ok(())
    }

    pub fn matches(&self, snapshot: &MetricsSnapshot) -> bool {
        snapshot.client_id == self.client_id
            && self.integration_id.is_none_or(|i| i == snapshot.integration_id)
            && self.platform.is_none_or(|p| p == snapshot.platform)
            && snapshot.date >= self.date_from
            && snapshot.date <= self.date_to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn make_snapshot(client_id: Uuid, date: NaiveDate) -> MetricsSnapshot {
        MetricsSnapshot::new(
            client_id,
            Uuid::new_v4(),
            Platform::AdSpend,
            "ad_spend",
            date,
            serde_json::json!({ "spend": 10.0 }),
        )
    }

    #[test]
    fn delete_filter_rejects_inverted_range() {
        let filter = SnapshotDeleteFilter {
            client_id: Uuid::new_v4(),
            integration_id: None,
            platform: None,
            date_from: day(10),
            date_to: day(9),
        };
        assert!(matches!(filter.validate(), Err(TallyError::Validation(_))));
    }

    #[test]
    fn delete_filter_allows_single_day() {
        let filter = SnapshotDeleteFilter {
            client_id: Uuid::new_v4(),
            integration_id: None,
            platform: None,
            date_from: day(9),
            date_to: day(9),
        };
        assert!(filter.validate().is_ok());
    }

    #[test]
    fn delete_filter_matches_inclusive_range_for_client() {
        let client = Uuid::new_v4();
        let filter = SnapshotDeleteFilter {
            client_id: client,
            integration_id: None,
            platform: Some(Platform::AdSpend),
            date_from: day(2),
            date_to: day(4),
        };
        assert!(filter.matches(&make_snapshot(client, day(2))));
        assert!(filter.matches(&make_snapshot(client, day(4))));
        assert!(!filter.matches(&make_snapshot(client, day(5))));
        assert!(!filter.matches(&make_snapshot(Uuid::new_v4(), day(3))));
    }

    #[test]
    fn list_filter_defaults_match_everything() {
        let snapshot = make_snapshot(Uuid::new_v4(), day(1));
        assert!(SnapshotFilter::default().matches(&snapshot));

        let filter = SnapshotFilter {
            metric_type: Some("ad_spend_aggregate".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&snapshot));
    }
}
