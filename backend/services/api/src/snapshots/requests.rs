use chrono::NaiveDate;
use serde::Deserialize;
use tally_common::types::Platform;
use tally_db::snapshots::models::{SnapshotDeleteFilter, SnapshotFilter};
use uuid::Uuid;

use crate::error::ApiError;

const MAX_LIMIT: i64 = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct ListSnapshotsQuery {
    pub client_id: Option<Uuid>,
    pub integration_id: Option<Uuid>,
    pub platform: Option<Platform>,
    pub metric_type: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListSnapshotsQuery {
    pub fn into_filter(self) -> Result<SnapshotFilter, ApiError> {
        let client_id = self
            .client_id
            .ok_or_else(|| ApiError::validation("client_id is required"))?;

        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(ApiError::validation(format!(
                    "date_from ({from}) must not be after date_to ({to})"
                )));
            }
        }
        if let Some(limit) = self.limit {
            if !(1..=MAX_LIMIT).contains(&limit) {
                return Err(ApiError::validation(format!(
                    "limit must be between 1 and {MAX_LIMIT}"
                )));
            }
        }
        if self.offset.is_some_and(|o| o < 0) {
            return Err(ApiError::validation("offset must not be negative"));
        }

        Ok(SnapshotFilter {
            client_id: Some(client_id),
            integration_id: self.integration_id,
            platform: self.platform,
            metric_type: self.metric_type,
            date_from: self.date_from,
            date_to: self.date_to,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

/// Body of `POST /snapshots/delete`. Every field is optional at parse time so a
/// missing one is reported by name.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteSnapshotsRequest {
    pub client_id: Option<Uuid>,
    pub integration_id: Option<Uuid>,
    pub platform: Option<Platform>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl DeleteSnapshotsRequest {
    pub fn into_filter(self) -> Result<SnapshotDeleteFilter, ApiError> {
        let client_id = self
            .client_id
            .ok_or_else(|| ApiError::validation("client_id is required"))?;
        let date_from = self
            .date_from
            .ok_or_else(|| ApiError::validation("date_from is required"))?;
        let date_to = self
            .date_to
            .ok_or_else(|| ApiError::validation("date_to is required"))?;

        let filter = SnapshotDeleteFilter {
            client_id,
            integration_id: self.integration_id,
            platform: self.platform,
            date_from,
            date_to,
        };
        filter.validate()?;
        Ok(filter)
    }
}
