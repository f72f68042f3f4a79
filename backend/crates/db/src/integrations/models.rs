use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_common::error::TallyError;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationStatus {
    Active,
    Inactive,
    /// Last sync failed. Still polled every cycle.
    Error,
}

impl IntegrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationStatus::Active => "active",
            IntegrationStatus::Inactive => "inactive",
            IntegrationStatus::Error => "error",
        }
    }
}

impl fmt::Display for IntegrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntegrationStatus {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(IntegrationStatus::Active),
            "inactive" => Ok(IntegrationStatus::Inactive),
            "error" => Ok(IntegrationStatus::Error),
            other => Err(TallyError::Database(format!(
                "unknown integration status: {other}"
            ))),
        }
    }
}

/// A configured connection between a client and one external platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integration {
    pub id: Uuid,
    pub client_id: Uuid,
    /// Raw platform tag; parsed at dispatch so unknown tags surface as caller errors.
    pub platform: String,
    #[serde(skip_serializing, default)]
    pub credentials: serde_json::Value,
    #[serde(default)]
    pub config: serde_json::Value,
    pub status: IntegrationStatus,
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Minutes between syncs (1-1440).
    pub sync_frequency: i32,
    pub error_message: Option<String>,
    /// Set while some process holds the sync claim. Stale once older than the lease.
    #[serde(default)]
    pub sync_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Integration {
    /// Active and errored integrations are polled; inactive ones never are.
    pub fn is_pollable(&self) -> bool {
        matches!(
            self.status,
            IntegrationStatus::Active | IntegrationStatus::Error
        )
    }
}
