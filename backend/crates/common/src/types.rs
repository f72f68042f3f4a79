use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TallyError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub instance_id: Uuid,
}

impl ServiceInfo {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            instance_id: Uuid::new_v4(),
        }
    }
}

/// The closed set of external platforms an integration can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Order/commerce storefront.
    Ecommerce,
    AdSpend,
    Email,
    /// Content site (CMS).
    Content,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Ecommerce,
        Platform::AdSpend,
        Platform::Email,
        Platform::Content,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ecommerce => "ecommerce",
            Platform::AdSpend => "ad_spend",
            Platform::Email => "email",
            Platform::Content => "content",
        }
    }

    /// Metric type tag for a single-day snapshot.
    pub fn daily_metric_type(&self) -> String {
        self.as_str().to_string()
    }

    /// Metric type tag for a multi-day window aggregate.
    pub fn aggregate_metric_type(&self) -> String {
        format!("{}_aggregate", self.as_str())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| TallyError::Validation(format!("unknown platform: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_round_trips_through_str() {
        for platform in Platform::ALL {
            let parsed: Platform = platform.as_str().parse().expect("known tag");
            assert_eq!(parsed, platform);
        }
    }

    #[test]
    fn unknown_platform_is_validation_error() {
        let err = "tiktok".parse::<Platform>().unwrap_err();
        assert!(matches!(err, TallyError::Validation(_)));
        assert!(err.to_string().contains("tiktok"));
    }

    #[test]
    fn metric_type_tags() {
        assert_eq!(Platform::Ecommerce.daily_metric_type(), "ecommerce");
        assert_eq!(Platform::AdSpend.aggregate_metric_type(), "ad_spend_aggregate");
    }

    #[test]
    fn platform_serializes_snake_case() {
        let json = serde_json::to_string(&Platform::AdSpend).unwrap();
        assert_eq!(json, "\"ad_spend\"");
    }

    #[test]
    fn service_info_carries_name() {
        let info = ServiceInfo::new("tally-api");
        assert_eq!(info.name, "tally-api");
        assert!(!info.version.is_empty());
    }
}
