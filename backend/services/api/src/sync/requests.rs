use axum::body::Bytes;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::ApiError;

/// Optional explicit window for a manual sync. An empty body means the default backfill.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManualSyncRequest {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ManualSyncRequest {
    pub fn from_body(body: &Bytes) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| ApiError::validation(format!("invalid sync request: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_default() {
        let req = ManualSyncRequest::from_body(&Bytes::new()).unwrap();
        assert!(req.from.is_none() && req.to.is_none());

        let req = ManualSyncRequest::from_body(&Bytes::from_static(b" \n")).unwrap();
        assert!(req.from.is_none());
    }

    #[test]
    fn parses_dates() {
        let req = ManualSyncRequest::from_body(&Bytes::from_static(
            br#"{"from":"2026-04-01","to":"2026-04-10"}"#,
        ))
        .unwrap();
        assert_eq!(req.from, NaiveDate::from_ymd_opt(2026, 4, 1));
        assert_eq!(req.to, NaiveDate::from_ymd_opt(2026, 4, 10));
    }

    #[test]
    fn rejects_garbage() {
        assert!(ManualSyncRequest::from_body(&Bytes::from_static(b"{\"from\": 3}")).is_err());
        let body = Bytes::from_static(b"{\"since\":\"2026-01-01\"}");
        assert!(ManualSyncRequest::from_body(&body).is_err());
    }
}
