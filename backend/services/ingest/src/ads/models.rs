use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::normalize::{lenient_f64, lenient_u64, mean, round2, safe_div};

/// One row of the insights report (`time_increment=1`, so one row per day).
#[derive(Debug, Clone, Deserialize)]
pub struct InsightRow {
    pub date_start: NaiveDate,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub spend: f64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub impressions: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub clicks: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub conversions: u64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub revenue: f64,
}

/// Normalized ad spend metrics. Rates are percentages except `cpc`, `cpm` and `roas`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdSpendMetrics {
    pub spend: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub revenue: f64,
    pub ctr: f64,
    pub cpc: f64,
    pub cpm: f64,
    pub conversion_rate: f64,
    pub roas: f64,
    pub days_with_data: u32,
}

impl AdSpendMetrics {
    fn from_totals(
        spend: f64,
        impressions: u64,
        clicks: u64,
        conversions: u64,
        revenue: f64,
    ) -> Self {
        let (imp, clk, conv) = (impressions as f64, clicks as f64, conversions as f64);
        Self {
            spend: round2(spend),
            impressions,
            clicks,
            conversions,
            revenue: round2(revenue),
            ctr: safe_div(clk, imp) * 100.0,
            cpc: safe_div(spend, clk),
            cpm: safe_div(spend, imp) * 1000.0,
            conversion_rate: safe_div(conv, clk) * 100.0,
            roas: safe_div(revenue, spend),
            days_with_data: 1,
        }
    }

    /// Combine per-day metrics: additive fields summed, rates averaged over
    /// the days present. `None` when there are no days.
    pub fn aggregate(days: &[AdSpendMetrics]) -> Option<Self> {
        if days.is_empty() {
            return None;
        }

        Some(Self {
            spend: round2(days.iter().map(|d| d.spend).sum()),
            impressions: days.iter().map(|d| d.impressions).sum(),
            clicks: days.iter().map(|d| d.clicks).sum(),
            conversions: days.iter().map(|d| d.conversions).sum(),
            revenue: round2(days.iter().map(|d| d.revenue).sum()),
            ctr: mean(days.iter().map(|d| d.ctr)),
            cpc: mean(days.iter().map(|d| d.cpc)),
            cpm: mean(days.iter().map(|d| d.cpm)),
            conversion_rate: mean(days.iter().map(|d| d.conversion_rate)),
            roas: mean(days.iter().map(|d| d.roas)),
            days_with_data: days.len() as u32,
        })
    }
}

/// Per-day metrics keyed by date. Rows sharing a date are merged first.
pub fn daily_metrics(rows: &[InsightRow]) -> BTreeMap<NaiveDate, AdSpendMetrics> {
    let mut totals: BTreeMap<NaiveDate, (f64, u64, u64, u64, f64)> = BTreeMap::new();
    for row in rows {
        let t = totals.entry(row.date_start).or_default();
        t.0 += row.spend;
        t.1 += row.impressions;
        t.2 += row.clicks;
        t.3 += row.conversions;
        t.4 += row.revenue;
    }

    totals
        .into_iter()
        .map(|(date, (spend, imp, clk, conv, rev))| {
            (date, AdSpendMetrics::from_totals(spend, imp, clk, conv, rev))
        })
        .collect()
}
