use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::{lenient_u64, mean, safe_div, top_n_by};

const TOP_CAMPAIGNS: usize = 5;

/// An audience list (`GET /lists`).
#[derive(Debug, Clone, Deserialize)]
pub struct MailingList {
    pub id: serde_json::Value,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub member_count: u64,
}

/// A sent campaign with its report counters (`GET /campaigns`).
#[derive(Debug, Clone, Deserialize)]
pub struct Campaign {
    pub id: serde_json::Value,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub emails_sent: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub opens: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub clicks: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub bounces: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub unsubscribes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub id: String,
    pub name: String,
    pub emails_sent: u64,
    pub opens: u64,
    pub clicks: u64,
    pub open_rate: f64,
}

/// Normalized email marketing metrics. Rates are percentages of emails sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMetrics {
    pub total_subscribers: u64,
    pub lists_count: u64,
    pub campaigns_sent: u64,
    pub emails_sent: u64,
    pub opens: u64,
    pub clicks: u64,
    pub bounces: u64,
    pub unsubscribes: u64,
    pub open_rate: f64,
    pub click_rate: f64,
    pub bounce_rate: f64,
    pub unsubscribe_rate: f64,
    pub top_campaigns: Vec<CampaignSummary>,
}

#[derive(Default)]
struct DayTotals {
    emails_sent: u64,
    opens: u64,
    clicks: u64,
    bounces: u64,
    unsubscribes: u64,
}

impl DayTotals {
    fn rate(&self, count: u64) -> f64 {
        safe_div(count as f64, self.emails_sent as f64) * 100.0
    }
}

impl EmailMetrics {
    /// `None` when there are neither lists nor campaigns.
    ///
    /// Campaigns without a send time are counted on `fallback_date`. Rates are
    /// computed per send day and averaged over the days that had campaigns.
    pub fn build(
        lists: &[MailingList],
        campaigns: &[Campaign],
        fallback_date: NaiveDate,
    ) -> Option<Self> {
        if lists.is_empty() && campaigns.is_empty() {
            return None;
        }

        let mut days: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();
        for c in campaigns {
            let date = c.sent_at.map(|t| t.date_naive()).unwrap_or(fallback_date);
            let day = days.entry(date).or_default();
            day.emails_sent += c.emails_sent;
            day.opens += c.opens;
            day.clicks += c.clicks;
            day.bounces += c.bounces;
            day.unsubscribes += c.unsubscribes;
        }

        let summaries: Vec<CampaignSummary> = campaigns
            .iter()
            .map(|c| CampaignSummary {
                id: match &c.id {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
                name: c.name.clone(),
                emails_sent: c.emails_sent,
                opens: c.opens,
                clicks: c.clicks,
                open_rate: safe_div(c.opens as f64, c.emails_sent as f64) * 100.0,
            })
            .collect();

        Some(Self {
            total_subscribers: lists.iter().map(|l| l.member_count).sum(),
            lists_count: lists.len() as u64,
            campaigns_sent: campaigns.len() as u64,
            emails_sent: days.values().map(|d| d.emails_sent).sum(),
            opens: days.values().map(|d| d.opens).sum(),
            clicks: days.values().map(|d| d.clicks).sum(),
            bounces: days.values().map(|d| d.bounces).sum(),
            unsubscribes: days.values().map(|d| d.unsubscribes).sum(),
            open_rate: mean(days.values().map(|d| d.rate(d.opens))),
            click_rate: mean(days.values().map(|d| d.rate(d.clicks))),
            bounce_rate: mean(days.values().map(|d| d.rate(d.bounces))),
            unsubscribe_rate: mean(days.values().map(|d| d.rate(d.unsubscribes))),
            top_campaigns: top_n_by(summaries, TOP_CAMPAIGNS, |c| c.opens as f64),
        })
    }
}
