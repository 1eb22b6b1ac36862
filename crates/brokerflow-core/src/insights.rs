//! Narrative summaries of cohort flow for the dashboard.

use serde::Serialize;

use crate::aggregate::{DailyRecord, Summary};
use crate::rounding::round2;
use crate::Cohort;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub whale_insight: String,
    pub retail_insight: String,
    #[serde(serialize_with = "round2")]
    pub whale_peak: f64,
    pub whale_peak_day: usize,
    #[serde(serialize_with = "round2")]
    pub retail_peak: f64,
    pub retail_peak_day: usize,
}

/// Highest cumulative net of a cohort and the first day it was reached.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Peak {
    pub value: f64,
    /// 1-based day index, `0` for an empty series.
    pub day: usize,
}

pub fn peak(daily: &[DailyRecord], cohort: Cohort) -> Peak {
    daily
        .iter()
        .fold(None::<Peak>, |best, record| {
            let value = record.cumulative_net(cohort);
            match best {
                Some(best) if best.value >= value => Some(best),
                _ => Some(Peak {
                    value,
                    day: record.day,
                }),
            }
        })
        .unwrap_or_default()
}

fn highlight(text: &str) -> String {
    format!("<span class=\"highlight\">{text}</span>")
}

fn amount(value: f64) -> String {
    highlight(&format!("Rp {value:.1}B"))
}

pub fn generate(summary: &Summary, daily: &[DailyRecord]) -> Insights {
    let days = daily.len();
    let whale_peak = peak(daily, Cohort::Whale);
    let retail_peak = peak(daily, Cohort::Retail);
    let whale_net = summary.net(Cohort::Whale);
    let retail_net = summary.net(Cohort::Retail);

    let whale_insight = if whale_net < 0.0 {
        let mut text = format!(
            "Institutions are {} {} over {days} trading days. ",
            highlight("DISTRIBUTING"),
            amount(whale_net.abs()),
        );
        if whale_peak.day > 0 {
            text.push_str(&format!(
                "Accumulation peaked on day {} (+{:.1}B), followed by gradual distribution. ",
                whale_peak.day, whale_peak.value
            ));
        }
        text.push_str(&format!(
            "This points to {} by large institutions.",
            highlight("profit taking")
        ));
        text
    } else {
        format!(
            "Institutions are {} {} over {days} trading days. Institutions are buying this stock.",
            highlight("ACCUMULATING"),
            amount(whale_net),
        )
    };

    let retail_insight = if retail_net > 0.0 {
        let mut text = format!(
            "Retail is {} {} over {days} trading days. ",
            highlight("ACCUMULATING"),
            amount(retail_net),
        );
        if retail_peak.day > 0 {
            text.push_str(&format!(
                "Accumulation peaked on day {} (+{:.1}B). ",
                retail_peak.day, retail_peak.value
            ));
        }
        text.push_str("This shows strong buying interest from retail investors.");
        text
    } else {
        format!(
            "Retail is {} {} over {days} trading days. Retail investors are taking profit.",
            highlight("DISTRIBUTING"),
            amount(retail_net.abs()),
        )
    };

    Insights {
        whale_insight,
        retail_insight,
        whale_peak: whale_peak.value,
        whale_peak_day: whale_peak.day,
        retail_peak: retail_peak.value,
        retail_peak_day: retail_peak.day,
    }
}
