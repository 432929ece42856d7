use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Days, Local, NaiveDate};

use super::transcripts::list_transcripts;
use crate::core::dashboard::{CostSummary, DataSource, MetricPayload};
use crate::error::Result;

const TOP_MODELS: usize = 5;
const RECENT_DAYS: usize = 7;

/// All-time spend from session transcripts, by model and by day.
#[derive(Debug, Clone)]
pub struct CostsSource {
    sessions_dir: PathBuf,
}

impl CostsSource {
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
        }
    }
}

impl DataSource for CostsSource {
    fn fetch(&self) -> Result<MetricPayload> {
        summarize_costs(&self.sessions_dir, Local::now().date_naive()).map(MetricPayload::Costs)
    }
}

/// Sum every priced message; `today` anchors the today/week figures.
pub fn summarize_costs(sessions_dir: &Path, today: NaiveDate) -> Result<CostSummary> {
    let mut per_model: BTreeMap<String, f64> = BTreeMap::new();
    let mut per_day: BTreeMap<String, f64> = BTreeMap::new();
    let mut total = 0.0;

    for file in list_transcripts(sessions_dir)? {
        let messages = match file.messages() {
            Ok(messages) => messages,
            Err(e) => {
                log::debug!("Skipping transcript {}: {}", file.path.display(), e);
                continue;
            }
        };

        for msg in messages {
            if msg.cost <= 0.0 || msg.is_mirror() {
                continue;
            }
            *per_model.entry(msg.model.clone()).or_default() += msg.cost;
            *per_day.entry(msg.day().to_string()).or_default() += msg.cost;
            total += msg.cost;
        }
    }

    let today_key = today.format("%Y-%m-%d").to_string();
    let week_start = today
        .checked_sub_days(Days::new(7))
        .unwrap_or(today)
        .format("%Y-%m-%d")
        .to_string();

    let week = per_day
        .iter()
        .filter(|(day, _)| day.as_str() >= week_start.as_str())
        .map(|(_, cost)| cost)
        .sum();

    let mut models: Vec<(String, f64)> = per_model.into_iter().collect();
    models.sort_by(|a, b| b.1.total_cmp(&a.1));
    models.truncate(TOP_MODELS);

    Ok(CostSummary {
        total,
        today: per_day.get(&today_key).copied().unwrap_or(0.0),
        week,
        per_model: models,
        per_day: per_day.into_iter().rev().take(RECENT_DAYS).collect(),
    })
}
