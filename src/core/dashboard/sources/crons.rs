use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::truncate_chars;
use crate::core::dashboard::{CronJob, DataSource, MetricPayload};
use crate::error::Result;

#[derive(Debug, Default, Deserialize)]
struct RawJobsFile {
    #[serde(default)]
    jobs: Vec<RawJob>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawJob {
    id: Option<String>,
    name: Option<String>,
    schedule: Option<RawSchedule>,
    enabled: Option<bool>,
    state: Option<RawJobState>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSchedule {
    expr: Option<String>,
    every: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawJobState {
    last_run_at_ms: Option<i64>,
    last_status: Option<String>,
}

/// Scheduled jobs from the gateway's `cron/jobs.json`.
#[derive(Debug, Clone)]
pub struct CronsSource {
    jobs_file: PathBuf,
}

impl CronsSource {
    pub fn new(jobs_file: impl Into<PathBuf>) -> Self {
        Self {
            jobs_file: jobs_file.into(),
        }
    }
}

impl DataSource for CronsSource {
    fn fetch(&self) -> Result<MetricPayload> {
        load_crons(&self.jobs_file).map(MetricPayload::Crons)
    }
}

pub fn load_crons(path: &Path) -> Result<Vec<CronJob>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let file: RawJobsFile = serde_json::from_str(&text)?;
    Ok(file.jobs.into_iter().map(to_job).collect())
}

fn to_job(raw: RawJob) -> CronJob {
    let id = truncate_chars(raw.id.as_deref().unwrap_or(""), 8);
    let schedule = raw
        .schedule
        .and_then(|s| s.expr.or_else(|| s.every.map(|every| every_label(&every))))
        .unwrap_or_else(|| "?".to_string());
    let state = raw.state.unwrap_or_default();

    CronJob {
        name: raw.name.unwrap_or_else(|| id.clone()),
        id,
        schedule,
        enabled: raw.enabled.unwrap_or(true),
        last_run_ms: state.last_run_at_ms.unwrap_or(0),
        last_status: state.last_status.unwrap_or_else(|| "unknown".to_string()),
    }
}

// `every` may be a string ("30m") or a number.
fn every_label(every: &serde_json::Value) -> String {
    match every {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
