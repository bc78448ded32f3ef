//! Run reporter: the per-run summary and the two log lines it emits.

use chrono::{DateTime, SecondsFormat, Utc};
use metrics::counter;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::pipeline::Job;
use crate::sink::{IngestStats, Row, RowStore};

pub const RUN_KEY_COLUMN: &str = "run_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Failure,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub pipeline: &'static str,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub fetched: usize,
    pub enriched_ok: usize,
    pub enriched_failed: usize,
    pub stored: usize,
    pub skipped: usize,
    pub status: RunStatus,
    pub failed_stage: Option<&'static str>,
    pub error: Option<String>,
}

impl RunSummary {
    pub fn start(job: Job) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            pipeline: job.as_str(),
            started_at: Utc::now(),
            finished_at: None,
            fetched: 0,
            enriched_ok: 0,
            enriched_failed: 0,
            stored: 0,
            skipped: 0,
            status: RunStatus::Running,
            failed_stage: None,
            error: None,
        }
    }

    pub fn record_ingest(&mut self, stats: IngestStats) {
        self.stored += stats.stored;
        self.skipped += stats.skipped;
    }

    /// Close the run. `None` means every stage completed.
    pub fn finish(&mut self, error: Option<&PipelineError>) {
        self.finished_at = Some(Utc::now());
        match error {
            None => self.status = RunStatus::Success,
            Some(e) => {
                self.status = RunStatus::Failure;
                self.failed_stage = Some(e.stage());
                self.error = Some(e.to_string());
            }
        }
        counter!(
            "pipeline_runs_total",
            "pipeline" => self.pipeline,
            "status" => self.status.as_str()
        )
        .increment(1);
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn human_line(&self) -> String {
        let mut line = format!(
            "{} run {} started {}: fetched={} enriched_ok={} enriched_failed={} stored={} skipped={} status={}",
            self.pipeline,
            self.run_id,
            self.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.fetched,
            self.enriched_ok,
            self.enriched_failed,
            self.stored,
            self.skipped,
            self.status.as_str(),
        );
        if let Some(e) = &self.error {
            line.push_str(" error=");
            line.push_str(e);
        }
        line
    }

    pub fn json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Emit the human-readable and the structured line.
    pub fn emit(&self) {
        let human = self.human_line();
        let json = self.json_line();
        if self.is_success() {
            tracing::info!(target: "run_report", "{human}");
            tracing::info!(target: "run_report", summary = %json, "run summary");
        } else {
            tracing::error!(target: "run_report", "{human}");
            tracing::error!(target: "run_report", summary = %json, "run summary");
        }
    }

    pub fn to_row(&self) -> Row {
        let mut m = Map::new();
        m.insert(RUN_KEY_COLUMN.into(), Value::from(self.run_id.to_string()));
        m.insert("pipeline".into(), Value::from(self.pipeline));
        m.insert("started_at".into(), Value::from(self.started_at.to_rfc3339()));
        m.insert(
            "finished_at".into(),
            self.finished_at
                .map(|t| Value::from(t.to_rfc3339()))
                .unwrap_or(Value::Null),
        );
        m.insert("fetched".into(), Value::from(self.fetched));
        m.insert("enriched_ok".into(), Value::from(self.enriched_ok));
        m.insert("enriched_failed".into(), Value::from(self.enriched_failed));
        m.insert("stored".into(), Value::from(self.stored));
        m.insert("skipped".into(), Value::from(self.skipped));
        m.insert("status".into(), Value::from(self.status.as_str()));
        m.insert(
            "error".into(),
            self.error.clone().map(Value::from).unwrap_or(Value::Null),
        );
        Row::new(self.run_id.to_string(), m)
    }
}

/// Best-effort write of the summary to `table`. Failures are logged only.
pub async fn persist(summary: &RunSummary, store: &dyn RowStore, table: &str) {
    if let Err(e) = store
        .insert_if_absent(table, RUN_KEY_COLUMN, &summary.to_row())
        .await
    {
        tracing::warn!(target: "run_report", table, error = %e, "could not persist run summary");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn success_line_has_all_counts() {
        let mut s = RunSummary::start(Job::News);
        s.fetched = 3;
        s.enriched_ok = 3;
        s.record_ingest(IngestStats { stored: 3, skipped: 0 });
        s.finish(None);

        let human = s.human_line();
        assert!(human.starts_with("news run "), "{human}");
        assert!(
            human.contains("fetched=3 enriched_ok=3 enriched_failed=0 stored=3 skipped=0 status=success"),
            "{human}"
        );

        let v: serde_json::Value = serde_json::from_str(&s.json_line()).unwrap();
        assert_eq!(v["status"], "success");
        assert_eq!(v["stored"], 3);
        assert_eq!(v["error"], serde_json::Value::Null);
    }

    #[test]
    fn failure_records_stage_and_message() {
        let mut s = RunSummary::start(Job::Email);
        let e = PipelineError::from(ConfigError::MissingEnvVar("TARGET_EMAIL".into()));
        s.finish(Some(&e));
        assert!(!s.is_success());
        assert_eq!(s.failed_stage, Some("startup"));
        assert!(s.human_line().contains("status=failure error="));

        let row = s.to_row();
        assert_eq!(row.key, s.run_id.to_string());
        assert_eq!(row.columns["status"], "failure");
    }
}
