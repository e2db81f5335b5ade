//! Observable ingestion jobs.
//!
//! Ingestion is fire-and-forget at the API surface: the triggering request
//! returns immediately with a job id. The registry makes the detached run
//! observable: jobs transition pending → running → succeeded | failed and
//! can be polled for their final report or error.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use crate::ingest::IngestReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// One ingestion run and its observable state.
#[derive(Debug, Clone, Serialize)]
pub struct IngestJob {
    pub id: String,
    pub status: JobStatus,
    pub limit: usize,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub report: Option<IngestReport>,
    pub error: Option<String>,
}

/// Process-wide registry of ingestion jobs.
///
/// Cheap to clone; all clones share the same job table. Completed jobs stay
/// in the table for polling (crawl state is not persisted across restarts).
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<String, IngestJob>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<IngestJob> {
        self.jobs.read().unwrap().get(id).cloned()
    }

    /// Register a job and run `work` on a background task, recording state
    /// transitions as it progresses. Returns the job id immediately.
    pub fn spawn<F>(&self, limit: usize, work: F) -> String
    where
        F: Future<Output = anyhow::Result<IngestReport>> + Send + 'static,
    {
        let id = Uuid::new_v4().to_string();
        let job = IngestJob {
            id: id.clone(),
            status: JobStatus::Pending,
            limit,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            report: None,
            error: None,
        };
        self.jobs.write().unwrap().insert(id.clone(), job);

        let registry = self.clone();
        let job_id = id.clone();
        tokio::spawn(async move {
            registry.update(&job_id, |job| {
                job.status = JobStatus::Running;
                job.started_at = Some(Utc::now());
            });

            match work.await {
                Ok(report) => registry.update(&job_id, |job| {
                    job.status = JobStatus::Succeeded;
                    job.finished_at = Some(Utc::now());
                    job.report = Some(report.clone());
                }),
                Err(err) => {
                    let message = format!("{err:#}");
                    error!(job = %job_id, error = %message, "ingestion job failed");
                    registry.update(&job_id, |job| {
                        job.status = JobStatus::Failed;
                        job.finished_at = Some(Utc::now());
                        job.error = Some(message.clone());
                    });
                }
            }
        });

        id
    }

    fn update(&self, id: &str, apply: impl Fn(&mut IngestJob)) {
        if let Some(job) = self.jobs.write().unwrap().get_mut(id) {
            apply(job);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn wait_for(registry: &JobRegistry, id: &str, status: JobStatus) -> IngestJob {
        for _ in 0..200 {
            if let Some(job) = registry.get(id) {
                if job.status == status {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {id} never reached {status:?}");
    }

    #[tokio::test]
    async fn successful_job_records_report() {
        let registry = JobRegistry::new();
        let id = registry.spawn(10, async {
            Ok(IngestReport {
                urls_discovered: 4,
                pages_ingested: 3,
                pages_skipped: 1,
                chunks_stored: 12,
            })
        });

        let job = wait_for(&registry, &id, JobStatus::Succeeded).await;
        assert_eq!(job.limit, 10);
        assert!(job.started_at.is_some());
        assert!(job.finished_at.is_some());
        assert_eq!(job.report.unwrap().chunks_stored, 12);
        assert!(job.error.is_none());
    }

    #[tokio::test]
    async fn failed_job_records_error() {
        let registry = JobRegistry::new();
        let id = registry.spawn(5, async { anyhow::bail!("seed page unreachable") });

        let job = wait_for(&registry, &id, JobStatus::Failed).await;
        assert!(job.report.is_none());
        assert!(job.error.unwrap().contains("seed page unreachable"));
    }

    #[tokio::test]
    async fn unknown_job_is_absent() {
        let registry = JobRegistry::new();
        assert!(registry.get("no-such-job").is_none());
    }
}
