//! Periodic collection scheduler.
//!
//! Jobs are keyed by name and run on independent clocks: a new job is due
//! immediately, a finished run is rescheduled one frequency out, and a
//! failed run is rechecked early. A tick that finds a job still running
//! (or the concurrency cap exhausted) skips it rather than piling up
//! overlapping runs.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::collector::Collector;
use crate::{
    CoreError, DataType, Location, ProviderId, SourceErrorKind, UtcDateTime, ValidationError,
};

/// Definition of one periodic collection job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionJob {
    pub name: String,
    pub source: ProviderId,
    pub location: Location,
    pub data_type: DataType,
    pub frequency: Duration,
}

impl CollectionJob {
    /// Job with a frequency in whole minutes, the granularity exposed to
    /// configuration. At least one minute.
    pub fn new(
        name: impl Into<String>,
        source: ProviderId,
        location: Location,
        data_type: DataType,
        frequency_minutes: u64,
    ) -> Result<Self, ValidationError> {
        if frequency_minutes == 0 {
            return Err(ValidationError::InvalidJobFrequency {
                minutes: frequency_minutes,
            });
        }
        Self::with_frequency(
            name,
            source,
            location,
            data_type,
            Duration::from_secs(frequency_minutes * 60),
        )
    }

    /// Job with an arbitrary non-zero frequency.
    pub fn with_frequency(
        name: impl Into<String>,
        source: ProviderId,
        location: Location,
        data_type: DataType,
        frequency: Duration,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyJobName);
        }
        if frequency.is_zero() {
            return Err(ValidationError::InvalidJobFrequency { minutes: 0 });
        }
        Ok(Self {
            name,
            source,
            location,
            data_type,
            frequency,
        })
    }
}

/// Outcome of a job's most recent tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Never run yet.
    Pending,
    Success,
    Failure,
    /// Passed over because the previous run was still in flight or the
    /// concurrency cap was exhausted.
    Skipped,
}

/// Read-only view of a scheduled job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job: CollectionJob,
    pub status: JobStatus,
    pub next_run_at: UtcDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<UtcDateTime>,
    pub consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct JobState {
    job: CollectionJob,
    status: JobStatus,
    next_run_at: UtcDateTime,
    last_run_at: Option<UtcDateTime>,
    running: bool,
    consecutive_failures: u32,
    last_error: Option<String>,
}

impl JobState {
    fn new(job: CollectionJob, next_run_at: UtcDateTime) -> Self {
        Self {
            job,
            status: JobStatus::Pending,
            next_run_at,
            last_run_at: None,
            running: false,
            consecutive_failures: 0,
            last_error: None,
        }
    }

    fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job: self.job.clone(),
            status: self.status,
            next_run_at: self.next_run_at,
            last_run_at: self.last_run_at,
            consecutive_failures: self.consecutive_failures,
            last_error: self.last_error.clone(),
        }
    }
}

/// Scheduler tuning.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_concurrent_jobs: usize,
    /// Hard deadline per run; a run past it counts as a failure.
    pub job_timeout: Duration,
    /// How soon a failed job is rechecked, capped by its own frequency.
    pub failure_recheck: Duration,
    pub tick_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            job_timeout: Duration::from_secs(30),
            failure_recheck: Duration::from_secs(60),
            tick_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Clone)]
pub struct CollectionScheduler {
    collector: Collector,
    config: SchedulerConfig,
    jobs: Arc<Mutex<HashMap<String, JobState>>>,
    permits: Arc<Semaphore>,
}

impl CollectionScheduler {
    pub fn new(collector: Collector, config: SchedulerConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        Self {
            collector,
            config,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            permits,
        }
    }

    /// Register a job, replacing any existing job with the same name.
    /// The job is due immediately; its first run happens on the next tick.
    pub async fn add_job(&self, job: CollectionJob) {
        let mut jobs = self.jobs.lock().await;
        let name = job.name.clone();
        let state = JobState::new(job, UtcDateTime::now());
        if jobs.insert(name.clone(), state).is_some() {
            info!(job = %name, "replaced existing collection job");
        } else {
            info!(job = %name, "registered collection job");
        }
    }

    /// Remove a job by name. A run already in flight completes normally
    /// but is not rescheduled.
    pub async fn remove_job(&self, name: &str) -> bool {
        let removed = self.jobs.lock().await.remove(name).is_some();
        if removed {
            info!(job = %name, "removed collection job");
        }
        removed
    }

    pub async fn snapshots(&self) -> Vec<JobSnapshot> {
        let jobs = self.jobs.lock().await;
        let mut all: Vec<JobSnapshot> = jobs.values().map(JobState::snapshot).collect();
        all.sort_by(|a, b| a.job.name.cmp(&b.job.name));
        all
    }

    pub async fn job_count(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// One scheduler tick: launch every due job that can get a permit.
    ///
    /// Returns the handles of the launched runs so callers can await
    /// completion deterministically; the long-running loop just drops them.
    pub async fn run_cycle(&self) -> Vec<JoinHandle<()>> {
        let now = UtcDateTime::now();
        let mut handles = Vec::new();
        let mut jobs = self.jobs.lock().await;

        let due: Vec<String> = jobs
            .values()
            .filter(|state| !state.running && state.next_run_at <= now)
            .map(|state| state.job.name.clone())
            .collect();

        for name in due {
            let Some(state) = jobs.get_mut(&name) else {
                continue;
            };

            let permit = match self.permits.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    // Still due: the job queues for the next tick instead of
                    // losing a whole frequency period.
                    state.status = JobStatus::Skipped;
                    warn!(job = %name, "concurrency cap reached; job waits for the next tick");
                    continue;
                }
            };

            state.running = true;
            let job = state.job.clone();
            let collector = self.collector.clone();
            let jobs_handle = Arc::clone(&self.jobs);
            let job_timeout = self.config.job_timeout;
            let failure_recheck = self.config.failure_recheck;

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let run_id = uuid::Uuid::new_v4();
                debug!(job = %job.name, source = %job.source, %run_id, "job run started");

                let outcome = tokio::time::timeout(
                    job_timeout,
                    collector.collect(job.source, job.location, job.data_type),
                )
                .await;

                let finished_at = UtcDateTime::now();
                let mut jobs = jobs_handle.lock().await;
                // Removed mid-run: the result is dropped, nothing is rescheduled.
                let Some(state) = jobs.get_mut(&job.name) else {
                    debug!(job = %job.name, "job removed mid-run; dropping result");
                    return;
                };
                state.running = false;
                state.last_run_at = Some(finished_at);

                match outcome {
                    Ok(Ok(result)) => {
                        state.status = JobStatus::Success;
                        state.consecutive_failures = 0;
                        state.last_error = None;
                        state.next_run_at = finished_at.plus(state.job.frequency);
                        info!(
                            job = %job.name,
                            %run_id,
                            origin = ?result.origin,
                            latency_ms = result.latency.as_millis() as u64,
                            "job run succeeded"
                        );
                    }
                    Ok(Err(source_error)) => {
                        state.status = JobStatus::Failure;
                        state.consecutive_failures += 1;
                        state.last_error = Some(source_error.to_string());
                        // A missing key will not fix itself by rechecking
                        // early; wait out the normal period.
                        let recheck =
                            if source_error.kind() == SourceErrorKind::MissingCredentials {
                                state.job.frequency
                            } else {
                                failure_recheck.min(state.job.frequency)
                            };
                        state.next_run_at = finished_at.plus(recheck);
                        error!(
                            job = %job.name,
                            %run_id,
                            error = %source_error,
                            failures = state.consecutive_failures,
                            "job run failed"
                        );
                    }
                    Err(_elapsed) => {
                        let message = format!("run timed out after {}s", job_timeout.as_secs());
                        // collect() never returned, so the cancellation has
                        // to be booked against the source here.
                        collector
                            .stats_registry()
                            .record_failure(job.source, job_timeout, &message);
                        state.status = JobStatus::Failure;
                        state.consecutive_failures += 1;
                        state.last_error = Some(message);
                        state.next_run_at =
                            finished_at.plus(failure_recheck.min(state.job.frequency));
                        error!(job = %job.name, %run_id, timeout_s = job_timeout.as_secs(), "job run timed out");
                    }
                }
            }));
        }

        handles
    }

    /// Long-running scheduler loop. Ticks forever; cancel the future to stop.
    pub async fn run(&self) {
        info!(
            tick_ms = self.config.tick_interval.as_millis() as u64,
            max_concurrent = self.config.max_concurrent_jobs,
            "scheduler loop started"
        );
        loop {
            let _ = self.run_cycle().await;
            tokio::time::sleep(self.config.tick_interval).await;
        }
    }

    /// Persist job definitions and their next due times as JSON.
    pub async fn save_jobs(&self, path: &Path) -> Result<(), CoreError> {
        let jobs = self.jobs.lock().await;
        let mut persisted: Vec<PersistedJob> = jobs
            .values()
            .map(|state| PersistedJob {
                job: state.job.clone(),
                next_run_at: state.next_run_at,
            })
            .collect();
        persisted.sort_by(|a, b| a.job.name.cmp(&b.job.name));
        drop(jobs);

        let body = serde_json::to_string_pretty(&persisted)?;
        std::fs::write(path, body)?;
        Ok(())
    }

    /// Restore jobs saved by [`save_jobs`](Self::save_jobs). Due times in
    /// the past stay in the past, so overdue jobs run on the first tick.
    pub async fn load_jobs(&self, path: &Path) -> Result<usize, CoreError> {
        let body = std::fs::read_to_string(path)?;
        let persisted: Vec<PersistedJob> = serde_json::from_str(&body)?;
        let count = persisted.len();

        let mut jobs = self.jobs.lock().await;
        for entry in persisted {
            let name = entry.job.name.clone();
            jobs.insert(name, JobState::new(entry.job, entry.next_run_at));
        }
        Ok(count)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedJob {
    job: CollectionJob,
    next_run_at: UtcDateTime,
}
