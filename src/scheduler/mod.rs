//! Background jobs and the daily trigger that runs them.

pub mod clock;
pub mod evaluator;
pub mod lock;
pub mod materializer;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Duration, NaiveTime, Utc};
use rusqlite::Connection;
use tracing::{error, info, warn};

use crate::calendar;
use crate::config::SchedulerConfig;
use crate::db::connection::establish_connection;
use crate::error::{AppError, AppResult};
use clock::Clock;
use evaluator::AlertReport;
use lock::JobLock;
use materializer::MaterializeReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    MaterializeRecurring,
    EvaluateBudgets,
}

impl Job {
    pub fn name(self) -> &'static str {
        match self {
            Job::MaterializeRecurring => "materialize_recurring",
            Job::EvaluateBudgets => "evaluate_budgets",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Materialized(MaterializeReport),
    Evaluated(AlertReport),
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Materialized(report) => write!(f, "recurring expenses: {}", report),
            JobOutcome::Evaluated(report) => write!(f, "budget alerts: {}", report),
        }
    }
}

/// Runs `job` once on its own connection to `db_path`. The connection and
/// the job lock are released when this returns, on success or error.
pub fn run_job(job: Job, db_path: &Path, now: DateTime<Utc>, lock_ttl: Duration) -> AppResult<JobOutcome> {
    let conn = establish_connection(db_path)?;
    run_job_on(&conn, job, now, lock_ttl)
}

pub fn run_job_on(
    conn: &Connection,
    job: Job,
    now: DateTime<Utc>,
    lock_ttl: Duration,
) -> AppResult<JobOutcome> {
    let _lock = JobLock::acquire(conn, job.name(), now, lock_ttl)?;
    match job {
        Job::MaterializeRecurring => {
            materializer::process_due_schedules(conn, now).map(JobOutcome::Materialized)
        }
        Job::EvaluateBudgets => evaluator::check_budget_alerts(conn, now).map(JobOutcome::Evaluated),
    }
}

struct Worker {
    job: Job,
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

struct JobTrigger {
    job: Job,
    at: NaiveTime,
    db_path: PathBuf,
    clock: Arc<dyn Clock>,
    lock_ttl: Duration,
}

impl JobTrigger {
    fn run(self, stop: Receiver<()>) {
        info!(job = self.job.name(), at = %self.at, "job trigger started");
        let mut last_fire: Option<DateTime<Utc>> = None;
        loop {
            let now = self.clock.now();
            let from = last_fire.map_or(now, |last| last.max(now));
            let next = calendar::next_fire_after(from, self.at);
            let wait = (next - now).to_std().unwrap_or_default();

            match stop.recv_timeout(wait) {
                Err(RecvTimeoutError::Timeout) => {
                    last_fire = Some(next);
                    self.fire();
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!(job = self.job.name(), "job trigger stopped");
    }

    fn fire(&self) {
        let job = self.job.name();
        match run_job(self.job, &self.db_path, self.clock.now(), self.lock_ttl) {
            Ok(outcome) => info!(job, %outcome, "job finished"),
            Err(AppError::JobLocked(_)) => warn!(job, "previous run still holds the lock; skipping"),
            Err(err) => error!(job, error = %err, "job failed"),
        }
    }
}

/// Owns one trigger thread per job. Created and started by the host process,
/// stopped explicitly or when dropped.
pub struct Scheduler {
    db_path: PathBuf,
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    workers: Vec<Worker>,
}

impl Scheduler {
    pub fn new(db_path: impl Into<PathBuf>, config: SchedulerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            db_path: db_path.into(),
            config,
            clock,
            workers: Vec::new(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        !self.workers.is_empty()
    }

    pub fn start(&mut self) -> AppResult<()> {
        if self.is_running() {
            warn!("scheduler already running");
            return Ok(());
        }
        if !self.config.evaluator_runs_after_materializer() {
            warn!(
                materialize_at = %self.config.materialize_at,
                evaluate_at = %self.config.evaluate_at,
                "budget alerts run before recurring expenses are materialized"
            );
        }

        let jobs = [
            (Job::MaterializeRecurring, self.config.materialize_at),
            (Job::EvaluateBudgets, self.config.evaluate_at),
        ];
        for (job, at) in jobs {
            let (stop_tx, stop_rx) = mpsc::channel();
            let trigger = JobTrigger {
                job,
                at,
                db_path: self.db_path.clone(),
                clock: Arc::clone(&self.clock),
                lock_ttl: self.config.lock_ttl,
            };
            let spawned = thread::Builder::new()
                .name(format!("job-{}", job.name()))
                .spawn(move || trigger.run(stop_rx));
            match spawned {
                Ok(handle) => self.workers.push(Worker {
                    job,
                    stop: stop_tx,
                    handle,
                }),
                Err(source) => {
                    self.stop();
                    return Err(AppError::Worker {
                        job: job.name(),
                        source,
                    });
                }
            }
        }
        info!(db = %self.db_path.display(), "scheduler started");
        Ok(())
    }

    /// Signals every trigger and waits for an in-flight run to finish.
    pub fn stop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        for worker in self.workers.drain(..) {
            let _ = worker.stop.send(());
            if worker.handle.join().is_err() {
                error!(job = worker.job.name(), "job trigger panicked");
            }
        }
        info!("scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
