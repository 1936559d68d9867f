// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cron-driven job scheduler.
//!
//! The scheduler keeps one entry per job. Each loop iteration computes the
//! next occurrence of every entry, sleeps until the earliest one and spawns
//! the jobs that are due. Jobs run on their own tasks so a slow job never
//! delays the next tick of another one.
//!
//! Expressions use five fields (minute precision) or six with a leading
//! seconds field.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use croner::Cron;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::jobs::Job;

/// Scheduler errors.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// A cron expression did not parse.
    #[error("Invalid schedule '{expression}' for job {job}: {reason}")]
    InvalidSchedule {
        /// Job name.
        job: String,
        /// Rejected expression.
        expression: String,
        /// Parser message.
        reason: String,
    },
}

struct Entry {
    job: Arc<dyn Job>,
    expression: String,
    cron: Cron,
}

/// Runs jobs on their cron schedules until told to stop.
pub struct JobScheduler {
    entries: Vec<Entry>,
    shutdown: Arc<Notify>,
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl JobScheduler {
    /// Create a scheduler with no jobs.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Register a job. `schedule` overrides the job's default expression.
    pub fn add(
        &mut self,
        job: Arc<dyn Job>,
        schedule: Option<&str>,
    ) -> Result<(), SchedulerError> {
        let expression = schedule.unwrap_or_else(|| job.default_schedule()).trim();

        let cron = Cron::new(expression)
            .with_seconds_optional()
            .parse()
            .map_err(|e| SchedulerError::InvalidSchedule {
                job: job.name().to_string(),
                expression: expression.to_string(),
                reason: e.to_string(),
            })?;

        debug!(job = job.name(), schedule = expression, "Registered job");
        self.entries.push(Entry {
            job,
            expression: expression.to_string(),
            cron,
        });
        Ok(())
    }

    /// `(job name, expression)` for every registered job.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.job.name(), e.expression.as_str()))
            .collect()
    }

    /// Handle used to stop [`run`](Self::run). Signal it with `notify_one`.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Earliest upcoming occurrence after `now` and the entries due then.
    fn next_due(&self, now: &DateTime<Local>) -> Option<(DateTime<Local>, Vec<usize>)> {
        let mut next: Option<(DateTime<Local>, Vec<usize>)> = None;

        for (idx, entry) in self.entries.iter().enumerate() {
            let at = match entry.cron.find_next_occurrence(now, false) {
                Ok(at) => at,
                Err(e) => {
                    warn!(job = entry.job.name(), error = %e, "No next occurrence");
                    continue;
                }
            };

            let earliest = next.as_ref().map(|(best, _)| *best);
            match earliest {
                Some(best) if at > best => {}
                Some(best) if at == best => {
                    if let Some((_, due)) = next.as_mut() {
                        due.push(idx);
                    }
                }
                _ => next = Some((at, vec![idx])),
            }
        }

        next
    }

    /// Run the scheduling loop until the shutdown handle is notified.
    ///
    /// Jobs still running at shutdown are awaited before returning.
    pub async fn run(&self) {
        if self.entries.is_empty() {
            info!("Job scheduler has no jobs");
            return;
        }

        info!(jobs = self.entries.len(), "Job scheduler started");

        let mut running: JoinSet<()> = JoinSet::new();

        loop {
            let now = Local::now();
            let Some((at, due)) = self.next_due(&now) else {
                warn!("No job has an upcoming occurrence");
                self.shutdown.notified().await;
                break;
            };
            let wait = (at - now).to_std().unwrap_or(Duration::ZERO);

            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Job scheduler received shutdown signal");
                    break;
                }

                Some(result) = running.join_next(), if !running.is_empty() => {
                    if let Err(e) = result {
                        error!(error = %e, "Job task panicked");
                    }
                }

                _ = tokio::time::sleep(wait) => {
                    for idx in due {
                        let job = self.entries[idx].job.clone();
                        debug!(job = job.name(), "Starting scheduled job");
                        running.spawn(async move {
                            if let Err(e) = job.run().await {
                                error!(job = job.name(), error = %e, "Scheduled job failed");
                            }
                        });
                    }
                }
            }
        }

        while let Some(result) = running.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Job task panicked");
            }
        }

        info!("Job scheduler stopped");
    }
}
