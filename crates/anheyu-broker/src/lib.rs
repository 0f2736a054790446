//! Task Broker: a cron-driven scheduler plus an on-demand dispatch queue
//! backed by a bounded worker pool.
//!
//! Every job, whether it arrived from a cron tick or from [`Broker::dispatch`],
//! runs behind the same two wrappers: panic isolation (a job can never take
//! down a worker) and structured begin/end logging. Cron entries additionally
//! get an overlap guard — a tick that fires while the previous run of the same
//! entry is still in flight is dropped, not queued.

mod job;
mod worker_pool;

pub use job::{BoxFuture, Job};

use anheyu_types::errors::BrokerError;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing::{error, info, warn};

/// A cron schedule (6 fields, seconds first) paired with the job it runs.
pub struct PeriodicEntry {
    pub schedule: String,
    pub job: Job,
}

impl PeriodicEntry {
    pub fn new(schedule: impl Into<String>, job: Job) -> Self {
        Self {
            schedule: schedule.into(),
            job,
        }
    }
}

/// The Task Broker.
pub struct Broker {
    sender: mpsc::Sender<Job>,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    worker_count: usize,
    scheduler: Option<JobScheduler>,
    worker_handles: Vec<tokio::task::JoinHandle<()>>,
    entry_names: Arc<Mutex<HashSet<String>>>,
}

impl Broker {
    /// Build a broker with a dispatch queue of `queue_capacity` and a worker
    /// pool of `max(worker_pool_size.unwrap_or(num_cpus), 4)`.
    pub fn new(queue_capacity: usize, worker_pool_size: Option<usize>) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity);
        let worker_count = worker_pool_size.unwrap_or_else(num_cpus::get).max(4);
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            worker_count,
            scheduler: None,
            worker_handles: Vec::new(),
            entry_names: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Enqueue a one-off job. Blocks (applying backpressure) if the queue of
    /// capacity `queue_capacity` is full.
    pub async fn dispatch(&self, job: Job) -> Result<(), BrokerError> {
        self.sender
            .send(job)
            .await
            .map_err(|_| BrokerError::QueueClosed)
    }

    /// Install the fixed cron schedule. Each entry is wrapped with panic
    /// isolation, structured logging, and an overlap guard. A registration
    /// failure for any entry is fatal.
    pub async fn register_cron_jobs(&mut self, entries: Vec<PeriodicEntry>) -> Result<(), BrokerError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| BrokerError::Registration {
                name: "<scheduler init>".to_string(),
                message: e.to_string(),
            })?;

        for entry in entries {
            let name = entry.job.name().to_string();
            let running = Arc::new(AtomicBool::new(false));
            let job = Arc::new(entry.job);

            let cron_job = CronJob::new_async(entry.schedule.as_str(), move |_uuid, _l| {
                let running = running.clone();
                let job = job.clone();
                Box::pin(async move {
                    if running.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
                        warn!(job = job.name(), "skipping tick, previous run still active");
                        return;
                    }
                    job::run_isolated(&job).await;
                    running.store(false, Ordering::SeqCst);
                })
            })
            .map_err(|e| BrokerError::Registration {
                name: name.clone(),
                message: e.to_string(),
            })?;

            scheduler
                .add(cron_job)
                .await
                .map_err(|e| BrokerError::Registration {
                    name: name.clone(),
                    message: e.to_string(),
                })?;

            self.entry_names.lock().await.insert(name);
        }

        self.scheduler = Some(scheduler);
        Ok(())
    }

    /// Start cron ticking, the worker pool, and run `startup_jobs` once each
    /// in the background (used for the crawl-if-empty and backfill passes).
    pub async fn start(&mut self, startup_jobs: Vec<Job>) -> Result<(), BrokerError> {
        self.worker_handles = worker_pool::spawn_workers(self.worker_count, self.receiver.clone());

        if let Some(scheduler) = &mut self.scheduler {
            scheduler
                .start()
                .await
                .map_err(|e| BrokerError::Registration {
                    name: "<scheduler start>".to_string(),
                    message: e.to_string(),
                })?;
        }

        for job in startup_jobs {
            tokio::spawn(async move { job::run_isolated(&job).await });
        }

        info!(workers = self.worker_count, "broker started");
        Ok(())
    }

    /// Stop cron (waiting for in-flight entries), then drop the sender so
    /// workers drain the remaining queue and exit.
    pub async fn stop(mut self) {
        if let Some(mut scheduler) = self.scheduler.take()
            && let Err(e) = scheduler.shutdown().await
        {
            error!(error = %e, "error shutting down cron scheduler");
        }
        drop(self.sender);
        for handle in self.worker_handles {
            let _ = handle.await;
        }
    }
}
