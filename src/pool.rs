//! Worker Pool
//!
//! A fixed set of named threads fed through a bounded channel.
//!
//! ## Guarantees
//! - `try_execute` never blocks; a full queue hands the job back
//! - A panicking job is caught and logged; the worker keeps serving
//! - `shutdown` stops intake, lets queued and running jobs finish, then joins
//!   every thread. Threads are never killed mid-job.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};

use crate::error::{BeingError, Result};

/// A unit of work
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Bounded pool of worker threads
///
/// All methods take `&self`, so a pool can be shared behind an `Arc` and
/// still be shut down by its owner.
pub struct WorkerPool {
    name: String,

    /// Intake; `None` once shut down
    sender: RwLock<Option<Sender<Job>>>,

    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawn `threads` workers sharing a queue of `capacity` jobs.
    ///
    /// Jobs running longer than `slow_after` are reported.
    pub fn new(name: &str, threads: usize, capacity: usize, slow_after: Duration) -> Result<Self> {
        if threads == 0 || capacity == 0 {
            return Err(BeingError::Pool(format!(
                "{}: threads and capacity must be positive",
                name
            )));
        }

        let (sender, receiver) = channel::bounded::<Job>(capacity);
        let mut workers = Vec::with_capacity(threads);

        for i in 0..threads {
            let receiver = receiver.clone();
            let thread_name = format!("{}-{}", name, i);
            let handle = thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || worker_loop(&thread_name, receiver, slow_after))?;
            workers.push(handle);
        }

        tracing::debug!("Started pool {} ({} threads, queue {})", name, threads, capacity);

        Ok(Self {
            name: name.to_string(),
            sender: RwLock::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    /// Queue a job without blocking; gives it back if the queue is full or
    /// the pool is shut down
    pub fn try_execute(&self, job: Job) -> std::result::Result<(), Job> {
        match self.sender.read().as_ref() {
            Some(sender) => sender.try_send(job).map_err(|e| match e {
                TrySendError::Full(job) | TrySendError::Disconnected(job) => job,
            }),
            None => Err(job),
        }
    }

    /// Queue a job, waiting for room
    pub fn execute(&self, job: Job) -> Result<()> {
        // Clone the sender so a blocked send does not hold the lock that
        // `shutdown` needs
        let sender = self
            .sender
            .read()
            .clone()
            .ok_or_else(|| BeingError::Pool(format!("{} is shut down", self.name)))?;
        sender
            .send(job)
            .map_err(|_| BeingError::Pool(format!("{} has no workers left", self.name)))
    }

    /// Jobs waiting in the queue
    pub fn queued(&self) -> usize {
        self.sender.read().as_ref().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_shutdown(&self) -> bool {
        self.sender.read().is_none()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop intake, drain the queue, and join every worker
    pub fn shutdown(&self) {
        // Workers leave their receive loop once every sender is gone and
        // the queue is empty
        if self.sender.write().take().is_none() {
            return;
        }

        let workers: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        let current = thread::current().id();
        for handle in workers {
            // A job of this pool may end up calling shutdown; never join self
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                tracing::error!("A worker of {} exited abnormally", self.name);
            }
        }
        tracing::debug!("Pool {} drained", self.name);
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(name: &str, receiver: Receiver<Job>, slow_after: Duration) {
    for job in receiver.iter() {
        let started = Instant::now();

        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::error!("Job panicked on {}", name);
        }

        let elapsed = started.elapsed();
        if elapsed > slow_after {
            tracing::warn!("Slow job on {}: {:?} (limit {:?})", name, elapsed, slow_after);
        }
    }
}
