//! Runner module.
//!
//! The runner schedules the jobs of every client. Each job runs once
//! at start, then again every time its interval elapses. Jobs without
//! interval run once. The runner stops when no job is left or when it
//! gets interrupted.

use log::{debug, info};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use crate::{Backend, Job};

use super::Result;

/// Represents the longest uninterrupted nap between two checks of the
/// interrupt flag.
const NAP: Duration = Duration::from_millis(200);

pub struct Runner<B: Backend> {
    jobs: Vec<Job<B>>,
    interrupted: Arc<AtomicBool>,
}

impl<B: Backend> Runner<B> {
    pub fn new(jobs: Vec<Job<B>>) -> Self {
        Self {
            jobs,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Gets the flag that stops the runner once set.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Acquire)
    }

    /// Runs the jobs until none is left to repeat or until interrupted.
    /// A fatal job error stops the runner.
    pub fn run(&self) -> Result<()> {
        let now = Instant::now();
        let mut due: Vec<(Instant, &Job<B>)> = self.jobs.iter().map(|job| (now, job)).collect();

        while !due.is_empty() && !self.is_interrupted() {
            let now = Instant::now();
            let mut next = Vec::with_capacity(due.len());

            for (at, job) in due {
                if at > now {
                    next.push((at, job));
                    continue;
                }

                if self.is_interrupted() {
                    break;
                }

                job.run_cycle()?;

                match job.config().interval {
                    Some(interval) => next.push((now + interval, job)),
                    None => debug!("client {} runs once, done", job.config().name),
                }
            }

            due = next;

            if let Some(wake_at) = due.iter().map(|(at, _)| *at).min() {
                self.sleep_until(wake_at);
            }
        }

        if self.is_interrupted() {
            info!("interrupted, shutting down");
        } else {
            info!("no client left to poll, shutting down");
        }

        Ok(())
    }

    /// Sleeps until the given instant, waking up early if interrupted.
    fn sleep_until(&self, wake_at: Instant) {
        loop {
            if self.is_interrupted() {
                break;
            }
            let now = Instant::now();
            if now >= wake_at {
                break;
            }
            thread::sleep(NAP.min(wake_at - now));
        }
    }
}
