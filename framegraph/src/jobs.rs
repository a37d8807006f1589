//! Job system used to record node callbacks in parallel.
//!
//! The frame graph only needs two things from a job system: submit a batch of
//! independent work items, and wait until all of them have finished. That
//! contract is the [`JobSystem`] trait. [`ThreadPool`] implements it on top of
//! `std::thread::scope`, so jobs may borrow from the caller's stack.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// A unit of work submitted to a [`JobSystem`].
pub type Job<'a> = Box<dyn FnOnce() + Send + 'a>;

/// Runs batches of independent jobs.
pub trait JobSystem: Send + Sync {
    /// Number of jobs that may run at the same time.
    fn worker_count(&self) -> usize;

    /// Run every job and return once all of them have completed.
    ///
    /// A panic in any job is propagated to the caller after the batch joins.
    fn run_batch<'a>(&self, jobs: Vec<Job<'a>>);
}

/// Fixed-width pool of scoped workers.
///
/// Workers live only for the duration of one batch and pull jobs from a
/// shared queue, so a slow node does not hold up the rest of its share.
///
/// # Example
///
/// ```
/// use redlilium_framegraph::jobs::{Job, JobSystem};
/// use redlilium_framegraph::ThreadPool;
///
/// let pool = ThreadPool::new(4);
///
/// let mut slots = vec![0u32; 4];
/// let jobs: Vec<Job<'_>> = slots
///     .iter_mut()
///     .enumerate()
///     .map(|(i, slot)| Box::new(move || *slot = i as u32 * 10) as Job<'_>)
///     .collect();
/// pool.run_batch(jobs);
/// assert_eq!(slots, vec![0, 10, 20, 30]);
/// ```
#[derive(Debug)]
pub struct ThreadPool {
    workers: usize,
}

impl ThreadPool {
    /// Create a pool running at most `workers` jobs at once (at least one).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }
}

impl Default for ThreadPool {
    /// One worker per available core.
    fn default() -> Self {
        Self::new(std::thread::available_parallelism().map_or(1, |n| n.get()))
    }
}

impl JobSystem for ThreadPool {
    fn worker_count(&self) -> usize {
        self.workers
    }

    fn run_batch<'a>(&self, jobs: Vec<Job<'a>>) {
        let workers = self.workers.min(jobs.len());
        if workers <= 1 {
            jobs.into_iter().for_each(|job| job());
            return;
        }

        let queue: Mutex<VecDeque<Job<'a>>> = Mutex::new(jobs.into());
        std::thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(|| {
                    crate::set_thread_name!("framegraph: worker");
                    loop {
                        let next = queue.lock().pop_front();
                        match next {
                            Some(job) => job(),
                            None => break,
                        }
                    }
                });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static_assertions::assert_obj_safe!(JobSystem);

    #[test]
    fn run_batch_runs_every_job() {
        let pool = ThreadPool::new(3);
        let counter = AtomicU32::new(0);
        let jobs: Vec<Job<'_>> = (0..16)
            .map(|_| {
                Box::new(|| {
                    counter.fetch_add(1, Ordering::Relaxed);
                }) as Job<'_>
            })
            .collect();
        pool.run_batch(jobs);
        assert_eq!(counter.load(Ordering::Relaxed), 16);
    }

    #[test]
    fn run_batch_writes_disjoint_slots() {
        let pool = ThreadPool::new(4);
        let mut slots = vec![0usize; 8];
        let jobs: Vec<Job<'_>> = slots
            .iter_mut()
            .enumerate()
            .map(|(i, slot)| Box::new(move || *slot = i * i) as Job<'_>)
            .collect();
        pool.run_batch(jobs);
        assert_eq!(slots, vec![0, 1, 4, 9, 16, 25, 36, 49]);
    }

    #[test]
    fn single_worker_runs_inline() {
        let pool = ThreadPool::new(0);
        assert_eq!(pool.worker_count(), 1);
        let caller = std::thread::current().id();
        let mut ran_on = None;
        pool.run_batch(vec![
            Box::new(|| ran_on = Some(std::thread::current().id())) as Job<'_>,
        ]);
        assert_eq!(ran_on, Some(caller));
    }

    #[test]
    fn default_uses_available_cores() {
        assert!(ThreadPool::default().worker_count() >= 1);
    }
}
