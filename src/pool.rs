//! Fixed pool of per-worker scratch contexts.
//!
//! Every engine owns one `WorkerPool` sized at construction. Each slot holds
//! the mutable working set of one concurrent worker (subset buffers, Hessian,
//! FFT plans, …) and is reused across POIs, so the hot loop never allocates.
//!
//! With the `parallel` feature the pool also owns a rayon thread pool with
//! exactly as many threads as slots; a task running on thread `i` works with
//! slot `i`, so every slot is touched by one thread at a time and its lock is
//! never contended. Without the feature, batches run on slot 0.
use crate::error::DicError;
use parking_lot::{Mutex, MutexGuard};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Worker count used when the caller does not choose one: available cores
/// minus one, at least one.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

pub struct WorkerPool<W> {
    slots: Vec<Mutex<W>>,
    #[cfg(feature = "parallel")]
    threads: rayon::ThreadPool,
}

impl<W: Send> WorkerPool<W> {
    /// Allocate `count` worker contexts with `make(worker_id)`.
    pub fn new(count: usize, mut make: impl FnMut(usize) -> W) -> Result<Self, DicError> {
        if count == 0 {
            return Err(DicError::NoWorkers);
        }
        let slots = (0..count).map(|id| Mutex::new(make(id))).collect();
        #[cfg(feature = "parallel")]
        let threads = rayon::ThreadPoolBuilder::new()
            .num_threads(count)
            .thread_name(|i| format!("dic-worker-{i}"))
            .build()
            .map_err(|e| DicError::ThreadPool(e.to_string()))?;
        Ok(Self {
            slots,
            #[cfg(feature = "parallel")]
            threads,
        })
    }

    /// Number of worker contexts.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Exclusive access to the context of `worker`.
    pub fn acquire(&self, worker: usize) -> Result<MutexGuard<'_, W>, DicError> {
        self.slots
            .get(worker)
            .map(|slot| slot.lock())
            .ok_or(DicError::WorkerOutOfRange {
                worker,
                workers: self.slots.len(),
            })
    }

    /// Run `f` on every item, handing each call the context of the worker
    /// executing it.
    ///
    /// The worker range is validated before any item is touched; on error no
    /// item has been visited.
    pub fn for_each<T, F>(&self, items: &mut [T], f: F) -> Result<(), DicError>
    where
        T: Send,
        F: Fn(&mut W, &mut T) + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        {
            let threads = self.threads.current_num_threads();
            if threads > self.slots.len() {
                return Err(DicError::WorkerOutOfRange {
                    worker: threads - 1,
                    workers: self.slots.len(),
                });
            }
            let slots = &self.slots;
            self.threads.install(|| {
                items.par_iter_mut().for_each(|item| {
                    let id = rayon::current_thread_index().unwrap_or(0) % slots.len();
                    let mut ctx = slots[id].lock();
                    f(&mut ctx, item);
                });
            });
            Ok(())
        }
        #[cfg(not(feature = "parallel"))]
        {
            let mut ctx = self.acquire(0)?;
            for item in items.iter_mut() {
                f(&mut ctx, item);
            }
            Ok(())
        }
    }
}
