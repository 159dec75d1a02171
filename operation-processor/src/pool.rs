//! Processor pool
//!
//! A bounded free-list of processor instances. [`ProcessorPool::get`] hands out
//! a [`Pooled`] guard; closing or dropping the guard resets the instance and
//! returns it to the pool, so no state survives from one operation to the
//! next.

use parking_lot::Mutex;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Clears per-operation state before an instance is reused
pub trait Reset {
    /// Return to the freshly constructed state
    fn reset(&mut self);
}

/// Pool of reusable processors
pub struct ProcessorPool<P> {
    idle: Mutex<Vec<P>>,
    max_idle: usize,
    reused: AtomicU64,
}

impl<P: Reset + Default> ProcessorPool<P> {
    /// Create a pool keeping at most `max_idle` instances
    pub fn new(max_idle: usize) -> Arc<Self> {
        Arc::new(Self {
            idle: Mutex::new(Vec::with_capacity(max_idle)),
            max_idle,
            reused: AtomicU64::new(0),
        })
    }

    /// Take an idle instance, or construct one
    pub fn get(self: &Arc<Self>) -> Pooled<P> {
        let processor = match self.idle.lock().pop() {
            Some(processor) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                processor
            }
            None => P::default(),
        };

        Pooled {
            processor: Some(processor),
            pool: Arc::clone(self),
        }
    }

    /// Number of idle instances
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    /// Number of times an idle instance was handed out again
    pub fn reused(&self) -> u64 {
        self.reused.load(Ordering::Relaxed)
    }

    fn put(&self, mut processor: P) {
        processor.reset();

        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(processor);
        }
    }
}

impl<P> fmt::Debug for ProcessorPool<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorPool")
            .field("idle", &self.idle.lock().len())
            .field("max_idle", &self.max_idle)
            .field("reused", &self.reused.load(Ordering::Relaxed))
            .finish()
    }
}

/// Processor borrowed from a pool
pub struct Pooled<P: Reset + Default> {
    processor: Option<P>,
    pool: Arc<ProcessorPool<P>>,
}

impl<P: Reset + Default> Pooled<P> {
    /// Reset the processor and return it to the pool
    pub fn close(self) {
        drop(self)
    }
}

impl<P: Reset + Default> Deref for Pooled<P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.processor
            .as_ref()
            .expect("processor is only taken on drop")
    }
}

impl<P: Reset + Default> DerefMut for Pooled<P> {
    fn deref_mut(&mut self) -> &mut P {
        self.processor
            .as_mut()
            .expect("processor is only taken on drop")
    }
}

impl<P: Reset + Default> Drop for Pooled<P> {
    fn drop(&mut self) {
        if let Some(processor) = self.processor.take() {
            self.pool.put(processor);
        }
    }
}

impl<P: Reset + Default + fmt::Debug> fmt::Debug for Pooled<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pooled").field(&self.processor).finish()
    }
}
