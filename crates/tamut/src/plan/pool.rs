//! Bounded pool of strategy engine connections.

use super::engine::{EngineError, StrategyEngine};
use crate::mutation::MutationTestCase;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

const INITIAL_WAIT: Duration = Duration::from_millis(1);
const MAX_WAIT: Duration = Duration::from_millis(50);

/// Engine connections shared between plan workers.
pub struct EnginePool {
    idle: Mutex<Vec<Box<dyn StrategyEngine>>>,
    released: Condvar,
    capacity: usize,
}

impl std::fmt::Debug for EnginePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnginePool")
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .finish()
    }
}

impl EnginePool {
    /// Pool over already-open connections
    #[must_use]
    pub fn new(engines: Vec<Box<dyn StrategyEngine>>) -> Self {
        Self {
            capacity: engines.len(),
            idle: Mutex::new(engines),
            released: Condvar::new(),
        }
    }

    /// Pool of `max_connections` engines built by `factory`
    pub fn from_factory(
        max_connections: usize,
        mut factory: impl FnMut() -> Box<dyn StrategyEngine>,
    ) -> Self {
        Self::new((0..max_connections).map(|_| factory()).collect())
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Idle connections
    #[must_use]
    pub fn available(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }

    /// Block until a connection is free, backing off exponentially.
    ///
    /// # Errors
    /// Returns `PoolExhausted` if none is released within `timeout`.
    pub fn acquire(&self, timeout: Duration) -> Result<EngineLease<'_>, EngineError> {
        let started = Instant::now();
        let mut wait = INITIAL_WAIT;
        let mut idle = self.idle.lock().map_err(|_| EngineError::Poisoned)?;
        loop {
            if let Some(engine) = idle.pop() {
                return Ok(EngineLease {
                    pool: self,
                    engine: Some(engine),
                });
            }
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Err(EngineError::PoolExhausted {
                    waited_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                });
            }
            let (guard, _) = self
                .released
                .wait_timeout(idle, wait.min(timeout - elapsed))
                .map_err(|_| EngineError::Poisoned)?;
            idle = guard;
            wait = (wait * 2).min(MAX_WAIT);
        }
    }

    fn release(&self, engine: Box<dyn StrategyEngine>) {
        if let Ok(mut idle) = self.idle.lock() {
            idle.push(engine);
        }
        self.released.notify_one();
    }
}

/// A borrowed connection, returned to the pool on drop.
pub struct EngineLease<'p> {
    pool: &'p EnginePool,
    engine: Option<Box<dyn StrategyEngine>>,
}

impl std::fmt::Debug for EngineLease<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineLease")
            .field("held", &self.engine.is_some())
            .finish()
    }
}

impl EngineLease<'_> {
    /// Forward a synthesis request to the leased engine.
    ///
    /// # Errors
    /// Returns the engine's error.
    pub fn synthesize(&mut self, case: &MutationTestCase) -> Result<String, EngineError> {
        self.engine
            .as_mut()
            .ok_or(EngineError::Poisoned)?
            .synthesize(case)
    }
}

impl Drop for EngineLease<'_> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            self.pool.release(engine);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingEngine {
        calls: Arc<AtomicUsize>,
    }

    impl StrategyEngine for CountingEngine {
        fn synthesize(&mut self, _case: &MutationTestCase) -> Result<String, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(String::new())
        }
    }

    fn pool(size: usize) -> EnginePool {
        let calls = Arc::new(AtomicUsize::new(0));
        EnginePool::from_factory(size, || {
            Box::new(CountingEngine {
                calls: Arc::clone(&calls),
            })
        })
    }

    #[test]
    fn test_lease_released_on_drop() {
        let pool = pool(1);
        {
            let _lease = pool.acquire(Duration::from_millis(10)).unwrap();
            assert_eq!(pool.available(), 0);
        }
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_exhausted_pool_times_out() {
        let pool = pool(1);
        let _lease = pool.acquire(Duration::from_millis(10)).unwrap();
        let err = pool.acquire(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, EngineError::PoolExhausted { .. }));
    }

    #[test]
    fn test_blocked_worker_gets_released_engine() {
        let pool = pool(1);
        std::thread::scope(|scope| {
            let lease = pool.acquire(Duration::from_millis(10)).unwrap();
            let waiter = scope.spawn(|| pool.acquire(Duration::from_secs(5)).map(|_| ()));
            std::thread::sleep(Duration::from_millis(20));
            drop(lease);
            assert!(waiter.join().unwrap().is_ok());
        });
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_release_on_panic() {
        let pool = pool(1);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _lease = pool.acquire(Duration::from_millis(10)).unwrap();
            panic!("worker failed");
        }));
        assert!(result.is_err());
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_capacity() {
        assert_eq!(pool(3).capacity(), 3);
        assert_eq!(pool(3).available(), 3);
    }
}
