//! Bit-packed reader/writer spin guard
//!
//! One `AtomicU32` per entity:
//!
//! ```text
//!  31            20 19                      0
//! +----------------+-------------------------+
//! |  writer slot   |      active readers     |
//! +----------------+-------------------------+
//! ```
//!
//! There is no wait queue. A steady stream of writers can starve readers and a steady
//! stream of readers can keep a claimed writer waiting for the drain; both are accepted
//! costs of keeping the per-element lock free of syscalls.

use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;

/// Mask of the low 20 bits holding the active reader count
pub const READER_MASK: u32 = (1 << 20) - 1;

/// One unit in the writer field (high 12 bits)
pub const WRITER_UNIT: u32 = 1 << 20;

/// Mask of the high 12 bits holding the writer slot
pub const WRITER_MASK: u32 = !READER_MASK;

/// Default retry budget: the largest representable iteration count
pub const DEFAULT_RETRY_BUDGET: u64 = u64::MAX;

/// Spins before the backoff starts yielding the thread
const SPIN_LIMIT: u64 = 64;

/// Raised when a guard could not be acquired within its retry budget
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("lock not acquired after {retries} retries (writer holder: {})", .holder.as_deref().unwrap_or("unknown"))]
pub struct ConcurrencyViolation {
    pub retries: u64,
    /// Backtrace of the competing writer, recorded with the `lock-diagnostics` feature
    pub holder: Option<String>,
}

/// Per-entity reader/writer spin lock packed into one atomic word
#[derive(Debug, Default)]
pub struct ConcurrencyGuard {
    state: AtomicU32,
    #[cfg(feature = "lock-diagnostics")]
    holder: parking_lot::Mutex<Option<String>>,
}

impl ConcurrencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a shared lock, retrying until it succeeds
    pub fn acquire_read(&self) -> Result<(), ConcurrencyViolation> {
        self.acquire_read_bounded(DEFAULT_RETRY_BUDGET)
    }

    /// Acquire a shared lock with at most `budget` retries.
    ///
    /// The reader count is bumped optimistically; if a writer turns out to hold the
    /// slot the bump is undone and the loop retries.
    pub fn acquire_read_bounded(&self, budget: u64) -> Result<(), ConcurrencyViolation> {
        let mut attempt = 0u64;
        while attempt < budget {
            if self.try_acquire_read() {
                return Ok(());
            }
            backoff(attempt);
            attempt += 1;
        }
        Err(self.violation(attempt))
    }

    /// Single attempt at a shared lock
    pub fn try_acquire_read(&self) -> bool {
        let current = self.state.load(Ordering::Acquire);
        if current & WRITER_MASK != 0 || current & READER_MASK == READER_MASK {
            return false;
        }
        let previous = self.state.fetch_add(1, Ordering::AcqRel);
        if previous & WRITER_MASK == 0 {
            return true;
        }
        self.state.fetch_sub(1, Ordering::AcqRel);
        false
    }

    /// Release a shared lock
    pub fn release_read(&self) {
        let previous = self.state.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous & READER_MASK != 0, "release_read without a reader");
    }

    /// Acquire the exclusive lock, retrying until it succeeds
    pub fn acquire_write(&self) -> Result<(), ConcurrencyViolation> {
        self.acquire_write_bounded(DEFAULT_RETRY_BUDGET)
    }

    /// Acquire the exclusive lock with at most `budget` retries.
    ///
    /// The writer slot is claimed first, which stops new readers; the call then waits
    /// for the readers already inside to drain. If the budget runs out during the
    /// drain the claim is given back.
    pub fn acquire_write_bounded(&self, budget: u64) -> Result<(), ConcurrencyViolation> {
        let mut attempt = 0u64;
        loop {
            if attempt >= budget {
                return Err(self.violation(attempt));
            }
            if self.claim_writer_slot() {
                break;
            }
            backoff(attempt);
            attempt += 1;
        }

        while self.state.load(Ordering::Acquire) & READER_MASK != 0 {
            if attempt >= budget {
                self.state.fetch_sub(WRITER_UNIT, Ordering::AcqRel);
                return Err(self.violation(attempt));
            }
            backoff(attempt);
            attempt += 1;
        }

        self.record_holder();
        Ok(())
    }

    /// Single attempt at the exclusive lock; fails if anyone holds the guard
    pub fn try_acquire_write(&self) -> bool {
        let acquired = self
            .state
            .compare_exchange(0, WRITER_UNIT, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if acquired {
            self.record_holder();
        }
        acquired
    }

    /// Release the exclusive lock
    pub fn release_write(&self) {
        #[cfg(feature = "lock-diagnostics")]
        {
            *self.holder.lock() = None;
        }
        let previous = self.state.fetch_sub(WRITER_UNIT, Ordering::AcqRel);
        debug_assert!(previous & WRITER_MASK != 0, "release_write without a writer");
    }

    /// Number of readers currently inside (includes optimistic bumps in flight)
    pub fn reader_count(&self) -> u32 {
        self.state.load(Ordering::Acquire) & READER_MASK
    }

    pub fn is_write_locked(&self) -> bool {
        self.state.load(Ordering::Acquire) & WRITER_MASK != 0
    }

    fn claim_writer_slot(&self) -> bool {
        let current = self.state.load(Ordering::Acquire);
        if current & WRITER_MASK != 0 {
            return false;
        }
        self.state
            .compare_exchange_weak(
                current,
                current + WRITER_UNIT,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    #[cfg(feature = "lock-diagnostics")]
    fn record_holder(&self) {
        let trace = std::backtrace::Backtrace::force_capture();
        *self.holder.lock() = Some(trace.to_string());
    }

    #[cfg(not(feature = "lock-diagnostics"))]
    fn record_holder(&self) {}

    #[cfg(feature = "lock-diagnostics")]
    fn violation(&self, retries: u64) -> ConcurrencyViolation {
        ConcurrencyViolation {
            retries,
            holder: self.holder.lock().clone(),
        }
    }

    #[cfg(not(feature = "lock-diagnostics"))]
    fn violation(&self, retries: u64) -> ConcurrencyViolation {
        ConcurrencyViolation { retries, holder: None }
    }
}

fn backoff(attempt: u64) {
    if attempt < SPIN_LIMIT {
        std::hint::spin_loop();
    } else {
        std::thread::yield_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_bit_layout() {
        assert_eq!(READER_MASK, 0x000F_FFFF);
        assert_eq!(WRITER_MASK, 0xFFF0_0000);
        assert_eq!(WRITER_UNIT & READER_MASK, 0);
    }

    #[test]
    fn test_readers_share() {
        let guard = ConcurrencyGuard::new();
        guard.acquire_read().unwrap();
        guard.acquire_read().unwrap();
        assert_eq!(guard.reader_count(), 2);
        assert!(!guard.try_acquire_write());

        guard.release_read();
        guard.release_read();
        assert_eq!(guard.reader_count(), 0);
        assert!(guard.try_acquire_write());
        guard.release_write();
    }

    #[test]
    fn test_writer_excludes_readers_and_writers() {
        let guard = ConcurrencyGuard::new();
        guard.acquire_write().unwrap();
        assert!(guard.is_write_locked());
        assert!(!guard.try_acquire_read());
        assert!(!guard.try_acquire_write());
        assert_eq!(guard.reader_count(), 0);

        guard.release_write();
        assert!(guard.try_acquire_read());
        guard.release_read();
    }

    #[test]
    fn test_bounded_read_fails_under_writer() {
        let guard = ConcurrencyGuard::new();
        guard.acquire_write().unwrap();
        let err = guard.acquire_read_bounded(10).unwrap_err();
        assert_eq!(err.retries, 10);
        // The optimistic bump must have been rolled back
        assert_eq!(guard.reader_count(), 0);
        guard.release_write();
    }

    #[test]
    fn test_bounded_write_gives_back_claim_when_readers_stay() {
        let guard = ConcurrencyGuard::new();
        guard.acquire_read().unwrap();
        assert!(guard.acquire_write_bounded(100).is_err());
        assert!(!guard.is_write_locked());
        guard.release_read();
        guard.acquire_write_bounded(100).unwrap();
        guard.release_write();
    }

    #[test]
    fn test_concurrent_readers_never_block() {
        let guard = Arc::new(ConcurrencyGuard::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = Arc::clone(&guard);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        guard.acquire_read_bounded(1_000_000).unwrap();
                        guard.release_read();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(guard.reader_count(), 0);
    }

    #[test]
    fn test_mutual_exclusion_under_contention() {
        let guard = Arc::new(ConcurrencyGuard::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let guard = Arc::clone(&guard);
                let inside = Arc::clone(&inside);
                thread::spawn(move || {
                    for _ in 0..500 {
                        guard.acquire_write().unwrap();
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        assert_eq!(guard.reader_count(), 0);
                        inside.fetch_sub(1, Ordering::SeqCst);
                        guard.release_write();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(!guard.is_write_locked());
    }
}
