//! Decode concurrency control.
//!
//! Tile decoding is CPU and memory bound, and a single region read can
//! fan out over dozens of tiles. Every open slide carries a
//! [`DecoderPool`] that caps how many tiles are being decoded at once;
//! painters check out a permit before decoding and the permit returns to
//! the pool when dropped, on success and failure alike.
//!
//! The pool is a plain semaphore-backed capacity limiter. It does not
//! order waiters beyond the semaphore's own FIFO fairness.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Smallest default pool capacity, for hosts that report few cores.
const MIN_DECODER_CAPACITY: usize = 4;

/// Default decode concurrency for the current host.
pub(crate) fn default_decoder_capacity() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(MIN_DECODER_CAPACITY)
        .max(MIN_DECODER_CAPACITY)
}

// =============================================================================
// Decoder Pool
// =============================================================================

/// Semaphore-backed pool bounding concurrent tile decodes for one slide.
#[derive(Debug)]
pub struct DecoderPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl DecoderPool {
    /// Creates a pool with the given capacity.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Creates a pool sized for the current host.
    pub fn with_defaults() -> Self {
        Self::new(default_decoder_capacity())
    }

    /// Acquires a decode permit, waiting if the pool is at capacity.
    pub async fn acquire(&self) -> DecoderPermit<'_> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore closed unexpectedly");

        let current = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.update_peak(current);

        DecoderPermit {
            _permit: permit,
            in_flight: &self.in_flight,
        }
    }

    /// Updates the peak counter if current exceeds it.
    fn update_peak(&self, current: usize) {
        let mut peak = self.peak_in_flight.load(Ordering::Relaxed);
        while current > peak {
            match self.peak_in_flight.compare_exchange_weak(
                peak,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(p) => peak = p,
            }
        }
    }

    /// Returns the total capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of available permits.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Returns the current number of in-flight decodes.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Returns the peak number of concurrent decodes observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Decoder Permit
// =============================================================================

/// A checked-out slot in a [`DecoderPool`].
///
/// While the permit is held it counts against the pool's capacity. It is
/// released automatically when dropped.
pub struct DecoderPermit<'a> {
    _permit: OwnedSemaphorePermit,
    in_flight: &'a AtomicUsize,
}

impl Drop for DecoderPermit<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for DecoderPermit<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderPermit").finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
