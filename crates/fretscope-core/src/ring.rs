//! Single-producer, single-consumer lock-free ring buffer.
//!
//! Bridges the hard real-time audio callback (producer) to the best-effort
//! analysis worker (consumer). All storage is allocated once at construction;
//! `write` and `read` never block and never allocate.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Bounded SPSC FIFO over `Copy` elements.
///
/// The backing array holds `capacity + 1` slots; the spare slot distinguishes
/// empty (`write == read`) from full without a separate count. The producer is
/// the sole writer of the write index, the consumer the sole writer of the
/// read index. Each side publishes its index with a release store and observes
/// the other side's with an acquire load; that pair is the only cross-thread
/// synchronization.
#[derive(Debug)]
pub struct RingBuffer<T> {
    storage: Box<[UnsafeCell<T>]>,
    write_index: AtomicUsize,
    read_index: AtomicUsize,
}

/// Ring of mono audio samples, the instantiation used throughout fretscope.
pub type SampleRing = RingBuffer<f32>;

// One producer and one consumer may touch the storage concurrently, but each
// slot is owned by exactly one side at a time: slots in [read, write) belong
// to the consumer, the rest to the producer. The index handoff (release store
// / acquire load) transfers ownership.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T: Copy + Default> RingBuffer<T> {
    /// Creates a ring that can hold up to `capacity` elements.
    ///
    /// Allocates `capacity + 1` slots up front; no further allocation happens
    /// for the lifetime of the ring.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be at least 1");

        let storage: Box<[UnsafeCell<T>]> = (0..capacity + 1)
            .map(|_| UnsafeCell::new(T::default()))
            .collect();

        Self {
            storage,
            write_index: AtomicUsize::new(0),
            read_index: AtomicUsize::new(0),
        }
    }

    /// Maximum number of elements the ring can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len() - 1
    }

    /// Writes all of `data`, or nothing.
    ///
    /// Returns `false` when fewer than `data.len()` slots are free; that is
    /// the backpressure signal, not an error. An empty `data` is a successful
    /// no-op. Producer side only.
    #[inline]
    pub fn write(&self, data: &[T]) -> bool {
        if data.is_empty() {
            return true;
        }

        let slots = self.storage.len();
        let write_idx = self.write_index.load(Ordering::Relaxed);
        let read_idx = self.read_index.load(Ordering::Acquire);

        if Self::writable(write_idx, read_idx, slots) < data.len() {
            return false;
        }

        for (i, &value) in data.iter().enumerate() {
            let slot = (write_idx + i) % slots;
            // Slot is producer-owned until the release store below.
            unsafe { *self.storage[slot].get() = value };
        }

        self.write_index
            .store((write_idx + data.len()) % slots, Ordering::Release);

        true
    }

    /// Reads up to `output.len()` elements in FIFO order.
    ///
    /// Returns the number of elements actually read; fewer than requested is
    /// normal when the ring is running dry. Consumer side only.
    #[inline]
    pub fn read(&self, output: &mut [T]) -> usize {
        if output.is_empty() {
            return 0;
        }

        let slots = self.storage.len();
        let read_idx = self.read_index.load(Ordering::Relaxed);
        let write_idx = self.write_index.load(Ordering::Acquire);

        let available = Self::readable(read_idx, write_idx, slots);
        let to_read = available.min(output.len());

        for (i, out) in output.iter_mut().take(to_read).enumerate() {
            let slot = (read_idx + i) % slots;
            // Slot is consumer-owned until the release store below.
            *out = unsafe { *self.storage[slot].get() };
        }

        self.read_index
            .store((read_idx + to_read) % slots, Ordering::Release);

        to_read
    }

    /// Number of elements ready to read.
    ///
    /// A lower bound: a concurrent producer may have written more by the time
    /// the caller acts on the value.
    #[inline]
    pub fn available_read(&self) -> usize {
        let read_idx = self.read_index.load(Ordering::Relaxed);
        let write_idx = self.write_index.load(Ordering::Acquire);
        Self::readable(read_idx, write_idx, self.storage.len())
    }

    /// Number of free slots.
    ///
    /// A lower bound: a concurrent consumer may have freed more by the time
    /// the caller acts on the value.
    #[inline]
    pub fn available_write(&self) -> usize {
        let write_idx = self.write_index.load(Ordering::Relaxed);
        let read_idx = self.read_index.load(Ordering::Acquire);
        Self::writable(write_idx, read_idx, self.storage.len())
    }

    #[inline]
    fn readable(read_idx: usize, write_idx: usize, slots: usize) -> usize {
        if write_idx >= read_idx {
            write_idx - read_idx
        } else {
            slots - read_idx + write_idx
        }
    }

    #[inline]
    fn writable(write_idx: usize, read_idx: usize, slots: usize) -> usize {
        slots - 1 - Self::readable(read_idx, write_idx, slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_write_then_read_in_order() {
        let ring = SampleRing::new(1024);
        assert!(ring.write(&[1.0, 2.0, 3.0, 4.0, 5.0]));

        let mut out = [0.0f32; 5];
        assert_eq!(ring.read(&mut out), 5);
        assert_eq!(out, [1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(ring.available_read(), 0);
    }

    #[test]
    fn test_write_full_then_reject() {
        let ring = SampleRing::new(1024);
        let block = vec![1.0f32; 1024];
        assert!(ring.write(&block));
        assert!(!ring.write(&[1.0]));
        assert_eq!(ring.available_read(), 1024);
    }

    #[test]
    fn test_oversized_write_is_all_or_nothing() {
        let ring = SampleRing::new(8);
        let block = vec![0.5f32; 9];
        assert!(!ring.write(&block));
        assert_eq!(ring.available_read(), 0);
    }

    #[test]
    fn test_empty_write_and_read() {
        let ring = SampleRing::new(16);
        assert!(ring.write(&[]));
        assert_eq!(ring.available_read(), 0);

        let mut empty: [f32; 0] = [];
        assert_eq!(ring.read(&mut empty), 0);
    }

    #[test]
    fn test_partial_read_when_running_dry() {
        let ring = SampleRing::new(16);
        assert!(ring.write(&[1.0, 2.0, 3.0]));

        let mut out = [0.0f32; 8];
        assert_eq!(ring.read(&mut out), 3);
        assert_eq!(&out[..3], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_wraparound_preserves_order() {
        let ring = SampleRing::new(4);
        let mut out = [0.0f32; 4];

        // Cycle enough times to wrap the indices repeatedly.
        for round in 0..10 {
            let base = round as f32 * 3.0;
            assert!(ring.write(&[base, base + 1.0, base + 2.0]));
            assert_eq!(ring.read(&mut out[..3]), 3);
            assert_eq!(&out[..3], &[base, base + 1.0, base + 2.0]);
        }
    }

    #[test]
    fn test_read_write_availability_invariant() {
        let ring = SampleRing::new(100);
        assert_eq!(ring.available_read() + ring.available_write(), 100);

        ring.write(&[0.0; 37]);
        assert_eq!(ring.available_read() + ring.available_write(), 100);

        let mut out = [0.0f32; 17];
        ring.read(&mut out);
        assert_eq!(ring.available_read() + ring.available_write(), 100);
    }

    #[test]
    fn test_spsc_stress_no_gaps_no_duplicates() {
        let ring = Arc::new(RingBuffer::<u32>::new(64));
        let total = 10_000u32;

        let producer = {
            let ring = Arc::clone(&ring);
            std::thread::spawn(move || {
                for value in 0..total {
                    while !ring.write(&[value]) {
                        std::hint::spin_loop();
                    }
                }
            })
        };

        let consumer = {
            let ring = Arc::clone(&ring);
            std::thread::spawn(move || {
                let mut seen = Vec::with_capacity(total as usize);
                let mut chunk = [0u32; 16];
                while seen.len() < total as usize {
                    let n = ring.read(&mut chunk);
                    seen.extend_from_slice(&chunk[..n]);
                    if n == 0 {
                        std::hint::spin_loop();
                    }
                }
                seen
            })
        };

        producer.join().unwrap();
        let seen = consumer.join().unwrap();

        assert_eq!(seen.len(), total as usize);
        for (expected, &actual) in seen.iter().enumerate() {
            assert_eq!(actual, expected as u32, "gap or reorder at {}", expected);
        }
    }
}
