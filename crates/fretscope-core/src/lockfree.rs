//! Lock-free cells shared across the capture, worker, and reader threads.
//!
//! Both cells are cache-line aligned so the capture callback's stores never
//! share a line with unrelated state.

use atomic_float::AtomicF32;
use std::sync::atomic::{AtomicBool, Ordering};

/// Engine run state: one controller starts and stops it, any thread observes.
#[derive(Debug, Default)]
#[repr(align(64))]
pub struct RunFlag {
    running: AtomicBool,
}

impl RunFlag {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
        }
    }

    /// Attempts the idle→running transition. Returns `false` when the flag
    /// was already raised, leaving it raised.
    #[inline]
    pub fn begin(&self) -> bool {
        !self.running.swap(true, Ordering::AcqRel)
    }

    /// Returns to idle. Idempotent.
    #[inline]
    pub fn end(&self) {
        self.running.store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Input level published by the capture callback and polled by meters.
///
/// Stores are relaxed: a level readout carries no ordering obligations, and
/// the capture context must pay the minimum for it.
#[derive(Debug, Default)]
#[repr(align(64))]
pub struct LevelMeter {
    rms: AtomicF32,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self {
            rms: AtomicF32::new(0.0),
        }
    }

    /// Publishes the RMS of the latest captured block. Capture side only.
    #[inline]
    pub fn update(&self, rms: f32) {
        self.rms.store(rms, Ordering::Relaxed);
    }

    /// The most recently published level.
    #[inline]
    pub fn level(&self) -> f32 {
        self.rms.load(Ordering::Relaxed)
    }
}
