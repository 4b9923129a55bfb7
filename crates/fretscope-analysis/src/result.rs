//! Analysis result types and the lock-free publication slot.

use crate::strings::StringInfo;
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::SystemTime;

/// Single-cell publication slot holding the most recent result.
///
/// The analysis worker is the sole publisher; any number of readers may hold
/// clones of the slot and load consistent snapshots at their own pace. An
/// overwrite drops the older value once the last reader releases it.
#[derive(Debug)]
pub struct ResultSlot<T> {
    inner: Arc<ArcSwap<T>>,
}

impl<T> Clone for ResultSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default> Default for ResultSlot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> ResultSlot<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// Replaces the published value. Worker side only.
    #[inline]
    pub fn publish(&self, value: T) {
        self.inner.store(Arc::new(value));
    }

    /// Loads the latest complete snapshot.
    #[inline]
    pub fn latest(&self) -> Arc<T> {
        self.inner.load_full()
    }
}

/// Fret-buzz likelihood for the most recent frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FretBuzzResult {
    pub timestamp: SystemTime,
    pub is_valid: bool,
    pub error_message: String,

    /// Composite buzz likelihood in `[0, 1]`.
    pub buzz_score: f32,
    /// Whether this frame triggered the onset detector.
    pub onset_detected: bool,
    /// Attack-time / zero-crossing composite in `[0, 1]`.
    pub transient_score: f32,
    /// 4–8 kHz energy relative to the 80 Hz–12 kHz band, in `[0, 1]`.
    pub high_freq_energy_score: f32,
    /// Mean harmonic-peak deviation in `[0, 1]`.
    pub inharmonicity_score: f32,
    /// String classification of the last confidently detected fundamental.
    pub string: StringInfo,
}

impl Default for FretBuzzResult {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::UNIX_EPOCH,
            is_valid: false,
            error_message: String::new(),
            buzz_score: 0.0,
            onset_detected: false,
            transient_score: 0.0,
            high_freq_energy_score: 0.0,
            inharmonicity_score: 0.0,
            string: StringInfo::default(),
        }
    }
}

/// Phases of the two-note intonation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntonationState {
    /// Waiting for any stable pitch.
    #[default]
    Idle,
    /// Holding the open string.
    OpenString,
    /// Waiting for the player to fret the twelfth position.
    WaitForTwelfthFret,
    /// Holding the fretted note.
    FrettedString,
    /// Measurement finished; terminal until reset.
    Complete,
}

/// Progress and outcome of the intonation calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct IntonationResult {
    pub timestamp: SystemTime,
    pub is_valid: bool,
    pub error_message: String,

    pub state: IntonationState,
    /// Measured open-string fundamental, 0 until captured.
    pub open_string_frequency: f32,
    /// Measured twelfth-fret fundamental, 0 until captured.
    pub fretted_string_frequency: f32,
    /// Twice the open-string fundamental.
    pub expected_fretted_frequency: f32,
    /// `1200·log2(fretted / expected)`, set on completion.
    pub cent_deviation: f32,
    /// Whether the deviation is within ±5 cents.
    pub is_in_tune: bool,
}

impl Default for IntonationResult {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::UNIX_EPOCH,
            is_valid: false,
            error_message: String::new(),
            state: IntonationState::Idle,
            open_string_frequency: 0.0,
            fretted_string_frequency: 0.0,
            expected_fretted_frequency: 0.0,
            cent_deviation: 0.0,
            is_in_tune: false,
        }
    }
}

/// Brightness and harmonic integrity of a sustained note.
#[derive(Debug, Clone, PartialEq)]
pub struct StringHealthResult {
    pub timestamp: SystemTime,
    pub is_valid: bool,
    pub error_message: String,

    /// Composite health score in `[0, 1]`.
    pub health_score: f32,
    /// Fitted harmonic decay in dB/s (negative while a note rings out).
    pub decay_rate: f32,
    /// Magnitude-weighted mean frequency in Hz.
    pub spectral_centroid: f32,
    /// Mean harmonic-peak deviation in `[0, 1]`.
    pub inharmonicity: f32,
    /// Last confidently detected fundamental in Hz.
    pub fundamental_frequency: f32,
    /// String classification of that fundamental.
    pub string: StringInfo,
}

impl Default for StringHealthResult {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::UNIX_EPOCH,
            is_valid: false,
            error_message: String::new(),
            health_score: 0.0,
            decay_rate: 0.0,
            spectral_centroid: 0.0,
            inharmonicity: 0.0,
            fundamental_frequency: 0.0,
            string: StringInfo::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_publish_and_latest() {
        let slot: ResultSlot<FretBuzzResult> = ResultSlot::default();
        assert!(!slot.latest().is_valid);

        let mut result = FretBuzzResult::default();
        result.is_valid = true;
        result.buzz_score = 0.4;
        slot.publish(result);

        let snapshot = slot.latest();
        assert!(snapshot.is_valid);
        assert_eq!(snapshot.buzz_score, 0.4);
    }

    #[test]
    fn test_slot_clones_share_state() {
        let slot: ResultSlot<IntonationResult> = ResultSlot::default();
        let reader = slot.clone();

        let mut result = IntonationResult::default();
        result.state = IntonationState::OpenString;
        slot.publish(result);

        assert_eq!(reader.latest().state, IntonationState::OpenString);
    }

    #[test]
    fn test_reader_keeps_old_snapshot_across_overwrites() {
        let slot: ResultSlot<StringHealthResult> = ResultSlot::default();

        let mut first = StringHealthResult::default();
        first.health_score = 0.25;
        slot.publish(first);

        let held = slot.latest();

        let mut second = StringHealthResult::default();
        second.health_score = 0.75;
        slot.publish(second);

        assert_eq!(held.health_score, 0.25);
        assert_eq!(slot.latest().health_score, 0.75);
    }
}
