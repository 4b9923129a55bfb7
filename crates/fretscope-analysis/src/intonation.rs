//! Two-note intonation check: open string versus the twelfth fret.

use crate::analyzer::Analyzer;
use crate::pitch::PitchDetector;
use crate::result::{IntonationResult, IntonationState, ResultSlot};
use crate::strings::cents_between;
use fretscope_core::AnalysisConfig;
use std::any::Any;
use std::time::{Duration, Instant, SystemTime};

/// Pitches below this confidence are not accumulated.
const CONFIDENCE_MIN: f32 = 0.7;
/// Rolling accumulator length.
const ACCUMULATOR_CAPACITY: usize = 100;
/// Minimum accumulated pitches before stability can be claimed.
const MIN_STABLE_SAMPLES: usize = 10;
/// Standard-deviation ceiling for a stable pitch, Hz.
const STABILITY_STDEV: f32 = 2.0;
/// Dwell required in a state before advancing.
const STABLE_DWELL: Duration = Duration::from_millis(500);
/// Relative tolerance for recognizing the octave at the twelfth fret.
const OCTAVE_TOLERANCE: f32 = 0.10;
/// In-tune window in cents.
const IN_TUNE_TOLERANCE: f32 = 5.0;

/// Walks the player through an open-string / twelfth-fret comparison and
/// reports the deviation of the fretted note from the expected octave.
///
/// States advance strictly `Idle → OpenString → WaitForTwelfthFret →
/// FrettedString → Complete`; only [`Analyzer::reset`] goes backward.
pub struct IntonationAnalyzer {
    config: Option<AnalysisConfig>,
    pitch_detector: Option<PitchDetector>,

    state: IntonationState,
    accumulator: [f32; ACCUMULATOR_CAPACITY],
    accumulated: usize,
    state_started: Instant,

    open_string_freq: f32,
    fretted_string_freq: f32,
    cent_deviation: f32,
    is_in_tune: bool,

    slot: ResultSlot<IntonationResult>,
}

impl Default for IntonationAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl IntonationAnalyzer {
    pub fn new() -> Self {
        Self {
            config: None,
            pitch_detector: None,
            state: IntonationState::Idle,
            accumulator: [0.0; ACCUMULATOR_CAPACITY],
            accumulated: 0,
            state_started: Instant::now(),
            open_string_freq: 0.0,
            fretted_string_freq: 0.0,
            cent_deviation: 0.0,
            is_in_tune: false,
            slot: ResultSlot::default(),
        }
    }

    /// Handle for reading published results from any thread.
    pub fn results(&self) -> ResultSlot<IntonationResult> {
        self.slot.clone()
    }

    fn accumulate(&mut self, frequency: f32) {
        if self.accumulated < ACCUMULATOR_CAPACITY {
            self.accumulator[self.accumulated] = frequency;
            self.accumulated += 1;
        } else {
            self.accumulator.copy_within(1.., 0);
            self.accumulator[ACCUMULATOR_CAPACITY - 1] = frequency;
        }
    }

    /// Median of the accumulated pitches (mean of the middle two when the
    /// count is even).
    fn stable_pitch(&self) -> f32 {
        if self.accumulated == 0 {
            return 0.0;
        }

        let mut sorted = self.accumulator[..self.accumulated].to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        }
    }

    fn has_stable_pitch(&self) -> bool {
        self.accumulated >= MIN_STABLE_SAMPLES && self.standard_deviation() < STABILITY_STDEV
    }

    fn standard_deviation(&self) -> f32 {
        if self.accumulated == 0 {
            return 0.0;
        }

        let count = self.accumulated as f32;
        let mean = self.accumulator[..self.accumulated].iter().sum::<f32>() / count;
        let variance = self.accumulator[..self.accumulated]
            .iter()
            .map(|f| (f - mean) * (f - mean))
            .sum::<f32>()
            / count;

        variance.sqrt()
    }

    fn dwell_elapsed(&self) -> bool {
        self.state_started.elapsed() >= STABLE_DWELL
    }

    fn enter(&mut self, state: IntonationState) {
        tracing::debug!(?state, "intonation state change");
        self.state = state;
        self.accumulated = 0;
        self.state_started = Instant::now();
    }

    fn advance_state_machine(&mut self) {
        match self.state {
            IntonationState::Idle => {
                if self.has_stable_pitch() {
                    self.open_string_freq = self.stable_pitch();
                    self.enter(IntonationState::OpenString);
                }
            }

            IntonationState::OpenString => {
                if self.has_stable_pitch() && self.dwell_elapsed() {
                    self.enter(IntonationState::WaitForTwelfthFret);
                }
            }

            IntonationState::WaitForTwelfthFret => {
                if self.has_stable_pitch() {
                    let pitch = self.stable_pitch();
                    let expected = self.open_string_freq * 2.0;

                    if expected > 0.0 && ((pitch - expected) / expected).abs() < OCTAVE_TOLERANCE {
                        self.fretted_string_freq = pitch;
                        self.enter(IntonationState::FrettedString);
                    }
                }
            }

            IntonationState::FrettedString => {
                if self.has_stable_pitch() && self.dwell_elapsed() {
                    self.state = IntonationState::Complete;
                    self.compute_deviation();
                    tracing::debug!(
                        cent_deviation = self.cent_deviation,
                        in_tune = self.is_in_tune,
                        "intonation measurement complete"
                    );
                }
            }

            // Terminal until reset.
            IntonationState::Complete => {}
        }
    }

    fn compute_deviation(&mut self) {
        let expected = self.open_string_freq * 2.0;

        if self.fretted_string_freq > 0.0 && expected > 0.0 {
            self.cent_deviation = cents_between(self.fretted_string_freq, expected);
            self.is_in_tune = self.cent_deviation.abs() <= IN_TUNE_TOLERANCE;
        } else {
            self.cent_deviation = 0.0;
            self.is_in_tune = false;
        }
    }

    fn publish(&self) {
        self.slot.publish(IntonationResult {
            timestamp: SystemTime::now(),
            is_valid: true,
            error_message: String::new(),
            state: self.state,
            open_string_frequency: self.open_string_freq,
            fretted_string_frequency: self.fretted_string_freq,
            expected_fretted_frequency: self.open_string_freq * 2.0,
            cent_deviation: self.cent_deviation,
            is_in_tune: self.is_in_tune,
        });
    }
}

impl Analyzer for IntonationAnalyzer {
    fn configure(&mut self, config: &AnalysisConfig) {
        if let Err(err) = config.validate() {
            tracing::warn!(%err, "refusing to configure intonation analyzer");
            return;
        }

        self.config = Some(*config);
        self.pitch_detector = Some(PitchDetector::new(config.sample_rate));
    }

    fn process_frame(&mut self, frame: &[f32]) {
        if self.config.is_none() {
            return;
        }
        let detector = match self.pitch_detector.as_mut() {
            Some(d) => d,
            None => return,
        };

        if let Some(pitch) = detector.detect(frame) {
            if pitch.confidence >= CONFIDENCE_MIN {
                self.accumulate(pitch.frequency);
                self.advance_state_machine();
            }
        }

        self.publish();
    }

    fn reset(&mut self) {
        self.state = IntonationState::Idle;
        self.accumulated = 0;
        self.accumulator.fill(0.0);
        self.open_string_freq = 0.0;
        self.fretted_string_freq = 0.0;
        self.cent_deviation = 0.0;
        self.is_in_tune = false;
        self.state_started = Instant::now();

        self.publish();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const SAMPLE_RATE: f32 = 48_000.0;
    const FRAME_SIZE: usize = 2048;

    fn configured() -> IntonationAnalyzer {
        let mut analyzer = IntonationAnalyzer::new();
        analyzer.configure(&AnalysisConfig::new(SAMPLE_RATE, FRAME_SIZE));
        analyzer
    }

    fn sine_frame(frequency: f32) -> Vec<f32> {
        (0..FRAME_SIZE)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE;
                (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.8
            })
            .collect()
    }

    fn feed(analyzer: &mut IntonationAnalyzer, frequency: f32, frames: usize, gap: Duration) {
        let frame = sine_frame(frequency);
        for _ in 0..frames {
            analyzer.process_frame(&frame);
            if !gap.is_zero() {
                thread::sleep(gap);
            }
        }
    }

    /// Feeds `frequency` until the analyzer reaches `target`, up to
    /// `max_frames`. Returns whether the target state was reached.
    fn feed_until(
        analyzer: &mut IntonationAnalyzer,
        frequency: f32,
        max_frames: usize,
        gap: Duration,
        target: IntonationState,
    ) -> bool {
        let frame = sine_frame(frequency);
        for _ in 0..max_frames {
            analyzer.process_frame(&frame);
            if analyzer.results().latest().state == target {
                return true;
            }
            thread::sleep(gap);
        }
        false
    }

    #[test]
    fn test_open_string_lock() {
        let mut analyzer = configured();
        // ~600 ms of stable low E at 5 ms per frame.
        feed(&mut analyzer, 82.41, 15, Duration::from_millis(5));

        let result = analyzer.results().latest();
        assert!(result.is_valid);
        assert!(
            matches!(
                result.state,
                IntonationState::OpenString | IntonationState::WaitForTwelfthFret
            ),
            "unexpected state {:?}",
            result.state
        );
        assert!(
            (result.open_string_frequency - 82.41).abs() < 2.0,
            "open string locked at {} Hz",
            result.open_string_frequency
        );
    }

    #[test]
    fn test_full_calibration_reaches_complete() {
        let mut analyzer = configured();

        // Open low E until the dwell in OpenString elapses.
        assert!(
            feed_until(
                &mut analyzer,
                82.41,
                100,
                Duration::from_millis(20),
                IntonationState::WaitForTwelfthFret,
            ),
            "never reached WaitForTwelfthFret"
        );

        // Slightly sharp octave at the twelfth fret. Generous frame budget:
        // stray open-string pitches accumulated around the transition take up
        // to a full accumulator cycle to shift out.
        assert!(
            feed_until(
                &mut analyzer,
                165.2,
                400,
                Duration::from_millis(5),
                IntonationState::FrettedString,
            ),
            "never recognized the fretted octave"
        );
        assert!(
            feed_until(
                &mut analyzer,
                165.2,
                400,
                Duration::from_millis(5),
                IntonationState::Complete,
            ),
            "never completed the measurement"
        );

        let result = analyzer.results().latest();
        assert_eq!(result.state, IntonationState::Complete);
        assert!((result.fretted_string_frequency - 165.2).abs() < 2.0);
        assert!(
            (result.expected_fretted_frequency - 2.0 * result.open_string_frequency).abs() < 1e-3
        );
        // 165.2 vs ~164.82 is a few cents sharp.
        assert!(result.cent_deviation.abs() < 30.0);
    }

    #[test]
    fn test_wrong_octave_does_not_advance() {
        let mut analyzer = configured();

        assert!(feed_until(
            &mut analyzer,
            82.41,
            100,
            Duration::from_millis(20),
            IntonationState::WaitForTwelfthFret,
        ));

        // A fifth above the open string is far outside the octave window, no
        // matter how stable it becomes.
        feed(&mut analyzer, 123.47, 200, Duration::from_millis(2));
        assert_eq!(
            analyzer.results().latest().state,
            IntonationState::WaitForTwelfthFret
        );
    }

    #[test]
    fn test_low_confidence_frames_do_not_accumulate() {
        let mut analyzer = configured();
        let silence = vec![0.0f32; FRAME_SIZE];

        for _ in 0..20 {
            analyzer.process_frame(&silence);
        }

        let result = analyzer.results().latest();
        assert_eq!(result.state, IntonationState::Idle);
        assert_eq!(result.open_string_frequency, 0.0);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut analyzer = configured();
        feed(&mut analyzer, 110.0, 15, Duration::from_millis(5));
        assert_ne!(analyzer.results().latest().state, IntonationState::Idle);

        analyzer.reset();

        let result = analyzer.results().latest();
        assert_eq!(result.state, IntonationState::Idle);
        assert_eq!(result.open_string_frequency, 0.0);
        assert_eq!(result.fretted_string_frequency, 0.0);
        assert_eq!(result.cent_deviation, 0.0);
        assert!(!result.is_in_tune);
    }

    #[test]
    fn test_reset_twice_equals_reset_once() {
        let mut analyzer = configured();
        feed(&mut analyzer, 110.0, 15, Duration::from_millis(5));

        analyzer.reset();
        let first = analyzer.results().latest();
        analyzer.reset();
        let second = analyzer.results().latest();

        assert_eq!(first.state, second.state);
        assert_eq!(first.open_string_frequency, second.open_string_frequency);
        assert_eq!(first.is_in_tune, second.is_in_tune);
    }

    #[test]
    fn test_accumulator_shifts_at_capacity() {
        let mut analyzer = configured();
        for i in 0..(ACCUMULATOR_CAPACITY + 50) {
            analyzer.accumulate(i as f32);
        }

        assert_eq!(analyzer.accumulated, ACCUMULATOR_CAPACITY);
        // Oldest values were shifted out; the newest is at the tail.
        assert_eq!(analyzer.accumulator[0], 50.0);
        assert_eq!(
            analyzer.accumulator[ACCUMULATOR_CAPACITY - 1],
            (ACCUMULATOR_CAPACITY + 49) as f32
        );
    }

    #[test]
    fn test_stable_pitch_is_median() {
        let mut analyzer = configured();
        for f in [100.0, 101.0, 99.0, 100.5, 100.2] {
            analyzer.accumulate(f);
        }
        assert!((analyzer.stable_pitch() - 100.2).abs() < 1e-6);

        analyzer.accumulate(100.4);
        // Even count: mean of the middle two (100.2, 100.4).
        assert!((analyzer.stable_pitch() - 100.3).abs() < 1e-4);
    }
}
