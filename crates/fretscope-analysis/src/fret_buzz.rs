//! Fret-buzz likelihood from transient and spectral anomalies.

use crate::analyzer::Analyzer;
use crate::pitch::PitchDetector;
use crate::result::{FretBuzzResult, ResultSlot};
use crate::spectrum::SpectrumAnalyzer;
use crate::strings::{self, StringInfo};
use fretscope_core::AnalysisConfig;
use std::any::Any;
use std::time::SystemTime;

const FFT_SIZE: usize = 2048;
/// Applied to both the RMS ratio and the spectral flux.
const ONSET_THRESHOLD: f32 = 1.5;
const HIGH_FREQ_MIN: f32 = 4000.0;
const HIGH_FREQ_MAX: f32 = 8000.0;
const TOTAL_BAND_MIN: f32 = 80.0;
const TOTAL_BAND_MAX: f32 = 12_000.0;
const NUM_HARMONICS: usize = 10;
const PITCH_CONFIDENCE_MIN: f32 = 0.5;
const STRING_CONFIDENCE_MIN: f32 = 0.85;
const EPSILON: f32 = 1e-6;

/// Scores each frame for fret buzz: a weighted blend of transient sharpness,
/// high-frequency noise, and harmonic-peak deviation.
pub struct FretBuzzAnalyzer {
    config: Option<AnalysisConfig>,
    pitch_detector: Option<PitchDetector>,
    spectrum: Option<SpectrumAnalyzer>,

    prev_spectrum: Vec<f32>,
    /// `None` until the first frame after construction or reset.
    prev_rms: Option<f32>,

    buzz_score: f32,
    onset_detected: bool,
    transient_score: f32,
    high_freq_energy_score: f32,
    inharmonicity_score: f32,
    string: StringInfo,

    slot: ResultSlot<FretBuzzResult>,
}

impl Default for FretBuzzAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl FretBuzzAnalyzer {
    pub fn new() -> Self {
        Self {
            config: None,
            pitch_detector: None,
            spectrum: None,
            prev_spectrum: vec![0.0; FFT_SIZE / 2],
            prev_rms: None,
            buzz_score: 0.0,
            onset_detected: false,
            transient_score: 0.0,
            high_freq_energy_score: 0.0,
            inharmonicity_score: 0.0,
            string: StringInfo::default(),
            slot: ResultSlot::default(),
        }
    }

    /// Handle for reading published results from any thread.
    pub fn results(&self) -> ResultSlot<FretBuzzResult> {
        self.slot.clone()
    }

    fn detect_onset(&mut self, frame: &[f32], spectrum: &SpectrumAnalyzer) -> bool {
        let rms = rms_energy(frame);
        let flux = self.spectral_flux(spectrum);

        let onset = match self.prev_rms {
            // RMS ratio is undefined on the very first frame.
            None => false,
            Some(prev) => {
                (prev > 0.0 && rms / prev > ONSET_THRESHOLD) || flux > ONSET_THRESHOLD
            }
        };

        self.prev_rms = Some(rms);
        onset
    }

    /// Half-wave rectified flux against the previous frame's spectrum.
    fn spectral_flux(&self, spectrum: &SpectrumAnalyzer) -> f32 {
        let mut flux = 0.0;
        for (bin, &prev) in self.prev_spectrum.iter().enumerate() {
            let diff = spectrum.magnitude_at_bin(bin) - prev;
            if diff > 0.0 {
                flux += diff;
            }
        }
        flux
    }

    fn analyze_transient(&self, frame: &[f32], sample_rate: f32) -> f32 {
        let attack_time = attack_time_seconds(frame, sample_rate);
        let zcr = zero_crossing_rate(frame, sample_rate);

        let attack_score = (1.0 - attack_time / 0.1).clamp(0.0, 1.0);
        let zcr_score = (zcr / 1000.0).clamp(0.0, 1.0);

        (attack_score + zcr_score) / 2.0
    }

    fn analyze_high_frequency_noise(&self, spectrum: &SpectrumAnalyzer) -> f32 {
        let high = spectrum.band_energy(HIGH_FREQ_MIN, HIGH_FREQ_MAX);
        let total = spectrum.band_energy(TOTAL_BAND_MIN, TOTAL_BAND_MAX);

        if total < EPSILON {
            return 0.0;
        }

        (high / total).clamp(0.0, 1.0)
    }

    fn analyze_inharmonicity(
        &mut self,
        frame: &[f32],
        spectrum: &SpectrumAnalyzer,
        sample_rate: f32,
    ) -> f32 {
        let detector = match self.pitch_detector.as_mut() {
            Some(d) => d,
            None => return 0.0,
        };

        let pitch = match detector.detect(frame) {
            Some(p) if p.confidence >= PITCH_CONFIDENCE_MIN => p,
            _ => return 0.0,
        };

        if pitch.confidence > STRING_CONFIDENCE_MIN {
            self.string = strings::classify(pitch.frequency);
        }

        harmonic_peak_deviation(spectrum, pitch.frequency, sample_rate, 2)
    }

    fn publish(&self) {
        self.slot.publish(FretBuzzResult {
            timestamp: SystemTime::now(),
            is_valid: true,
            error_message: String::new(),
            buzz_score: self.buzz_score,
            onset_detected: self.onset_detected,
            transient_score: self.transient_score,
            high_freq_energy_score: self.high_freq_energy_score,
            inharmonicity_score: self.inharmonicity_score,
            string: self.string,
        });
    }
}

impl Analyzer for FretBuzzAnalyzer {
    fn configure(&mut self, config: &AnalysisConfig) {
        if let Err(err) = config.validate() {
            tracing::warn!(%err, "refusing to configure fret-buzz analyzer");
            return;
        }

        self.config = Some(*config);
        self.pitch_detector = Some(PitchDetector::new(config.sample_rate));
        self.spectrum = Some(SpectrumAnalyzer::new(FFT_SIZE, config.sample_rate));
    }

    fn process_frame(&mut self, frame: &[f32]) {
        let config = match self.config {
            Some(c) => c,
            None => return,
        };
        let mut spectrum = match self.spectrum.take() {
            Some(s) => s,
            None => return,
        };

        spectrum.compute(frame);

        // Flux compares against the previous frame, so the onset decision
        // must happen before prev_spectrum is refreshed.
        self.onset_detected = self.detect_onset(frame, &spectrum);
        self.prev_spectrum.copy_from_slice(spectrum.magnitudes());

        self.transient_score = self.analyze_transient(frame, config.sample_rate);
        self.high_freq_energy_score = self.analyze_high_frequency_noise(&spectrum);
        self.inharmonicity_score =
            self.analyze_inharmonicity(frame, &spectrum, config.sample_rate);

        self.buzz_score = (0.3 * self.transient_score
            + 0.4 * self.high_freq_energy_score
            + 0.3 * self.inharmonicity_score)
            .clamp(0.0, 1.0);

        self.spectrum = Some(spectrum);
        self.publish();
    }

    fn reset(&mut self) {
        self.prev_spectrum.fill(0.0);
        self.prev_rms = None;
        self.buzz_score = 0.0;
        self.onset_detected = false;
        self.transient_score = 0.0;
        self.high_freq_energy_score = 0.0;
        self.inharmonicity_score = 0.0;
        self.string = StringInfo::default();

        self.publish();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn rms_energy(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = frame.iter().map(|s| s * s).sum();
    (sum_squares / frame.len() as f32).sqrt()
}

/// Seconds from frame start until the envelope first reaches 90 % of its
/// peak. Near-silent frames (peak below 0.01) report a full second.
fn attack_time_seconds(frame: &[f32], sample_rate: f32) -> f32 {
    let mut peak = 0.0f32;
    for &sample in frame {
        peak = peak.max(sample.abs());
    }

    if peak < 0.01 {
        return 1.0;
    }

    let threshold = peak * 0.9;
    let mut attack_samples = 0;
    for (i, &sample) in frame.iter().enumerate() {
        if sample.abs() >= threshold {
            attack_samples = i;
            break;
        }
    }

    attack_samples as f32 / sample_rate
}

/// Sign changes per second.
fn zero_crossing_rate(frame: &[f32], sample_rate: f32) -> f32 {
    if frame.len() < 2 {
        return 0.0;
    }

    let mut crossings = 0usize;
    for pair in frame.windows(2) {
        if (pair[0] >= 0.0 && pair[1] < 0.0) || (pair[0] < 0.0 && pair[1] >= 0.0) {
            crossings += 1;
        }
    }

    let duration = frame.len() as f32 / sample_rate;
    crossings as f32 / duration
}

/// Mean relative deviation of the strongest bin within `search_radius` bins
/// of each expected harmonic, clamped to `[0, 1]`.
pub(crate) fn harmonic_peak_deviation(
    spectrum: &SpectrumAnalyzer,
    fundamental: f32,
    sample_rate: f32,
    search_radius: i64,
) -> f32 {
    if fundamental <= 0.0 || sample_rate <= 0.0 {
        return 0.0;
    }

    let bin_width = sample_rate / spectrum.fft_size() as f32;
    let num_bins = spectrum.num_bins() as i64;
    let mut total_deviation = 0.0;

    for n in 1..=NUM_HARMONICS {
        let expected_freq = fundamental * n as f32;
        let expected_bin = (expected_freq / bin_width).round() as i64;

        let mut max_magnitude = 0.0f32;
        let mut peak_bin = expected_bin;

        for offset in -search_radius..=search_radius {
            let bin = expected_bin + offset;
            if bin < 0 || bin >= num_bins {
                continue;
            }
            let magnitude = spectrum.magnitude_at_bin(bin as usize);
            if magnitude > max_magnitude {
                max_magnitude = magnitude;
                peak_bin = bin;
            }
        }

        let actual_freq = peak_bin as f32 * bin_width;
        total_deviation += (actual_freq - expected_freq).abs() / expected_freq;
    }

    (total_deviation / NUM_HARMONICS as f32).clamp(0.0, 1.0)
}
