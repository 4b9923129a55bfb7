//! String-health rating from harmonic decay, brightness, and inharmonicity.

use crate::analyzer::Analyzer;
use crate::fret_buzz::harmonic_peak_deviation;
use crate::pitch::PitchDetector;
use crate::result::{ResultSlot, StringHealthResult};
use crate::spectrum::SpectrumAnalyzer;
use crate::strings::{self, StringInfo};
use fretscope_core::AnalysisConfig;
use std::any::Any;
use std::collections::VecDeque;
use std::time::{Instant, SystemTime};

const FFT_SIZE: usize = 2048;
const NUM_HARMONICS: usize = 10;
/// Frames of harmonic history kept for the decay fit.
const DECAY_HISTORY_LEN: usize = 50;
/// Minimum history before a decay estimate is attempted.
const DECAY_MIN_FRAMES: usize = 10;
/// Useful decay range mapped onto the decay sub-score, dB/s.
const MIN_DECAY_RATE: f32 = -50.0;
const MAX_DECAY_RATE: f32 = -5.0;
/// Centroid at or above this maps to a zero brightness sub-score, Hz.
const CENTROID_CEILING: f32 = 5000.0;
const PITCH_CONFIDENCE_MIN: f32 = 0.5;
const STRING_CONFIDENCE_MIN: f32 = 0.85;
/// Nepers/s to dB/s (20 / ln 10).
const NEPERS_TO_DB: f32 = 8.686;
const EPSILON: f32 = 1e-6;

/// Rates the brightness and harmonic integrity of a sustained note.
///
/// Keeps a rolling history of per-frame harmonic magnitudes and fits an
/// exponential decay to their mean by ordinary least squares on the log
/// domain.
pub struct StringHealthAnalyzer {
    config: Option<AnalysisConfig>,
    pitch_detector: Option<PitchDetector>,
    spectrum: Option<SpectrumAnalyzer>,

    harmonic_history: VecDeque<[f32; NUM_HARMONICS]>,
    timestamps: VecDeque<Instant>,

    fundamental: f32,
    frames_analyzed: usize,

    health_score: f32,
    decay_rate: f32,
    spectral_centroid: f32,
    inharmonicity: f32,
    string: StringInfo,

    slot: ResultSlot<StringHealthResult>,
}

impl Default for StringHealthAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl StringHealthAnalyzer {
    pub fn new() -> Self {
        Self {
            config: None,
            pitch_detector: None,
            spectrum: None,
            harmonic_history: VecDeque::with_capacity(DECAY_HISTORY_LEN),
            timestamps: VecDeque::with_capacity(DECAY_HISTORY_LEN),
            fundamental: 0.0,
            frames_analyzed: 0,
            health_score: 0.0,
            decay_rate: 0.0,
            spectral_centroid: 0.0,
            inharmonicity: 0.0,
            string: StringInfo::default(),
            slot: ResultSlot::default(),
        }
    }

    /// Handle for reading published results from any thread.
    pub fn results(&self) -> ResultSlot<StringHealthResult> {
        self.slot.clone()
    }

    /// Samples the spectrum at the first ten harmonics of `fundamental` and
    /// appends the vector to the rolling history.
    fn track_harmonics(&mut self, fundamental: f32, spectrum: &SpectrumAnalyzer) {
        let mut magnitudes = [0.0f32; NUM_HARMONICS];
        for (n, magnitude) in magnitudes.iter_mut().enumerate() {
            let harmonic_freq = fundamental * (n + 1) as f32;
            *magnitude = spectrum.magnitude_at_frequency(harmonic_freq);
        }

        self.harmonic_history.push_back(magnitudes);
        self.timestamps.push_back(Instant::now());

        if self.harmonic_history.len() > DECAY_HISTORY_LEN {
            self.harmonic_history.pop_front();
            self.timestamps.pop_front();
        }
    }

    fn analyze_decay(&self) -> f32 {
        if self.harmonic_history.len() < DECAY_MIN_FRAMES {
            return 0.0;
        }
        self.fit_exponential_decay()
    }

    /// OLS slope of ln(mean harmonic magnitude) over elapsed seconds, scaled
    /// to dB/s. Entries whose mean magnitude has fallen to the noise floor
    /// are excluded from the regression.
    fn fit_exponential_decay(&self) -> f32 {
        let first_timestamp = match self.timestamps.front() {
            Some(&t) => t,
            None => return 0.0,
        };

        let mut log_means = Vec::with_capacity(self.harmonic_history.len());
        let mut times = Vec::with_capacity(self.harmonic_history.len());

        for (magnitudes, &timestamp) in self.harmonic_history.iter().zip(self.timestamps.iter()) {
            let mean = magnitudes.iter().sum::<f32>() / NUM_HARMONICS as f32;
            if mean > EPSILON {
                log_means.push(mean.ln());
                times.push((timestamp - first_timestamp).as_secs_f32());
            }
        }

        if log_means.len() < 2 {
            return 0.0;
        }

        let count = times.len() as f32;
        let mean_time = times.iter().sum::<f32>() / count;
        let mean_log = log_means.iter().sum::<f32>() / count;

        let mut numerator = 0.0f32;
        let mut denominator = 0.0f32;
        for (&t, &l) in times.iter().zip(log_means.iter()) {
            numerator += (t - mean_time) * (l - mean_log);
            denominator += (t - mean_time) * (t - mean_time);
        }

        if denominator < EPSILON {
            return 0.0;
        }

        (numerator / denominator) * NEPERS_TO_DB
    }

    /// Maps the useful decay range (−50 … −5 dB/s) onto `[0, 1]`; slower
    /// decay (less negative) scores higher.
    fn decay_score(&self) -> f32 {
        ((self.decay_rate - MIN_DECAY_RATE) / (MAX_DECAY_RATE - MIN_DECAY_RATE)).clamp(0.0, 1.0)
    }

    /// Dimmer spectra score higher.
    /// TODO: confirm the direction with product — this inverts the usual
    /// brightness-is-healthy heuristic.
    fn spectral_score(&self) -> f32 {
        (1.0 - self.spectral_centroid / CENTROID_CEILING).clamp(0.0, 1.0)
    }

    fn compute_health_score(&mut self) {
        let inharmonicity_score = 1.0 - self.inharmonicity;

        self.health_score = (0.3 * self.decay_score()
            + 0.3 * self.spectral_score()
            + 0.4 * inharmonicity_score)
            .clamp(0.0, 1.0);
    }

    fn publish(&self) {
        self.slot.publish(StringHealthResult {
            timestamp: SystemTime::now(),
            is_valid: true,
            error_message: String::new(),
            health_score: self.health_score,
            decay_rate: self.decay_rate,
            spectral_centroid: self.spectral_centroid,
            inharmonicity: self.inharmonicity,
            fundamental_frequency: self.fundamental,
            string: self.string,
        });
    }
}

impl Analyzer for StringHealthAnalyzer {
    fn configure(&mut self, config: &AnalysisConfig) {
        if let Err(err) = config.validate() {
            tracing::warn!(%err, "refusing to configure string-health analyzer");
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
        let (mut spectrum, detector) = match (self.spectrum.take(), self.pitch_detector.as_mut()) {
            (Some(s), Some(d)) => (s, d),
            _ => return,
        };

        spectrum.compute(frame);

        if let Some(pitch) = detector.detect(frame) {
            if pitch.confidence > PITCH_CONFIDENCE_MIN {
                self.fundamental = pitch.frequency;
                self.track_harmonics(pitch.frequency, &spectrum);

                if pitch.confidence > STRING_CONFIDENCE_MIN && self.frames_analyzed > 3 {
                    self.string = strings::classify(pitch.frequency);
                }
            }
        }

        self.decay_rate = self.analyze_decay();
        self.spectral_centroid = spectrum.centroid_hz();
        self.inharmonicity = if self.fundamental > 0.0 {
            harmonic_peak_deviation(&spectrum, self.fundamental, config.sample_rate, 3)
        } else {
            0.0
        };

        self.compute_health_score();

        self.spectrum = Some(spectrum);
        self.publish();
        self.frames_analyzed += 1;
    }

    fn reset(&mut self) {
        self.harmonic_history.clear();
        self.timestamps.clear();
        self.fundamental = 0.0;
        self.frames_analyzed = 0;
        self.health_score = 0.0;
        self.decay_rate = 0.0;
        self.spectral_centroid = 0.0;
        self.inharmonicity = 0.0;
        self.string = StringInfo::default();

        self.publish();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
