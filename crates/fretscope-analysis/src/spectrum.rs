//! Windowed magnitude-spectrum computation shared by the analyzers.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Denominator floor for magnitude ratios.
const EPSILON: f32 = 1e-6;

/// Reusable magnitude-spectrum processor over a fixed FFT size.
///
/// Frames are Hann-windowed before transforming; all magnitude lookups below
/// therefore assume that fixed window. Frames shorter than the FFT size are
/// zero-padded, longer frames are truncated.
pub struct SpectrumAnalyzer {
    fft_size: usize,
    sample_rate: f32,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
}

impl SpectrumAnalyzer {
    pub fn new(fft_size: usize, sample_rate: f32) -> Self {
        let fft_size = fft_size.next_power_of_two();

        Self {
            fft_size,
            sample_rate,
            fft: FftPlanner::new().plan_fft_forward(fft_size),
            window: hann_window(fft_size),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            magnitudes: vec![0.0; fft_size / 2],
        }
    }

    /// Recomputes the magnitude spectrum from `frame`.
    pub fn compute(&mut self, frame: &[f32]) {
        let used = frame.len().min(self.fft_size);

        for i in 0..used {
            self.buffer[i] = Complex::new(frame[i] * self.window[i], 0.0);
        }
        for slot in self.buffer[used..].iter_mut() {
            *slot = Complex::new(0.0, 0.0);
        }

        self.fft.process(&mut self.buffer);

        for (bin, magnitude) in self.magnitudes.iter_mut().enumerate() {
            *magnitude = self.buffer[bin].norm();
        }
    }

    /// Number of usable bins (`fft_size / 2`).
    #[inline]
    pub fn num_bins(&self) -> usize {
        self.magnitudes.len()
    }

    #[inline]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Width of one bin in Hz.
    #[inline]
    pub fn bin_width(&self) -> f32 {
        self.sample_rate / self.fft_size as f32
    }

    /// Magnitude of `bin`, or 0.0 when out of range.
    #[inline]
    pub fn magnitude_at_bin(&self, bin: usize) -> f32 {
        self.magnitudes.get(bin).copied().unwrap_or(0.0)
    }

    /// Magnitude at the bin nearest to `frequency`, or 0.0 when the frequency
    /// falls outside the spectrum.
    pub fn magnitude_at_frequency(&self, frequency: f32) -> f32 {
        if frequency < 0.0 {
            return 0.0;
        }
        let bin = (frequency / self.bin_width()).round() as usize;
        self.magnitude_at_bin(bin)
    }

    /// Sum of magnitudes over bins whose center frequency lies in
    /// `[min_hz, max_hz]`.
    pub fn band_energy(&self, min_hz: f32, max_hz: f32) -> f32 {
        if max_hz < min_hz {
            return 0.0;
        }

        let bin_width = self.bin_width();
        let first = (min_hz / bin_width).ceil().max(0.0) as usize;
        let last = ((max_hz / bin_width).floor() as usize).min(self.magnitudes.len().saturating_sub(1));

        if first > last {
            return 0.0;
        }

        self.magnitudes[first..=last].iter().sum()
    }

    /// Magnitude-weighted mean frequency in Hz, or 0.0 for a silent spectrum.
    pub fn centroid_hz(&self) -> f32 {
        let mut weighted = 0.0f32;
        let mut total = 0.0f32;

        for (bin, &magnitude) in self.magnitudes.iter().enumerate() {
            weighted += bin as f32 * magnitude;
            total += magnitude;
        }

        if total < EPSILON {
            return 0.0;
        }

        (weighted / total) * self.bin_width()
    }

    /// Snapshot of all bin magnitudes, in bin order.
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let angle = 2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32;
            0.5 * (1.0 - angle.cos())
        })
        .collect()
}
