//! Classification of a fundamental frequency onto a standard-tuning string.

/// Standard tuning references in Hz: E2, A2, D3, G3, B3, E4.
pub const STANDARD_TUNING: [f32; 6] = [82.41, 110.0, 146.83, 196.0, 246.94, 329.63];

/// String names matching [`STANDARD_TUNING`] (1 = low E, 6 = high e).
pub const STRING_NAMES: [&str; 6] = ["E", "A", "D", "G", "B", "e"];

/// Lower edge of the guitar range (below low E minus ~15 %).
const MIN_GUITAR_FREQUENCY: f32 = 70.0;
/// Upper edge of the guitar range (above high e plus ~20 %).
const MAX_GUITAR_FREQUENCY: f32 = 400.0;

/// Within ±5 cents the classification is considered exact.
const HIGH_CONFIDENCE_CENTS: f32 = 5.0;
/// Beyond ±50 cents the classification is considered unreliable.
const ZERO_CONFIDENCE_CENTS: f32 = 50.0;

/// Which string a fundamental most likely belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StringInfo {
    /// 1 (low E) through 6 (high e); `None` when outside the guitar range.
    pub number: Option<u8>,
    /// Name matching `number`.
    pub name: Option<&'static str>,
    /// 1.0 for an exact match, decaying linearly to 0.0 at ±50 cents.
    pub confidence: f32,
    /// Signed deviation from the reference pitch (positive = sharp).
    pub detune_cents: f32,
}

/// Deviation of `measured` from `reference` in cents.
#[inline]
pub fn cents_between(measured: f32, reference: f32) -> f32 {
    1200.0 * (measured / reference).log2()
}

fn confidence_from_cents(cents: f32) -> f32 {
    if cents <= HIGH_CONFIDENCE_CENTS {
        return 1.0;
    }
    if cents >= ZERO_CONFIDENCE_CENTS {
        return 0.0;
    }

    let normalized =
        (cents - HIGH_CONFIDENCE_CENTS) / (ZERO_CONFIDENCE_CENTS - HIGH_CONFIDENCE_CENTS);
    (1.0 - normalized).max(0.0)
}

/// Maps `frequency` onto the nearest standard-tuning string.
///
/// Frequencies outside 70–400 Hz return a default (unknown) `StringInfo`.
pub fn classify(frequency: f32) -> StringInfo {
    if !(MIN_GUITAR_FREQUENCY..=MAX_GUITAR_FREQUENCY).contains(&frequency) {
        return StringInfo::default();
    }

    let mut best_index = 0;
    let mut best_abs_cents = f32::INFINITY;

    for (index, &reference) in STANDARD_TUNING.iter().enumerate() {
        let abs_cents = cents_between(frequency, reference).abs();
        if abs_cents < best_abs_cents {
            best_abs_cents = abs_cents;
            best_index = index;
        }
    }

    StringInfo {
        number: Some(best_index as u8 + 1),
        name: Some(STRING_NAMES[best_index]),
        confidence: confidence_from_cents(best_abs_cents),
        detune_cents: cents_between(frequency, STANDARD_TUNING[best_index]),
    }
}
