use core::fmt;

use super::Gain;

/// Picovolts in one hundredth of a millivolt.
const PICOVOLTS_PER_CENTI_MV: u64 = 10_000_000;

/// A non-negative voltage with a resolution of 0.01 mV.
///
/// Stored as an integer count of hundredths of a millivolt so that the two
/// decimal places in the payload are exact rather than a float rounding
/// artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Millivolts {
    centi: u32,
}

impl Millivolts {
    pub const fn from_centi(centi: u32) -> Self {
        Self { centi }
    }

    /// `abs(raw * lsb)`, rounded half-up to 0.01 mV.
    ///
    /// The sign of the raw code is dropped.
    pub const fn from_raw(raw: i16, gain: Gain) -> Self {
        let magnitude = raw.unsigned_abs() as u64;
        let picovolts = magnitude * gain.lsb_picovolts();
        let centi = (picovolts + PICOVOLTS_PER_CENTI_MV / 2) / PICOVOLTS_PER_CENTI_MV;
        Self {
            centi: centi as u32,
        }
    }

    pub const fn centi(self) -> u32 {
        self.centi
    }

    pub fn as_f32(self) -> f32 {
        self.centi as f32 / 100.0
    }
}

impl fmt::Display for Millivolts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.centi / 100, self.centi % 100)
    }
}

/// One channel of a report cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSample<'a> {
    /// Global channel index.
    pub index: usize,
    /// Payload field name.
    pub label: &'a str,
    /// Raw conversion result, `None` when the converter had no data.
    pub raw: Option<i16>,
    pub gain: Gain,
}

impl ChannelSample<'_> {
    pub fn millivolts(&self) -> Option<Millivolts> {
        self.raw.map(|raw| Millivolts::from_raw(raw, self.gain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn test_positive_reading() {
        let mv = Millivolts::from_raw(1600, Gain::TwoThirds);
        assert_eq!(mv.centi(), 30_000);
        assert_eq!(format!("{mv}"), "300.00");
    }

    #[test]
    fn test_negative_reading_is_folded_and_rounded_up() {
        // -50 * 0.1875 = -9.375
        let mv = Millivolts::from_raw(-50, Gain::TwoThirds);
        assert_eq!(format!("{mv}"), "9.38");
    }

    #[test]
    fn test_half_hundredth_rounds_up() {
        // 6 * 0.1875 = 1.125
        assert_eq!(format!("{}", Millivolts::from_raw(6, Gain::TwoThirds)), "1.13");
        // 2 * 0.1875 = 0.375
        assert_eq!(format!("{}", Millivolts::from_raw(2, Gain::TwoThirds)), "0.38");
    }

    #[test]
    fn test_extremes_are_non_negative() {
        assert_eq!(format!("{}", Millivolts::from_raw(0, Gain::TwoThirds)), "0.00");
        assert_eq!(
            format!("{}", Millivolts::from_raw(i16::MAX, Gain::TwoThirds)),
            "6143.81"
        );
        assert_eq!(
            format!("{}", Millivolts::from_raw(i16::MIN, Gain::TwoThirds)),
            "6144.00"
        );
    }

    #[test]
    fn test_matches_float_formula_for_every_code_step() {
        for raw in (i16::MIN..=i16::MAX).step_by(97) {
            let expected = (raw as f64 * 0.1875).abs();
            let mv = Millivolts::from_raw(raw, Gain::TwoThirds);
            let diff = (mv.as_f32() as f64 - expected).abs();
            assert!(diff <= 0.005 + 1e-3, "raw {raw}: {mv} vs {expected}");
        }
    }

    #[test]
    fn test_other_gains() {
        // 1000 * 0.125 mV
        assert_eq!(format!("{}", Millivolts::from_raw(1000, Gain::One)), "125.00");
        // 3 * 0.0078125 mV = 0.0234375
        assert_eq!(format!("{}", Millivolts::from_raw(3, Gain::Sixteen)), "0.02");
    }

    #[test]
    fn test_sample_without_data() {
        let sample = ChannelSample {
            index: 3,
            label: "Y2",
            raw: None,
            gain: Gain::TwoThirds,
        };
        assert_eq!(sample.millivolts(), None);
    }
}
