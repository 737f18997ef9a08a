//! Vendor-neutral fader and meter levels.
//!
//! Consoles report fader positions as raw integers on wildly different
//! scales (0..=127, 0..=1023, 0..=32767, sometimes with non-linear taper
//! baked in). The core never exposes those raw values: a per-vendor
//! [`FaderScale`] codec maps raw units through the vendor's dB taper onto
//! the unit scale of [`FaderLevel`], so application code can treat every
//! console the same way.
//!
//! Meters are one-way: a [`MeterScale`] converts a raw metering sample to a
//! dB reading for display; no raw round trip exists or is needed.

use std::fmt;

use crate::error::{Error, Result};

/// A fader position on the vendor-independent unit scale.
///
/// Values run from 0 (fader fully down / -infinity) to
/// [`MAX_VALUE`](FaderLevel::MAX_VALUE) (fader fully up). A `FaderLevel` is
/// only ever produced by a [`FaderScale`] codec or by clamping construction;
/// it never directly equals a raw device value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FaderLevel(u16);

impl FaderLevel {
    /// Top of the unit scale.
    pub const MAX_VALUE: u16 = 1000;

    /// Fader fully down.
    pub const MIN: FaderLevel = FaderLevel(0);

    /// Fader fully up.
    pub const MAX: FaderLevel = FaderLevel(Self::MAX_VALUE);

    /// Create a level, clamping to `[0, MAX_VALUE]`.
    pub fn clamped(value: u16) -> Self {
        FaderLevel(value.min(Self::MAX_VALUE))
    }

    /// The unit-scale value in `[0, MAX_VALUE]`.
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for FaderLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX_VALUE)
    }
}

/// A display-only meter reading in dB.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct MeterLevel(f32);

impl MeterLevel {
    /// Create a meter reading from a dB value.
    pub fn from_db(db: f32) -> Self {
        MeterLevel(db)
    }

    /// The reading in dB.
    pub fn db(&self) -> f32 {
        self.0
    }
}

impl fmt::Display for MeterLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} dB", self.0)
    }
}

/// Conversion between a vendor's raw fader units and [`FaderLevel`].
///
/// Both directions must be total: any representable raw value and any level
/// in range converts, with clamping at the extremes rather than failure.
/// `level_to_raw(raw_to_level(x))` must stay within
/// [`quantization_step`](FaderScale::quantization_step) of `x`, and
/// `raw_to_level` must be monotonic non-decreasing.
pub trait FaderScale: Send + Sync {
    /// Convert a raw device value to the unit scale. Out-of-range raw
    /// values clamp to the nearest end of the scale.
    fn raw_to_level(&self, raw: u16) -> FaderLevel;

    /// Convert a unit-scale level back to a raw device value.
    fn level_to_raw(&self, level: FaderLevel) -> u16;

    /// Worst-case raw-unit error introduced by a round trip through the
    /// unit scale.
    fn quantization_step(&self) -> u16;
}

/// A piecewise-linear-in-dB fader scale built from vendor breakpoints.
///
/// Each breakpoint maps a raw device value to the dB gain the console
/// applies at that fader position. Between breakpoints the dB curve is
/// interpolated linearly; the dB span of the whole table is then mapped
/// linearly onto `[0, FaderLevel::MAX_VALUE]`.
///
/// The breakpoint table is vendor data supplied at construction (no static
/// registries); construction validates it once.
#[derive(Debug, Clone)]
pub struct PiecewiseDbScale {
    /// `(raw, db)` pairs, strictly increasing in raw, non-decreasing in dB.
    breakpoints: Vec<(u16, f32)>,
    /// Worst-case raw error of a round trip, computed at construction.
    quantization: u16,
}

impl PiecewiseDbScale {
    /// Build a scale from `(raw, db)` breakpoints.
    ///
    /// Requires at least two breakpoints, strictly increasing raw values,
    /// non-decreasing dB values, and a non-zero overall dB span.
    pub fn new(breakpoints: Vec<(u16, f32)>) -> Result<Self> {
        if breakpoints.len() < 2 {
            return Err(Error::InvalidParameter(
                "fader scale needs at least two breakpoints".into(),
            ));
        }
        for pair in breakpoints.windows(2) {
            let (raw_a, db_a) = pair[0];
            let (raw_b, db_b) = pair[1];
            if raw_b <= raw_a {
                return Err(Error::InvalidParameter(format!(
                    "breakpoint raw values must be strictly increasing ({raw_a} then {raw_b})"
                )));
            }
            if db_b < db_a {
                return Err(Error::InvalidParameter(format!(
                    "breakpoint dB values must be non-decreasing ({db_a} then {db_b})"
                )));
            }
            if !db_a.is_finite() || !db_b.is_finite() {
                return Err(Error::InvalidParameter(
                    "breakpoint dB values must be finite".into(),
                ));
            }
        }
        let db_floor = breakpoints[0].1;
        let db_ceil = breakpoints[breakpoints.len() - 1].1;
        if db_ceil <= db_floor {
            return Err(Error::InvalidParameter(
                "fader scale must span a non-zero dB range".into(),
            ));
        }

        // Worst-case round-trip error: the steepest segment in raw-per-level
        // terms decides how many raw units one unit-scale step can cover.
        let db_span = db_ceil - db_floor;
        let mut worst = 1.0f32;
        for pair in breakpoints.windows(2) {
            let (raw_a, db_a) = pair[0];
            let (raw_b, db_b) = pair[1];
            let seg_db = db_b - db_a;
            if seg_db <= 0.0 {
                // Flat segment: every raw value in it maps to one level, so
                // the whole segment width is the round-trip error.
                worst = worst.max((raw_b - raw_a) as f32);
                continue;
            }
            let levels = seg_db / db_span * FaderLevel::MAX_VALUE as f32;
            let raw_per_level = (raw_b - raw_a) as f32 / levels;
            worst = worst.max(raw_per_level);
        }

        Ok(PiecewiseDbScale {
            breakpoints,
            quantization: worst.ceil() as u16,
        })
    }

    /// Lowest raw value in the table.
    pub fn raw_min(&self) -> u16 {
        self.breakpoints[0].0
    }

    /// Highest raw value in the table.
    pub fn raw_max(&self) -> u16 {
        self.breakpoints[self.breakpoints.len() - 1].0
    }

    fn db_floor(&self) -> f32 {
        self.breakpoints[0].1
    }

    fn db_ceil(&self) -> f32 {
        self.breakpoints[self.breakpoints.len() - 1].1
    }

    /// Interpolate the dB gain at a raw value, clamped to the table range.
    fn raw_to_db(&self, raw: u16) -> f32 {
        if raw <= self.raw_min() {
            return self.db_floor();
        }
        if raw >= self.raw_max() {
            return self.db_ceil();
        }
        for pair in self.breakpoints.windows(2) {
            let (raw_a, db_a) = pair[0];
            let (raw_b, db_b) = pair[1];
            if raw <= raw_b {
                let t = (raw - raw_a) as f32 / (raw_b - raw_a) as f32;
                return db_a + t * (db_b - db_a);
            }
        }
        self.db_ceil()
    }

    /// Inverse-interpolate a dB gain back to a raw value.
    fn db_to_raw(&self, db: f32) -> u16 {
        if db <= self.db_floor() {
            return self.raw_min();
        }
        if db >= self.db_ceil() {
            return self.raw_max();
        }
        for pair in self.breakpoints.windows(2) {
            let (raw_a, db_a) = pair[0];
            let (raw_b, db_b) = pair[1];
            if db <= db_b {
                if db_b <= db_a {
                    // Flat segment; pick its left edge.
                    return raw_a;
                }
                let t = (db - db_a) / (db_b - db_a);
                return raw_a + (t * (raw_b - raw_a) as f32).round() as u16;
            }
        }
        self.raw_max()
    }
}

impl FaderScale for PiecewiseDbScale {
    fn raw_to_level(&self, raw: u16) -> FaderLevel {
        let db = self.raw_to_db(raw);
        let t = (db - self.db_floor()) / (self.db_ceil() - self.db_floor());
        FaderLevel::clamped((t * FaderLevel::MAX_VALUE as f32).round() as u16)
    }

    fn level_to_raw(&self, level: FaderLevel) -> u16 {
        let t = level.value() as f32 / FaderLevel::MAX_VALUE as f32;
        let db = self.db_floor() + t * (self.db_ceil() - self.db_floor());
        self.db_to_raw(db)
    }

    fn quantization_step(&self) -> u16 {
        self.quantization
    }
}

/// Conversion from a raw metering sample to dB.
///
/// Consoles encode meter samples as fixed-point integers; the reading in dB
/// is `raw / divisor + offset_db`. Vendor data decides both constants (e.g.
/// a console sending 1/256-dB steps relative to -128 dBFS uses divisor 256
/// and offset -128).
#[derive(Debug, Clone, Copy)]
pub struct MeterScale {
    /// dB value corresponding to a raw sample of zero.
    pub offset_db: f32,
    /// Raw units per dB.
    pub divisor: f32,
}

impl MeterScale {
    /// Convert a raw metering sample to a dB reading.
    pub fn raw_to_db(&self, raw: i32) -> MeterLevel {
        MeterLevel::from_db(raw as f32 / self.divisor + self.offset_db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A representative vendor taper: -inf..-40 dB packed into the bottom
    /// of the raw range, finer resolution near unity, +10 dB at the top.
    fn test_scale() -> PiecewiseDbScale {
        PiecewiseDbScale::new(vec![
            (0, -90.0),
            (64, -40.0),
            (256, -20.0),
            (512, -10.0),
            (768, 0.0),
            (1023, 10.0),
        ])
        .unwrap()
    }

    #[test]
    fn fader_level_clamps() {
        assert_eq!(FaderLevel::clamped(5000).value(), FaderLevel::MAX_VALUE);
        assert_eq!(FaderLevel::clamped(0), FaderLevel::MIN);
    }

    #[test]
    fn construction_rejects_single_breakpoint() {
        assert!(PiecewiseDbScale::new(vec![(0, -90.0)]).is_err());
    }

    #[test]
    fn construction_rejects_non_increasing_raw() {
        let result = PiecewiseDbScale::new(vec![(0, -90.0), (64, -40.0), (64, -20.0)]);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn construction_rejects_decreasing_db() {
        let result = PiecewiseDbScale::new(vec![(0, -90.0), (64, -40.0), (128, -50.0)]);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn construction_rejects_zero_db_span() {
        let result = PiecewiseDbScale::new(vec![(0, -10.0), (100, -10.0)]);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn endpoints_map_to_scale_extremes() {
        let scale = test_scale();
        assert_eq!(scale.raw_to_level(0), FaderLevel::MIN);
        assert_eq!(scale.raw_to_level(1023), FaderLevel::MAX);
        assert_eq!(scale.level_to_raw(FaderLevel::MIN), 0);
        assert_eq!(scale.level_to_raw(FaderLevel::MAX), 1023);
    }

    #[test]
    fn out_of_range_raw_clamps() {
        let scale = test_scale();
        // Raw values beyond the table clamp instead of failing.
        assert_eq!(scale.raw_to_level(u16::MAX), FaderLevel::MAX);
    }

    #[test]
    fn unity_gain_position() {
        let scale = test_scale();
        // 0 dB sits at raw 768; on the unit scale that is 90/100 of the
        // -90..+10 dB span.
        let level = scale.raw_to_level(768);
        assert_eq!(level.value(), 900);
    }

    #[test]
    fn round_trip_within_quantization_step() {
        let scale = test_scale();
        let step = scale.quantization_step();
        for raw in scale.raw_min()..=scale.raw_max() {
            let back = scale.level_to_raw(scale.raw_to_level(raw));
            let diff = raw.abs_diff(back);
            assert!(
                diff <= step,
                "raw {raw} round-tripped to {back} (diff {diff} > step {step})"
            );
        }
    }

    #[test]
    fn raw_to_level_is_monotonic() {
        let scale = test_scale();
        let mut prev = scale.raw_to_level(0);
        for raw in 1..=scale.raw_max() {
            let level = scale.raw_to_level(raw);
            assert!(
                level >= prev,
                "level decreased at raw {raw}: {prev} -> {level}"
            );
            prev = level;
        }
    }

    #[test]
    fn meter_scale_conversion() {
        // 1/256-dB steps relative to -128 dBFS.
        let scale = MeterScale {
            offset_db: -128.0,
            divisor: 256.0,
        };
        let reading = scale.raw_to_db(256 * 108);
        assert!((reading.db() - (-20.0)).abs() < 1e-3);
        assert_eq!(reading.to_string(), "-20.0 dB");
    }

    #[test]
    fn meter_scale_negative_raw() {
        let scale = MeterScale {
            offset_db: 0.0,
            divisor: 2.0,
        };
        assert!((scale.raw_to_db(-40).db() - (-20.0)).abs() < 1e-6);
    }
}
