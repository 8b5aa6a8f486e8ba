//! Crossfade gain curves.
//!
//! Each curve maps a normalized position `t ∈ [0, 1]` through the overlap to
//! a pair of gains: the outgoing track's fade-out and the incoming track's
//! fade-in. All curves start at (1, 0), end at (0, 1), stay within [0, 1],
//! and cross at t = 0.5.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;

/// Shape of a crossfade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CurveType {
    /// Straight lines; gains always sum to 1.
    Linear,
    /// Quarter sine/cosine; constant total power.
    #[default]
    EqualPower,
    /// Raised cosine (haversine); slow start and end.
    SCurve,
}

impl CurveType {
    /// All curve types, in picker order.
    pub const ALL: [CurveType; 3] = [Self::Linear, Self::EqualPower, Self::SCurve];

    /// Next curve type in picker order, wrapping around.
    pub fn next(self) -> Self {
        match self {
            Self::Linear => Self::EqualPower,
            Self::EqualPower => Self::SCurve,
            Self::SCurve => Self::Linear,
        }
    }

    /// Human-readable name.
    pub fn label(self) -> &'static str {
        match self {
            Self::Linear => "Linear",
            Self::EqualPower => "Equal power",
            Self::SCurve => "S-curve",
        }
    }
}

impl fmt::Display for CurveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Gain pair at one point of a crossfade.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Gains {
    pub fade_out: f64,
    pub fade_in: f64,
}

/// Evaluate a curve at normalized position `t`. Values outside [0, 1] are clamped.
pub fn gains(t: f64, curve: CurveType) -> Gains {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let (fade_out, fade_in) = match curve {
        CurveType::Linear => (1.0 - t, t),
        CurveType::EqualPower => ((t * FRAC_PI_2).cos(), (t * FRAC_PI_2).sin()),
        CurveType::SCurve => {
            let c = (t * PI).cos();
            ((1.0 + c) * 0.5, (1.0 - c) * 0.5)
        }
    };
    // cos(π/2) is 6e-17, not 0; keep the endpoints exact and the range closed.
    Gains {
        fade_out: fade_out.clamp(0.0, 1.0),
        fade_in: fade_in.clamp(0.0, 1.0),
    }
    .snap_endpoints(t)
}

impl Gains {
    fn snap_endpoints(self, t: f64) -> Self {
        if t == 0.0 {
            Self {
                fade_out: 1.0,
                fade_in: 0.0,
            }
        } else if t == 1.0 {
            Self {
                fade_out: 0.0,
                fade_in: 1.0,
            }
        } else {
            self
        }
    }
}

/// Discretized fade-out/fade-in curves.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CurveSamples {
    pub fade_out: Vec<f32>,
    pub fade_in: Vec<f32>,
}

impl CurveSamples {
    pub fn len(&self) -> usize {
        self.fade_out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fade_out.is_empty()
    }
}

/// Sample a curve at `n` evenly spaced points `t = i / (n - 1)`.
///
/// `n == 1` yields the single `t = 0` sample; `n == 0` yields empty curves.
pub fn sample_curve(curve: CurveType, n: usize) -> CurveSamples {
    let mut samples = CurveSamples {
        fade_out: Vec::with_capacity(n),
        fade_in: Vec::with_capacity(n),
    };
    let denom = n.saturating_sub(1).max(1) as f64;
    for i in 0..n {
        let g = gains(i as f64 / denom, curve);
        samples.fade_out.push(g.fade_out as f32);
        samples.fade_in.push(g.fade_in as f32);
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_endpoints_exact() {
        for curve in CurveType::ALL {
            let start = gains(0.0, curve);
            let end = gains(1.0, curve);
            assert_eq!((start.fade_out, start.fade_in), (1.0, 0.0), "{curve}");
            assert_eq!((end.fade_out, end.fade_in), (0.0, 1.0), "{curve}");
        }
    }

    #[test]
    fn test_linear_is_additive() {
        for t in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let g = gains(t, CurveType::Linear);
            assert!((g.fade_out + g.fade_in - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn test_equal_power_is_constant_power() {
        for t in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let g = gains(t, CurveType::EqualPower);
            let power = g.fade_out * g.fade_out + g.fade_in * g.fade_in;
            assert!((power - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn test_midpoint_symmetry() {
        for curve in CurveType::ALL {
            let g = gains(0.5, curve);
            assert!((g.fade_out - g.fade_in).abs() < EPS, "{curve}");
        }
    }

    #[test]
    fn test_monotonic_over_20_steps() {
        for curve in CurveType::ALL {
            let mut prev = gains(0.0, curve);
            for i in 1..=20 {
                let g = gains(i as f64 / 20.0, curve);
                assert!(g.fade_out <= prev.fade_out + EPS, "{curve} step {i}");
                assert!(g.fade_in >= prev.fade_in - EPS, "{curve} step {i}");
                prev = g;
            }
        }
    }

    #[test]
    fn test_out_of_range_clamped() {
        assert_eq!(gains(-1.0, CurveType::SCurve), gains(0.0, CurveType::SCurve));
        assert_eq!(gains(2.0, CurveType::Linear), gains(1.0, CurveType::Linear));
    }

    #[test]
    fn test_sample_curve_matches_gains() {
        let samples = sample_curve(CurveType::SCurve, 5);
        assert_eq!(samples.len(), 5);
        for i in 0..5 {
            let g = gains(i as f64 / 4.0, CurveType::SCurve);
            assert!((samples.fade_out[i] as f64 - g.fade_out).abs() < 1e-6);
            assert!((samples.fade_in[i] as f64 - g.fade_in).abs() < 1e-6);
        }
    }

    #[test]
    fn test_sample_curve_degenerate_sizes() {
        let one = sample_curve(CurveType::EqualPower, 1);
        assert_eq!(one.fade_out, vec![1.0]);
        assert_eq!(one.fade_in, vec![0.0]);
        assert!(sample_curve(CurveType::Linear, 0).is_empty());
    }

    #[test]
    fn test_curve_cycle() {
        let mut c = CurveType::Linear;
        for _ in 0..3 {
            c = c.next();
        }
        assert_eq!(c, CurveType::Linear);
    }

    proptest! {
        #[test]
        fn prop_gains_bounded(t in -1.0f64..2.0, idx in 0usize..3) {
            let g = gains(t, CurveType::ALL[idx]);
            prop_assert!((0.0..=1.0).contains(&g.fade_out));
            prop_assert!((0.0..=1.0).contains(&g.fade_in));
        }
    }
}
