//! Editing the 17-point tone curve. Moving one point drags its neighbours
//! along with it, falling off with distance, so the curve stays smooth.

use serde::{Deserialize, Serialize};
use splines::{Interpolation, Key, Spline};

use crate::patch::LevelRequest;

/// Registry family holding tone curves.
pub const FAMILY: &str = "Tone curve";
pub const POINT_COUNT: usize = 17;
/// How many points on each side a change reaches.
pub const INFLUENCE_RADIUS: usize = 2;
/// Fraction of the change passed on per step away from the edited point.
pub const INFLUENCE_DECAY: f32 = 0.5;
pub const CURVE_MIN: f32 = 0.0;
pub const CURVE_MAX: f32 = 1.0;

quick_error! {
    #[derive(Debug, Clone, PartialEq)]
    pub enum CurveError {
        PointCount(got: usize) {
            display("a tone curve has {} points, got {}", POINT_COUNT, got)
        }
        PointIndex(index: usize) {
            display("no point {}; points are 0 to {}", index, POINT_COUNT - 1)
        }
        Decay(decay: f32) {
            display("decay must be between 0 and 1, got {}", decay)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Smoothing {
    pub radius: usize,
    pub decay: f32,
    /// Flatten any dips after each edit.
    pub monotonic: bool,
}

impl Default for Smoothing {
    fn default() -> Self {
        Smoothing {
            radius: INFLUENCE_RADIUS,
            decay: INFLUENCE_DECAY,
            monotonic: false,
        }
    }
}

impl Smoothing {
    pub fn check(&self) -> Result<(), CurveError> {
        if (0.0..=1.0).contains(&self.decay) {
            Ok(())
        } else {
            Err(CurveError::Decay(self.decay))
        }
    }

    /// Weight given to a point `distance` steps from the edited one.
    pub fn kernel(&self, distance: usize) -> f32 {
        if distance > self.radius {
            0.0
        } else {
            self.decay.powi(distance as i32)
        }
    }
}

/// NaN goes to [`CURVE_MIN`].
pub fn clamp(value: f32) -> f32 {
    value.max(CURVE_MIN).min(CURVE_MAX)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToneCurve {
    points: [f32; POINT_COUNT],
}

impl Default for ToneCurve {
    fn default() -> Self {
        ToneCurve::linear()
    }
}

impl ToneCurve {
    /// Output equals input.
    pub fn linear() -> Self {
        let mut points = [0.0; POINT_COUNT];
        for (idx, point) in points.iter_mut().enumerate() {
            *point = ToneCurve::input(idx);
        }
        ToneCurve { points }
    }

    /// Takes values in field order (`P0` to `P16`), clamping each.
    pub fn from_values(values: &[f32]) -> Result<Self, CurveError> {
        if values.len() != POINT_COUNT {
            return Err(CurveError::PointCount(values.len()));
        }
        let mut points = [0.0; POINT_COUNT];
        for (point, value) in points.iter_mut().zip(values) {
            *point = clamp(*value);
        }
        Ok(ToneCurve { points })
    }

    /// Input level that point `index` sits at.
    pub fn input(index: usize) -> f32 {
        index as f32 / (POINT_COUNT - 1) as f32
    }

    pub fn points(&self) -> &[f32] {
        &self.points
    }

    /// Moves point `index` towards `target` and its neighbours part of the
    /// way, per `smoothing`. Everything stays within the curve's range.
    pub fn set_point(&mut self, index: usize, target: f32, smoothing: &Smoothing) -> Result<(), CurveError> {
        if index >= POINT_COUNT {
            return Err(CurveError::PointIndex(index));
        }
        smoothing.check()?;
        let delta = clamp(target) - self.points[index];
        for (j, point) in self.points.iter_mut().enumerate() {
            let distance = if j > index { j - index } else { index - j };
            let weight = smoothing.kernel(distance);
            if weight > 0.0 {
                *point = clamp(*point + weight * delta);
            }
        }
        if smoothing.monotonic {
            self.make_monotonic();
        }
        debug!("Point {} -> {} (delta {})", index, self.points[index], delta);
        Ok(())
    }

    /// Raises any point that's below the one before it.
    pub fn make_monotonic(&mut self) {
        let mut highest = CURVE_MIN;
        for point in self.points.iter_mut() {
            highest = highest.max(*point);
            *point = highest;
        }
    }

    pub fn is_monotonic(&self) -> bool {
        self.points.windows(2).all(|pair| pair[0] <= pair[1])
    }

    fn spline(&self) -> Spline<f32, f32> {
        let keys = self
            .points
            .iter()
            .enumerate()
            .map(|(idx, point)| Key::new(ToneCurve::input(idx), *point, Interpolation::Linear))
            .collect();
        Spline::from_vec(keys)
    }

    /// Output for input `x`, interpolating linearly between points.
    pub fn sample(&self, x: f32) -> f32 {
        let x = clamp(x);
        self.spline().clamped_sample(x).unwrap_or_else(|| {
            let nearest = (x * (POINT_COUNT - 1) as f32).round() as usize;
            self.points[nearest.min(POINT_COUNT - 1)]
        })
    }

    /// Ready to hand to the patcher as `level` of the tone curve family.
    pub fn request(&self, level: &str) -> LevelRequest {
        LevelRequest::new(level, self.points.to_vec())
    }
}

#[cfg(test)]
mod test {
    use crate::extract::{extract_level, ExtractOptions};
    use crate::patch::patch_level;
    use crate::registry::Registry;
    use crate::tone_curve::{clamp, CurveError, Smoothing, ToneCurve, FAMILY, POINT_COUNT};
    use test_case::test_case;

    #[test_case(0 => 1.0)]
    #[test_case(1 => 0.5)]
    #[test_case(2 => 0.25)]
    #[test_case(3 => 0.0; "past the radius")]
    #[test_case(16 => 0.0)]
    fn default_kernel(distance: usize) -> f32 {
        Smoothing::default().kernel(distance)
    }

    #[test_case(-0.5 => 0.0)]
    #[test_case(0.25 => 0.25)]
    #[test_case(1.5 => 1.0)]
    #[test_case(std::f32::NAN => 0.0; "nan")]
    fn clamping(value: f32) -> f32 {
        clamp(value)
    }

    #[test]
    fn linear_is_identity() {
        let curve = ToneCurve::linear();
        assert_eq!(curve.points().len(), POINT_COUNT);
        assert_eq!(curve.points()[0], 0.0);
        assert_eq!(curve.points()[8], 0.5);
        assert_eq!(curve.points()[16], 1.0);
        assert!(curve.is_monotonic());
    }

    #[test]
    fn neighbours_follow_with_decay() {
        let mut curve = ToneCurve::linear();
        curve.set_point(8, 1.0, &Smoothing::default()).unwrap();
        let p = curve.points();
        assert_eq!(p[8], 1.0);
        assert_eq!(p[7], 0.4375 + 0.25);
        assert_eq!(p[9], 0.5625 + 0.25);
        assert_eq!(p[6], 0.375 + 0.125);
        assert_eq!(p[10], 0.625 + 0.125);
        // Out of reach.
        assert_eq!(p[5], 0.3125);
        assert_eq!(p[11], 0.6875);
        assert!(!curve.is_monotonic());
    }

    #[test]
    fn monotonic_pass_flattens_dips() {
        let mut curve = ToneCurve::linear();
        let smoothing = Smoothing {
            monotonic: true,
            ..Smoothing::default()
        };
        curve.set_point(8, 1.0, &smoothing).unwrap();
        assert!(curve.is_monotonic());
        assert!(curve.points()[8..].iter().all(|p| *p == 1.0));
        assert_eq!(curve.points()[7], 0.6875);
    }

    #[test]
    fn edits_stay_in_range() {
        let mut curve = ToneCurve::linear();
        curve.set_point(15, 5.0, &Smoothing::default()).unwrap();
        assert_eq!(curve.points()[15], 1.0);
        assert_eq!(curve.points()[16], 1.0);
        curve.set_point(1, -3.0, &Smoothing::default()).unwrap();
        assert!(curve.points().iter().all(|p| (0.0..=1.0).contains(p)));
        assert_eq!(curve.points()[0], 0.0);
    }

    #[test]
    fn no_radius_moves_one_point() {
        let mut curve = ToneCurve::linear();
        let smoothing = Smoothing {
            radius: 0,
            ..Smoothing::default()
        };
        curve.set_point(4, 0.0, &smoothing).unwrap();
        let mut expected = ToneCurve::linear().points().to_vec();
        expected[4] = 0.0;
        assert_eq!(curve.points(), expected.as_slice());
    }

    #[test]
    fn bad_edits() {
        let mut curve = ToneCurve::linear();
        assert_eq!(
            curve.set_point(17, 0.5, &Smoothing::default()),
            Err(CurveError::PointIndex(17))
        );
        let smoothing = Smoothing {
            decay: 1.5,
            ..Smoothing::default()
        };
        assert_eq!(curve.set_point(3, 0.5, &smoothing), Err(CurveError::Decay(1.5)));
        assert_eq!(ToneCurve::from_values(&[0.0; 16]), Err(CurveError::PointCount(16)));
    }

    #[test_case(0.5 => 0.5)]
    #[test_case(0.03125 => 0.03125; "between points")]
    #[test_case(-1.0 => 0.0)]
    #[test_case(2.0 => 1.0)]
    fn samples_linear(x: f32) -> f32 {
        ToneCurve::linear().sample(x)
    }

    #[test]
    fn survives_a_trip_through_a_blob() {
        let registry = Registry::builtin().unwrap();
        let family = registry.family(FAMILY).unwrap();
        let level = family.level("Tone curve linear").unwrap();

        let mut curve = ToneCurve::linear();
        curve.set_point(4, 0.4, &Smoothing::default()).unwrap();
        let request = curve.request(level.name());
        let blob = patch_level(family, level, &request.values).unwrap();

        let extraction = extract_level(&blob, family, level, &ExtractOptions::default());
        let back = ToneCurve::from_values(&extraction.values(family).unwrap()).unwrap();
        assert_eq!(back, curve);
    }

    #[test]
    fn builtin_curves_load() {
        let registry = Registry::builtin().unwrap();
        let family = registry.family(FAMILY).unwrap();
        for level in family.levels() {
            let curve = ToneCurve::from_values(level.defaults()).unwrap();
            assert!(curve.is_monotonic(), "{}", level.name());
        }
    }
}
