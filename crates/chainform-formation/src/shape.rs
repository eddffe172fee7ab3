//! Shape functions: the curve a formation lays its agents along.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::FormationError;

/// Built-in curves, selectable by index or by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ShapePreset {
    /// y = 0
    Line,
    /// y = x
    Slope,
    /// y = |x|
    Vee,
    /// y = -x/2
    ShallowDecline,
    /// y = -|x/2|
    ShallowCaret,
    /// y = -|x|
    Caret,
    /// y = x²
    Parabola,
    /// y = x³
    Cubic,
    /// y = sign(x)·√|x/2|
    SignedSqrt,
    /// y = sin(10x)/10
    Sine,
    /// y = x·√3
    SteepRise,
    /// y = -x·√3
    SteepFall,
}

impl ShapePreset {
    /// Every preset in index order.
    pub const ALL: [ShapePreset; 12] = [
        ShapePreset::Line,
        ShapePreset::Slope,
        ShapePreset::Vee,
        ShapePreset::ShallowDecline,
        ShapePreset::ShallowCaret,
        ShapePreset::Caret,
        ShapePreset::Parabola,
        ShapePreset::Cubic,
        ShapePreset::SignedSqrt,
        ShapePreset::Sine,
        ShapePreset::SteepRise,
        ShapePreset::SteepFall,
    ];

    /// Preset at a position in [`ShapePreset::ALL`].
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Position in [`ShapePreset::ALL`].
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&p| p == self).unwrap_or(0)
    }

    /// Stable snake_case name.
    pub fn name(self) -> &'static str {
        match self {
            ShapePreset::Line => "line",
            ShapePreset::Slope => "slope",
            ShapePreset::Vee => "vee",
            ShapePreset::ShallowDecline => "shallow_decline",
            ShapePreset::ShallowCaret => "shallow_caret",
            ShapePreset::Caret => "caret",
            ShapePreset::Parabola => "parabola",
            ShapePreset::Cubic => "cubic",
            ShapePreset::SignedSqrt => "signed_sqrt",
            ShapePreset::Sine => "sine",
            ShapePreset::SteepRise => "steep_rise",
            ShapePreset::SteepFall => "steep_fall",
        }
    }

    /// Evaluate the curve at `x`.
    pub fn eval(self, x: f64) -> f64 {
        const SQRT_3: f64 = 1.732_050_807_568_877_2;
        match self {
            ShapePreset::Line => 0.0,
            ShapePreset::Slope => x,
            ShapePreset::Vee => x.abs(),
            ShapePreset::ShallowDecline => -0.5 * x,
            ShapePreset::ShallowCaret => -(0.5 * x).abs(),
            ShapePreset::Caret => -x.abs(),
            ShapePreset::Parabola => x * x,
            ShapePreset::Cubic => x * x * x,
            ShapePreset::SignedSqrt => (0.5 * x).abs().sqrt() * sign(x),
            ShapePreset::Sine => 0.1 * (10.0 * x).sin(),
            ShapePreset::SteepRise => x * SQRT_3,
            ShapePreset::SteepFall => -x * SQRT_3,
        }
    }
}

/// Sign with sign(0) = 0.
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

impl FromStr for ShapePreset {
    type Err = FormationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(index) = s.parse::<usize>() {
            return Self::from_index(index).ok_or_else(|| FormationError::UnknownShape(s.to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| FormationError::UnknownShape(s.to_string()))
    }
}

impl fmt::Display for ShapePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The curve `y = f(x)` a formation follows.
#[derive(Clone)]
pub enum ShapeFunction {
    Preset(ShapePreset),
    Custom(Arc<dyn Fn(f64) -> f64 + Send + Sync>),
}

impl ShapeFunction {
    /// Wrap an arbitrary curve.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Evaluate the curve at `x`.
    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        match self {
            ShapeFunction::Preset(preset) => preset.eval(x),
            ShapeFunction::Custom(f) => f(x),
        }
    }

    /// Name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ShapeFunction::Preset(preset) => preset.name(),
            ShapeFunction::Custom(_) => "custom",
        }
    }
}

impl Default for ShapeFunction {
    fn default() -> Self {
        ShapeFunction::Preset(ShapePreset::Line)
    }
}

impl From<ShapePreset> for ShapeFunction {
    fn from(preset: ShapePreset) -> Self {
        ShapeFunction::Preset(preset)
    }
}

impl fmt::Debug for ShapeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeFunction::Preset(preset) => f.debug_tuple("Preset").field(preset).finish(),
            ShapeFunction::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twelve_presets_round_trip_by_index() {
        for (i, preset) in ShapePreset::ALL.iter().enumerate() {
            assert_eq!(ShapePreset::from_index(i), Some(*preset));
            assert_eq!(preset.index(), i);
        }
        assert_eq!(ShapePreset::from_index(12), None);
    }

    #[test]
    fn parses_names_and_indices() {
        assert_eq!("vee".parse::<ShapePreset>(), Ok(ShapePreset::Vee));
        assert_eq!("SINE".parse::<ShapePreset>(), Ok(ShapePreset::Sine));
        assert_eq!("7".parse::<ShapePreset>(), Ok(ShapePreset::Cubic));
        assert!(matches!("spiral".parse::<ShapePreset>(), Err(FormationError::UnknownShape(_))));
        assert!("99".parse::<ShapePreset>().is_err());
    }

    #[test]
    fn preset_values() {
        assert_eq!(ShapePreset::Line.eval(3.0), 0.0);
        assert_eq!(ShapePreset::Vee.eval(-2.0), 2.0);
        assert_eq!(ShapePreset::ShallowCaret.eval(-2.0), -1.0);
        assert_eq!(ShapePreset::Parabola.eval(-3.0), 9.0);
        assert_eq!(ShapePreset::SignedSqrt.eval(-8.0), -2.0);
        assert_eq!(ShapePreset::SignedSqrt.eval(0.0), 0.0);
        assert!((ShapePreset::SteepRise.eval(1.0) - 3f64.sqrt()).abs() < 1e-15);
    }

    #[test]
    fn custom_shape_evaluates() {
        let shape = ShapeFunction::custom(|x| 2.0 * x + 1.0);
        assert_eq!(shape.eval(1.0), 3.0);
        assert_eq!(shape.name(), "custom");
        assert_eq!(format!("{:?}", shape), "Custom(..)");
    }
}
