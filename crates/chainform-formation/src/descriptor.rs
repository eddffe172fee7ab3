//! The shared, versioned description of the target formation.

use chainform_topology::{AgentId, Side};
use glam::DVec2;
use tracing::trace;

use crate::geometry::rotate_deg;
use crate::{FormationError, Result, ShapeFunction};

/// Secant search stops once a step is smaller than this.
pub const ROOT_TOLERANCE: f64 = 5e-7;

/// Secant search gives up (keeping its best estimate) after this many steps.
pub const ROOT_MAX_ITERATIONS: usize = 100;

/// Default spacing between neighbors: three agent radii of 0.03.
pub const DEFAULT_SPACING: f64 = 0.09;

/// Default formation heading, in degrees.
pub const DEFAULT_HEADING: f64 = 90.0;

/// Outcome of one circle/curve intersection search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootEstimate {
    /// Abscissa of the intersection.
    pub x: f64,
    /// Secant steps taken.
    pub iterations: usize,
    /// Whether the step size fell below [`ROOT_TOLERANCE`].
    pub converged: bool,
}

/// Shape, spacing, heading and seed of a formation, plus its version.
///
/// The version grows with every topology change. Agents compare versions to
/// decide whether a neighbor's descriptor supersedes their own.
#[derive(Debug, Clone)]
pub struct FormationDescriptor {
    shape: ShapeFunction,
    radius: f64,
    heading: f64,
    seed_id: AgentId,
    seed_gradient: DVec2,
    version: u64,
}

impl FormationDescriptor {
    /// Create a descriptor at version 0 with the default heading and a zero seed gradient.
    pub fn new(shape: impl Into<ShapeFunction>, radius: f64, seed_id: AgentId) -> Result<Self> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(FormationError::InvalidRadius(radius));
        }
        Ok(Self {
            shape: shape.into(),
            radius,
            heading: DEFAULT_HEADING,
            seed_id,
            seed_gradient: DVec2::ZERO,
            version: 0,
        })
    }

    /// Set the heading in degrees.
    pub fn with_heading(mut self, heading: f64) -> Result<Self> {
        if !heading.is_finite() {
            return Err(FormationError::InvalidHeading(heading));
        }
        self.heading = heading;
        Ok(self)
    }

    /// Set the gradient the seed pins itself to.
    #[must_use]
    pub fn with_seed_gradient(mut self, gradient: DVec2) -> Self {
        self.seed_gradient = gradient;
        self
    }

    /// Set the seed agent.
    #[must_use]
    pub fn with_seed(mut self, seed_id: AgentId) -> Self {
        self.seed_id = seed_id;
        self
    }

    /// Set the version.
    #[must_use]
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn shape(&self) -> &ShapeFunction {
        &self.shape
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn seed_id(&self) -> AgentId {
        self.seed_id
    }

    pub fn seed_gradient(&self) -> DVec2 {
        self.seed_gradient
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// True if `id` is this formation's seed.
    pub fn is_seed(&self, id: AgentId) -> bool {
        self.seed_id == id
    }

    /// Advance to the next version and return it.
    pub fn bump_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    /// Desired offsets to the left and right neighbors of an agent at `point`.
    ///
    /// Each offset runs from `point` to where the spacing circle around it
    /// crosses the curve, rotated into the formation's heading frame. Index
    /// with [`Side::index`]. Deterministic: identical inputs give identical
    /// offsets.
    pub fn relationships_at(&self, point: DVec2) -> [DVec2; 2] {
        let mut rels = [DVec2::ZERO; 2];
        for side in Side::ALL {
            let guess = match side {
                Side::Left => point.x - self.radius,
                Side::Right => point.x + self.radius,
            };
            let root = self.intersect(point, guess);
            let crossing = DVec2::new(root.x, self.shape.eval(root.x));
            rels[side.index()] = rotate_deg(crossing - point, -self.heading);
        }
        rels
    }

    /// Find where the spacing circle around `center` crosses the curve, near `guess`.
    ///
    /// Secant iteration on `(x - cx)² + (f(x) - cy)² - r²`. A zero
    /// denominator, a non-finite step or the iteration cap all end the search
    /// early with the best estimate seen so far.
    pub fn intersect(&self, center: DVec2, guess: f64) -> RootEstimate {
        let r2 = self.radius * self.radius;
        let residual = |x: f64| {
            let dx = x - center.x;
            let dy = self.shape.eval(x) - center.y;
            dx * dx + dy * dy - r2
        };

        let mut prev = guess - ROOT_TOLERANCE;
        let mut x = guess + ROOT_TOLERANCE;
        let mut f_prev = residual(prev);
        let mut f_x = residual(x);
        let mut best = if f_x.abs() <= f_prev.abs() { (x, f_x) } else { (prev, f_prev) };

        for iteration in 1..=ROOT_MAX_ITERATIONS {
            let denom = f_x - f_prev;
            if denom == 0.0 || !denom.is_finite() {
                return RootEstimate {
                    x: best.0,
                    iterations: iteration - 1,
                    converged: best.1 == 0.0,
                };
            }
            let next = x - f_x * (x - prev) / denom;
            if !next.is_finite() {
                break;
            }
            prev = x;
            f_prev = f_x;
            x = next;
            f_x = residual(x);
            if f_x.is_finite() && f_x.abs() < best.1.abs() {
                best = (x, f_x);
            }
            if (x - prev).abs() < ROOT_TOLERANCE {
                return RootEstimate { x, iterations: iteration, converged: true };
            }
        }

        trace!(guess, best = best.0, residual = best.1, "secant search capped");
        RootEstimate {
            x: best.0,
            iterations: ROOT_MAX_ITERATIONS,
            converged: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ShapePreset;

    fn line() -> FormationDescriptor {
        FormationDescriptor::new(ShapePreset::Line, DEFAULT_SPACING, AgentId(0)).unwrap()
    }

    fn close(a: DVec2, b: DVec2, eps: f64) -> bool {
        (a - b).length() < eps
    }

    #[test]
    fn rejects_bad_radius() {
        assert_eq!(
            FormationDescriptor::new(ShapePreset::Line, 0.0, AgentId(0)).unwrap_err(),
            FormationError::InvalidRadius(0.0)
        );
        assert!(FormationDescriptor::new(ShapePreset::Line, f64::NAN, AgentId(0)).is_err());
        assert!(line().with_heading(f64::INFINITY).is_err());
    }

    #[test]
    fn line_relationships_at_origin() {
        let rels = line().relationships_at(DVec2::ZERO);
        // Heading 90: the formation's +x axis maps to the agent frame's -y axis
        assert!(close(rels[Side::Left.index()], DVec2::new(0.0, DEFAULT_SPACING), 1e-6));
        assert!(close(rels[Side::Right.index()], DVec2::new(0.0, -DEFAULT_SPACING), 1e-6));
    }

    #[test]
    fn relationships_are_spacing_radius_long() {
        for preset in ShapePreset::ALL {
            let f = FormationDescriptor::new(preset, DEFAULT_SPACING, AgentId(0)).unwrap();
            let point = DVec2::new(0.2, preset.eval(0.2));
            for rel in f.relationships_at(point) {
                assert!(
                    (rel.length() - DEFAULT_SPACING).abs() < 1e-4,
                    "{} gave offset of length {}",
                    preset,
                    rel.length()
                );
            }
        }
    }

    #[test]
    fn relationships_are_idempotent() {
        let f = FormationDescriptor::new(ShapePreset::Sine, DEFAULT_SPACING, AgentId(0)).unwrap();
        let point = DVec2::new(0.37, ShapePreset::Sine.eval(0.37));
        assert_eq!(f.relationships_at(point), f.relationships_at(point));
    }

    #[test]
    fn intersect_converges_on_parabola() {
        let f = FormationDescriptor::new(ShapePreset::Parabola, DEFAULT_SPACING, AgentId(0)).unwrap();
        let root = f.intersect(DVec2::ZERO, DEFAULT_SPACING);
        assert!(root.converged);
        assert!(root.iterations <= ROOT_MAX_ITERATIONS);
        let y = root.x * root.x;
        assert!(((root.x * root.x + y * y).sqrt() - DEFAULT_SPACING).abs() < 1e-6);
    }

    #[test]
    fn no_crossing_returns_best_estimate() {
        // The circle never reaches y = 10, so there is no root to find
        let f = FormationDescriptor::new(ShapeFunction::custom(|_| 10.0), DEFAULT_SPACING, AgentId(0)).unwrap();
        let root = f.intersect(DVec2::ZERO, DEFAULT_SPACING);
        assert!(!root.converged);
        assert!(root.x.is_finite());
    }

    #[test]
    fn non_finite_shape_does_not_panic() {
        let f = FormationDescriptor::new(ShapeFunction::custom(|_| f64::NAN), DEFAULT_SPACING, AgentId(0)).unwrap();
        let root = f.intersect(DVec2::ZERO, DEFAULT_SPACING);
        assert!(root.x.is_finite());
        assert!(!root.converged);
        assert_eq!(root.iterations, 0);
    }

    #[test]
    fn bump_is_monotonic() {
        let mut f = line();
        assert_eq!(f.version(), 0);
        assert_eq!(f.bump_version(), 1);
        assert_eq!(f.bump_version(), 2);
    }
}
