//! Planar helpers in degrees.
//!
//! Headings and rotational errors are kept in degrees throughout.

use glam::DVec2;

/// Rotate `v` counter-clockwise by `degrees`.
#[inline]
pub fn rotate_deg(v: DVec2, degrees: f64) -> DVec2 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    DVec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Angle of `v` from the +x axis, in degrees within (-180, 180].
#[inline]
pub fn angle_deg(v: DVec2) -> f64 {
    v.y.atan2(v.x).to_degrees()
}

/// Wrap an angle into [-180, 180).
#[inline]
pub fn wrap_degrees(degrees: f64) -> f64 {
    (degrees + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: DVec2, b: DVec2) -> bool {
        (a - b).length() < 1e-12
    }

    #[test]
    fn quarter_turn() {
        assert!(close(rotate_deg(DVec2::X, 90.0), DVec2::Y));
        assert!(close(rotate_deg(DVec2::X, -90.0), -DVec2::Y));
        assert!(close(rotate_deg(DVec2::new(0.0, -0.09), 90.0), DVec2::new(0.09, 0.0)));
    }

    #[test]
    fn angle_of_axes() {
        assert_eq!(angle_deg(DVec2::X), 0.0);
        assert!((angle_deg(DVec2::Y) - 90.0).abs() < 1e-12);
        assert!((angle_deg(-DVec2::X) - 180.0).abs() < 1e-12);
    }

    #[test]
    fn wraps_into_range() {
        assert_eq!(wrap_degrees(0.0), 0.0);
        assert_eq!(wrap_degrees(190.0), -170.0);
        assert_eq!(wrap_degrees(-190.0), 170.0);
        assert_eq!(wrap_degrees(180.0), -180.0);
        assert_eq!(wrap_degrees(720.0 + 45.0), 45.0);
    }
}
