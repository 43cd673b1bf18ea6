//! World-matrix composition.
//!
//! Every placed mesh derives its world matrix from the same recipe: a point
//! is scaled, then rotated about X, then Y, then Z (Euler angles in
//! radians), then translated. Level data is authored against this exact
//! order, so it is the one fixed convention of the renderer. glam multiplies
//! column vectors, which puts the matrices in the reverse textual order:
//! `T * Rz * Ry * Rx * S`.

use glam::{Mat4, Vec3};

/// Compose scale, Euler rotation (applied X, then Y, then Z), and
/// translation into a single world matrix.
pub fn make_affine_matrix(scale: Vec3, rotation: Vec3, translation: Vec3) -> Mat4 {
    let rotate = Mat4::from_rotation_z(rotation.z)
        * Mat4::from_rotation_y(rotation.y)
        * Mat4::from_rotation_x(rotation.x);

    Mat4::from_translation(translation) * rotate * Mat4::from_scale(scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPS: f32 = 1e-5;

    fn assert_vec3_close(actual: Vec3, expected: Vec3) {
        assert!(
            (actual - expected).length() < EPS,
            "expected {expected:?}, got {actual:?}"
        );
    }

    /// Reference implementation: apply each step to the point directly,
    /// without any matrix in sight.
    fn apply_steps(point: Vec3, scale: Vec3, rotation: Vec3, translation: Vec3) -> Vec3 {
        let p = point * scale;

        let (sx, cx) = rotation.x.sin_cos();
        let p = Vec3::new(p.x, p.y * cx - p.z * sx, p.y * sx + p.z * cx);

        let (sy, cy) = rotation.y.sin_cos();
        let p = Vec3::new(p.x * cy + p.z * sy, p.y, -p.x * sy + p.z * cy);

        let (sz, cz) = rotation.z.sin_cos();
        let p = Vec3::new(p.x * cz - p.y * sz, p.x * sz + p.y * cz, p.z);

        p + translation
    }

    #[test]
    fn neutral_inputs_give_identity() {
        let m = make_affine_matrix(Vec3::ONE, Vec3::ZERO, Vec3::ZERO);
        assert!(m.abs_diff_eq(Mat4::IDENTITY, EPS));
    }

    #[test]
    fn scale_and_translation_without_rotation() {
        let m = make_affine_matrix(
            Vec3::new(2.0, 3.0, 4.0),
            Vec3::ZERO,
            Vec3::new(10.0, 20.0, 30.0),
        );
        assert_vec3_close(
            m.transform_point3(Vec3::new(1.0, 1.0, 1.0)),
            Vec3::new(12.0, 23.0, 34.0),
        );
    }

    #[test]
    fn matches_stepwise_application() {
        let scale = Vec3::new(2.0, 1.0, 3.0);
        let rotation = Vec3::new(0.3, -0.7, 1.1);
        let translation = Vec3::new(4.0, 5.0, 6.0);
        let m = make_affine_matrix(scale, rotation, translation);

        for point in [
            Vec3::X,
            Vec3::Y,
            Vec3::Z,
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(-0.5, 4.0, -2.5),
        ] {
            assert_vec3_close(
                m.transform_point3(point),
                apply_steps(point, scale, rotation, translation),
            );
        }
    }

    #[test]
    fn rotation_applies_x_before_y() {
        // +Y rotated a quarter turn about X lands on +Z; a further quarter
        // turn about Y carries it to +X. The reverse order would leave the
        // point on +Z, so this pins the application order.
        let m = make_affine_matrix(Vec3::ONE, Vec3::new(FRAC_PI_2, FRAC_PI_2, 0.0), Vec3::ZERO);
        assert_vec3_close(m.transform_point3(Vec3::Y), Vec3::X);
    }

    #[test]
    fn scale_applies_before_rotation() {
        // Scaling X by 2 then rotating a quarter turn about Z must produce
        // (0, 2, 0); rotating first and scaling second would give (0, 1, 0).
        let m = make_affine_matrix(
            Vec3::new(2.0, 1.0, 1.0),
            Vec3::new(0.0, 0.0, FRAC_PI_2),
            Vec3::ZERO,
        );
        assert_vec3_close(m.transform_point3(Vec3::X), Vec3::new(0.0, 2.0, 0.0));
    }
}
