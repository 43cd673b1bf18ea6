//! Per-instance world transform state: translation/rotation/scale components
//! plus the cached world matrix derived from them. The matrix is refreshed
//! explicitly by the scene update, once per tick, rather than on every field
//! write.

use glam::{Mat4, Vec3};

use crate::math::make_affine_matrix;

#[derive(Debug, Clone)]
pub struct WorldTransform {
    pub translation: Vec3,
    /// Euler angles in radians, applied about X, then Y, then Z.
    pub rotation: Vec3,
    pub scale: Vec3,
    world: Mat4,
}

impl WorldTransform {
    pub fn new(translation: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
            world: make_affine_matrix(scale, rotation, translation),
        }
    }

    /// Recompute the cached world matrix from the current components.
    pub fn update_matrix(&mut self) {
        self.world = make_affine_matrix(self.scale, self.rotation, self.translation);
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.world
    }
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO, Vec3::ONE)
    }
}
