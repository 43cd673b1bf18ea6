use glam::{Mat4, Vec3};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// Perspective camera. View and projection are left-handed, matching the
/// convention the level data is authored against.
pub struct Camera3D {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub viewport: (u32, u32),
}

impl Camera3D {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            eye: Vec3::new(0.0, 12.0, -24.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 45.0_f32.to_radians(),
            z_near: 0.1,
            z_far: 600.0,
            viewport: (viewport_width, viewport_height),
        }
    }

    pub fn build_uniform(&self) -> CameraUniform {
        let aspect = self.viewport.0.max(1) as f32 / self.viewport.1.max(1) as f32;
        let view = Mat4::look_at_lh(self.eye, self.target, self.up);
        let proj = Mat4::perspective_lh(self.fov_y, aspect, self.z_near, self.z_far);

        CameraUniform {
            view_proj: (proj * view).to_cols_array_2d(),
        }
    }
}
