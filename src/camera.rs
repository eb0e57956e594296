use glam::{Mat4, Vec2, Vec3};

/// Camera uniform uploaded to the GPU: the combined view-projection matrix.
///
/// Column-major, matching WGSL `mat4x4<f32>`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// Orthographic 2D camera.
///
/// The visible region is `position ± (scale * aspect, scale)` in world units,
/// so a larger `scale` zooms out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// World-space point at the centre of the screen.
    pub position: Vec2,
    /// Viewport width / height.
    pub aspect: f32,
    /// Half the visible height in world units.
    pub scale: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self { position: Vec2::ZERO, aspect: 1.0, scale: 1.0 }
    }
}

impl Camera {
    /// Smallest allowed `scale`; keeps the projection invertible.
    pub const MIN_SCALE: f32 = 1e-4;

    pub fn new(position: Vec2, scale: f32) -> Self {
        Self { position, scale: scale.max(Self::MIN_SCALE), ..Default::default() }
    }

    pub fn calc_aspect(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Multiply the visible extent by `factor` (>1 zooms out).
    pub fn zoom(&mut self, factor: f32) {
        self.scale = (self.scale * factor).max(Self::MIN_SCALE);
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.position += delta;
    }

    pub fn to_matrix(&self) -> Mat4 {
        let half_w = self.scale * self.aspect;
        Mat4::orthographic_rh(
            self.position.x - half_w,
            self.position.x + half_w,
            self.position.y - self.scale,
            self.position.y + self.scale,
            0.0,
            100.0,
        )
    }

    pub fn uniform(&self) -> CameraUniform {
        CameraUniform { view_proj: self.to_matrix().to_cols_array_2d() }
    }

    /// World-space point under normalised device coordinates `ndc`
    /// (x right, y up, both in `[-1, 1]`).
    pub fn ndc_to_world(&self, ndc: Vec2) -> Vec2 {
        let half = Vec2::new(self.scale * self.aspect, self.scale);
        self.position + ndc * half
    }

    pub fn world_to_ndc(&self, world: Vec2) -> Vec2 {
        let clip = self.to_matrix() * Vec3::new(world.x, world.y, 0.0).extend(1.0);
        Vec2::new(clip.x, clip.y) / clip.w
    }
}
