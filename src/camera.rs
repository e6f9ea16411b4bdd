use cgmath::{Deg, Matrix4, Vector3};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Camera circling the origin about the vertical axis at a fixed rate.
pub struct OrbitCamera {
  pub aspect: f32,
  pub fovy: f32,
  pub znear: f32,
  pub zfar: f32,
  pub distance: f32,
  pub degrees_per_second: f32,
}

impl OrbitCamera {
  pub fn new(aspect: f32) -> Self {
    Self {
      aspect,
      fovy: 45.0,
      znear: 0.1,
      zfar: 1000.0,
      distance: 160.0,
      degrees_per_second: 15.0,
    }
  }

  pub fn build_view_projection_matrix(&self, elapsed: f64) -> Matrix4<f32> {
    let angle = Deg((self.degrees_per_second as f64 * elapsed % 360.0) as f32);
    let view = Matrix4::from_translation(Vector3::new(0.0, 0.0, -self.distance)) * Matrix4::from_angle_y(angle);
    let proj = cgmath::perspective(Deg(self.fovy), self.aspect, self.znear, self.zfar);
    OPENGL_TO_WGPU_MATRIX * proj * view
  }
}

/// Per-frame uniform block of the draw program.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniform {
  view_proj: [[f32; 4]; 4],
  cold: [f32; 4],
  hot: [f32; 4],
}

impl DrawUniform {
  /// Color of a particle with life 0.
  pub const COLD: [f32; 4] = [0.0, 0.2, 1.0, 1.0];
  /// Color of a particle with life 1.
  pub const HOT: [f32; 4] = [0.2, 0.05, 0.0, 1.0];

  pub fn new() -> Self {
    use cgmath::SquareMatrix;
    Self {
      view_proj: Matrix4::identity().into(),
      cold: Self::COLD,
      hot: Self::HOT,
    }
  }

  pub fn update_view_proj(&mut self, camera: &OrbitCamera, elapsed: f64) {
    self.view_proj = camera.build_view_projection_matrix(elapsed).into();
  }

  pub fn view_proj(&self) -> Matrix4<f32> {
    self.view_proj.into()
  }
}

impl Default for DrawUniform {
  fn default() -> Self {
    Self::new()
  }
}
