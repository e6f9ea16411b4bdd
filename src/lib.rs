pub mod attractor;
pub mod camera;
pub mod compute;
pub mod error;
pub mod frame;
pub mod host;
pub mod initialize;
pub mod integrator;
pub mod render;
pub mod state;
pub mod store;

pub use error::SimError;

/// Slots in the attractor uniform array. Must match the array length declared in the kernel.
pub const MAX_ATTRACTORS: usize = 64;

/// Invocations per compute workgroup. Must match `@workgroup_size` in the kernel.
pub const WORKGROUP_SIZE: u32 = 256;

/// Dispatches are one-dimensional, so the group count is bounded by a single axis.
pub const MAX_WORKGROUPS: u32 = 65535;

#[derive(Debug, Clone)]
pub struct SimConfig {
  pub particle_count: u32,
  pub active_attractors: usize,
  pub width: u32,
  pub height: u32,
  /// Iterations closer together than this are skipped entirely.
  pub min_step: f64,
  /// Upper clamp for the integration step after a stall.
  pub max_step: f64,
  pub softening: f32,
  pub seed: u64,
  pub kernel_path: std::path::PathBuf,
}

impl Default for SimConfig {
  fn default() -> Self {
    Self {
      particle_count: 1024 * 8192,
      active_attractors: 32,
      width: 1280,
      height: 720,
      min_step: 0.01,
      max_step: 2.0,
      softening: 10.0,
      seed: 0x5eed,
      kernel_path: concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/particle.wgsl").into(),
    }
  }
}

impl SimConfig {
  pub fn validate(&self) -> Result<(), SimError> {
    if self.particle_count == 0 {
      return Err(SimError::Config("particle count must be non-zero".into()));
    }
    if self.active_attractors > MAX_ATTRACTORS {
      return Err(SimError::Config(format!(
        "{} active attractors exceed the capacity of {MAX_ATTRACTORS}",
        self.active_attractors
      )));
    }
    if self.width == 0 || self.height == 0 {
      return Err(SimError::Config("window dimensions must be non-zero".into()));
    }
    if self.min_step.is_nan() || self.min_step < 0.0 || self.min_step > self.max_step {
      return Err(SimError::Config(format!(
        "step bounds [{}, {}] are not ordered",
        self.min_step, self.max_step
      )));
    }
    if self.workgroup_count() > MAX_WORKGROUPS {
      return Err(SimError::Config(format!(
        "{} particles need more than {MAX_WORKGROUPS} workgroups",
        self.particle_count
      )));
    }
    if self.softening < 0.0 {
      return Err(SimError::Config("softening must not be negative".into()));
    }
    Ok(())
  }

  pub fn workgroup_count(&self) -> u32 {
    self.particle_count.div_ceil(WORKGROUP_SIZE)
  }

  pub fn aspect(&self) -> f32 {
    self.width as f32 / self.height as f32
  }
}

/// Position and coloring scalar of one particle, as the kernel and vertex stage see it.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticlePosition {
  pub pos: [f32; 3],
  pub life: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleVelocity {
  pub vel: [f32; 3],
  pub _pad: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Attractor {
  pub pos: [f32; 3],
  pub mass: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct IntegratorParams {
  pub dt: f32,
  pub attractor_count: u32,
  pub softening: f32,
  pub particle_count: u32,
}
