use thiserror::Error;

/// Everything that can stop the simulation from starting.
///
/// None of these are recoverable: they are raised while building the GPU
/// context, the programs and the particle buffers, before the first frame.
#[derive(Error, Debug)]
pub enum SimError {
  #[error("invalid configuration: {0}")]
  Config(String),

  #[error("failed to create event loop: {0}")]
  EventLoop(#[from] winit::error::EventLoopError),

  #[error("failed to create window: {0}")]
  Window(#[from] winit::error::OsError),

  #[error("failed to create surface: {0}")]
  Surface(#[from] wgpu::CreateSurfaceError),

  #[error("surface is not supported by the adapter")]
  SurfaceUnsupported,

  #[error("no compatible GPU adapter found")]
  NoAdapter,

  #[error("failed to request device: {0}")]
  Device(#[from] wgpu::RequestDeviceError),

  #[error("failed to read {path}: {source}")]
  ShaderSource {
    path: std::path::PathBuf,
    source: std::io::Error,
  },

  #[error("{program} program failed to build:\n{diagnostics}")]
  ProgramBuild {
    program: &'static str,
    diagnostics: String,
  },

  #[error("failed to install termination handler: {0}")]
  Signal(#[from] ctrlc::Error),

  #[error("failed to allocate {label} ({size} bytes): {reason}")]
  Allocation {
    label: &'static str,
    size: u64,
    reason: String,
  },
}

/// Runs `build` inside a validation error scope, turning any captured error
/// (WGSL compile failures, pipeline/layout mismatches) into [`SimError::ProgramBuild`].
pub async fn build_checked<T>(
  device: &wgpu::Device,
  program: &'static str,
  build: impl FnOnce() -> T,
) -> Result<T, SimError> {
  device.push_error_scope(wgpu::ErrorFilter::Validation);
  let built = build();
  match device.pop_error_scope().await {
    Some(err) => Err(SimError::ProgramBuild {
      program,
      diagnostics: err.to_string(),
    }),
    None => Ok(built),
  }
}
