//! GPU backing memory for the particle population.
//!
//! Both buffers are bound read-write as storage by the integrator and read as
//! a vertex stream by the draw stage. Nothing on the host writes them after
//! they are seeded here.

use crate::initialize::{seed_positions, seed_velocities};
use crate::{ParticlePosition, ParticleVelocity, SimError};
use rand::rngs::SmallRng;

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x4];

pub struct ParticleStore {
  positions: wgpu::Buffer,
  velocities: wgpu::Buffer,
  count: u32,
}

impl ParticleStore {
  pub async fn new(device: &wgpu::Device, count: u32, rng: &mut SmallRng) -> Result<Self, SimError> {
    let limits = device.limits();

    let size = buffer_size::<ParticlePosition>(count);
    check_limits(&limits, "position buffer", size)?;
    let positions = allocate(device, "position buffer", size, |bytes| {
      seed_positions(rng, bytemuck::cast_slice_mut(bytes));
    })
    .await?;

    let size = buffer_size::<ParticleVelocity>(count);
    check_limits(&limits, "velocity buffer", size)?;
    let velocities = allocate(device, "velocity buffer", size, |bytes| {
      seed_velocities(rng, bytemuck::cast_slice_mut(bytes));
    })
    .await?;

    log::info!(
      "allocated {count} particles ({} MiB per buffer)",
      size / (1024 * 1024)
    );
    Ok(Self {
      positions,
      velocities,
      count,
    })
  }

  pub fn count(&self) -> u32 {
    self.count
  }

  pub fn positions(&self) -> &wgpu::Buffer {
    &self.positions
  }

  pub fn velocities(&self) -> &wgpu::Buffer {
    &self.velocities
  }

  pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
      array_stride: std::mem::size_of::<ParticlePosition>() as wgpu::BufferAddress,
      step_mode: wgpu::VertexStepMode::Vertex,
      attributes: &POSITION_ATTRIBUTES,
    }
  }

  pub fn release(self) {
    self.positions.destroy();
    self.velocities.destroy();
  }
}

pub fn buffer_size<T>(count: u32) -> u64 {
  u64::from(count) * std::mem::size_of::<T>() as u64
}

pub fn check_limits(limits: &wgpu::Limits, label: &'static str, size: u64) -> Result<(), SimError> {
  let binding = u64::from(limits.max_storage_buffer_binding_size);
  if size > binding {
    return Err(SimError::Allocation {
      label,
      size,
      reason: format!("exceeds the storage binding limit of {binding} bytes"),
    });
  }
  if size > limits.max_buffer_size {
    return Err(SimError::Allocation {
      label,
      size,
      reason: format!("exceeds the buffer size limit of {} bytes", limits.max_buffer_size),
    });
  }
  Ok(())
}

/// Creates a buffer mapped at creation, lets `fill` write its contents, and unmaps it.
async fn allocate(
  device: &wgpu::Device,
  label: &'static str,
  size: u64,
  fill: impl FnOnce(&mut [u8]),
) -> Result<wgpu::Buffer, SimError> {
  device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
  device.push_error_scope(wgpu::ErrorFilter::Validation);
  let buffer = device.create_buffer(&wgpu::BufferDescriptor {
    label: Some(label),
    size,
    usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::VERTEX,
    mapped_at_creation: true,
  });
  let validation = device.pop_error_scope().await;
  let out_of_memory = device.pop_error_scope().await;
  if let Some(err) = out_of_memory.or(validation) {
    return Err(SimError::Allocation {
      label,
      size,
      reason: err.to_string(),
    });
  }

  {
    let mut view = buffer.slice(..).get_mapped_range_mut();
    fill(&mut view[..]);
  }
  buffer.unmap();
  Ok(buffer)
}
