use crate::attractor::AttractorBuffer;
use crate::error::build_checked;
use crate::store::ParticleStore;
use crate::{IntegratorParams, SimConfig, SimError};
use std::borrow::Cow;
use std::path::Path;
use wgpu::{util::DeviceExt, PipelineCompilationOptions};

/// The compute stage: one invocation per particle, updating both buffers in place.
pub struct Integrator {
  pipeline: wgpu::ComputePipeline,
  bind_group: wgpu::BindGroup,
  params_buffer: wgpu::Buffer,
  params: IntegratorParams,
  work_group_count: u32,
}

impl Integrator {
  pub fn load_kernel(path: &Path) -> Result<String, SimError> {
    let source = std::fs::read_to_string(path).map_err(|source| SimError::ShaderSource {
      path: path.to_path_buf(),
      source,
    })?;
    log::info!("loaded integrator kernel from {}", path.display());
    Ok(source)
  }

  pub async fn new(
    device: &wgpu::Device,
    config: &SimConfig,
    store: &ParticleStore,
    attractors: &AttractorBuffer,
    kernel: &str,
  ) -> Result<Self, SimError> {
    let params = IntegratorParams {
      dt: 0.0,
      attractor_count: config.active_attractors as u32,
      softening: config.softening,
      particle_count: store.count(),
    };
    let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Integrator Params Buffer"),
      contents: bytemuck::bytes_of(&params),
      usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let (pipeline, bind_group) = build_checked(device, "integrator", || {
      let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("integrator"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(kernel)),
      });

      let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
          uniform_entry(0, std::mem::size_of::<IntegratorParams>() as u64),
          uniform_entry(1, AttractorBuffer::SIZE),
          storage_entry(2),
          storage_entry(3),
        ],
        label: Some("integrator_bind_group_layout"),
      });
      let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("integrate"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
      });
      let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("Integrator pipeline"),
        layout: Some(&pipeline_layout),
        module: &shader,
        entry_point: "main",
        compilation_options: PipelineCompilationOptions::default(),
        cache: None,
      });

      let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &bind_group_layout,
        entries: &[
          wgpu::BindGroupEntry {
            binding: 0,
            resource: params_buffer.as_entire_binding(),
          },
          wgpu::BindGroupEntry {
            binding: 1,
            resource: attractors.binding(),
          },
          wgpu::BindGroupEntry {
            binding: 2,
            resource: store.positions().as_entire_binding(),
          },
          wgpu::BindGroupEntry {
            binding: 3,
            resource: store.velocities().as_entire_binding(),
          },
        ],
        label: Some("integrator_bind_group"),
      });
      (pipeline, bind_group)
    })
    .await?;

    let work_group_count = config.workgroup_count();
    log::info!("integrator ready: {work_group_count} workgroups of {}", crate::WORKGROUP_SIZE);
    Ok(Self {
      pipeline,
      bind_group,
      params_buffer,
      params,
      work_group_count,
    })
  }

  pub fn set_step(&mut self, queue: &wgpu::Queue, dt: f32) {
    self.params.dt = dt;
    queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&self.params));
  }

  pub fn encode(&self, encoder: &mut wgpu::CommandEncoder) {
    let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
      label: Some("integrate"),
      timestamp_writes: None,
    });
    cpass.set_pipeline(&self.pipeline);
    cpass.set_bind_group(0, &self.bind_group, &[]);
    cpass.dispatch_workgroups(self.work_group_count, 1, 1);
  }

  pub fn release(self) {
    self.params_buffer.destroy();
  }
}

fn uniform_entry(binding: u32, size: u64) -> wgpu::BindGroupLayoutEntry {
  wgpu::BindGroupLayoutEntry {
    binding,
    visibility: wgpu::ShaderStages::COMPUTE,
    ty: wgpu::BindingType::Buffer {
      ty: wgpu::BufferBindingType::Uniform,
      has_dynamic_offset: false,
      min_binding_size: wgpu::BufferSize::new(size),
    },
    count: None,
  }
}

fn storage_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
  wgpu::BindGroupLayoutEntry {
    binding,
    visibility: wgpu::ShaderStages::COMPUTE,
    ty: wgpu::BindingType::Buffer {
      ty: wgpu::BufferBindingType::Storage { read_only: false },
      has_dynamic_offset: false,
      min_binding_size: wgpu::BufferSize::new(16),
    },
    count: None,
  }
}
