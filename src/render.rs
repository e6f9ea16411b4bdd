use crate::camera::DrawUniform;
use crate::error::build_checked;
use crate::store::ParticleStore;
use crate::SimError;
use std::borrow::Cow;
use wgpu::{util::DeviceExt, PipelineCompilationOptions};

pub const DRAW_SHADER: &str = r#"
struct Draw {
    view_proj: mat4x4<f32>,
    cold: vec4<f32>,
    hot: vec4<f32>,
};

@group(0) @binding(0) var<uniform> draw: Draw;

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) life: f32,
};

@vertex
fn main_vs(@location(0) vert: vec4<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip = draw.view_proj * vec4<f32>(vert.xyz, 1.0);
    out.life = vert.w;
    return out;
}

@fragment
fn main_fs(v: VertexOutput) -> @location(0) vec4<f32> {
    return mix(draw.cold, draw.hot, v.life);
}
"#;

/// Contributions sum, so overlapping particles brighten instead of occluding.
pub const ADDITIVE: wgpu::BlendState = wgpu::BlendState {
  color: wgpu::BlendComponent {
    src_factor: wgpu::BlendFactor::One,
    dst_factor: wgpu::BlendFactor::One,
    operation: wgpu::BlendOperation::Add,
  },
  alpha: wgpu::BlendComponent {
    src_factor: wgpu::BlendFactor::One,
    dst_factor: wgpu::BlendFactor::One,
    operation: wgpu::BlendOperation::Add,
  },
};

/// The draw stage: one point per particle, read straight from the position buffer.
pub struct Renderer {
  render_pipeline: wgpu::RenderPipeline,
  uniform_buffer: wgpu::Buffer,
  bind_group: wgpu::BindGroup,
  particle_count: u32,
}

impl Renderer {
  pub async fn new(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    particle_count: u32,
  ) -> Result<Self, SimError> {
    let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Draw Uniform Buffer"),
      contents: bytemuck::bytes_of(&DrawUniform::new()),
      usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let (render_pipeline, bind_group) = build_checked(device, "draw", || {
      let draw_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("draw"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(DRAW_SHADER)),
      });

      let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
          binding: 0,
          visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
          ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniform>() as _),
          },
          count: None,
        }],
        label: Some("draw_bind_group_layout"),
      });
      let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("render"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
      });
      let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Render Pipeline"),
        layout: Some(&render_pipeline_layout),
        vertex: wgpu::VertexState {
          module: &draw_shader,
          entry_point: "main_vs",
          compilation_options: PipelineCompilationOptions::default(),
          buffers: &[ParticleStore::vertex_layout()],
        },
        fragment: Some(wgpu::FragmentState {
          module: &draw_shader,
          entry_point: "main_fs",
          compilation_options: PipelineCompilationOptions::default(),
          targets: &[Some(wgpu::ColorTargetState {
            format,
            blend: Some(ADDITIVE),
            write_mask: wgpu::ColorWrites::ALL,
          })],
        }),
        primitive: wgpu::PrimitiveState {
          topology: wgpu::PrimitiveTopology::PointList,
          ..Default::default()
        },
        // no depth test: additive blending makes draw order irrelevant
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
      });

      let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
          binding: 0,
          resource: uniform_buffer.as_entire_binding(),
        }],
        label: Some("draw_bind_group"),
      });
      (render_pipeline, bind_group)
    })
    .await?;

    Ok(Renderer {
      render_pipeline,
      uniform_buffer,
      bind_group,
      particle_count,
    })
  }

  pub fn render(
    &self,
    view: &wgpu::TextureView,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    store: &ParticleStore,
    uniform: &DrawUniform,
  ) {
    queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniform));

    let color_attachments = [Some(wgpu::RenderPassColorAttachment {
      view,
      resolve_target: None,
      ops: wgpu::Operations {
        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
        store: wgpu::StoreOp::Store,
      },
    })];
    let render_pass_descriptor = wgpu::RenderPassDescriptor {
      label: Some("draw"),
      color_attachments: &color_attachments,
      depth_stencil_attachment: None,
      timestamp_writes: None,
      occlusion_query_set: None,
    };
    let mut command_encoder =
      device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("draw") });
    {
      let mut rpass = command_encoder.begin_render_pass(&render_pass_descriptor);
      rpass.set_pipeline(&self.render_pipeline);
      rpass.set_bind_group(0, &self.bind_group, &[]);
      rpass.set_vertex_buffer(0, store.positions().slice(..));
      rpass.draw(0..self.particle_count, 0..1);
    }
    queue.submit(Some(command_encoder.finish()));
  }

  pub fn release(self) {
    self.uniform_buffer.destroy();
  }
}
