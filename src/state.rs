use crate::attractor::{AttractorBuffer, AttractorField};
use crate::camera::DrawUniform;
use crate::compute::Integrator;
use crate::frame::{FrameDriver, FrameOutcome, FrameStages, PendingWrites, Visible};
use crate::initialize::{attractor_masses, seeded_rng};
use crate::render::Renderer;
use crate::store::ParticleStore;
use crate::{Attractor, SimConfig, SimError, MAX_ATTRACTORS};
use rand::rngs::SmallRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::event::ElementState;
use winit::keyboard::*;
use winit::{
  dpi::PhysicalSize,
  event::{Event, KeyEvent, WindowEvent},
  event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
  window::Window,
};

const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

pub struct GpuContext {
  pub adapter: wgpu::Adapter,
  pub device: wgpu::Device,
  pub queue: wgpu::Queue,
}

impl GpuContext {
  pub fn instance() -> wgpu::Instance {
    wgpu::Instance::new(wgpu::InstanceDescriptor {
      #[cfg(not(target_arch = "wasm32"))]
      backends: wgpu::Backends::PRIMARY,
      ..Default::default()
    })
  }

  pub async fn new(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'_>>,
  ) -> Result<Self, SimError> {
    let adapter = instance
      .request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: surface,
        force_fallback_adapter: false,
      })
      .await
      .ok_or(SimError::NoAdapter)?;
    let info = adapter.get_info();
    log::info!("using adapter {} ({:?})", info.name, info.backend);

    // the particle buffers need the adapter's full storage binding size
    let (device, queue) = adapter
      .request_device(
        &wgpu::DeviceDescriptor {
          label: Some("attractor-sim"),
          required_features: wgpu::Features::empty(),
          required_limits: adapter.limits(),
          memory_hints: wgpu::MemoryHints::Performance,
        },
        None,
      )
      .await?;

    Ok(Self {
      adapter,
      device,
      queue,
    })
  }
}

pub struct SurfaceWrapper {
  surface: wgpu::Surface<'static>,
  config: wgpu::SurfaceConfiguration,
}

impl SurfaceWrapper {
  pub fn new(
    context: &GpuContext,
    surface: wgpu::Surface<'static>,
    size: PhysicalSize<u32>,
  ) -> Result<Self, SimError> {
    let width = size.width.max(1);
    let height = size.height.max(1);
    let mut config = surface
      .get_default_config(&context.adapter, width, height)
      .ok_or(SimError::SurfaceUnsupported)?;
    let view_format = config.format.add_srgb_suffix();
    config.view_formats.push(view_format);
    surface.configure(&context.device, &config);
    Ok(Self { surface, config })
  }

  fn format(&self) -> wgpu::TextureFormat {
    self.config.view_formats[0]
  }

  fn acquire(&self, device: &wgpu::Device) -> Option<wgpu::SurfaceTexture> {
    let retry = match self.surface.get_current_texture() {
      Ok(frame) => return Some(frame),
      Err(wgpu::SurfaceError::Timeout) => self.surface.get_current_texture(),
      Err(
        wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost | wgpu::SurfaceError::OutOfMemory,
      ) => {
        self.surface.configure(device, &self.config);
        self.surface.get_current_texture()
      }
    };
    retry
      .map_err(|err| log::warn!("surface unavailable: {err}"))
      .ok()
  }
}

/// Where the draw stage writes: the window, or a texture of the same size when headless.
pub enum RenderTarget {
  Window(SurfaceWrapper),
  Offscreen {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
  },
}

impl RenderTarget {
  pub fn offscreen(device: &wgpu::Device, width: u32, height: u32) -> Self {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
      label: Some("Offscreen Target"),
      size: wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
      },
      mip_level_count: 1,
      sample_count: 1,
      dimension: wgpu::TextureDimension::D2,
      format: OFFSCREEN_FORMAT,
      usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
      view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    RenderTarget::Offscreen { texture, view }
  }

  fn format(&self) -> wgpu::TextureFormat {
    match self {
      RenderTarget::Window(surface) => surface.format(),
      RenderTarget::Offscreen { .. } => OFFSCREEN_FORMAT,
    }
  }
}

/// The wgpu realization of the frame stages. Owns every GPU resource of the simulation.
pub struct GpuStages {
  context: GpuContext,
  target: RenderTarget,
  store: ParticleStore,
  attractors: AttractorBuffer,
  integrator: Integrator,
  renderer: Renderer,
  compute: Option<wgpu::CommandEncoder>,
}

impl GpuStages {
  pub async fn new(
    context: GpuContext,
    target: RenderTarget,
    config: &SimConfig,
    kernel: &str,
    rng: &mut SmallRng,
  ) -> Result<Self, SimError> {
    let device = &context.device;
    let store = ParticleStore::new(device, config.particle_count, rng).await?;
    let attractors = AttractorBuffer::new(device);
    let integrator = Integrator::new(device, config, &store, &attractors, kernel).await?;
    let renderer = Renderer::new(device, target.format(), store.count()).await?;
    Ok(Self {
      context,
      target,
      store,
      attractors,
      integrator,
      renderer,
      compute: None,
    })
  }

  /// Destroys every buffer and texture the simulation allocated.
  pub fn release(self) {
    self.store.release();
    self.attractors.release();
    self.integrator.release();
    self.renderer.release();
    if let RenderTarget::Offscreen { texture, .. } = self.target {
      texture.destroy();
    }
    log::info!("released GPU resources");
  }
}

impl FrameStages for GpuStages {
  fn update_attractors(&mut self, attractors: &[Attractor]) {
    self.attractors.upload(&self.context.queue, attractors);
  }

  fn integrate(&mut self, dt: f32) -> PendingWrites {
    self.integrator.set_step(&self.context.queue, dt);
    let mut encoder = self
      .context
      .device
      .create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("integrate"),
      });
    self.integrator.encode(&mut encoder);
    self.compute = Some(encoder);
    PendingWrites::issued()
  }

  fn barrier(&mut self, writes: PendingWrites) -> Visible {
    // The draw submission is queued after this one; wgpu transitions the
    // particle buffers from storage writes to vertex reads between the two.
    if let Some(encoder) = self.compute.take() {
      self.context.queue.submit(Some(encoder.finish()));
    }
    Visible::published(writes)
  }

  fn render(&mut self, _visible: &Visible, uniform: &DrawUniform) -> bool {
    let GpuContext { device, queue, .. } = &self.context;
    match &self.target {
      RenderTarget::Window(surface) => {
        let Some(frame) = surface.acquire(device) else {
          return false;
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor {
          format: Some(surface.format()),
          ..wgpu::TextureViewDescriptor::default()
        });
        self.renderer.render(&view, device, queue, &self.store, uniform);
        frame.present();
      }
      RenderTarget::Offscreen { view, .. } => {
        self.renderer.render(view, device, queue, &self.store, uniform);
        let _ = device.poll(wgpu::Maintain::Wait);
      }
    }
    true
  }
}

fn build_field(config: &SimConfig, rng: &mut SmallRng) -> AttractorField {
  let masses = attractor_masses(rng, MAX_ATTRACTORS);
  log::info!(
    "{} of {MAX_ATTRACTORS} attractor slots active",
    config.active_attractors
  );
  AttractorField::new(masses, config.active_attractors)
}

pub fn run(config: SimConfig) -> Result<(), SimError> {
  config.validate()?;
  let kernel = Integrator::load_kernel(&config.kernel_path)?;

  let event_loop = EventLoop::new()?;
  let window = Arc::new(
    winit::window::WindowBuilder::new()
      .with_title("Attractor Sim")
      .with_inner_size(PhysicalSize::new(config.width, config.height))
      .with_resizable(false)
      .build(&event_loop)?,
  );

  let instance = GpuContext::instance();
  let surface = instance.create_surface(window.clone())?;
  let mut rng = seeded_rng(config.seed);
  let stages = pollster::block_on(async {
    let context = GpuContext::new(&instance, Some(&surface)).await?;
    let target = RenderTarget::Window(SurfaceWrapper::new(&context, surface, window.inner_size())?);
    GpuStages::new(context, target, &config, &kernel, &mut rng).await
  })?;
  let field = build_field(&config, &mut rng);

  let mut driver = FrameDriver::new(&config, field, 0.0);
  let mut stages = Some(stages);
  let start = Instant::now();
  log::info!("running {} particles", config.particle_count);

  event_loop.run(move |event, target: &EventLoopWindowTarget<()>| {
    target.set_control_flow(ControlFlow::Poll);
    match event {
      Event::AboutToWait => window.request_redraw(),
      Event::WindowEvent { event, window_id } if window_id == window.id() => match event {
        WindowEvent::CloseRequested
        | WindowEvent::KeyboardInput {
          event:
            KeyEvent {
              state: ElementState::Pressed,
              physical_key: PhysicalKey::Code(KeyCode::Escape),
              ..
            },
          ..
        } => target.exit(),
        WindowEvent::RedrawRequested => {
          if let Some(stages) = stages.as_mut() {
            driver.tick(start.elapsed().as_secs_f64(), stages);
          }
        }
        _ => {}
      },
      Event::LoopExiting => {
        if let Some(stages) = stages.take() {
          log::info!("close requested after {} frames", driver.frames());
          stages.release();
        }
      }
      _ => {}
    }
  })?;
  Ok(())
}

/// Runs the same pipeline into an offscreen texture until `frames` have been
/// drawn or Ctrl-C is pressed.
pub fn run_headless(config: SimConfig, frames: Option<u64>) -> Result<(), SimError> {
  config.validate()?;
  let kernel = Integrator::load_kernel(&config.kernel_path)?;

  let stop = Arc::new(AtomicBool::new(false));
  {
    let stop = stop.clone();
    ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))?;
  }

  let instance = GpuContext::instance();
  let mut rng = seeded_rng(config.seed);
  let mut stages = pollster::block_on(async {
    let context = GpuContext::new(&instance, None).await?;
    let target = RenderTarget::offscreen(&context.device, config.width, config.height);
    GpuStages::new(context, target, &config, &kernel, &mut rng).await
  })?;
  let field = build_field(&config, &mut rng);

  let mut driver = FrameDriver::new(&config, field, 0.0);
  let start = Instant::now();
  log::info!("running {} particles headless", config.particle_count);

  while !stop.load(Ordering::SeqCst) && frames.map_or(true, |n| driver.frames() < n) {
    if driver.tick(start.elapsed().as_secs_f64(), &mut stages) == FrameOutcome::Throttled {
      std::thread::sleep(Duration::from_millis(1));
    }
  }

  let elapsed = start.elapsed().as_secs_f64();
  log::info!(
    "{} frames in {elapsed:.2}s ({:.1} fps)",
    driver.frames(),
    driver.frames() as f64 / elapsed.max(f64::EPSILON)
  );
  stages.release();
  Ok(())
}
