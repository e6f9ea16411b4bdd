use attractor_sim::attractor::AttractorField;
use attractor_sim::camera::DrawUniform;
use attractor_sim::compute::Integrator;
use attractor_sim::frame::{FrameDriver, FrameOutcome, FrameStages};
use attractor_sim::host::{HostStages, ParticleState};
use attractor_sim::initialize::{attractor_masses, seeded_rng};
use attractor_sim::{
  Attractor, ParticlePosition, ParticleVelocity, SimConfig, SimError, MAX_ATTRACTORS,
};
use std::path::Path;

fn bits(state: &ParticleState) -> (Vec<u32>, Vec<u32>) {
  (
    bytemuck::cast_slice(&state.positions).to_vec(),
    bytemuck::cast_slice(&state.velocities).to_vec(),
  )
}

fn small_config() -> SimConfig {
  SimConfig {
    particle_count: 512,
    ..Default::default()
  }
}

fn setup(config: &SimConfig) -> (FrameDriver, HostStages) {
  let mut rng = seeded_rng(config.seed);
  let state = ParticleState::seeded(&mut rng, config.particle_count as usize);
  let field = AttractorField::new(
    attractor_masses(&mut rng, MAX_ATTRACTORS),
    config.active_attractors,
  );
  (
    FrameDriver::new(config, field, 0.0),
    HostStages::new(state, config.active_attractors, config.softening),
  )
}

#[test]
fn one_particle_one_attractor() {
  let mass = 80000.0;
  let state = ParticleState {
    positions: vec![ParticlePosition::default()],
    velocities: vec![ParticleVelocity::default()],
  };
  let mut stages = HostStages::new(state, 1, 0.0);
  let mut attractors = vec![Attractor::default(); MAX_ATTRACTORS];
  attractors[0] = Attractor { pos: [10.0, 0.0, 0.0], mass };

  stages.update_attractors(&attractors);
  let writes = stages.integrate(1.0);
  let visible = stages.barrier(writes);
  assert!(stages.render(&visible, &DrawUniform::new()));

  // inverse square at distance 10; position moves by the updated velocity
  let expected = mass / 100.0;
  let p = stages.published().positions[0];
  let v = stages.published().velocities[0];
  assert!((v.vel[0] - expected).abs() < expected * 1e-5);
  assert_eq!([v.vel[1], v.vel[2]], [0.0, 0.0]);
  assert!((p.pos[0] - expected).abs() < expected * 1e-5);
  assert_eq!([p.pos[1], p.pos[2]], [0.0, 0.0]);
  assert_eq!(stages.drawn(), &[p]);
}

#[test]
fn throttled_iteration_leaves_state_untouched() {
  let config = small_config();
  let (mut driver, mut stages) = setup(&config);

  assert!(matches!(driver.tick(0.5, &mut stages), FrameOutcome::Rendered { .. }));
  let before = bits(stages.published());
  let draws = stages.draws();

  assert_eq!(driver.tick(0.505, &mut stages), FrameOutcome::Throttled);
  assert_eq!(bits(stages.published()), before);
  assert_eq!(stages.draws(), draws);
}

#[test]
fn zero_step_leaves_state_untouched() {
  let config = small_config();
  let mut rng = seeded_rng(config.seed);
  let state = ParticleState::seeded(&mut rng, 64);
  let before = bits(&state);
  let mut stages = HostStages::new(state, config.active_attractors, config.softening);

  let mut attractors = vec![Attractor::default(); MAX_ATTRACTORS];
  AttractorField::new(attractor_masses(&mut rng, MAX_ATTRACTORS), 32).generate(3.0, &mut attractors);
  stages.update_attractors(&attractors);
  let writes = stages.integrate(0.0);
  stages.barrier(writes);
  assert_eq!(bits(stages.published()), before);
}

#[test]
fn driver_steps_within_clamp() {
  let config = small_config();
  let (mut driver, mut stages) = setup(&config);
  let times = [0.001, 0.02, 0.021, 0.5, 0.49, 9.0, 9.005, 9.5];
  for now in times {
    match driver.tick(now, &mut stages) {
      FrameOutcome::Rendered { dt } | FrameOutcome::Dropped { dt } => {
        assert!(dt >= 0.0 && dt as f64 <= config.max_step);
      }
      FrameOutcome::Throttled => {}
    }
  }
  assert_eq!(driver.frames(), 4);
}

#[test]
fn particles_keep_their_slots_across_frames() {
  let config = small_config();
  let (mut driver, mut stages) = setup(&config);
  let lives: Vec<f32> = stages.published().positions.iter().map(|p| p.life).collect();

  for frame in 1..=20 {
    driver.tick(frame as f64 * 0.016, &mut stages);
  }
  let state = stages.published();
  assert_eq!(state.positions.len(), state.velocities.len());
  assert_eq!(state.len(), config.particle_count as usize);
  for (p, life) in state.positions.iter().zip(&lives) {
    assert_eq!(p.life, *life);
  }
  assert!(state.velocities.iter().all(|v| v._pad == 0.0));
}

#[test]
fn drawn_frame_matches_published_state() {
  let config = small_config();
  let (mut driver, mut stages) = setup(&config);
  driver.tick(0.1, &mut stages);
  assert_eq!(stages.drawn(), &stages.published().positions[..]);
}

#[test]
fn missing_kernel_is_fatal() {
  let err = Integrator::load_kernel(Path::new("does/not/exist.wgsl")).unwrap_err();
  assert!(matches!(err, SimError::ShaderSource { .. }));
  assert!(err.to_string().contains("does/not/exist.wgsl"));
}
