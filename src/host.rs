//! Host reference of the GPU stages.
//!
//! Keeps a published copy of the particle state (what the draw stage reads)
//! and a working copy (what the integrator writes). The barrier is the only
//! place the working copy becomes the published one.

use crate::camera::DrawUniform;
use crate::frame::{FrameStages, PendingWrites, Visible};
use crate::initialize::{seed_positions, seed_velocities};
use crate::integrator::integrate;
use crate::{Attractor, IntegratorParams, ParticlePosition, ParticleVelocity, MAX_ATTRACTORS};
use rand::rngs::SmallRng;

#[derive(Clone, Debug, PartialEq)]
pub struct ParticleState {
  pub positions: Vec<ParticlePosition>,
  pub velocities: Vec<ParticleVelocity>,
}

impl ParticleState {
  pub fn seeded(rng: &mut SmallRng, count: usize) -> Self {
    let mut positions = vec![ParticlePosition::default(); count];
    let mut velocities = vec![ParticleVelocity::default(); count];
    seed_positions(rng, &mut positions);
    seed_velocities(rng, &mut velocities);
    Self {
      positions,
      velocities,
    }
  }

  pub fn len(&self) -> usize {
    self.positions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }
}

pub struct HostStages {
  published: ParticleState,
  working: ParticleState,
  attractors: Vec<Attractor>,
  attractor_count: u32,
  softening: f32,
  drawn: Vec<ParticlePosition>,
  draws: u64,
}

impl HostStages {
  pub fn new(state: ParticleState, attractor_count: usize, softening: f32) -> Self {
    Self {
      working: state.clone(),
      published: state,
      attractors: vec![Attractor::default(); MAX_ATTRACTORS],
      attractor_count: attractor_count.min(MAX_ATTRACTORS) as u32,
      softening,
      drawn: Vec::new(),
      draws: 0,
    }
  }

  /// State the draw stage currently sees.
  pub fn published(&self) -> &ParticleState {
    &self.published
  }

  /// Positions read by the most recent draw.
  pub fn drawn(&self) -> &[ParticlePosition] {
    &self.drawn
  }

  pub fn draws(&self) -> u64 {
    self.draws
  }

  pub fn attractors(&self) -> &[Attractor] {
    &self.attractors
  }
}

impl FrameStages for HostStages {
  fn update_attractors(&mut self, attractors: &[Attractor]) {
    self.attractors.copy_from_slice(attractors);
  }

  fn integrate(&mut self, dt: f32) -> PendingWrites {
    let params = IntegratorParams {
      dt,
      attractor_count: self.attractor_count,
      softening: self.softening,
      particle_count: self.working.len() as u32,
    };
    self.working.clone_from(&self.published);
    integrate(
      &mut self.working.positions,
      &mut self.working.velocities,
      &self.attractors,
      &params,
    );
    PendingWrites::issued()
  }

  fn barrier(&mut self, writes: PendingWrites) -> Visible {
    std::mem::swap(&mut self.published, &mut self.working);
    Visible::published(writes)
  }

  fn render(&mut self, _visible: &Visible, _uniform: &DrawUniform) -> bool {
    self.drawn.clone_from(&self.published.positions);
    self.draws += 1;
    true
  }
}
