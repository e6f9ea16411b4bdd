//! Host-side reference of the integration kernel in `shaders/particle.wgsl`.
//!
//! Both apply semi-implicit Euler: velocity is advanced first, then position
//! moves by the *updated* velocity.

use crate::{Attractor, IntegratorParams, ParticlePosition, ParticleVelocity};
use cgmath::{InnerSpace, Vector3};

/// Acceleration pulled toward every active attractor.
pub fn acceleration(pos: Vector3<f32>, attractors: &[Attractor], softening: f32) -> Vector3<f32> {
  attractors
    .iter()
    .fold(Vector3::new(0.0, 0.0, 0.0), |acc, a| {
      let d = Vector3::from(a.pos) - pos;
      let r2 = d.magnitude2() + softening;
      if r2 <= 0.0 {
        return acc;
      }
      let inv = r2.sqrt().recip();
      acc + d * (a.mass * inv * inv * inv)
    })
}

pub fn step(
  position: &mut ParticlePosition,
  velocity: &mut ParticleVelocity,
  attractors: &[Attractor],
  params: &IntegratorParams,
) {
  let pos = Vector3::from(position.pos);
  let vel = Vector3::from(velocity.vel) + acceleration(pos, attractors, params.softening) * params.dt;
  position.pos = (pos + vel * params.dt).into();
  velocity.vel = vel.into();
}

/// Advances every particle by one step. Slot `i` of each array is only ever
/// paired with slot `i` of the other.
pub fn integrate(
  positions: &mut [ParticlePosition],
  velocities: &mut [ParticleVelocity],
  attractors: &[Attractor],
  params: &IntegratorParams,
) {
  assert_eq!(positions.len(), velocities.len(), "particle arrays out of step");
  let active = &attractors[..(params.attractor_count as usize).min(attractors.len())];
  for (p, v) in positions.iter_mut().zip(velocities.iter_mut()) {
    step(p, v, active, params);
  }
}
