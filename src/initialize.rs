use crate::{ParticlePosition, ParticleVelocity};
use cgmath::{InnerSpace, Vector3};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};

const SPREAD: f32 = 20.0;
const OFFSET: f32 = -10.0;
const MAX_SPEED: f32 = 10.0;
const MASS_RANGE: (f32, f32) = (50000.0, 100000.0);

#[must_use]
pub fn seeded_rng(seed: u64) -> SmallRng {
  SmallRng::seed_from_u64(seed)
}

/// Fills `positions` with normalized random directions mapped into the working
/// volume, each with an independent life value in `[0, 1)`.
pub fn seed_positions(rng: &mut SmallRng, positions: &mut [ParticlePosition]) {
  let unit = Uniform::new(0.0f32, 1.0);
  for p in positions.iter_mut() {
    let dir = loop {
      let v = Vector3::new(unit.sample(rng), unit.sample(rng), unit.sample(rng));
      // zero length cannot be normalized
      if v.magnitude2() > f32::EPSILON {
        break v.normalize();
      }
    };
    let pos = dir * SPREAD + Vector3::new(OFFSET, OFFSET, OFFSET);
    *p = ParticlePosition {
      pos: pos.into(),
      life: unit.sample(rng),
    };
  }
}

pub fn seed_velocities(rng: &mut SmallRng, velocities: &mut [ParticleVelocity]) {
  let speed = Uniform::new(-MAX_SPEED, MAX_SPEED);
  for v in velocities.iter_mut() {
    *v = ParticleVelocity {
      vel: [speed.sample(rng), speed.sample(rng), speed.sample(rng)],
      _pad: 0.0,
    };
  }
}

/// One mass per attractor slot, fixed for the lifetime of the process.
#[must_use]
pub fn attractor_masses(rng: &mut SmallRng, slots: usize) -> Vec<f32> {
  let mass = Uniform::new(MASS_RANGE.0, MASS_RANGE.1);
  (0..slots).map(|_| mass.sample(rng)).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn positions_lie_on_scaled_octant() {
    let mut rng = seeded_rng(1);
    let mut positions = vec![ParticlePosition::default(); 1000];
    seed_positions(&mut rng, &mut positions);
    for p in &positions {
      let dir = Vector3::from(p.pos) - Vector3::new(OFFSET, OFFSET, OFFSET);
      assert!((dir.magnitude() - SPREAD).abs() < 1e-3);
      assert!(p.pos.iter().all(|c| (-10.0..=10.0).contains(c)));
      assert!((0.0..1.0).contains(&p.life));
    }
  }

  #[test]
  fn velocities_bounded_with_zero_padding() {
    let mut rng = seeded_rng(2);
    let mut velocities = vec![ParticleVelocity::default(); 1000];
    seed_velocities(&mut rng, &mut velocities);
    for v in &velocities {
      assert!(v.vel.iter().all(|c| (-MAX_SPEED..MAX_SPEED).contains(c)));
      assert_eq!(v._pad, 0.0);
    }
  }

  #[test]
  fn same_seed_same_particles() {
    let mut a = vec![ParticlePosition::default(); 64];
    let mut b = vec![ParticlePosition::default(); 64];
    seed_positions(&mut seeded_rng(7), &mut a);
    seed_positions(&mut seeded_rng(7), &mut b);
    assert_eq!(a, b);

    let mut c = vec![ParticlePosition::default(); 64];
    seed_positions(&mut seeded_rng(8), &mut c);
    assert_ne!(a, c);
  }

  #[test]
  fn masses_in_range() {
    let masses = attractor_masses(&mut seeded_rng(3), 64);
    assert_eq!(masses.len(), 64);
    assert!(masses
      .iter()
      .all(|m| (MASS_RANGE.0..MASS_RANGE.1).contains(m)));
  }
}
