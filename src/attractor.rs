//! The moving mass points that pull the particle cloud around.
//!
//! Positions are a pure function of elapsed time and slot index. Masses are
//! chosen once at startup and never change.

use crate::{Attractor, MAX_ATTRACTORS};

/// One `sin`/`cos` term: `f(t * (slot + slot_offset) * rate)`.
#[derive(Copy, Clone, Debug)]
pub struct Wave {
  pub slot_offset: f64,
  pub rate: f64,
}

impl Wave {
  fn phase(&self, t: f64, slot: usize) -> f64 {
    t * (slot as f64 + self.slot_offset) * self.rate
  }
}

#[derive(Copy, Clone, Debug)]
pub struct OrbitTuning {
  pub x: Wave,
  pub y: Wave,
  pub z: (Wave, Wave),
  pub amplitude: [f64; 3],
}

impl Default for OrbitTuning {
  fn default() -> Self {
    Self {
      x: Wave { slot_offset: 4.0, rate: 7.5 * 20.0 },
      y: Wave { slot_offset: 7.0, rate: 3.9 * 20.0 },
      z: (
        Wave { slot_offset: 3.0, rate: 5.3 * 20.0 },
        Wave { slot_offset: 5.0, rate: 9.1 },
      ),
      amplitude: [50.0, 50.0, 100.0],
    }
  }
}

pub struct AttractorField {
  masses: Vec<f32>,
  active: usize,
  tuning: OrbitTuning,
}

impl AttractorField {
  /// `masses` holds one entry per capacity slot; only the first `active` are animated.
  pub fn new(masses: Vec<f32>, active: usize) -> Self {
    let active = active.min(masses.len()).min(MAX_ATTRACTORS);
    Self {
      masses,
      active,
      tuning: OrbitTuning::default(),
    }
  }

  pub fn with_tuning(mut self, tuning: OrbitTuning) -> Self {
    self.tuning = tuning;
    self
  }

  pub fn active(&self) -> usize {
    self.active
  }

  pub fn position(&self, t: f64, slot: usize) -> [f32; 3] {
    let tuning = &self.tuning;
    let [ax, ay, az] = tuning.amplitude;
    let x = tuning.x.phase(t, slot).sin() * ax;
    let y = tuning.y.phase(t, slot).cos() * ay;
    let z = tuning.z.0.phase(t, slot).sin() * tuning.z.1.phase(t, slot).cos() * az;
    [x as f32, y as f32, z as f32]
  }

  /// Overwrites `out` with the field at time `t`. Slots past the active count are zeroed.
  pub fn generate(&self, t: f64, out: &mut [Attractor]) {
    for (slot, a) in out.iter_mut().enumerate() {
      *a = if slot < self.active {
        Attractor {
          pos: self.position(t, slot),
          mass: self.masses[slot],
        }
      } else {
        Attractor::default()
      };
    }
  }
}

/// GPU copy of the field, sized for the full slot capacity.
pub struct AttractorBuffer {
  buffer: wgpu::Buffer,
}

impl AttractorBuffer {
  pub const SIZE: u64 = (MAX_ATTRACTORS * std::mem::size_of::<Attractor>()) as u64;

  pub fn new(device: &wgpu::Device) -> Self {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
      label: Some("Attractor Buffer"),
      size: Self::SIZE,
      usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
      mapped_at_creation: false,
    });
    Self { buffer }
  }

  /// Replaces the whole buffer in one write. `attractors` must cover every slot.
  pub fn upload(&self, queue: &wgpu::Queue, attractors: &[Attractor]) {
    debug_assert_eq!(attractors.len(), MAX_ATTRACTORS);
    queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(attractors));
  }

  pub fn binding(&self) -> wgpu::BindingResource<'_> {
    self.buffer.as_entire_binding()
  }

  pub fn release(self) {
    self.buffer.destroy();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn field() -> AttractorField {
    let masses = (0..MAX_ATTRACTORS).map(|i| 50000.0 + i as f32).collect();
    AttractorField::new(masses, 32)
  }

  #[test]
  fn same_time_same_field() {
    let field = field();
    let mut a = vec![Attractor::default(); MAX_ATTRACTORS];
    let mut b = vec![Attractor::default(); MAX_ATTRACTORS];
    field.generate(12.345, &mut a);
    field.generate(99.0, &mut b);
    field.generate(12.345, &mut b);
    assert_eq!(a, b);
  }

  #[test]
  fn inactive_slots_are_zeroed() {
    let field = field();
    let mut out = vec![Attractor { pos: [1.0; 3], mass: 1.0 }; MAX_ATTRACTORS];
    field.generate(3.0, &mut out);
    assert!(out[..32].iter().all(|a| a.mass >= 50000.0));
    assert!(out[32..].iter().all(|a| *a == Attractor::default()));
  }

  #[test]
  fn masses_do_not_animate() {
    let field = field();
    let mut early = vec![Attractor::default(); MAX_ATTRACTORS];
    let mut late = vec![Attractor::default(); MAX_ATTRACTORS];
    field.generate(0.5, &mut early);
    field.generate(500.0, &mut late);
    for (e, l) in early.iter().zip(&late) {
      assert_eq!(e.mass, l.mass);
    }
  }

  #[test]
  fn positions_stay_within_amplitude() {
    let field = field();
    let mut out = vec![Attractor::default(); MAX_ATTRACTORS];
    for step in 0..2000 {
      field.generate(step as f64 * 0.0137, &mut out);
      for a in &out[..field.active()] {
        assert!(a.pos[0].abs() <= 50.0);
        assert!(a.pos[1].abs() <= 50.0);
        assert!(a.pos[2].abs() <= 100.0);
      }
    }
  }

  #[test]
  fn slots_move_out_of_phase() {
    let field = field();
    let t = 0.01;
    assert_ne!(field.position(t, 0), field.position(t, 1));
  }

  #[test]
  fn motion_is_continuous() {
    let field = field();
    let eps = 1e-7;
    for slot in 0..field.active() {
      let a = field.position(1.0, slot);
      let b = field.position(1.0 + eps, slot);
      for axis in 0..3 {
        assert!((a[axis] - b[axis]).abs() < 0.1);
      }
    }
  }

  #[test]
  fn active_count_clamped_to_masses() {
    let field = AttractorField::new(vec![1.0; 4], 32);
    assert_eq!(field.active(), 4);
  }
}
