//! Per-frame sequencing: field update, integration, barrier, draw.
//!
//! The driver is written against [`FrameStages`] so the same loop runs the
//! wgpu pipeline and the host reference in [`crate::host`].

use crate::attractor::AttractorField;
use crate::camera::{DrawUniform, OrbitCamera};
use crate::{Attractor, SimConfig, MAX_ATTRACTORS};

/// Integrator writes that have been issued but are not yet visible to the draw stage.
#[must_use = "integrator writes must pass through a barrier before they are drawn"]
pub struct PendingWrites {
  _private: (),
}

impl PendingWrites {
  pub(crate) fn issued() -> Self {
    Self { _private: () }
  }
}

/// Proof that the current frame's integrator writes are visible to the draw stage.
pub struct Visible {
  _private: (),
}

impl Visible {
  pub(crate) fn published(_writes: PendingWrites) -> Self {
    Self { _private: () }
  }
}

/// The pipeline stages the driver sequences each frame.
pub trait FrameStages {
  /// Replaces the whole attractor buffer. Runs before any dispatch that reads it.
  fn update_attractors(&mut self, attractors: &[Attractor]);

  fn integrate(&mut self, dt: f32) -> PendingWrites;

  /// Orders every write behind `writes` before any later read of the particle buffers.
  fn barrier(&mut self, writes: PendingWrites) -> Visible;

  /// Returns `false` when the frame could not be presented.
  fn render(&mut self, visible: &Visible, uniform: &DrawUniform) -> bool;
}

/// Tracks when the last frame was drawn and turns wall-clock time into a step.
#[derive(Debug, Clone)]
pub struct SimClock {
  last: f64,
  min_step: f64,
  max_step: f64,
}

impl SimClock {
  pub fn new(start: f64, min_step: f64, max_step: f64) -> Self {
    Self {
      last: start,
      min_step,
      max_step,
    }
  }

  /// `None` when less than `min_step` has passed since the last recorded frame.
  pub fn step(&self, now: f64) -> Option<f32> {
    let dt = now - self.last;
    if dt.is_nan() || dt < self.min_step {
      return None;
    }
    Some(dt.clamp(0.0, self.max_step) as f32)
  }

  pub fn record(&mut self, now: f64) {
    self.last = now;
  }

  pub fn last(&self) -> f64 {
    self.last
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
  /// Too soon after the previous frame; nothing ran.
  Throttled,
  Rendered { dt: f32 },
  /// Integrated but not presented; the frame time was not recorded.
  Dropped { dt: f32 },
}

pub struct FrameDriver {
  clock: SimClock,
  field: AttractorField,
  attractors: Vec<Attractor>,
  camera: OrbitCamera,
  uniform: DrawUniform,
  frames: u64,
}

impl FrameDriver {
  pub fn new(config: &SimConfig, field: AttractorField, start: f64) -> Self {
    Self {
      clock: SimClock::new(start, config.min_step, config.max_step),
      field,
      attractors: vec![Attractor::default(); MAX_ATTRACTORS],
      camera: OrbitCamera::new(config.aspect()),
      uniform: DrawUniform::new(),
      frames: 0,
    }
  }

  pub fn tick<S: FrameStages>(&mut self, now: f64, stages: &mut S) -> FrameOutcome {
    let Some(dt) = self.clock.step(now) else {
      return FrameOutcome::Throttled;
    };

    self.field.generate(now, &mut self.attractors);
    stages.update_attractors(&self.attractors);

    let writes = stages.integrate(dt);
    let visible = stages.barrier(writes);

    self.uniform.update_view_proj(&self.camera, now);
    if !stages.render(&visible, &self.uniform) {
      log::warn!("frame at {now:.3}s was not presented");
      return FrameOutcome::Dropped { dt };
    }
    self.clock.record(now);

    self.frames += 1;
    if self.frames % 600 == 0 {
      log::debug!("{} frames, last step {dt:.4}s", self.frames);
    }
    log::trace!("frame {} at {now:.3}s, dt {dt:.4}s", self.frames);
    FrameOutcome::Rendered { dt }
  }

  pub fn frames(&self) -> u64 {
    self.frames
  }

  pub fn clock(&self) -> &SimClock {
    &self.clock
  }

  pub fn attractors(&self) -> &[Attractor] {
    &self.attractors
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Default)]
  struct Recorder {
    calls: Vec<&'static str>,
    dts: Vec<f32>,
    present: bool,
  }

  impl FrameStages for Recorder {
    fn update_attractors(&mut self, _attractors: &[Attractor]) {
      self.calls.push("attractors");
    }

    fn integrate(&mut self, dt: f32) -> PendingWrites {
      self.calls.push("integrate");
      self.dts.push(dt);
      PendingWrites::issued()
    }

    fn barrier(&mut self, writes: PendingWrites) -> Visible {
      self.calls.push("barrier");
      Visible::published(writes)
    }

    fn render(&mut self, _visible: &Visible, _uniform: &DrawUniform) -> bool {
      self.calls.push("render");
      self.present
    }
  }

  fn driver(start: f64) -> FrameDriver {
    let config = SimConfig::default();
    let field = AttractorField::new(vec![60000.0; MAX_ATTRACTORS], config.active_attractors);
    FrameDriver::new(&config, field, start)
  }

  #[test]
  fn stages_run_in_order() {
    let mut stages = Recorder { present: true, ..Default::default() };
    let mut driver = driver(0.0);
    assert_eq!(driver.tick(0.5, &mut stages), FrameOutcome::Rendered { dt: 0.5 });
    assert_eq!(stages.calls, ["attractors", "integrate", "barrier", "render"]);
    assert_eq!(driver.clock().last(), 0.5);
    assert_eq!(driver.frames(), 1);
  }

  #[test]
  fn short_interval_is_throttled() {
    let mut stages = Recorder { present: true, ..Default::default() };
    let mut driver = driver(1.0);
    assert_eq!(driver.tick(1.005, &mut stages), FrameOutcome::Throttled);
    assert!(stages.calls.is_empty());
    assert_eq!(driver.clock().last(), 1.0);
    // the throttled interval still counts toward the next step
    assert_eq!(driver.tick(1.02, &mut stages), FrameOutcome::Rendered { dt: (1.02f64 - 1.0) as f32 });
  }

  #[test]
  fn stall_is_clamped() {
    let mut stages = Recorder { present: true, ..Default::default() };
    let mut driver = driver(0.0);
    assert_eq!(driver.tick(30.0, &mut stages), FrameOutcome::Rendered { dt: 2.0 });
    assert_eq!(stages.dts, [2.0]);
  }

  #[test]
  fn clock_going_backwards_is_throttled() {
    let clock = SimClock::new(10.0, 0.01, 2.0);
    assert_eq!(clock.step(9.0), None);
    assert_eq!(clock.step(f64::NAN), None);
  }

  #[test]
  fn step_stays_within_bounds() {
    let clock = SimClock::new(0.0, 0.01, 2.0);
    for i in 0..10_000 {
      let now = i as f64 * 0.0007 - 1.0;
      if let Some(dt) = clock.step(now) {
        assert!((0.0..=2.0).contains(&dt), "dt {dt} out of range at {now}");
      }
    }
  }

  #[test]
  fn unpresented_frame_is_not_recorded() {
    let mut stages = Recorder::default();
    let mut driver = driver(0.0);
    assert_eq!(driver.tick(0.1, &mut stages), FrameOutcome::Dropped { dt: 0.1 });
    assert_eq!(driver.clock().last(), 0.0);
    assert_eq!(driver.frames(), 0);
  }

  #[test]
  fn attractors_follow_elapsed_time() {
    let mut stages = Recorder { present: true, ..Default::default() };
    let mut driver = driver(0.0);
    driver.tick(0.25, &mut stages);
    let mut expected = vec![Attractor::default(); MAX_ATTRACTORS];
    AttractorField::new(vec![60000.0; MAX_ATTRACTORS], 32).generate(0.25, &mut expected);
    assert_eq!(driver.attractors(), &expected[..]);
  }
}
