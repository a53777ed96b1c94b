//! Frame animation scheduler.
//!
//! [`AnimationScheduler`] owns every running [`AnimationInstance`] and
//! advances them all from one shared clock. Each instance plays its own
//! [`AnimationConfig`] at its own fps and reports, through an optional
//! callback, the frame name it now shows whenever that name's index changes.
//!
//! # State machine
//!
//! An instance is either stopped or playing:
//!
//! - [`create_animation`](AnimationScheduler::create_animation) starts it
//!   stopped on frame 0 and reports frame 0 right away.
//! - [`play`](AnimationScheduler::play) resumes from wherever it is.
//! - [`pause`](AnimationScheduler::pause) keeps frame index and the time
//!   already spent on the current frame.
//! - [`stop`](AnimationScheduler::stop) rewinds to frame 0 and always
//!   reports frame 0, even when it was already there.
//! - [`set_animation`](AnimationScheduler::set_animation) swaps the config,
//!   rewinds, reports the new first frame and leaves play/pause untouched.
//! - A non-looping instance that steps past its last frame freezes there
//!   and stops by itself; its finished callback (if any) fires once.
//!
//! Handles come from a counter that never repeats, so a destroyed handle
//! stays "not found" forever. Every operation on an unknown handle is a
//! silent no-op.
//!
//! # Timing
//!
//! [`tick`](AnimationScheduler::tick) takes an explicit delta in
//! milliseconds. Hosts with a refresh callback can call
//! [`pulse`](AnimationScheduler::pulse) with a timestamp instead and let the
//! scheduler derive the delta. In the ECS the
//! [`animation_scheduler_system`](crate::systems::animation::animation_scheduler_system)
//! feeds it from [`WorldTime`](crate::resources::worldtime::WorldTime).
//! [`shutdown`](AnimationScheduler::shutdown) releases the clock: until
//! [`start`](AnimationScheduler::start) is called again, ticks and pulses
//! are ignored.

use std::fmt;
use std::sync::Arc;

use bevy_ecs::prelude::Resource;
use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::resources::animationlibrary::AnimationConfig;

/// Accumulated time within this many milliseconds of a frame boundary counts
/// as having reached it. The borrowed fraction is not carried over to the
/// next frame, so playback may lag by up to this much per step.
pub const FRAME_TIME_EPSILON_MS: f64 = 0.01;

/// Called with the name of the frame an instance now shows.
pub type FrameCallback = Box<dyn FnMut(&str) + Send + Sync>;

/// Called once when a non-looping instance runs past its last frame.
pub type FinishedCallback = Box<dyn FnMut(AnimationId) + Send + Sync>;

/// Opaque handle to an animation instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(u64);

impl AnimationId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AnimationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anim_{}", self.0)
    }
}

/// Runtime state of one playing (or paused) animation.
pub struct AnimationInstance {
    pub id: AnimationId,
    pub sheet_id: String,
    config: Arc<AnimationConfig>,
    frame_index: usize,
    playing: bool,
    elapsed_ms: f64,
    on_frame_change: Option<FrameCallback>,
    on_finished: Option<FinishedCallback>,
}

impl AnimationInstance {
    pub fn config(&self) -> &Arc<AnimationConfig> {
        &self.config
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Time spent on the current frame, in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn current_frame(&self) -> Option<&str> {
        self.config.frames.get(self.frame_index).map(String::as_str)
    }

    fn notify(&mut self) {
        if let (Some(callback), Some(name)) = (
            self.on_frame_change.as_mut(),
            self.config.frames.get(self.frame_index),
        ) {
            callback(name);
        }
    }

    fn rewind(&mut self) {
        self.frame_index = 0;
        self.elapsed_ms = 0.0;
    }

    /// Advance by `delta_ms`, firing at most one frame-change notification.
    fn advance(&mut self, delta_ms: f64) {
        if !self.playing {
            return;
        }
        let frame_count = self.config.frames.len();
        if frame_count == 0 || !(self.config.fps > 0.0) {
            return;
        }

        let frame_duration = self.config.frame_duration_ms();
        self.elapsed_ms += delta_ms.max(0.0);

        let steps = ((self.elapsed_ms + FRAME_TIME_EPSILON_MS) / frame_duration).floor();
        if steps < 1.0 {
            return;
        }
        self.elapsed_ms = (self.elapsed_ms - steps * frame_duration).max(0.0);

        let start_index = self.frame_index;
        let steps = steps as usize;
        let mut finished = false;

        if self.config.looped {
            self.frame_index = (self.frame_index + steps % frame_count) % frame_count;
        } else {
            let target = self.frame_index.saturating_add(steps);
            if target >= frame_count {
                self.frame_index = frame_count - 1;
                self.playing = false;
                self.elapsed_ms = 0.0;
                finished = true;
            } else {
                self.frame_index = target;
            }
        }

        if self.frame_index != start_index {
            trace!("{} -> frame {}", self.id, self.frame_index);
            self.notify();
        }
        if finished {
            debug!("{} finished on frame {}", self.id, self.frame_index);
            if let Some(callback) = self.on_finished.as_mut() {
                callback(self.id);
            }
        }
    }
}

/// Registry of animation instances driven by one shared clock.
#[derive(Resource)]
pub struct AnimationScheduler {
    instances: FxHashMap<AnimationId, AnimationInstance>,
    next_id: u64,
    running: bool,
    last_pulse_ms: Option<f64>,
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationScheduler {
    /// Create an empty scheduler with its clock subscription active.
    pub fn new() -> Self {
        Self {
            instances: FxHashMap::default(),
            next_id: 0,
            running: true,
            last_pulse_ms: None,
        }
    }

    /// Register a new stopped instance on frame 0.
    ///
    /// `on_frame_change` is called immediately with the first frame name so
    /// the caller can show it without waiting for a tick.
    pub fn create_animation(
        &mut self,
        sheet_id: impl Into<String>,
        config: Arc<AnimationConfig>,
        on_frame_change: Option<FrameCallback>,
    ) -> AnimationId {
        self.next_id += 1;
        let id = AnimationId(self.next_id);
        let mut instance = AnimationInstance {
            id,
            sheet_id: sheet_id.into(),
            config,
            frame_index: 0,
            playing: false,
            elapsed_ms: 0.0,
            on_frame_change,
            on_finished: None,
        };
        debug!(
            "Created {} ('{}' on sheet '{}')",
            id, instance.config.name, instance.sheet_id
        );
        instance.notify();
        self.instances.insert(id, instance);
        id
    }

    /// Set (or replace) the callback fired when a non-looping instance ends.
    pub fn set_on_finished(&mut self, id: AnimationId, callback: FinishedCallback) {
        if let Some(instance) = self.instances.get_mut(&id) {
            instance.on_finished = Some(callback);
        }
    }

    pub fn play(&mut self, id: AnimationId) {
        if let Some(instance) = self.instances.get_mut(&id) {
            instance.playing = true;
        }
    }

    /// Stop advancing but keep frame index and elapsed time.
    pub fn pause(&mut self, id: AnimationId) {
        if let Some(instance) = self.instances.get_mut(&id) {
            instance.playing = false;
        }
    }

    /// Stop and rewind to frame 0. Always reports frame 0.
    pub fn stop(&mut self, id: AnimationId) {
        if let Some(instance) = self.instances.get_mut(&id) {
            instance.playing = false;
            instance.rewind();
            instance.notify();
        }
    }

    /// Swap the instance's config and rewind. Play/pause state is kept.
    pub fn set_animation(&mut self, id: AnimationId, config: Arc<AnimationConfig>) {
        if let Some(instance) = self.instances.get_mut(&id) {
            instance.config = config;
            instance.rewind();
            instance.notify();
        }
    }

    pub fn destroy(&mut self, id: AnimationId) {
        if self.instances.remove(&id).is_some() {
            debug!("Destroyed {}", id);
        }
    }

    pub fn current_frame(&self, id: AnimationId) -> Option<&str> {
        self.instances.get(&id)?.current_frame()
    }

    pub fn frame_index(&self, id: AnimationId) -> Option<usize> {
        self.instances.get(&id).map(AnimationInstance::frame_index)
    }

    pub fn is_playing(&self, id: AnimationId) -> Option<bool> {
        self.instances.get(&id).map(AnimationInstance::is_playing)
    }

    pub fn sheet_id(&self, id: AnimationId) -> Option<&str> {
        self.instances.get(&id).map(|i| i.sheet_id.as_str())
    }

    pub fn config(&self, id: AnimationId) -> Option<&Arc<AnimationConfig>> {
        self.instances.get(&id).map(AnimationInstance::config)
    }

    pub fn instance(&self, id: AnimationId) -> Option<&AnimationInstance> {
        self.instances.get(&id)
    }

    pub fn contains(&self, id: AnimationId) -> bool {
        self.instances.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Advance every playing instance by `delta_ms` milliseconds.
    ///
    /// Contract
    /// - Each playing instance accumulates the delta and takes as many whole
    ///   frame steps (`1000 / fps` ms each) as the accumulator covers.
    /// - Looping instances wrap to frame 0; non-looping ones freeze on the
    ///   last frame and stop.
    /// - If the index changed, the frame-change callback fires once with the
    ///   final frame of this tick; skipped frames are not reported.
    /// - Instance order within a tick is unspecified.
    pub fn tick(&mut self, delta_ms: f64) {
        if !self.running {
            return;
        }
        for instance in self.instances.values_mut() {
            instance.advance(delta_ms);
        }
    }

    /// Tick using a timestamp from the host's refresh signal.
    ///
    /// The delta is measured from the previous pulse. The first pulse after
    /// [`start`](Self::start) only records the timestamp; a clock that moves
    /// backwards yields a zero delta.
    pub fn pulse(&mut self, now_ms: f64) {
        if !self.running {
            return;
        }
        let delta = match self.last_pulse_ms {
            Some(last) => (now_ms - last).max(0.0),
            None => 0.0,
        };
        self.last_pulse_ms = Some(now_ms);
        self.tick(delta);
    }

    /// Subscribe to the clock again after [`shutdown`](Self::shutdown).
    pub fn start(&mut self) {
        if !self.running {
            debug!("Animation clock started");
        }
        self.running = true;
        self.last_pulse_ms = None;
    }

    /// Release the clock subscription. Instances are kept but frozen.
    pub fn shutdown(&mut self) {
        if self.running {
            debug!("Animation clock stopped");
        }
        self.running = false;
        self.last_pulse_ms = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}
