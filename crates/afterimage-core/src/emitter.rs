//! The trail emitter: owns the pool and decides every tick what to stamp.

use std::fmt;

use afterimage_host::{ActorFactory, NodeId, TrailActor, Transition};
use glam::Vec2;
use tracing::{debug, info, warn};

use crate::config::{
    checked_pool_capacity, spawn_period_frames, EmitterConfig, MotionType, MOVE_TARGET_LERP,
};
use crate::error::Result;
use crate::follow::{FollowChain, FollowTracker};
use crate::history::PositionHistory;
use crate::pool::{SlotId, TrailPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StampMotion {
    Static,
    MoveOut,
    MoveIn,
}

/// Spawn strategy, picked from the motion type. Follow state only exists in `Follow`.
#[derive(Debug)]
enum Mode {
    Stamp(StampMotion),
    Follow(FollowChain),
}

impl Mode {
    fn new(motion_type: MotionType, follow_frames_span: usize, follow_trail_count: usize) -> Self {
        match motion_type {
            MotionType::Static => Mode::Stamp(StampMotion::Static),
            MotionType::MoveOut => Mode::Stamp(StampMotion::MoveOut),
            MotionType::MoveIn => Mode::Stamp(StampMotion::MoveIn),
            MotionType::Follow => {
                Mode::Follow(FollowChain::new(follow_frames_span, follow_trail_count))
            }
        }
    }

    fn motion_type(&self) -> MotionType {
        match self {
            Mode::Stamp(StampMotion::Static) => MotionType::Static,
            Mode::Stamp(StampMotion::MoveOut) => MotionType::MoveOut,
            Mode::Stamp(StampMotion::MoveIn) => MotionType::MoveIn,
            Mode::Follow(_) => MotionType::Follow,
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub spawned: Option<SlotId>,
    /// Follow trail hidden this tick.
    pub retired: Option<SlotId>,
}

pub struct TrailEmitter<A> {
    container: A,
    pool: TrailPool<A>,
    mode: Mode,
    spawn_frequency: u32,
    life_time: f32,
    minimum_spawn_displacement: f32,
    fade_duration_fraction: f32,
    follow_frames_span: usize,
    follow_trail_count: usize,
    position: Vec2,
    last_spawn_position: Vec2,
    frame_count: u32,
    spawn_count: u64,
    warned_empty_pool: bool,
}

impl<A: TrailActor> TrailEmitter<A> {
    /// Builds an emitter and pre-allocates its pool.
    ///
    /// `container` is the emitter's own visual and follows [`set_position`](Self::set_position).
    /// Fails, returning no emitter, if `factory` cannot supply every pooled actor or the
    /// configuration asks for an oversized pool.
    ///
    /// # Panics
    /// If `life_time` is negative or not finite.
    pub fn create(
        mut container: A,
        factory: impl ActorFactory<A> + 'static,
        motion_type: MotionType,
        spawn_frequency: u32,
        life_time: f32,
        follow_trail_count: usize,
    ) -> Result<Self> {
        assert_non_negative("life_time", life_time);
        let defaults = EmitterConfig::default();
        let capacity =
            checked_pool_capacity(motion_type, spawn_frequency, life_time, follow_trail_count)?;
        let pool = TrailPool::new(factory, capacity)?;
        container.set_position(Vec2::ZERO);

        info!(
            "trail emitter created: {:?}, {} pooled actors",
            motion_type, capacity
        );
        Ok(Self {
            container,
            pool,
            mode: Mode::new(motion_type, defaults.follow_frames_span, follow_trail_count),
            spawn_frequency,
            life_time,
            minimum_spawn_displacement: defaults.minimum_spawn_displacement,
            fade_duration_fraction: defaults.fade_duration_fraction,
            follow_frames_span: defaults.follow_frames_span,
            follow_trail_count,
            position: Vec2::ZERO,
            last_spawn_position: Vec2::ZERO,
            frame_count: 0,
            spawn_count: 0,
            warned_empty_pool: false,
        })
    }

    /// [`create`](Self::create) followed by every setter in `config`.
    ///
    /// # Panics
    /// On values [`EmitterConfig::validate`] rejects.
    pub fn from_config(
        container: A,
        factory: impl ActorFactory<A> + 'static,
        config: &EmitterConfig,
    ) -> Result<Self> {
        let mut emitter = Self::create(
            container,
            factory,
            config.motion_type,
            config.spawn_frequency,
            config.life_time,
            config.follow_trail_count,
        )?;
        emitter.set_minimum_spawn_displacement(config.minimum_spawn_displacement);
        emitter.set_fade_duration_fraction(config.fade_duration_fraction);
        emitter.set_follow_frames_span(config.follow_frames_span);
        Ok(emitter)
    }

    /// Runs one frame of the spawn policy. Call once per rendered frame, after moving
    /// the emitter.
    pub fn tick(&mut self, _dt: f32) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if let Mode::Stamp(motion) = self.mode {
            outcome.spawned = self.stamp(motion);
        } else if let Mode::Follow(chain) = &mut self.mode {
            if let Some((slot, sample)) =
                chain.try_spawn(&mut self.pool, self.position, self.frame_count)
            {
                self.last_spawn_position = sample;
                self.frame_count = 0;
                self.spawn_count += 1;
                outcome.spawned = Some(slot);
            }
            outcome.retired = chain.advance(&mut self.pool, self.position);
        }
        self.frame_count = self.frame_count.wrapping_add(1);
        outcome
    }

    fn stamp(&mut self, motion: StampMotion) -> Option<SlotId> {
        let period = spawn_period_frames(self.spawn_frequency);
        if self.frame_count % period != 0
            || self.position.distance(self.last_spawn_position) < self.minimum_spawn_displacement
        {
            return None;
        }

        let current = self.position;
        let target = self.last_spawn_position.lerp(current, MOVE_TARGET_LERP);
        let life_time = self.life_time;
        let (hold, fade) = self.fade_timing();
        let Some((slot, actor)) = self.pool.acquire_next() else {
            if !self.warned_empty_pool {
                warn!("trail emitter has an empty pool; nothing to spawn");
                self.warned_empty_pool = true;
            }
            return None;
        };

        actor.cancel_transitions();
        actor.set_visible(true);
        match motion {
            StampMotion::Static => actor.set_position(current),
            StampMotion::MoveOut => {
                actor.set_position(current);
                actor.run_transition(Transition::MoveTo {
                    target,
                    duration: life_time,
                });
            }
            StampMotion::MoveIn => {
                actor.set_position(target);
                actor.run_transition(Transition::MoveTo {
                    target: current,
                    duration: life_time,
                });
            }
        }
        actor.set_opacity(1.0);
        actor.run_transition(Transition::hold_then_fade(hold, fade));

        self.frame_count = 0;
        self.last_spawn_position = current;
        self.spawn_count += 1;
        debug!("trail {:?} stamped at {:?}", slot, current);
        Some(slot)
    }

    /// Seconds a stamped trail stays fully opaque, then seconds it spends fading out.
    pub fn fade_timing(&self) -> (f32, f32) {
        let fade = self.life_time * self.fade_duration_fraction;
        (self.life_time * (1.0 - self.fade_duration_fraction), fade)
    }

    /// Places the emitter without the move counting as displacement.
    pub fn set_start_position(&mut self, position: Vec2) {
        self.set_position(position);
        self.last_spawn_position = position;
    }

    /// Host movement. Takes effect on the next tick.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.container.set_position(position);
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Attaches the container and every pooled actor under the emitter's parent.
    pub fn set_parent(&mut self, parent: NodeId) {
        self.container.attach_to(parent);
        self.pool.attach_all(parent);
        debug!("trail emitter attached to {:?}", parent);
    }

    /// Hides every trail and forgets follow bookkeeping; configuration is kept.
    pub fn reset(&mut self) {
        self.pool.hide_all();
        if let Mode::Follow(chain) = &mut self.mode {
            chain.clear();
        }
        self.frame_count = 0;
        self.last_spawn_position = self.position;
    }

    pub fn motion_type(&self) -> MotionType {
        self.mode.motion_type()
    }

    /// Switches spawn strategy. Crossing into or out of follow mode resets the trails.
    pub fn set_motion_type(&mut self, motion_type: MotionType) -> Result<()> {
        let current = self.motion_type();
        if current == motion_type {
            return Ok(());
        }
        let capacity = checked_pool_capacity(
            motion_type,
            self.spawn_frequency,
            self.life_time,
            self.follow_trail_count,
        )?;
        if current.is_follow() != motion_type.is_follow() {
            self.pool.hide_all();
            self.frame_count = 0;
            self.last_spawn_position = self.position;
        }
        self.mode = Mode::new(motion_type, self.follow_frames_span, self.follow_trail_count);
        debug!("trail motion switched {:?} -> {:?}", current, motion_type);
        self.pool.grow(capacity)?;
        Ok(())
    }

    pub fn spawn_frequency(&self) -> u32 {
        self.spawn_frequency
    }

    /// Grows the pool to the new capacity outside follow mode.
    pub fn set_spawn_frequency(&mut self, spawn_frequency: u32) -> Result<()> {
        let capacity = checked_pool_capacity(
            self.motion_type(),
            spawn_frequency,
            self.life_time,
            self.follow_trail_count,
        )?;
        self.spawn_frequency = spawn_frequency;
        self.pool.grow(capacity)?;
        Ok(())
    }

    pub fn life_time(&self) -> f32 {
        self.life_time
    }

    /// # Panics
    /// If `life_time` is negative or not finite.
    pub fn set_life_time(&mut self, life_time: f32) -> Result<()> {
        assert_non_negative("life_time", life_time);
        let capacity = checked_pool_capacity(
            self.motion_type(),
            self.spawn_frequency,
            life_time,
            self.follow_trail_count,
        )?;
        self.life_time = life_time;
        self.pool.grow(capacity)?;
        Ok(())
    }

    pub fn minimum_spawn_displacement(&self) -> f32 {
        self.minimum_spawn_displacement
    }

    /// # Panics
    /// If `displacement` is negative or not finite.
    pub fn set_minimum_spawn_displacement(&mut self, displacement: f32) {
        assert_non_negative("minimum_spawn_displacement", displacement);
        self.minimum_spawn_displacement = displacement;
    }

    pub fn fade_duration_fraction(&self) -> f32 {
        self.fade_duration_fraction
    }

    /// # Panics
    /// If `fraction` is outside `[0, 1]`.
    pub fn set_fade_duration_fraction(&mut self, fraction: f32) {
        assert!(
            (0.0..=1.0).contains(&fraction),
            "fade_duration_fraction should be in the range [0, 1], got {fraction}"
        );
        self.fade_duration_fraction = fraction;
    }

    pub fn follow_frames_span(&self) -> usize {
        self.follow_frames_span
    }

    /// A new span hides the running follow chain; trails respawn at the new spacing.
    ///
    /// # Panics
    /// If `span` is 0.
    pub fn set_follow_frames_span(&mut self, span: usize) {
        assert!(span > 0, "follow_frames_span should be at least 1");
        self.follow_frames_span = span;
        if let Mode::Follow(chain) = &mut self.mode {
            chain.set_span(span, &mut self.pool);
        }
    }

    pub fn follow_trail_count(&self) -> usize {
        self.follow_trail_count
    }

    /// In follow mode, grows the pool to `count` or retires the oldest trails above it.
    pub fn set_follow_trail_count(&mut self, count: usize) -> Result<()> {
        let capacity = checked_pool_capacity(
            self.motion_type(),
            self.spawn_frequency,
            self.life_time,
            count,
        )?;
        self.follow_trail_count = count;
        if let Mode::Follow(chain) = &mut self.mode {
            chain.set_max_trails(count, &mut self.pool);
        }
        self.pool.grow(capacity)?;
        Ok(())
    }

    pub fn pool(&self) -> &TrailPool<A> {
        &self.pool
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    pub fn trail(&self, slot: SlotId) -> Option<&A> {
        self.pool.get(slot)
    }

    pub fn container(&self) -> &A {
        &self.container
    }

    /// Mutable access to the pooled actors, e.g. for host-side animation.
    pub fn trails_mut(&mut self) -> impl Iterator<Item = &mut A> {
        self.pool.iter_mut()
    }

    pub fn last_spawn_position(&self) -> Vec2 {
        self.last_spawn_position
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn spawn_count(&self) -> u64 {
        self.spawn_count
    }

    pub fn spawn_period_frames(&self) -> u32 {
        spawn_period_frames(self.spawn_frequency)
    }

    pub fn follow_tracker(&self) -> Option<&FollowTracker> {
        match &self.mode {
            Mode::Follow(chain) => Some(chain.tracker()),
            Mode::Stamp(_) => None,
        }
    }

    pub fn position_history(&self) -> Option<&PositionHistory> {
        match &self.mode {
            Mode::Follow(chain) => Some(chain.history()),
            Mode::Stamp(_) => None,
        }
    }

    pub fn tracked_count(&self) -> usize {
        self.follow_tracker().map_or(0, FollowTracker::len)
    }

    pub fn history_len(&self) -> usize {
        self.position_history().map_or(0, PositionHistory::len)
    }

    pub fn lead(&self) -> Option<SlotId> {
        self.follow_tracker().and_then(FollowTracker::lead)
    }
}

impl<A> fmt::Debug for TrailEmitter<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrailEmitter")
            .field("mode", &self.mode)
            .field("pool", &self.pool)
            .field("spawn_frequency", &self.spawn_frequency)
            .field("life_time", &self.life_time)
            .field("position", &self.position)
            .field("last_spawn_position", &self.last_spawn_position)
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}

fn assert_non_negative(field: &str, value: f32) {
    assert!(
        value.is_finite() && value >= 0.0,
        "{field} should be a finite non-negative number, got {value}"
    );
}
