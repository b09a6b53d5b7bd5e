//! Afterimage core: renderer-agnostic trail lifecycle management.
//!
//! A [`TrailEmitter`] owns a grow-only [`TrailPool`] of host actors and, every tick,
//! decides whether to stamp one at the emitter's position. In follow mode a
//! [`FollowChain`] keeps a [`PositionHistory`] of the emitter and drags a bounded chain
//! of trails along it.

pub mod config;
pub mod emitter;
pub mod error;
pub mod follow;
pub mod history;
pub mod pool;

pub use afterimage_host::{ActorFactory, NodeId, TrailActor, Transition};
pub use config::{EmitterConfig, MotionType, PresetFile, TrailPreset};
pub use emitter::{TickOutcome, TrailEmitter};
pub use error::{Result, TrailError};
pub use follow::{FollowChain, FollowTracker};
pub use history::PositionHistory;
pub use pool::{SlotId, TrailPool};
