//! Host abstraction traits so `afterimage-core` stays renderer-agnostic.
//!
//! The host owns drawing and interpolation. The emitter only positions pooled actors,
//! toggles their visibility and hands them [`Transition`]s to play out.

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub mod headless;

pub use headless::HeadlessActor;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Opaque handle to a node in the host scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// A scheduled visual change, interpolated by the host over `duration` seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Transition {
    MoveTo { target: Vec2, duration: f32 },
    FadeIn { duration: f32 },
    FadeOut { duration: f32 },
    Delay { duration: f32 },
    /// Steps played back to back.
    Sequence(Vec<Transition>),
}

impl Transition {
    /// Full opacity held for `hold` seconds, then faded to zero over `fade` seconds.
    pub fn hold_then_fade(hold: f32, fade: f32) -> Self {
        Transition::Sequence(vec![
            Transition::Delay { duration: hold },
            Transition::FadeOut { duration: fade },
        ])
    }

    /// Total playback time in seconds.
    pub fn duration(&self) -> f32 {
        match self {
            Transition::MoveTo { duration, .. }
            | Transition::FadeIn { duration }
            | Transition::FadeOut { duration }
            | Transition::Delay { duration } => *duration,
            Transition::Sequence(steps) => steps.iter().map(Transition::duration).sum(),
        }
    }
}

/// A pooled visual element stamped by the emitter.
pub trait TrailActor {
    fn position(&self) -> Vec2;
    fn set_position(&mut self, position: Vec2);
    fn is_visible(&self) -> bool;
    fn set_visible(&mut self, visible: bool);
    /// Opacity in `[0, 1]`.
    fn opacity(&self) -> f32;
    fn set_opacity(&mut self, opacity: f32);
    /// Starts `transition` alongside anything already running on this actor.
    fn run_transition(&mut self, transition: Transition);
    /// Stops every transition running on this actor, leaving its state where it is.
    fn cancel_transitions(&mut self);
    /// True while a scheduled transition is still pending.
    fn is_busy(&self) -> bool;
    /// Re-parents the actor under `parent` in the host scene graph.
    fn attach_to(&mut self, parent: NodeId);
}

/// Source of fresh trail actors. `None` means the host could not produce one.
pub trait ActorFactory<A> {
    fn create_actor(&mut self) -> Option<A>;
}

impl<A, F> ActorFactory<A> for F
where
    F: FnMut() -> Option<A>,
{
    fn create_actor(&mut self) -> Option<A> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_duration_sums_steps() {
        let transition = Transition::hold_then_fade(1.4, 0.6);
        assert!((transition.duration() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn closures_act_as_factories() {
        let mut made = 0;
        let mut factory = || {
            made += 1;
            Some(HeadlessActor::default())
        };
        assert!(factory.create_actor().is_some());
        assert!(factory.create_actor().is_some());
        drop(factory);
        assert_eq!(made, 2);
    }
}
