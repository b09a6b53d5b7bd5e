//! Headless reference host: an actor that interpolates its own transitions.
//!
//! Used by the demo binary and the test suites in place of a real scene graph.

use std::collections::VecDeque;

use glam::Vec2;
use tracing::trace;

use crate::{NodeId, TrailActor, Transition};

#[derive(Debug, Clone)]
struct Playback {
    steps: VecDeque<Transition>,
    elapsed: f32,
    origin: Option<(Vec2, f32)>,
}

impl Playback {
    fn new(transition: Transition) -> Self {
        let mut steps = VecDeque::new();
        flatten(transition, &mut steps);
        Self {
            steps,
            elapsed: 0.0,
            origin: None,
        }
    }
}

fn flatten(transition: Transition, out: &mut VecDeque<Transition>) {
    match transition {
        Transition::Sequence(steps) => {
            for step in steps {
                flatten(step, out);
            }
        }
        step => out.push_back(step),
    }
}

#[derive(Debug, Clone)]
pub struct HeadlessActor {
    position: Vec2,
    visible: bool,
    opacity: f32,
    parent: Option<NodeId>,
    playing: Vec<Playback>,
    started: Vec<Transition>,
    cancellations: usize,
}

impl Default for HeadlessActor {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            visible: true,
            opacity: 1.0,
            parent: None,
            playing: Vec::new(),
            started: Vec::new(),
            cancellations: 0,
        }
    }
}

impl HeadlessActor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Every transition handed to this actor, oldest first.
    pub fn started_transitions(&self) -> &[Transition] {
        &self.started
    }

    pub fn last_transition(&self) -> Option<&Transition> {
        self.started.last()
    }

    /// How many times `cancel_transitions` found something to stop or was asked to.
    pub fn cancellations(&self) -> usize {
        self.cancellations
    }

    /// Advances every running transition by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        let mut position = self.position;
        let mut opacity = self.opacity;
        for playback in &mut self.playing {
            let mut budget = dt;
            while let Some(step) = playback.steps.front() {
                let (from_position, from_opacity) =
                    *playback.origin.get_or_insert((position, opacity));
                let duration = step.duration();
                let reached = (playback.elapsed + budget).min(duration);
                let progress = if duration > 0.0 { reached / duration } else { 1.0 };
                match step {
                    Transition::MoveTo { target, .. } => {
                        position = from_position.lerp(*target, progress);
                    }
                    Transition::FadeIn { .. } => {
                        opacity = from_opacity + (1.0 - from_opacity) * progress;
                    }
                    Transition::FadeOut { .. } => {
                        opacity = from_opacity * (1.0 - progress);
                    }
                    Transition::Delay { .. } | Transition::Sequence(_) => {}
                }
                if reached < duration {
                    playback.elapsed = reached;
                    break;
                }
                budget -= duration - playback.elapsed;
                playback.elapsed = 0.0;
                playback.origin = None;
                playback.steps.pop_front();
            }
        }
        self.playing.retain(|playback| !playback.steps.is_empty());
        self.position = position;
        self.opacity = opacity;
    }
}

impl TrailActor for HeadlessActor {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn opacity(&self) -> f32 {
        self.opacity
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    fn run_transition(&mut self, transition: Transition) {
        trace!("headless actor: run {:?}", transition);
        self.started.push(transition.clone());
        self.playing.push(Playback::new(transition));
    }

    fn cancel_transitions(&mut self) {
        self.cancellations += 1;
        self.playing.clear();
    }

    fn is_busy(&self) -> bool {
        !self.playing.is_empty()
    }

    fn attach_to(&mut self, parent: NodeId) {
        self.parent = Some(parent);
    }
}
