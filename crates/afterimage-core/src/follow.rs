//! Follow mode: a chain of trails replaying the emitter's recent path.
//!
//! Every tracked trail mirrors one slot of the shared [`PositionHistory`]. Trails are
//! queued `span` samples apart, the first one closest to the emitter. While the history
//! is still filling, every tracked index moves forward one sample per tick so the
//! offsets to the newest sample stay fixed; once the history is full, eviction keeps the
//! offsets fixed instead.
//!
//! The lead trail retires when the emitter has reported the same position for `span`
//! consecutive ticks. Continuous motion therefore never retires anything.

use std::collections::BTreeMap;

use afterimage_host::{TrailActor, Transition};
use glam::Vec2;
use tracing::{debug, trace};

use crate::config::FOLLOW_FADE_IN_SECONDS;
use crate::history::PositionHistory;
use crate::pool::{SlotId, TrailPool};

/// Counts how many consecutive ticks reported the same position.
#[derive(Debug, Clone, Copy, Default)]
struct WindowTrack {
    key: Option<Vec2>,
    repeats: usize,
}

impl WindowTrack {
    fn observe(&mut self, position: Vec2) -> usize {
        if self.key != Some(position) {
            self.key = Some(position);
            self.repeats = 0;
        }
        self.repeats += 1;
        self.repeats
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Tracked trails and the history slot each one mirrors.
#[derive(Debug, Clone, Default)]
pub struct FollowTracker {
    indices: BTreeMap<SlotId, usize>,
    lead: Option<SlotId>,
    window: WindowTrack,
}

impl FollowTracker {
    pub fn track(&mut self, slot: SlotId, index: usize) {
        self.indices.insert(slot, index);
        if self.indices.len() == 1 {
            self.lead = Some(slot);
        }
    }

    pub fn contains(&self, slot: SlotId) -> bool {
        self.indices.contains_key(&slot)
    }

    pub fn index_of(&self, slot: SlotId) -> Option<usize> {
        self.indices.get(&slot).copied()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Oldest tracked trail, next in line to retire.
    pub fn lead(&self) -> Option<SlotId> {
        self.lead
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, usize)> + '_ {
        self.indices.iter().map(|(&slot, &index)| (slot, index))
    }

    fn advance_all(&mut self, by: usize) {
        for index in self.indices.values_mut() {
            *index += by;
        }
    }

    /// Repeat count of `position` including this observation.
    fn observe(&mut self, position: Vec2) -> usize {
        self.window.observe(position)
    }

    /// Untracks the lead, promotes the trail with the highest index and shifts every
    /// remaining index forward by `span`.
    fn retire_lead(&mut self, span: usize) -> Option<SlotId> {
        let retired = self.lead.take()?;
        self.indices.remove(&retired);
        self.window.clear();

        let mut highest: Option<usize> = None;
        for (&slot, index) in self.indices.iter_mut() {
            if highest.map_or(true, |best| *index > best) {
                highest = Some(*index);
                self.lead = Some(slot);
            }
            *index += span;
        }
        Some(retired)
    }

    /// Pulls every index back by `evicted` after the oldest history samples were dropped.
    fn rebase(&mut self, evicted: usize) {
        for index in self.indices.values_mut() {
            *index = index.saturating_sub(evicted);
        }
    }

    fn clear(&mut self) {
        self.indices.clear();
        self.lead = None;
        self.window.clear();
    }
}

/// History plus tracker; only exists while the emitter is in follow mode.
#[derive(Debug, Clone)]
pub struct FollowChain {
    history: PositionHistory,
    tracker: FollowTracker,
    span: usize,
    max_trails: usize,
}

impl FollowChain {
    pub fn new(span: usize, max_trails: usize) -> Self {
        Self {
            history: PositionHistory::with_cap(span.saturating_mul(max_trails)),
            tracker: FollowTracker::default(),
            span,
            max_trails,
        }
    }

    pub fn history(&self) -> &PositionHistory {
        &self.history
    }

    pub fn tracker(&self) -> &FollowTracker {
        &self.tracker
    }

    pub fn span(&self) -> usize {
        self.span
    }

    pub fn max_trails(&self) -> usize {
        self.max_trails
    }

    /// Changes the spacing between trails. Tracked trails are laid out for the old
    /// spacing, so the chain is hidden and rebuilt from the retained history.
    pub fn set_span<A: TrailActor>(&mut self, span: usize, pool: &mut TrailPool<A>) {
        if span == self.span {
            return;
        }
        for (slot, _) in self.tracker.iter() {
            if let Some(actor) = pool.get_mut(slot) {
                actor.cancel_transitions();
                actor.set_visible(false);
            }
        }
        debug!(
            "follow span {} -> {}, {} trail(s) released",
            self.span,
            span,
            self.tracker.len()
        );
        self.tracker.clear();
        self.span = span;
        self.resize_history();
    }

    /// Changes the trail limit, retiring the oldest trails beyond it.
    pub fn set_max_trails<A: TrailActor>(&mut self, max_trails: usize, pool: &mut TrailPool<A>) {
        while self.tracker.len() > max_trails {
            let Some(retired) = self.tracker.retire_lead(self.span) else {
                break;
            };
            if let Some(actor) = pool.get_mut(retired) {
                actor.cancel_transitions();
                actor.set_visible(false);
            }
            debug!("follow trail {:?} retired by a lower trail count", retired);
        }
        self.max_trails = max_trails;
        self.resize_history();
    }

    fn resize_history(&mut self) {
        let evicted = self.history.set_cap(self.span.saturating_mul(self.max_trails));
        self.tracker.rebase(evicted);
    }

    /// History index a new trail would take, if one should spawn this tick.
    pub fn spawn_index(&self, position: Vec2, frame_count: u32) -> Option<usize> {
        let latest = self.history.latest()?;
        if latest == position
            || frame_count as usize % self.span != 0
            || self.tracker.len() >= self.max_trails
        {
            return None;
        }
        self.history
            .len()
            .checked_sub(self.span.saturating_mul(self.tracker.len() + 1))
    }

    /// Places an untracked pooled actor at its history slot and starts tracking it.
    ///
    /// Returns the slot used and the sampled position the trail was placed at.
    pub fn try_spawn<A: TrailActor>(
        &mut self,
        pool: &mut TrailPool<A>,
        position: Vec2,
        frame_count: u32,
    ) -> Option<(SlotId, Vec2)> {
        let index = self.spawn_index(position, frame_count)?;
        let sample = self.history.get(index)?;
        let tracker = &self.tracker;
        let (slot, actor) = pool.acquire_available(|slot| !tracker.contains(slot))?;

        actor.cancel_transitions();
        actor.set_visible(true);
        actor.set_opacity(0.0);
        actor.run_transition(Transition::FadeIn {
            duration: FOLLOW_FADE_IN_SECONDS,
        });
        actor.set_position(sample);
        self.tracker.track(slot, index);
        debug!(
            "follow trail {:?} placed at history[{}] = {:?} ({} tracked)",
            slot,
            index,
            sample,
            self.tracker.len()
        );
        Some((slot, sample))
    }

    /// Per-tick bookkeeping: move tracked trails, record `position`, retire the lead
    /// when the emitter has held still for a full span.
    ///
    /// Returns the retired slot, if any.
    pub fn advance<A: TrailActor>(
        &mut self,
        pool: &mut TrailPool<A>,
        position: Vec2,
    ) -> Option<SlotId> {
        let filling = !self.history.is_full();
        for (slot, index) in self.tracker.indices.iter_mut() {
            if let (Some(sample), Some(actor)) = (self.history.get(*index), pool.get_mut(*slot)) {
                actor.set_position(sample);
            }
            if filling {
                *index += 1;
            }
        }

        self.history.push(position);

        let repeats = self.tracker.observe(position);
        if self.tracker.is_empty() || repeats < self.span {
            return None;
        }
        let retired = self.tracker.retire_lead(self.span)?;
        if let Some(actor) = pool.get_mut(retired) {
            actor.set_visible(false);
        }
        debug!(
            "follow trail {:?} retired after {} still ticks, new lead {:?}",
            retired, repeats, self.tracker.lead
        );
        Some(retired)
    }

    /// Drops every sample and tracked trail.
    pub fn clear(&mut self) {
        trace!("follow chain cleared");
        self.history.clear();
        self.tracker.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afterimage_host::HeadlessActor;

    #[test]
    fn window_track_resets_on_movement() {
        let mut window = WindowTrack::default();
        assert_eq!(window.observe(Vec2::ZERO), 1);
        assert_eq!(window.observe(Vec2::ZERO), 2);
        assert_eq!(window.observe(Vec2::X), 1);
        assert_eq!(window.observe(Vec2::X), 2);
        window.clear();
        assert_eq!(window.observe(Vec2::X), 1);
    }

    #[test]
    fn first_tracked_trail_leads() {
        let mut tracker = FollowTracker::default();
        tracker.track(SlotId(2), 5);
        tracker.track(SlotId(0), 1);
        assert_eq!(tracker.lead(), Some(SlotId(2)));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn retiring_promotes_highest_index_and_shifts_the_rest() {
        let mut tracker = FollowTracker::default();
        tracker.track(SlotId(0), 21);
        tracker.track(SlotId(1), 10);
        tracker.track(SlotId(2), 0);

        assert_eq!(tracker.retire_lead(10), Some(SlotId(0)));
        assert_eq!(tracker.lead(), Some(SlotId(1)));
        assert_eq!(tracker.index_of(SlotId(1)), Some(20));
        assert_eq!(tracker.index_of(SlotId(2)), Some(10));
        assert!(!tracker.contains(SlotId(0)));

        assert_eq!(tracker.retire_lead(10), Some(SlotId(1)));
        assert_eq!(tracker.retire_lead(10), Some(SlotId(2)));
        assert_eq!(tracker.lead(), None);
        assert_eq!(tracker.retire_lead(10), None);
    }

    #[test]
    fn spawn_index_waits_for_enough_history() {
        let mut chain = FollowChain::new(4, 3);
        assert_eq!(chain.spawn_index(Vec2::ZERO, 0), None);
        for x in 0..3 {
            chain.history.push(Vec2::new(x as f32, 0.0));
        }
        assert_eq!(chain.spawn_index(Vec2::new(9.0, 0.0), 0), None);
        chain.history.push(Vec2::new(3.0, 0.0));
        assert_eq!(chain.spawn_index(Vec2::new(9.0, 0.0), 0), Some(0));
        assert_eq!(chain.spawn_index(Vec2::new(9.0, 0.0), 3), None);
        // Standing on the latest sample never spawns.
        assert_eq!(chain.spawn_index(Vec2::new(3.0, 0.0), 0), None);
    }

    fn headless_pool(len: usize) -> TrailPool<HeadlessActor> {
        TrailPool::new(|| Some(HeadlessActor::new()), len).unwrap()
    }

    #[test]
    fn history_cap_follows_span_and_count() {
        let mut pool = headless_pool(5);
        let mut chain = FollowChain::new(10, 3);
        assert_eq!(chain.history().cap(), 30);
        chain.set_max_trails(5, &mut pool);
        assert_eq!((chain.span(), chain.max_trails()), (10, 5));
        assert_eq!(chain.history().cap(), 50);
        chain.set_span(2, &mut pool);
        assert_eq!((chain.span(), chain.max_trails()), (2, 5));
        assert_eq!(chain.history().cap(), 10);
    }

    #[test]
    fn lowering_the_limit_retires_oldest_and_rebases_the_rest() {
        let mut pool = headless_pool(3);
        let mut chain = FollowChain::new(10, 3);
        for x in 0..30 {
            chain.history.push(Vec2::new(x as f32, 0.0));
        }
        for (slot, index) in [(0, 20), (1, 10), (2, 0)] {
            pool.get_mut(SlotId(slot)).unwrap().set_visible(true);
            chain.tracker.track(SlotId(slot), index);
        }

        chain.set_max_trails(1, &mut pool);

        assert_eq!(chain.tracker().len(), 1);
        assert_eq!(chain.tracker().lead(), Some(SlotId(2)));
        assert_eq!(chain.history().len(), 10);
        // Still ten samples behind the newest one.
        assert_eq!(chain.tracker().index_of(SlotId(2)), Some(0));
        assert_eq!(chain.history().get(0), Some(Vec2::new(20.0, 0.0)));
        assert!(!pool.get(SlotId(0)).unwrap().is_visible());
        assert!(!pool.get(SlotId(1)).unwrap().is_visible());
        assert!(pool.get(SlotId(2)).unwrap().is_visible());
    }

    #[test]
    fn new_span_releases_the_chain() {
        let mut pool = headless_pool(2);
        let mut chain = FollowChain::new(10, 2);
        for x in 0..20 {
            chain.history.push(Vec2::new(x as f32, 0.0));
        }
        pool.get_mut(SlotId(0)).unwrap().set_visible(true);
        chain.tracker.track(SlotId(0), 10);

        chain.set_span(3, &mut pool);

        assert!(chain.tracker().is_empty());
        assert_eq!(chain.history().len(), 6);
        assert_eq!(chain.history().latest(), Some(Vec2::new(19.0, 0.0)));
        assert!(!pool.get(SlotId(0)).unwrap().is_visible());
    }
}
