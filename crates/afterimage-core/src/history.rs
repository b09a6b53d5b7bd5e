//! Bounded ring buffer of emitter positions, one sample per tick.

use std::collections::VecDeque;

use glam::Vec2;

#[derive(Debug, Clone, Default)]
pub struct PositionHistory {
    samples: VecDeque<Vec2>,
    cap: usize,
}

impl PositionHistory {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            cap,
        }
    }

    /// Appends `position`, evicting the oldest sample once the cap is exceeded.
    pub fn push(&mut self, position: Vec2) {
        self.samples.push_back(position);
        self.evict_overflow();
    }

    /// Returns how many of the oldest samples the new cap evicted.
    pub fn set_cap(&mut self, cap: usize) -> usize {
        self.cap = cap;
        self.evict_overflow()
    }

    fn evict_overflow(&mut self) -> usize {
        let excess = self.samples.len().saturating_sub(self.cap);
        self.samples.drain(..excess);
        excess
    }

    /// Sample `index` ticks after the oldest one still held.
    pub fn get(&self, index: usize) -> Option<Vec2> {
        self.samples.get(index).copied()
    }

    pub fn latest(&self) -> Option<Vec2> {
        self.samples.back().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// True once the buffer holds `cap` samples and further pushes start evicting.
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.cap
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
