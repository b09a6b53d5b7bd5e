//! Fixed, grow-only pool of trail actors.

use std::fmt;

use afterimage_host::{ActorFactory, NodeId, TrailActor};
use tracing::debug;

use crate::error::{Result, TrailError};

/// Index of an actor inside its pool. Stable for the pool's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(pub usize);

pub struct TrailPool<A> {
    actors: Vec<A>,
    cursor: usize,
    factory: Box<dyn ActorFactory<A>>,
    parent: Option<NodeId>,
}

impl<A: TrailActor> TrailPool<A> {
    /// Pre-allocates `capacity` hidden actors. Fails without a pool if the factory runs dry.
    pub fn new(factory: impl ActorFactory<A> + 'static, capacity: usize) -> Result<Self> {
        let mut pool = Self {
            actors: Vec::with_capacity(capacity),
            cursor: 0,
            factory: Box::new(factory),
            parent: None,
        };
        pool.grow(capacity)?;
        Ok(pool)
    }

    /// Appends fresh actors until the pool holds `count`. Never shrinks.
    ///
    /// Returns how many actors were added. Actors created before a factory failure stay
    /// in the pool.
    pub fn grow(&mut self, count: usize) -> Result<usize> {
        let before = self.actors.len();
        while self.actors.len() < count {
            let Some(mut actor) = self.factory.create_actor() else {
                return Err(TrailError::FactoryExhausted {
                    requested: count,
                    created: self.actors.len(),
                });
            };
            actor.set_visible(false);
            if let Some(parent) = self.parent {
                actor.attach_to(parent);
            }
            self.actors.push(actor);
        }
        let added = self.actors.len() - before;
        if added > 0 {
            debug!("trail pool grew by {} to {}", added, self.actors.len());
        }
        Ok(added)
    }

    /// Next actor in rotation. `None` only for an empty pool.
    pub fn acquire_next(&mut self) -> Option<(SlotId, &mut A)> {
        if self.actors.is_empty() {
            return None;
        }
        let slot = self.cursor % self.actors.len();
        self.cursor = (slot + 1) % self.actors.len();
        Some((SlotId(slot), &mut self.actors[slot]))
    }

    /// First actor at or after the cursor for which `is_free` holds.
    pub fn acquire_available(
        &mut self,
        mut is_free: impl FnMut(SlotId) -> bool,
    ) -> Option<(SlotId, &mut A)> {
        let len = self.actors.len();
        let slot = (0..len)
            .map(|offset| (self.cursor + offset) % len)
            .find(|&slot| is_free(SlotId(slot)))?;
        self.cursor = (slot + 1) % len;
        Some((SlotId(slot), &mut self.actors[slot]))
    }

    /// Re-parents every actor, and every actor grown later, under `parent`.
    pub fn attach_all(&mut self, parent: NodeId) {
        self.parent = Some(parent);
        for actor in &mut self.actors {
            actor.attach_to(parent);
        }
    }

    /// Cancels transitions and hides every actor; the rotation restarts at slot 0.
    pub fn hide_all(&mut self) {
        for actor in &mut self.actors {
            actor.cancel_transitions();
            actor.set_visible(false);
        }
        self.cursor = 0;
    }

    pub fn get(&self, slot: SlotId) -> Option<&A> {
        self.actors.get(slot.0)
    }

    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut A> {
        self.actors.get_mut(slot.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &A> {
        self.actors.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut A> {
        self.actors.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Slot the next rotating acquisition will return.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

impl<A> fmt::Debug for TrailPool<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrailPool")
            .field("len", &self.actors.len())
            .field("cursor", &self.cursor)
            .field("parent", &self.parent)
            .finish()
    }
}
