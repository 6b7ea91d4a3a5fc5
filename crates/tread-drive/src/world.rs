//! In-memory body collection with generational handles.

use std::collections::HashMap;

use tracing::debug;
use tread_kinematics::Pose;

use crate::body::{BodyStore, StaleHandle};

/// Handle into a [`BodyWorld`]. Goes stale once its body is despawned or
/// respawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyKey {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
struct Slot {
    name: String,
    generation: u32,
    alive: bool,
    transform: Pose,
}

/// A flat set of named bodies holding nothing but their transforms.
#[derive(Debug, Clone, Default)]
pub struct BodyWorld {
    slots: Vec<Slot>,
    by_name: HashMap<String, u32>,
}

impl BodyWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a world with one body per name, each at the origin.
    pub fn with_bodies<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let mut world = Self::new();
        for name in names {
            world.spawn(name, Pose::default());
        }
        world
    }

    /// Adds a body, or respawns it if the name is already taken.
    pub fn spawn(&mut self, name: impl Into<String>, transform: Pose) -> BodyKey {
        let name = name.into();
        if let Some(&index) = self.by_name.get(&name) {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.transform = transform;
            debug!(body = %name, generation = slot.generation, "Respawned body");
            return BodyKey { index, generation: slot.generation };
        }

        // Reuse a dead slot so indices stay dense.
        let index = match self.slots.iter().position(|s| !s.alive) {
            Some(i) => {
                let slot = &mut self.slots[i];
                slot.name = name.clone();
                slot.generation = slot.generation.wrapping_add(1);
                slot.alive = true;
                slot.transform = transform;
                i as u32
            }
            None => {
                self.slots.push(Slot { name: name.clone(), generation: 0, alive: true, transform });
                (self.slots.len() - 1) as u32
            }
        };
        self.by_name.insert(name, index);
        BodyKey { index, generation: self.slots[index as usize].generation }
    }

    /// Re-creates `name` in place at its current transform, invalidating
    /// every handle issued for it so far.
    pub fn respawn(&mut self, name: &str) -> Option<BodyKey> {
        let transform = self.transform(name)?;
        Some(self.spawn(name, transform))
    }

    pub fn despawn(&mut self, name: &str) -> bool {
        let Some(index) = self.by_name.remove(name) else {
            return false;
        };
        let slot = &mut self.slots[index as usize];
        slot.alive = false;
        slot.generation = slot.generation.wrapping_add(1);
        true
    }

    pub fn transform(&self, name: &str) -> Option<Pose> {
        self.by_name.get(name).map(|&i| self.slots[i as usize].transform)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    fn live_slot_mut(&mut self, key: BodyKey) -> Option<&mut Slot> {
        self.slots
            .get_mut(key.index as usize)
            .filter(|s| s.alive && s.generation == key.generation)
    }
}

impl BodyStore for BodyWorld {
    type Handle = BodyKey;

    fn resolve(&self, name: &str) -> Option<BodyKey> {
        let &index = self.by_name.get(name)?;
        Some(BodyKey { index, generation: self.slots[index as usize].generation })
    }

    fn set_transform(&mut self, handle: BodyKey, pose: Pose) -> Result<(), StaleHandle> {
        let slot = self.live_slot_mut(handle).ok_or(StaleHandle)?;
        slot.transform = pose;
        Ok(())
    }
}
