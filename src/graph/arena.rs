//! Dense id-addressed element storage with a free list
//!
//! Slots are `Arc<Guarded<T>>` so a caller can keep working on an element after the
//! table lock is gone. The table lock itself is only ever held for a slot copy and is
//! never held while waiting on an element guard.

use super::store::{GraphError, GraphResult};
use crate::concurrency::Guarded;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Hands out dense ids, preferring the most recently released one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    /// First id never handed out
    pub next: u32,
    /// Released ids waiting for reuse
    pub free: Vec<u32>,
}

impl IdAllocator {
    pub fn allocate(&mut self) -> GraphResult<u32> {
        if let Some(id) = self.free.pop() {
            return Ok(id);
        }
        if self.next == u32::MAX {
            return Err(GraphError::IdSpaceExhausted);
        }
        let id = self.next;
        self.next += 1;
        Ok(id)
    }

    pub fn release(&mut self, id: u32) {
        debug_assert!(id < self.next && !self.free.contains(&id));
        self.free.push(id);
    }
}

/// Plain copy of an arena, used by snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaImage<T> {
    pub slots: Vec<Option<T>>,
    pub ids: IdAllocator,
}

impl<T> Default for ArenaImage<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            ids: IdAllocator::default(),
        }
    }
}

impl<T> ArenaImage<T> {
    pub fn live(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().flatten()
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        self.slots.get(id as usize).and_then(Option::as_ref)
    }
}

pub type Slot<T> = Arc<Guarded<T>>;

#[derive(Debug)]
pub struct Arena<T> {
    slots: RwLock<Vec<Option<Slot<T>>>>,
    ids: Mutex<IdAllocator>,
    live: AtomicUsize,
}

impl<T> Arena<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: RwLock::new(Vec::with_capacity(capacity)),
            ids: Mutex::new(IdAllocator::default()),
            live: AtomicUsize::new(0),
        }
    }

    /// Reserve an id. The slot stays empty until [`Arena::publish`].
    pub fn reserve(&self) -> GraphResult<u32> {
        self.ids.lock().allocate()
    }

    /// Give back an id that was reserved but never published, or whose slot was detached
    pub fn release(&self, id: u32) {
        self.ids.lock().release(id);
    }

    /// Make an element visible under its reserved id
    pub fn publish(&self, id: u32, value: T) -> Slot<T> {
        let slot = Arc::new(Guarded::new(value));
        let idx = id as usize;
        let mut slots = self.slots.write();
        if idx >= slots.len() {
            slots.resize_with(idx + 1, || None);
        }
        debug_assert!(slots[idx].is_none(), "publishing over a live slot");
        slots[idx] = Some(Arc::clone(&slot));
        self.live.fetch_add(1, Ordering::AcqRel);
        slot
    }

    pub fn get(&self, id: u32) -> Option<Slot<T>> {
        self.slots.read().get(id as usize).and_then(Clone::clone)
    }

    /// Whether `slot` is still the element stored under `id`
    pub fn holds(&self, id: u32, slot: &Slot<T>) -> bool {
        self.slots
            .read()
            .get(id as usize)
            .and_then(Option::as_ref)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Empty the slot without releasing the id; the caller releases it once nothing
    /// references the id any more.
    pub fn detach(&self, id: u32) -> Option<Slot<T>> {
        let taken = self.slots.write().get_mut(id as usize).and_then(Option::take);
        if taken.is_some() {
            self.live.fetch_sub(1, Ordering::AcqRel);
        }
        taken
    }

    /// Live elements in id order
    pub fn snapshot(&self) -> Vec<Slot<T>> {
        self.slots.read().iter().flatten().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots, dead ones included
    pub fn slot_count(&self) -> usize {
        self.slots.read().len()
    }

    pub fn free_ids(&self) -> Vec<u32> {
        self.ids.lock().free.clone()
    }

    pub fn clear(&self) {
        let mut slots = self.slots.write();
        let mut ids = self.ids.lock();
        slots.clear();
        *ids = IdAllocator::default();
        self.live.store(0, Ordering::Release);
    }

    /// Drop trailing dead slots and forget free ids past the new end.
    ///
    /// Returns how many slots were dropped.
    pub fn trim(&self) -> usize {
        let mut slots = self.slots.write();
        let mut ids = self.ids.lock();
        if has_reserved_ids(&slots, &ids) {
            return 0;
        }
        let keep = slots.iter().rposition(Option::is_some).map_or(0, |last| last + 1);
        let dropped = slots.len() - keep;
        slots.truncate(keep);
        slots.shrink_to_fit();
        ids.next = keep as u32;
        ids.free.retain(|&id| (id as usize) < keep);
        dropped
    }

    /// Copy every live element out
    pub fn export(&self) -> GraphResult<ArenaImage<T>>
    where
        T: Clone,
    {
        let slots: Vec<Option<Slot<T>>> = self.slots.read().clone();
        let mut image = Vec::with_capacity(slots.len());
        for slot in &slots {
            match slot {
                Some(element) => image.push(Some(element.read()?.clone())),
                None => image.push(None),
            }
        }
        let ids = self.ids.lock().clone();
        Ok(ArenaImage { slots: image, ids })
    }

    /// Replace the whole content with `image`
    pub fn install(&self, image: ArenaImage<T>) {
        let mut slots = self.slots.write();
        let mut ids = self.ids.lock();
        let rebuilt: Vec<Option<Slot<T>>> = image
            .slots
            .into_iter()
            .map(|slot| slot.map(|value| Arc::new(Guarded::new(value))))
            .collect();
        let live = rebuilt.iter().filter(|slot| slot.is_some()).count();
        *slots = rebuilt;
        *ids = image.ids;
        self.live.store(live, Ordering::Release);
    }
}

/// An id that is neither published nor free is still reserved by a creation in flight
fn has_reserved_ids<T>(slots: &[Option<T>], ids: &IdAllocator) -> bool {
    (0..ids.next).any(|id| {
        let live = slots.get(id as usize).is_some_and(Option::is_some);
        !live && !ids.free.contains(&id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_reuses_latest_release() {
        let mut ids = IdAllocator::default();
        assert_eq!(ids.allocate().unwrap(), 0);
        assert_eq!(ids.allocate().unwrap(), 1);
        assert_eq!(ids.allocate().unwrap(), 2);
        ids.release(0);
        ids.release(2);
        assert_eq!(ids.allocate().unwrap(), 2);
        assert_eq!(ids.allocate().unwrap(), 0);
        assert_eq!(ids.allocate().unwrap(), 3);
    }

    #[test]
    fn test_publish_detach_release() {
        let arena: Arena<&'static str> = Arena::with_capacity(4);
        let a = arena.reserve().unwrap();
        let b = arena.reserve().unwrap();
        arena.publish(a, "a");
        let slot_b = arena.publish(b, "b");
        assert_eq!(arena.len(), 2);
        assert!(arena.holds(b, &slot_b));

        let detached = arena.detach(b).unwrap();
        assert_eq!(*detached.read().unwrap(), "b");
        assert!(!arena.holds(b, &slot_b));
        assert!(arena.get(b).is_none());
        assert_eq!(arena.len(), 1);

        arena.release(b);
        assert_eq!(arena.reserve().unwrap(), b);
    }

    #[test]
    fn test_trim_drops_trailing_dead_slots() {
        let arena: Arena<u8> = Arena::with_capacity(4);
        for value in 0..4u8 {
            let id = arena.reserve().unwrap();
            arena.publish(id, value);
        }
        for id in [1, 3, 2] {
            arena.detach(id);
            arena.release(id);
        }

        assert_eq!(arena.trim(), 3);
        assert_eq!(arena.slot_count(), 1);
        assert!(arena.free_ids().is_empty());
        assert_eq!(arena.reserve().unwrap(), 1);
    }

    #[test]
    fn test_export_install() {
        let arena: Arena<String> = Arena::with_capacity(2);
        for name in ["x", "y", "z"] {
            let id = arena.reserve().unwrap();
            arena.publish(id, name.to_string());
        }
        arena.detach(1);
        arena.release(1);

        let image = arena.export().unwrap();
        assert_eq!(image.live().count(), 2);
        assert_eq!(image.ids.free, vec![1]);

        let copy: Arena<String> = Arena::with_capacity(0);
        copy.install(image);
        assert_eq!(copy.len(), 2);
        assert_eq!(*copy.get(2).unwrap().read().unwrap(), "z");
        assert_eq!(copy.reserve().unwrap(), 1);
    }
}
