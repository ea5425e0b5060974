//! Generational slot pool
//!
//! Values live in a dense `Vec` and are never dropped on release: a released
//! slot keeps its old value so the next `take` can reinitialise it in place.
//! Liveness is tracked in a bit mask, free slots in a LIFO list, and every
//! release bumps the slot generation so stale ids stop resolving.

use std::fmt;
use std::str::FromStr;

use bitvec::vec::BitVec;
use serde::{Deserialize, Serialize};

/// Identity of a pooled value: slot index plus the generation it was taken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId {
    pub index: u32,
    pub generation: u32,
}

impl SlotId {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.index, self.generation)
    }
}

/// Error for ids that are not of the form `"{index}.{generation}"`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed slot id '{0}'")]
pub struct ParseSlotIdError(pub String);

impl FromStr for SlotId {
    type Err = ParseSlotIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (index, generation) = s
            .split_once('.')
            .ok_or_else(|| ParseSlotIdError(s.to_string()))?;
        let index = index.parse().map_err(|_| ParseSlotIdError(s.to_string()))?;
        let generation = generation
            .parse()
            .map_err(|_| ParseSlotIdError(s.to_string()))?;
        Ok(Self { index, generation })
    }
}

/// Object pool with O(1) take/release and stable iteration over live slots.
///
/// Storage only grows. Once the pool has reached its peak population, taking
/// and releasing values performs no allocation.
#[derive(Debug, Clone)]
pub struct Pool<T> {
    values: Vec<T>,
    generations: Vec<u32>,
    live: BitVec,
    free: Vec<u32>,
    len: usize,
}

impl<T: Default> Pool<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            generations: Vec::with_capacity(capacity),
            live: BitVec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Take a slot and mark it live.
    ///
    /// The returned value is either a recycled one (still holding whatever
    /// it held when released) or `T::default()`. Callers reinitialise it.
    pub fn take(&mut self) -> (SlotId, &mut T) {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.values.push(T::default());
                self.generations.push(0);
                self.live.push(false);
                (self.values.len() - 1) as u32
            }
        };

        let i = index as usize;
        self.live.set(i, true);
        self.len += 1;
        let id = SlotId::new(index, self.generations[i]);
        (id, &mut self.values[i])
    }
}

impl<T> Pool<T> {
    /// Release a live slot. Returns `false` for dead or stale ids.
    pub fn release(&mut self, id: SlotId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let i = id.index as usize;
        self.live.set(i, false);
        self.generations[i] = self.generations[i].wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        true
    }

    #[inline]
    pub fn contains(&self, id: SlotId) -> bool {
        let i = id.index as usize;
        i < self.values.len() && self.live[i] && self.generations[i] == id.generation
    }

    #[inline]
    pub fn get(&self, id: SlotId) -> Option<&T> {
        if self.contains(id) {
            Some(&self.values[id.index as usize])
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        if self.contains(id) {
            Some(&mut self.values[id.index as usize])
        } else {
            None
        }
    }

    /// Id of the live value in slot `index`, if any.
    ///
    /// Lets callers walk slots by index while mutating the pool in between.
    #[inline]
    pub fn id_at(&self, index: usize) -> Option<SlotId> {
        if index < self.values.len() && self.live[index] {
            Some(SlotId::new(index as u32, self.generations[index]))
        } else {
            None
        }
    }

    /// Number of slots ever allocated (live or dead)
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.values.len()
    }

    /// Number of live values
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate live values in slot order
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> + '_ {
        self.live.iter_ones().map(move |i| {
            (SlotId::new(i as u32, self.generations[i]), &self.values[i])
        })
    }

    pub fn for_each(&self, mut f: impl FnMut(SlotId, &T)) {
        for (id, value) in self.iter() {
            f(id, value);
        }
    }

    /// Release every live slot, keeping storage for reuse
    pub fn release_all(&mut self) {
        for i in 0..self.values.len() {
            if let Some(id) = self.id_at(i) {
                self.release(id);
            }
        }
    }
}

impl<T: Default> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}
