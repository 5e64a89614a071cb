use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;

/// Unique identifier with generation tracking to prevent stale references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct GenerationalId {
    pub index: usize,
    pub generation: u32,
}

impl GenerationalId {
    pub fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Typed handle into an [`Arena`].
pub trait ArenaKey: Copy + Eq {
    fn from_raw(id: GenerationalId) -> Self;
    fn raw(self) -> GenerationalId;
}

macro_rules! arena_key {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
        pub struct $name(pub GenerationalId);

        impl $name {
            pub fn index(&self) -> usize {
                self.0.index
            }

            pub fn generation(&self) -> u32 {
                self.0.generation
            }
        }

        impl ArenaKey for $name {
            fn from_raw(id: GenerationalId) -> Self {
                Self(id)
            }

            fn raw(self) -> GenerationalId {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}v{})", $tag, self.0.index, self.0.generation)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

arena_key!(
    /// Handle of a [`Part`](crate::core::part::Part) stored in a world.
    PartId,
    "Part"
);
arena_key!(
    /// Handle of a [`Physical`](crate::core::physical::Physical) stored in a world.
    PhysicalId,
    "Physical"
);

/// Generational arena that hands out stable typed IDs while preventing use-after-free.
pub struct Arena<K, T> {
    items: Vec<Option<T>>,
    generations: Vec<u32>,
    free_list: VecDeque<usize>,
    _key: PhantomData<fn() -> K>,
}

impl<K: ArenaKey, T> Default for Arena<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ArenaKey, T> Arena<K, T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            generations: Vec::new(),
            free_list: VecDeque::new(),
            _key: PhantomData,
        }
    }

    pub fn insert(&mut self, item: T) -> K {
        self.insert_with(|_| item)
    }

    /// Inserts a value built from its own future handle.
    pub fn insert_with(&mut self, build: impl FnOnce(K) -> T) -> K {
        match self.try_insert_with(|id| Ok::<T, std::convert::Infallible>(build(id))) {
            Ok(id) => id,
            Err(never) => match never {},
        }
    }

    /// Like [`Arena::insert_with`], but leaves the arena untouched when `build` fails.
    pub fn try_insert_with<E>(&mut self, build: impl FnOnce(K) -> Result<T, E>) -> Result<K, E> {
        let reused = self.free_list.front().copied();
        let index = reused.unwrap_or(self.items.len());
        let generation = reused.map(|i| self.generations[i]).unwrap_or(0);
        let id = K::from_raw(GenerationalId::new(index, generation));

        let item = build(id)?;
        if reused.is_some() {
            self.free_list.pop_front();
            self.items[index] = Some(item);
        } else {
            self.items.push(Some(item));
            self.generations.push(0);
        }
        Ok(id)
    }

    pub fn get(&self, id: K) -> Option<&T> {
        if self.is_valid(id) {
            self.items.get(id.raw().index).and_then(|slot| slot.as_ref())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: K) -> Option<&mut T> {
        if self.is_valid(id) {
            self.items.get_mut(id.raw().index).and_then(|slot| slot.as_mut())
        } else {
            None
        }
    }

    pub fn remove(&mut self, id: K) -> Option<T> {
        if !self.is_valid(id) {
            return None;
        }
        let index = id.raw().index;
        let slot = self.items.get_mut(index)?;
        if slot.is_some() {
            self.generations[index] = self.generations[index].wrapping_add(1);
            self.free_list.push_back(index);
        }
        slot.take()
    }

    pub fn contains(&self, id: K) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> + '_ {
        self.items.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|item| (K::from_raw(GenerationalId::new(index, self.generations[index])), item))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut T)> + '_ {
        let generations = &self.generations;
        self.items.iter_mut().enumerate().filter_map(move |(index, slot)| {
            slot.as_mut()
                .map(|item| (K::from_raw(GenerationalId::new(index, generations[index])), item))
        })
    }

    pub fn len(&self) -> usize {
        self.items.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_valid(&self, id: K) -> bool {
        let raw = id.raw();
        self.generations
            .get(raw.index)
            .copied()
            .map(|gen| gen == raw.generation)
            .unwrap_or(false)
    }
}

#[cfg(feature = "parallel")]
impl<K: ArenaKey, T: Send> Arena<K, T> {
    /// Visits every live value from the rayon pool.
    pub fn par_for_each_mut<F>(&mut self, f: F)
    where
        F: Fn(&mut T) + Sync + Send,
    {
        use rayon::prelude::*;

        self.items
            .par_iter_mut()
            .filter_map(|slot| slot.as_mut())
            .for_each(f);
    }
}
