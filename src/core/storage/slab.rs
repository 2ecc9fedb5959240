use std::iter::Iterator;
use std::slice::{
    Iter as SliceIter,
    IterMut as SliceIterMut,
};

/// A stable handle to an item in a Slab.
///
/// The generation is bumped each time a slot is reused, so a handle to a
/// removed item never aliases whatever takes its place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    index: usize,
    generation: u32,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    item: Option<T>,
}

/// A fixed capacity set of items with generation tagged handles.
#[derive(Debug)]
pub struct Slab<T> {
    slots: Vec<Slot<T>>,
    capacity: usize,
    len: usize,
}

impl<T> Slab<T> {
    /// Creates an empty slab which holds at most capacity items.
    pub fn new(capacity: usize) -> Slab<T> {
        Slab {
            slots: Vec::new(),
            capacity,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Adds an item and returns a stable handle, or hands the item back if
    /// the slab is full.
    pub fn insert(&mut self, item: T) -> Result<Handle, T> {
        if self.is_full() {
            return Err(item);
        }

        let index = match self.slots.iter().position(|slot| slot.item.is_none()) {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    item: None,
                });
                self.slots.len() - 1
            }
        };

        let slot = &mut self.slots[index];
        slot.generation = slot.generation.wrapping_add(1);
        slot.item = Some(item);
        self.len += 1;

        Ok(Handle {
            index,
            generation: slot.generation,
        })
    }

    /// Removes and returns the item for a handle, if it is still live.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index)?;

        if slot.generation != handle.generation {
            return None;
        }

        let item = slot.item.take();
        if item.is_some() {
            self.len -= 1;
        }
        item
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        match self.slots.get(handle.index) {
            Some(slot) if slot.generation == handle.generation => slot.item.as_ref(),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        match self.slots.get_mut(handle.index) {
            Some(slot) if slot.generation == handle.generation => slot.item.as_mut(),
            _ => None,
        }
    }

    /// Returns the handle of the first item matching a predicate.
    pub fn find<F>(&self, f: F) -> Option<Handle>
    where
        F: Fn(&T) -> bool,
    {
        self.iter()
            .find(|&(_, item)| f(item))
            .map(|(handle, _)| handle)
    }

    /// Returns the handles of all live items, in slot order.
    pub fn handles(&self) -> Vec<Handle> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    /// Returns an iterator over all live items, in slot order.
    pub fn iter<'a>(&'a self) -> Iter<'a, T> {
        Iter {
            slots: self.slots.iter().enumerate(),
        }
    }

    /// Returns a mutable iterator over all live items, in slot order.
    pub fn iter_mut<'a>(&'a mut self) -> IterMut<'a, T> {
        IterMut {
            slots: self.slots.iter_mut().enumerate(),
        }
    }
}

pub struct Iter<'a, T: 'a> {
    slots: std::iter::Enumerate<SliceIter<'a, Slot<T>>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Handle, &'a T);

    fn next(&mut self) -> Option<(Handle, &'a T)> {
        while let Some((index, slot)) = self.slots.next() {
            if let Some(ref item) = slot.item {
                let handle = Handle {
                    index,
                    generation: slot.generation,
                };
                return Some((handle, item));
            }
        }

        None
    }
}

pub struct IterMut<'a, T: 'a> {
    slots: std::iter::Enumerate<SliceIterMut<'a, Slot<T>>>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = (Handle, &'a mut T);

    fn next(&mut self) -> Option<(Handle, &'a mut T)> {
        while let Some((index, slot)) = self.slots.next() {
            let generation = slot.generation;
            if let Some(ref mut item) = slot.item {
                return Some((Handle { index, generation }, item));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_when_full() {
        let mut slab = Slab::new(2);
        assert_matches!(slab.insert(1), Ok(_));
        assert_matches!(slab.insert(2), Ok(_));
        assert_matches!(slab.insert(3), Err(3));
        assert_eq!(slab.len(), 2);
    }

    #[test]
    fn test_get_and_remove() {
        let mut slab = Slab::new(2);
        let handle = slab.insert("a").unwrap();
        assert_eq!(slab.get(handle), Some(&"a"));
        *slab.get_mut(handle).unwrap() = "b";
        assert_eq!(slab.remove(handle), Some("b"));
        assert_eq!(slab.remove(handle), None);
        assert!(slab.is_empty());
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut slab = Slab::new(1);
        let handle1 = slab.insert(1).unwrap();
        slab.remove(handle1);
        let handle2 = slab.insert(2).unwrap();

        assert_ne!(handle1, handle2);
        assert!(!slab.contains(handle1));
        assert_eq!(slab.get(handle2), Some(&2));
        assert_eq!(slab.remove(handle1), None);
        assert_eq!(slab.len(), 1);
    }

    #[test]
    fn test_iter_skips_removed() {
        let mut slab = Slab::new(4);
        let handles: Vec<_> = (0 .. 4).map(|i| slab.insert(i).unwrap()).collect();
        slab.remove(handles[1]);
        slab.remove(handles[2]);

        let items: Vec<_> = slab.iter().map(|(_, item)| *item).collect();
        assert_eq!(items, vec![0, 3]);
        assert_eq!(slab.handles(), vec![handles[0], handles[3]]);

        for (_, item) in slab.iter_mut() {
            *item += 10;
        }
        assert_eq!(slab.find(|item| *item == 13), Some(handles[3]));
    }
}
