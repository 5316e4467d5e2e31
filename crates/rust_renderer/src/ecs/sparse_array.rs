//! Fixed-capacity slot storage
//!
//! [`SparseArray`] keeps every value in one dense allocation sized at
//! construction. A parallel occupancy list marks live slots; new values go
//! into the first free slot found by scanning from index 0, so slot order
//! says nothing about insertion order once values have been removed.

/// Dense, fixed-capacity storage with slot reuse
#[derive(Debug, Clone)]
pub struct SparseArray<T> {
    slots: Vec<T>,
    occupied: Vec<bool>,
    len: usize,
}

impl<T: Default> SparseArray<T> {
    /// Allocate `capacity` default-initialized slots
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(T::default).take(capacity).collect(),
            occupied: vec![false; capacity],
            len: 0,
        }
    }

    /// Store `value` in the first free slot and return that slot index
    ///
    /// # Panics
    /// Panics when every slot is occupied.
    pub fn add(&mut self, value: T) -> usize {
        let Some(slot) = self.occupied.iter().position(|occupied| !occupied) else {
            panic!(
                "Trying to add more elements than the array can hold (capacity {})",
                self.capacity()
            );
        };
        self.slots[slot] = value;
        self.occupied[slot] = true;
        self.len += 1;
        slot
    }

    /// Free `slot`, returning the value it held
    ///
    /// # Panics
    /// Panics when the slot is not occupied.
    pub fn remove_at(&mut self, slot: usize) -> T {
        assert!(
            self.is_occupied(slot),
            "Trying to remove an empty slot ({slot})"
        );
        self.occupied[slot] = false;
        self.len -= 1;
        std::mem::take(&mut self.slots[slot])
    }

    /// Free every slot
    pub fn reset(&mut self) {
        for (slot, occupied) in self.slots.iter_mut().zip(self.occupied.iter_mut()) {
            if *occupied {
                *slot = T::default();
                *occupied = false;
            }
        }
        self.len = 0;
    }
}

impl<T> SparseArray<T> {
    /// Value in `slot` if it is occupied
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&T> {
        self.is_occupied(slot).then(|| &self.slots[slot])
    }

    /// Mutable value in `slot` if it is occupied
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        if self.is_occupied(slot) {
            Some(&mut self.slots[slot])
        } else {
            None
        }
    }

    /// Whether `slot` currently holds a value
    #[must_use]
    pub fn is_occupied(&self, slot: usize) -> bool {
        self.occupied.get(slot).copied().unwrap_or(false)
    }

    /// Number of occupied slots
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True when no slot is occupied
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total number of slots
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// True when every slot is occupied
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Iterate occupied slots as `(slot, value)`
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .zip(&self.occupied)
            .enumerate()
            .filter_map(|(slot, (value, occupied))| occupied.then_some((slot, value)))
    }

    /// Iterate occupied slots mutably as `(slot, value)`
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.slots
            .iter_mut()
            .zip(&self.occupied)
            .enumerate()
            .filter_map(|(slot, (value, occupied))| occupied.then_some((slot, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_uses_first_free_slot() {
        let mut array = SparseArray::<u32>::new(4);
        assert_eq!(array.add(10), 0);
        assert_eq!(array.add(11), 1);
        assert_eq!(array.add(12), 2);

        assert_eq!(array.remove_at(1), 11);
        assert_eq!(array.add(13), 1);
        assert_eq!(array.get(1), Some(&13));
        assert_eq!(array.len(), 3);
    }

    #[test]
    fn test_iter_skips_free_slots() {
        let mut array = SparseArray::<u32>::new(3);
        array.add(1);
        array.add(2);
        array.add(3);
        array.remove_at(0);

        let live: Vec<_> = array.iter().map(|(_, value)| *value).collect();
        assert_eq!(live, vec![2, 3]);
    }

    #[test]
    fn test_reset_twice_leaves_empty() {
        let mut array = SparseArray::<u32>::new(2);
        array.add(5);
        array.reset();
        assert!(array.is_empty());
        array.reset();
        assert!(array.is_empty());
        assert_eq!(array.get(0), None);
    }

    #[test]
    fn test_exact_capacity_fills() {
        let mut array = SparseArray::<u8>::new(3);
        for value in 0..3 {
            array.add(value);
        }
        assert!(array.is_full());
    }

    #[test]
    #[should_panic(expected = "Trying to add more elements")]
    fn test_overflow_panics() {
        let mut array = SparseArray::<u8>::new(1);
        array.add(1);
        array.add(2);
    }

    #[test]
    #[should_panic(expected = "Trying to remove an empty slot")]
    fn test_remove_empty_slot_panics() {
        let mut array = SparseArray::<u8>::new(2);
        array.remove_at(0);
    }
}
