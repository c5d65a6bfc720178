use super::{
    Index,
    OutOfBoundsAccess,
};
use crate::BoundedArray;
use alloc::vec::Vec;

/// A bounded binary max-heap with per-key weights.
///
/// Weights are stored for the entire key space so that a key keeps its
/// weight while it is not contained in the heap. This is what a branching
/// heuristic needs: variables leave the queue when they are assigned and
/// re-enter it with their old weight when they are unassigned.
#[derive(Debug, Clone)]
pub struct BoundedHeap<K, W> {
    /// The keys ordered according to the heap property.
    heap: Vec<K>,
    /// The current heap position of every contained key.
    positions: BoundedArray<K, Option<usize>>,
    /// The weight of every key, contained or not.
    weights: BoundedArray<K, W>,
}

impl<K, W> Default for BoundedHeap<K, W> {
    fn default() -> Self {
        Self {
            heap: Vec::default(),
            positions: BoundedArray::default(),
            weights: BoundedArray::default(),
        }
    }
}

impl<K, W> BoundedHeap<K, W>
where
    K: Index + Eq,
    W: Default + Ord + Copy,
{
    /// Returns the number of keys contained in the heap.
    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if the heap contains no keys.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns the capacity of the key space.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.weights.len()
    }

    /// Increases the key space to the new capacity.
    ///
    /// New keys start with the default weight and are not contained.
    pub fn resize_capacity(&mut self, new_cap: usize) {
        self.positions.resize_with(new_cap, || None);
        self.weights.resize_with(new_cap, W::default);
    }

    /// Returns `true` if the given key is contained in the heap.
    pub fn contains(&self, key: K) -> Result<bool, OutOfBoundsAccess> {
        self.positions
            .get(key)
            .map(Option::is_some)
            .ok_or(OutOfBoundsAccess)
    }

    /// Returns the weight of the given key.
    pub fn weight(&self, key: K) -> Result<W, OutOfBoundsAccess> {
        self.weights.get(key).copied().ok_or(OutOfBoundsAccess)
    }

    /// Inserts the key with its stored weight if it is not contained yet.
    ///
    /// # Errors
    ///
    /// If the key is out of bounds for the heap's key space.
    pub fn restore(&mut self, key: K) -> Result<(), OutOfBoundsAccess> {
        if self.contains(key)? {
            return Ok(())
        }
        let position = self.heap.len();
        self.heap.push(key);
        self.positions
            .update(key, Some(position))
            .expect("bounds were checked by the contains query");
        self.sift_up(position);
        Ok(())
    }

    /// Applies the given weight update to the key and restores the heap order.
    ///
    /// The update must not decrease the weight; the key is only sifted
    /// towards the root.
    ///
    /// # Errors
    ///
    /// If the key is out of bounds for the heap's key space.
    pub fn increase_weight<F>(&mut self, key: K, f: F) -> Result<W, OutOfBoundsAccess>
    where
        F: FnOnce(W) -> W,
    {
        let weight = self.weights.get_mut(key).ok_or(OutOfBoundsAccess)?;
        let new_weight = f(*weight);
        debug_assert!(new_weight >= *weight);
        *weight = new_weight;
        if let Some(Some(position)) = self.positions.get(key).copied() {
            self.sift_up(position);
        }
        Ok(new_weight)
    }

    /// Applies a monotone remapping to every stored weight.
    ///
    /// The mapping must preserve the relative order of weights; the heap is
    /// not re-ordered.
    pub fn update_weights<F>(&mut self, f: F)
    where
        F: Fn(W) -> W,
    {
        for weight in self.weights.iter_mut() {
            *weight = f(*weight);
        }
    }

    /// Removes and returns the key with the maximum weight if any.
    pub fn pop(&mut self) -> Option<(K, W)> {
        let top = *self.heap.first()?;
        let weight = self
            .weight(top)
            .expect("contained key is always within bounds");
        let last = self
            .heap
            .pop()
            .expect("the heap was just observed to be non-empty");
        self.positions
            .update(top, None)
            .expect("contained key is always within bounds");
        if !self.heap.is_empty() {
            self.heap[0] = last;
            self.positions
                .update(last, Some(0))
                .expect("contained key is always within bounds");
            self.sift_down(0);
        }
        Some((top, weight))
    }

    fn weight_at(&self, position: usize) -> W {
        self.weight(self.heap[position])
            .expect("heap keys are always within bounds")
    }

    fn swap_positions(&mut self, lhs: usize, rhs: usize) {
        self.heap.swap(lhs, rhs);
        for position in [lhs, rhs] {
            self.positions
                .update(self.heap[position], Some(position))
                .expect("heap keys are always within bounds");
        }
    }

    fn sift_up(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / 2;
            if self.weight_at(parent) >= self.weight_at(position) {
                break
            }
            self.swap_positions(parent, position);
            position = parent;
        }
    }

    fn sift_down(&mut self, mut position: usize) {
        loop {
            let mut largest = position;
            for child in [2 * position + 1, 2 * position + 2] {
                if child < self.heap.len()
                    && self.weight_at(child) > self.weight_at(largest)
                {
                    largest = child;
                }
            }
            if largest == position {
                break
            }
            self.swap_positions(position, largest);
            position = largest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_heap(weights: &[i32]) -> BoundedHeap<usize, i32> {
        let mut heap = <BoundedHeap<usize, i32>>::default();
        heap.resize_capacity(weights.len());
        for (key, &weight) in weights.iter().enumerate() {
            heap.restore(key).unwrap();
            heap.increase_weight(key, |_| weight).unwrap();
        }
        heap
    }

    #[test]
    fn pop_yields_descending_weights() {
        let mut heap = filled_heap(&[3, 1, 4, 1, 5]);
        let mut popped = alloc::vec::Vec::new();
        while let Some((_key, weight)) = heap.pop() {
            popped.push(weight);
        }
        assert_eq!(popped, [5, 4, 3, 1, 1]);
    }

    #[test]
    fn weight_survives_pop_and_restore() {
        let mut heap = filled_heap(&[1, 9]);
        assert_eq!(heap.pop(), Some((1, 9)));
        assert!(!heap.contains(1).unwrap());
        heap.restore(1).unwrap();
        assert_eq!(heap.pop(), Some((1, 9)));
    }

    #[test]
    fn increase_weight_reorders_the_heap() {
        let mut heap = filled_heap(&[1, 2, 3]);
        heap.increase_weight(0, |weight| weight + 10).unwrap();
        assert_eq!(heap.pop(), Some((0, 11)));
        assert_eq!(heap.pop(), Some((2, 3)));
    }

    #[test]
    fn restore_is_idempotent() {
        let mut heap = filled_heap(&[1, 2]);
        heap.restore(0).unwrap();
        heap.restore(0).unwrap();
        assert_eq!(heap.len(), 2);
    }

    #[test]
    fn out_of_bounds_keys_are_rejected() {
        let mut heap = <BoundedHeap<usize, i32>>::default();
        heap.resize_capacity(1);
        assert_eq!(heap.restore(1), Err(OutOfBoundsAccess));
        assert_eq!(heap.contains(1), Err(OutOfBoundsAccess));
    }
}
